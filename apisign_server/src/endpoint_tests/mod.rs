mod helpers;
mod issuance;
mod mocks;
mod signed_routes;
