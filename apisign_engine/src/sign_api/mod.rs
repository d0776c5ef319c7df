pub mod errors;
pub mod pipeline;
pub mod policy;
pub mod salt_api;
pub mod signature_api;
