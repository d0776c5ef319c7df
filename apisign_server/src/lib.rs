//! # API Sign server
//! This crate hosts the HTTP surface of the API signing engine. It is responsible for:
//! * Issuing dynamic salts and server-side signatures to registered callers.
//! * Verifying the `Sign-*` headers on protected endpoints before their handlers run.
//! * Periodically purging expired salts when salts are tracked statefully.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/sign/dynamic-salt-generate`, `/api/sign/dynamic-salt-validate`: Dynamic salt issue and check.
//! * `/api/sign/generate`, `/api/sign/sign-validate`: Signature issue and check.
//! * `/api/sign/submit-test`, `/api/sign/submit-with-params`, `/api/sign/user-auth-list`, `/api/orders/{id}`: Signed
//!   endpoints.
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod middleware;
pub mod routes;
pub mod salt_purge_worker;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
