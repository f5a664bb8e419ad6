//! Network Module
//!
//! HTTP front end for the store.
//!
//! ## Routes
//! - `PUT    /v1/key/{key}`: body is the raw value; `201 Created`
//! - `GET    /v1/key/{key}`: raw value; `404` when absent
//! - `DELETE /v1/key/{key}`: `200 OK`, also for absent keys
//! - `GET    /health`:       liveness probe

mod handlers;
mod server;

pub use handlers::router;
pub use server::Server;
