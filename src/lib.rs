//! Torii Gatewayr Library
//!
//! Workspace-scoped REST gateway for a geospatial resource catalogue.
//!
//! # Features
//!
//! - **Workspace AuthZ**: every request is checked against the workspace
//!   segment in the URL path and, optionally, an OPA policy
//! - **JWT Auth**: bearer-token authentication with signature and expiry
//!   validation
//! - **Catalogue Proxy**: STAC item create/update/delete into workspace
//!   storage with Pulsar ingestion messages
//! - **Commercial Orders**: order and quote endpoints for Airbus and Planet
//!   imagery, executed through an ADES workflow runner
//!
//! # Example
//!
//! ```no_run
//! use torii_gatewayr::{config::Config, server::Server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let server = Server::new(config).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod ades;
pub mod airbus;
pub mod auth;
pub mod authz;
pub mod catalogue;
pub mod config;
pub mod ingest;
pub mod metrics;
pub mod orders;
pub mod planet;
pub mod router;
pub mod secrets;
pub mod server;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use server::Server;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
