//! Cardmark Server Library - REST API components for membership card issuance
//!
//! This library exposes the server components for use in integration tests.
//! The main binary uses these same components.

pub mod artifact_store;
pub mod config;
pub mod error;
pub mod handlers;
pub mod multipart;
pub mod routes;
pub mod state;
pub mod validation;

pub use artifact_store::{ArtifactStore, ArtifactStoreError};
pub use config::Config;
pub use error::ApiError;
pub use routes::{create_router, create_router_with_config};
pub use state::AppState;
