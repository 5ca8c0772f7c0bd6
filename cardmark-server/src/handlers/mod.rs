//! HTTP request handlers
//!
//! This module contains all the request handlers for the API endpoints.

pub mod cards;
pub mod health;
pub mod register;
pub mod verify;

pub use crate::state::AppState;
pub use cards::card_handler;
pub use health::{health, ready, HealthResponse, ReadyResponse};
pub use register::{register_handler, AnchorView, MembershipCard, RegisterResponse};
pub use verify::{verify_handler, VerifyResponse};

/// Form field carrying the holder's ledger address
pub const WALLET_FIELD: &str = "walletAddress";
