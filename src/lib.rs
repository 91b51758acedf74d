//! bank_cards Library
//!
//! Card funds movement, spending limits and block requests.
//! Re-exports modules for integration testing and the server binary.

pub mod api;
pub mod domain;
pub mod handlers;
pub mod store;
pub mod validation;

pub mod config;
pub mod db;
mod error;

pub use config::Config;
pub use domain::{Amount, AmountError, Balance, DomainError};
pub use error::{AppError, AppResult, ErrorResponse};
