//! Command Handlers module
//!
//! Each handler opens a unit of work, loads and locks what it needs, runs the
//! business checks and commits the outcome. Handlers are generic over the
//! storage backend.

mod block_request_handler;
mod card_handler;
mod commands;
mod recharge_handler;
mod transfer_handler;
mod withdrawal_handler;


pub use block_request_handler::BlockRequestHandler;
pub use card_handler::CardHandler;
pub use commands::*;
pub use recharge_handler::RechargeHandler;
pub use transfer_handler::TransferHandler;
pub use withdrawal_handler::WithdrawalHandler;
