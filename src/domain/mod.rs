//! Domain module
//!
//! Card core types and the pure business rules over them.

pub mod amount;
pub mod block_request;
pub mod card;
pub mod clock;
pub mod error;
pub mod limit;
pub mod transaction;
pub mod user;

pub use amount::{Amount, AmountError, Balance};
pub use block_request::{BlockDecision, BlockRequest, BlockStatus, BLOCK_REQUEST_COOLDOWN_DAYS};
pub use card::{mask_card_number, Card, CardEvent, CardStatus};
pub use clock::{Clock, FixedClock, SharedClock, SystemClock};
pub use error::DomainError;
pub use limit::{check_limits, Limit, LimitPeriod, LimitWindow, WithdrawalTotals};
pub use transaction::{OperationKind, OperationResult, TransactionRecord};
pub use user::User;
