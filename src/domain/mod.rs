pub mod clock;
pub mod quote;
pub mod reconciliation;
pub mod transaction;

pub use clock::{Clock, ManualClock, SystemClock};
pub use quote::{FeeSchedule, Quote, QuoteError};
pub use reconciliation::{Classification, ReconciliationResult};
pub use transaction::{
    InvalidTransition, StatusChange, Transfer, TransferStatus, Trigger, VirtualAccount,
};
