pub mod admin;
pub mod expiry;
pub mod issuer;
pub mod locks;
pub mod poller;
pub mod quote;
pub mod reconciliation;

pub use admin::AdminService;
pub use expiry::ExpirySweeper;
pub use issuer::IssuerService;
pub use locks::TransferLocks;
pub use poller::{PollError, StatusPoller};
pub use quote::{CreateTransferInput, QuoteService};
pub use reconciliation::ReconciliationService;
