pub mod client;
pub mod rates;

pub use client::{InboundPayment, PaymentRail, PaymentState, RailClient, RailError, VirtualAccountResponse};
pub use rates::{RateClient, RateError, RateQuote, RateSource};
