pub mod gateway;
pub mod ledger;
pub mod signature;
pub mod storage;
pub mod types;

#[cfg(any(test, feature = "client"))]
pub mod client;

pub use ledger::{Config, Ledger};
