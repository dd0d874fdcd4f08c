//! Remote shutdown bookkeeping and recovery-window enforcement.

pub mod ledger;
pub mod record;

pub use ledger::ShutdownLedger;
pub use record::{ShutdownRecord, ShutdownRecordView};
