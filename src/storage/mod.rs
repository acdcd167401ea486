pub mod ledger;
pub mod records;

pub use ledger::{RunLedger, RunRecord, RunStatus};
pub use records::ResultStore;
