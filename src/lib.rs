// EcoSpend - Core Library
// Expense ledger with carbon-footprint aggregates, shared by the TUI and API server

pub mod factors;
pub mod form;
pub mod ledger;
pub mod logging;
pub mod report;
pub mod session;

// Re-export commonly used types
pub use factors::{EmissionFactor, EmissionFactorTable};
pub use form::{FormError, Submission, MIN_AMOUNT};
pub use ledger::{CategoryShare, CategoryTotal, DailyTotal, Entry, ExpenseLedger};
pub use session::{SessionError, SessionStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
