//! Reflection token primitives.
//! Stable, behavior-free, shared by every crate in the workspace.
//!
//! Rule: No String identifiers in ledger state. Ever.

pub mod fees;
pub mod primitives;

pub use fees::{FeeBreakdown, FeePolicy, ShareBreakdown};
pub use primitives::{Address, Amount, Bps, Percent};
