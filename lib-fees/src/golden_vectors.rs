//! Golden Vector Tests for the Fee Split
//!
//! These tests define EXACT expected fee values for specific inputs.
//! If any of these tests fail, it indicates a ledger-breaking change.
//!
//! # Purpose
//!
//! Golden vectors ensure:
//! 1. Fee computation is deterministic across all platforms
//! 2. Changes to fee logic are intentional (not accidental regressions)
//! 3. The documented truncation policy stays exactly as documented
//!
//! # Updating Golden Vectors
//!
//! If you need to change fee logic:
//! 1. Update the fee computation code
//! 2. Update these golden vectors with new expected values
//! 3. Document the change in the commit message
