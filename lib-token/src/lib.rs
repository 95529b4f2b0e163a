//! Reflection Token Ledger
//!
//! This crate implements a fungible-token ledger that redistributes a share
//! of every taxed transfer to all holders ("reflection") and accumulates
//! another share on the contract's own account for batched conversion into
//! external-pool liquidity.
//!
//! # Key Types
//!
//! - [`ReflectiveToken`]: the token surface (transfers, allowances, admin)
//! - [`RateLedger`]: share/token dual bookkeeping and the conversion rate
//! - [`SwapRouter`]: the external swap/add-liquidity collaborator seam
//! - [`TokenEvent`]: events returned by mutating operations
//!
//! # Execution
//!
//! Execution is single-threaded and serialized: every operation runs to
//! completion before the next is accepted. The only guard is the liquidity
//! controller's conversion lock, held across the external router calls.

pub mod contract;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod liquidity;
pub mod transfer;

pub use contract::{GenesisConfig, ReflectiveToken, TokenMetadata};
pub use errors::{TokenError, TokenResult};
pub use events::TokenEvent;
pub use ledger::{AccountBalance, RateLedger};
pub use liquidity::{LiquidityReceipt, LiquifyOutcome, RouterError, SwapRouter};
pub use transfer::TransferResult;
