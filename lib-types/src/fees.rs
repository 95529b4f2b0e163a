//! Pure fee data types
//!
//! Behavior-free inputs and outputs of the fee engine. The computation
//! functions live in `lib-fees` and re-export these types.

use serde::{Deserialize, Serialize};

use crate::primitives::{Amount, Percent};

/// Live fee configuration for the token
///
/// Percents are whole integers (5 = 5%). `max_tx_amount` is an absolute
/// token cap; it is derived from a percent of total supply at the moment the
/// owner sets it and is not recomputed afterwards. A `max_tx_amount` of 0
/// means no limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePolicy {
    /// Share of each taxed transfer retired from the share pool
    pub tax_fee_percent: Percent,
    /// Share of each taxed transfer accumulated for liquidity conversion
    pub liquidity_fee_percent: Percent,
    /// Absolute per-transfer token cap for non-privileged senders (0 = no limit)
    pub max_tx_amount: Amount,
    /// Contract-held token threshold that arms the liquidity controller
    pub min_tokens_before_swap: Amount,
    /// Feature flag for the liquidity controller
    pub swap_and_liquify_enabled: bool,
}

/// Token-side split of a single transfer amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    /// Amount delivered to the recipient
    pub net_amount: Amount,
    /// Amount retired from the share pool (redistributed to all holders)
    pub tax_fee: Amount,
    /// Amount credited to the contract account for later conversion
    pub liquidity_fee: Amount,
}

impl FeeBreakdown {
    /// Total amount levied on top of the net delivery
    pub fn total_levied(&self) -> Amount {
        self.tax_fee.saturating_add(self.liquidity_fee)
    }
}

/// Share-side mirror of a [`FeeBreakdown`], converted at one sampled rate
///
/// All four legs are converted at the same rate so a single transfer cannot
/// drift against itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareBreakdown {
    /// Shares debited from the sender (full transfer amount)
    pub gross_shares: Amount,
    /// Shares credited to the recipient
    pub net_shares: Amount,
    /// Shares permanently retired from the share pool
    pub tax_shares: Amount,
    /// Shares credited to the contract account
    pub liquidity_shares: Amount,
}
