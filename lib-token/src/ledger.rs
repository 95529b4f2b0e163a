//! Rate Ledger
//!
//! Dual share/token bookkeeping behind the reflection mechanism.
//!
//! Every account's visible balance is derived from one of two
//! representations, dispatched on a per-account tag:
//!
//! - **Participating**: the account holds shares; its balance is
//!   `shares / rate` at the current conversion rate. Retiring shares from
//!   the pool (tax fees) raises every participating balance implicitly.
//! - **Excluded**: the account holds an explicit token count, immune to the
//!   implicit inflation. Its share balance is still carried because the
//!   effective-supply computation subtracts both sides for every excluded
//!   account.
//!
//! # Invariants (Non-Negotiable)
//!
//! 1. **Supply Invariant**: `total_supply` is fixed at genesis and conserved
//!    by every transfer (fees move value, never mint or destroy units)
//! 2. **Share Monotonicity**: `total_shares` never increases; every tax
//!    application subtracts from it with no credit
//! 3. **Rate Sanity**: the effective share supply never drops below
//!    `total_shares / total_supply`, and the effective token supply never
//!    reaches zero; degenerate exclusion states fall back to the unmodified
//!    totals
//! 4. **Exclusion Neutrality**: excluding or including an account leaves its
//!    visible balance unchanged at that edge

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use lib_fees::{shares_for_breakdown, split_transfer_amount};
use lib_types::{Address, Amount, FeePolicy};

use crate::errors::{TokenError, TokenResult};

/// Genesis supply cap.
///
/// Keeping the supply within 64 bits guarantees at least 2^64 shares per
/// token, so the share/token conversion rate can never truncate to zero.
pub const MAX_GENESIS_SUPPLY: Amount = u64::MAX as Amount;

// =============================================================================
// ACCOUNT BALANCE
// =============================================================================

/// Per-account balance representation, dispatched on the exclusion tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountBalance {
    /// Share balance is authoritative; visible balance is rate-derived
    Participating { shares: Amount },
    /// Explicit token balance is authoritative; shares are still tracked
    /// for the effective-supply computation
    Excluded { tokens: Amount, shares: Amount },
}

impl AccountBalance {
    /// Share balance (meaningful for all accounts)
    pub fn shares(&self) -> Amount {
        match self {
            AccountBalance::Participating { shares } => *shares,
            AccountBalance::Excluded { shares, .. } => *shares,
        }
    }

    /// Explicit token balance (zero unless excluded)
    pub fn explicit_tokens(&self) -> Amount {
        match self {
            AccountBalance::Participating { .. } => 0,
            AccountBalance::Excluded { tokens, .. } => *tokens,
        }
    }
}

impl Default for AccountBalance {
    fn default() -> Self {
        AccountBalance::Participating { shares: 0 }
    }
}

// =============================================================================
// RATE LEDGER
// =============================================================================

/// Share/token ledger with an implicit, rate-based balance representation
///
/// A single owned value; all operations go through `&mut self`. Accounts are
/// created lazily on first balance-affecting event and never destroyed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLedger {
    /// Fixed token supply, set once at genesis
    total_supply: Amount,
    /// Share pool; monotonically non-increasing
    total_shares: Amount,
    /// Running token-equivalent total of tax fees applied (informational)
    total_fees_collected: Amount,
    /// Per-account balances
    accounts: HashMap<Address, AccountBalance>,
    /// Ordered set of reward-excluded accounts
    excluded: BTreeSet<Address>,
}

impl RateLedger {
    /// Create a ledger assigning the whole supply to the genesis holder
    pub fn new(total_supply: Amount, genesis_holder: Address) -> TokenResult<Self> {
        if total_supply == 0 {
            return Err(TokenError::InvalidAmount(
                "genesis supply must be positive".to_string(),
            ));
        }
        if total_supply > MAX_GENESIS_SUPPLY {
            return Err(TokenError::InvalidAmount(
                "genesis supply must fit in 64 bits".to_string(),
            ));
        }

        let total_shares = Amount::MAX - (Amount::MAX % total_supply);
        let mut accounts = HashMap::new();
        accounts.insert(
            genesis_holder,
            AccountBalance::Participating {
                shares: total_shares,
            },
        );

        Ok(Self {
            total_supply,
            total_shares,
            total_fees_collected: 0,
            accounts,
            excluded: BTreeSet::new(),
        })
    }

    // =========================================================================
    // Read surface
    // =========================================================================

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn total_shares(&self) -> Amount {
        self.total_shares
    }

    pub fn total_fees_collected(&self) -> Amount {
        self.total_fees_collected
    }

    /// Current balance representation of an account (zero shares if unseen)
    pub fn account(&self, address: Address) -> AccountBalance {
        self.accounts.get(&address).copied().unwrap_or_default()
    }

    pub fn is_excluded_from_reward(&self, address: Address) -> bool {
        self.excluded.contains(&address)
    }

    /// Visible balance of an account
    pub fn balance_of(&self, address: Address) -> Amount {
        match self.account(address) {
            AccountBalance::Excluded { tokens, .. } => tokens,
            AccountBalance::Participating { shares } => shares / self.current_rate(),
        }
    }

    /// Effective share and token supplies among participating accounts.
    ///
    /// Subtracts every excluded account's share and explicit token balance
    /// from the totals. Falls back to the unmodified totals whenever the
    /// subtraction would produce a degenerate rate: an excluded balance
    /// larger than the remaining supply, a zero effective token supply, or
    /// an effective share supply below `total_shares / total_supply`.
    fn effective_supplies(&self) -> (Amount, Amount) {
        let mut share_supply = self.total_shares;
        let mut token_supply = self.total_supply;

        for address in &self.excluded {
            let account = self.account(*address);
            let shares = account.shares();
            let tokens = account.explicit_tokens();
            if shares > share_supply || tokens > token_supply {
                return (self.total_shares, self.total_supply);
            }
            share_supply -= shares;
            token_supply -= tokens;
        }

        if token_supply == 0 || share_supply < self.total_shares / self.total_supply {
            return (self.total_shares, self.total_supply);
        }

        (share_supply, token_supply)
    }

    /// Current share-per-token conversion rate
    pub fn current_rate(&self) -> Amount {
        let (share_supply, token_supply) = self.effective_supplies();
        share_supply / token_supply
    }

    // =========================================================================
    // Conversions
    // =========================================================================

    /// Convert a token amount to its share-pool equivalent.
    ///
    /// With `deduct_transfer_fee` set, the result is the share amount a
    /// recipient would actually be credited by a same-sized taxed transfer
    /// under the given policy (a preview; no state is touched).
    pub fn reflection_from_token(
        &self,
        amount: Amount,
        deduct_transfer_fee: bool,
        policy: &FeePolicy,
    ) -> TokenResult<Amount> {
        if amount > self.total_supply {
            return Err(TokenError::InvalidAmount(
                "amount exceeds total supply".to_string(),
            ));
        }

        let rate = self.current_rate();
        if !deduct_transfer_fee {
            return amount.checked_mul(rate).ok_or(TokenError::Overflow);
        }

        let breakdown = split_transfer_amount(amount, policy, false);
        let shares = shares_for_breakdown(&breakdown, rate).ok_or(TokenError::Overflow)?;
        Ok(shares.net_shares)
    }

    /// Convert a share amount back to tokens at the current rate
    pub fn token_from_reflection(&self, share_amount: Amount) -> TokenResult<Amount> {
        if share_amount > self.total_shares {
            return Err(TokenError::InvalidAmount(
                "share amount exceeds total shares".to_string(),
            ));
        }
        Ok(share_amount / self.current_rate())
    }

    // =========================================================================
    // Exclusion set
    // =========================================================================

    /// Move an account between the rate-derived and explicit representations.
    ///
    /// Idempotent. Every visible balance is preserved at both edges:
    /// exclusion snapshots the derived balance computed before the account
    /// enters the set; inclusion restores the share balance as
    /// `tokens * rate` with the rate sampled while the account is still
    /// excluded, retiring the surplus stale shares so the rate does not move
    /// when the account rejoins the pool.
    pub fn set_excluded_from_reward(
        &mut self,
        address: Address,
        excluded: bool,
    ) -> TokenResult<()> {
        if excluded == self.excluded.contains(&address) {
            return Ok(());
        }

        if excluded {
            let tokens = self.balance_of(address);
            let shares = self.account(address).shares();
            self.accounts
                .insert(address, AccountBalance::Excluded { tokens, shares });
            self.excluded.insert(address);
        } else {
            let account = self.account(address);
            let tokens = account.explicit_tokens();
            let held_shares = account.shares();

            // Shares never mint: rounding drift in the stale share balance is
            // absorbed by the restored balance, not the pool.
            let shares = tokens
                .checked_mul(self.current_rate())
                .ok_or(TokenError::Overflow)?
                .min(held_shares);
            let surplus = held_shares - shares;
            self.total_shares = self
                .total_shares
                .checked_sub(surplus)
                .ok_or(TokenError::Overflow)?;

            self.excluded.remove(&address);
            self.accounts
                .insert(address, AccountBalance::Participating { shares });
        }

        Ok(())
    }

    // =========================================================================
    // Mutation primitives
    // =========================================================================

    /// Debit an account on both sides of its representation
    pub fn debit(&mut self, address: Address, tokens: Amount, shares: Amount) -> TokenResult<()> {
        let updated = match self.account(address) {
            AccountBalance::Participating { shares: held } => {
                if held < shares {
                    return Err(TokenError::InsufficientBalance {
                        have: held,
                        need: shares,
                    });
                }
                AccountBalance::Participating {
                    shares: held - shares,
                }
            }
            AccountBalance::Excluded {
                tokens: held_tokens,
                shares: held_shares,
            } => {
                if held_tokens < tokens {
                    return Err(TokenError::InsufficientBalance {
                        have: held_tokens,
                        need: tokens,
                    });
                }
                if held_shares < shares {
                    return Err(TokenError::InsufficientBalance {
                        have: held_shares,
                        need: shares,
                    });
                }
                AccountBalance::Excluded {
                    tokens: held_tokens - tokens,
                    shares: held_shares - shares,
                }
            }
        };
        self.accounts.insert(address, updated);
        Ok(())
    }

    /// Credit an account on both sides of its representation
    pub fn credit(&mut self, address: Address, tokens: Amount, shares: Amount) -> TokenResult<()> {
        let updated = match self.account(address) {
            AccountBalance::Participating { shares: held } => AccountBalance::Participating {
                shares: held.checked_add(shares).ok_or(TokenError::Overflow)?,
            },
            AccountBalance::Excluded {
                tokens: held_tokens,
                shares: held_shares,
            } => AccountBalance::Excluded {
                tokens: held_tokens.checked_add(tokens).ok_or(TokenError::Overflow)?,
                shares: held_shares.checked_add(shares).ok_or(TokenError::Overflow)?,
            },
        };
        self.accounts.insert(address, updated);
        Ok(())
    }

    /// Permanently retire shares from the pool with no credit.
    ///
    /// This is the redistribution mechanism: a smaller share pool inflates
    /// every participating balance. `token_fee` is the token-equivalent
    /// amount recorded in the informational fee total.
    pub fn retire_shares(&mut self, share_amount: Amount, token_fee: Amount) -> TokenResult<()> {
        self.total_shares = self
            .total_shares
            .checked_sub(share_amount)
            .ok_or(TokenError::Overflow)?;
        self.total_fees_collected = self
            .total_fees_collected
            .checked_add(token_fee)
            .ok_or(TokenError::Overflow)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUPPLY: Amount = 1_000_000;

    fn holder(n: u8) -> Address {
        Address::new([n; 32])
    }

    fn no_fee_policy() -> FeePolicy {
        FeePolicy {
            tax_fee_percent: 0,
            liquidity_fee_percent: 0,
            max_tx_amount: 0,
            min_tokens_before_swap: 0,
            swap_and_liquify_enabled: false,
        }
    }

    fn taxed_policy() -> FeePolicy {
        FeePolicy {
            tax_fee_percent: 5,
            liquidity_fee_percent: 5,
            ..no_fee_policy()
        }
    }

    // ===== GENESIS TESTS =====

    #[test]
    fn test_genesis_assigns_full_supply_to_holder() {
        let ledger = RateLedger::new(SUPPLY, holder(1)).unwrap();
        assert_eq!(ledger.total_supply(), SUPPLY);
        assert_eq!(ledger.balance_of(holder(1)), SUPPLY);
        assert_eq!(ledger.balance_of(holder(2)), 0);
        assert_eq!(ledger.total_fees_collected(), 0);
    }

    #[test]
    fn test_genesis_share_pool_is_a_multiple_of_supply() {
        let ledger = RateLedger::new(SUPPLY, holder(1)).unwrap();
        assert_eq!(ledger.total_shares() % SUPPLY, 0);
    }

    #[test]
    fn test_genesis_rejects_zero_supply() {
        assert!(matches!(
            RateLedger::new(0, holder(1)),
            Err(TokenError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_genesis_rejects_oversized_supply() {
        assert!(matches!(
            RateLedger::new(MAX_GENESIS_SUPPLY + 1, holder(1)),
            Err(TokenError::InvalidAmount(_))
        ));
    }

    // ===== CONVERSION TESTS =====

    #[test]
    fn test_reflection_round_trip_is_exact() {
        let ledger = RateLedger::new(SUPPLY, holder(1)).unwrap();
        for amount in [0u128, 1, 17, 9_999, SUPPLY] {
            let shares = ledger
                .reflection_from_token(amount, false, &no_fee_policy())
                .unwrap();
            assert_eq!(ledger.token_from_reflection(shares).unwrap(), amount);
        }
    }

    #[test]
    fn test_reflection_preview_deducts_transfer_fees() {
        let ledger = RateLedger::new(SUPPLY, holder(1)).unwrap();
        let gross = ledger
            .reflection_from_token(10_000, false, &taxed_policy())
            .unwrap();
        let net = ledger
            .reflection_from_token(10_000, true, &taxed_policy())
            .unwrap();
        assert_eq!(ledger.token_from_reflection(net).unwrap(), 9_000);
        assert_eq!(gross / ledger.current_rate(), 10_000);
    }

    #[test]
    fn test_conversions_reject_out_of_range_inputs() {
        let ledger = RateLedger::new(SUPPLY, holder(1)).unwrap();
        assert!(matches!(
            ledger.reflection_from_token(SUPPLY + 1, false, &no_fee_policy()),
            Err(TokenError::InvalidAmount(_))
        ));
        assert!(matches!(
            ledger.token_from_reflection(ledger.total_shares() + 1),
            Err(TokenError::InvalidAmount(_))
        ));
    }

    // ===== EXCLUSION TESTS =====

    #[test]
    fn test_exclusion_preserves_balance_at_both_edges() {
        let mut ledger = RateLedger::new(SUPPLY, holder(1)).unwrap();
        let rate = ledger.current_rate();
        ledger.debit(holder(1), 40_000, 40_000 * rate).unwrap();
        ledger.credit(holder(2), 40_000, 40_000 * rate).unwrap();

        let before = ledger.balance_of(holder(2));
        ledger.set_excluded_from_reward(holder(2), true).unwrap();
        assert!(ledger.is_excluded_from_reward(holder(2)));
        assert_eq!(ledger.balance_of(holder(2)), before);

        ledger.set_excluded_from_reward(holder(2), false).unwrap();
        assert!(!ledger.is_excluded_from_reward(holder(2)));
        assert_eq!(ledger.balance_of(holder(2)), before);
    }

    #[test]
    fn test_exclusion_preserves_balance_after_share_retirement() {
        let mut ledger = RateLedger::new(SUPPLY, holder(1)).unwrap();
        let rate = ledger.current_rate();
        ledger.debit(holder(1), 100_000, 100_000 * rate).unwrap();
        ledger.credit(holder(2), 100_000, 100_000 * rate).unwrap();
        ledger.set_excluded_from_reward(holder(2), true).unwrap();

        // A taxed transfer from holder(1) to holder(3) moves the rate while
        // holder(2) sits out.
        let rate = ledger.current_rate();
        ledger.debit(holder(1), 10_000, 10_000 * rate).unwrap();
        ledger.credit(holder(3), 5_000, 5_000 * rate).unwrap();
        ledger.retire_shares(5_000 * rate, 5_000).unwrap();
        assert_eq!(ledger.balance_of(holder(2)), 100_000);

        // Inclusion leaves every balance where it was, not just the
        // rejoining account's.
        let bystander = ledger.balance_of(holder(1));
        let recipient = ledger.balance_of(holder(3));
        ledger.set_excluded_from_reward(holder(2), false).unwrap();
        assert_eq!(ledger.balance_of(holder(2)), 100_000);
        assert_eq!(ledger.balance_of(holder(1)), bystander);
        assert_eq!(ledger.balance_of(holder(3)), recipient);

        let sum = ledger.balance_of(holder(1))
            + ledger.balance_of(holder(2))
            + ledger.balance_of(holder(3));
        assert!(SUPPLY - sum <= 2, "sum {} drifted from supply", sum);
    }

    #[test]
    fn test_exclusion_is_idempotent() {
        let mut ledger = RateLedger::new(SUPPLY, holder(1)).unwrap();
        ledger.set_excluded_from_reward(holder(1), true).unwrap();
        ledger.set_excluded_from_reward(holder(1), true).unwrap();
        assert_eq!(ledger.balance_of(holder(1)), SUPPLY);
        ledger.set_excluded_from_reward(holder(1), false).unwrap();
        ledger.set_excluded_from_reward(holder(1), false).unwrap();
        assert_eq!(ledger.balance_of(holder(1)), SUPPLY);
    }

    #[test]
    fn test_degenerate_exclusion_falls_back_to_totals() {
        let mut ledger = RateLedger::new(SUPPLY, holder(1)).unwrap();
        let baseline_rate = ledger.current_rate();

        // Excluding the sole holder would zero the effective token supply.
        ledger.set_excluded_from_reward(holder(1), true).unwrap();
        assert_eq!(ledger.current_rate(), baseline_rate);
        assert_eq!(ledger.balance_of(holder(1)), SUPPLY);
    }

    // ===== RETIREMENT TESTS =====

    #[test]
    fn test_retiring_shares_inflates_participating_balances() {
        let mut ledger = RateLedger::new(SUPPLY, holder(1)).unwrap();
        let rate = ledger.current_rate();
        ledger.debit(holder(1), 200_000, 200_000 * rate).unwrap();
        ledger.credit(holder(2), 100_000, 100_000 * rate).unwrap();
        ledger.credit(holder(3), 100_000, 100_000 * rate).unwrap();

        // holder(1) gives up 100,000 tokens with no recipient.
        ledger.debit(holder(1), 100_000, 100_000 * rate).unwrap();
        ledger.retire_shares(100_000 * rate, 100_000).unwrap();

        assert!(ledger.balance_of(holder(2)) > 100_000);
        assert!(ledger.balance_of(holder(3)) > 100_000);
        assert_eq!(ledger.total_fees_collected(), 100_000);

        // Conserved up to integer rounding.
        let sum = ledger.balance_of(holder(1))
            + ledger.balance_of(holder(2))
            + ledger.balance_of(holder(3));
        assert!(SUPPLY - sum <= 1, "sum {} drifted from supply", sum);
    }

    #[test]
    fn test_debit_beyond_balance_is_rejected() {
        let mut ledger = RateLedger::new(SUPPLY, holder(1)).unwrap();
        let rate = ledger.current_rate();
        assert_eq!(
            ledger.debit(holder(2), 1, rate),
            Err(TokenError::InsufficientBalance {
                have: 0,
                need: rate
            })
        );
    }
}
