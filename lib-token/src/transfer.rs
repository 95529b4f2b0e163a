//! Transfer Execution
//!
//! `execute_transfer` is the canonical way to move value between accounts
//! with full validation.
//!
//! # Enforcement
//!
//! - **Null accounts**: neither party may be the zero address
//! - **Positive amount**: zero-value transfers are rejected
//! - **Balance**: the sender must cover the full amount
//! - **Transaction limit**: non-privileged senders are bound by
//!   `max_tx_amount`
//! - **Rate sampling**: the share/token rate is sampled once per transfer and
//!   reused for every leg, so a transfer cannot drift against itself
//!
//! Steps 1-4 abort with no state mutation. A liquidity conversion triggered
//! by the transfer runs before the transfer's own accounting and its failure
//! does not abort the transfer (see [`TransferResult::conversion`]).

use tracing::{debug, warn};

use lib_fees::{shares_for_breakdown, split_transfer_amount};
use lib_types::{Address, Amount, FeeBreakdown};

use crate::contract::ReflectiveToken;
use crate::errors::{TokenError, TokenResult};
use crate::events::TokenEvent;
use crate::liquidity::{self, LiquifyOutcome};

/// Summary of an executed transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResult {
    /// Amount debited from the sender
    pub amount: Amount,
    /// Amount delivered to the recipient
    pub net_amount: Amount,
    /// Tax fee retired from the share pool
    pub tax_fee: Amount,
    /// Liquidity fee credited to the contract account
    pub liquidity_fee: Amount,
    /// Outcome of the liquidity conversion this transfer triggered, if any.
    ///
    /// A failed conversion does not fail the transfer: the conversion's
    /// committed ledger mutations stand and the transfer's own accounting
    /// still runs. This is a contract clause, not an accident.
    pub conversion: Option<Result<LiquifyOutcome, TokenError>>,
}

/// Execute a transfer with full validation
pub fn execute_transfer(
    token: &mut ReflectiveToken,
    router: &mut dyn liquidity::SwapRouter,
    from: Address,
    to: Address,
    amount: Amount,
) -> TokenResult<(TransferResult, Vec<TokenEvent>)> {
    // =========================================================================
    // Check 1: Null accounts
    // =========================================================================
    if from.is_zero() || to.is_zero() {
        return Err(TokenError::ZeroAddress);
    }

    // =========================================================================
    // Check 2: Positive amount
    // =========================================================================
    if amount == 0 {
        return Err(TokenError::InvalidAmount(
            "transfer amount must be greater than zero".to_string(),
        ));
    }

    // =========================================================================
    // Check 3: Sender balance
    // =========================================================================
    let have = token.ledger.balance_of(from);
    if have < amount {
        return Err(TokenError::InsufficientBalance { have, need: amount });
    }

    // =========================================================================
    // Check 4: Transaction limit (the owner is not bound)
    // =========================================================================
    let max = token.fees.max_tx_amount;
    if from != token.owner && max > 0 && amount > max {
        return Err(TokenError::TxLimitExceeded { amount, max });
    }

    let mut events = Vec::new();

    // =========================================================================
    // Convert previously-accumulated liquidity fees
    // =========================================================================
    // Runs before this transfer's own accounting and only on its accumulated
    // balance. An incoming trade from the pool pair must not trigger a
    // conversion while it is being serviced.
    let mut conversion = None;
    let contract_balance = token.ledger.balance_of(token.contract_account);
    if token.fees.swap_and_liquify_enabled
        && !token.liquidity.in_swap_and_liquify
        && from != token.pair_account
        && contract_balance > 0
        && contract_balance >= token.fees.min_tokens_before_swap
    {
        match liquidity::swap_and_liquify(token, router) {
            Ok((outcome, mut conversion_events)) => {
                events.append(&mut conversion_events);
                conversion = Some(Ok(outcome));
            }
            Err(error) => {
                warn!(%error, "liquidity conversion failed; transfer proceeds");
                conversion = Some(Err(error));
            }
        }
    }

    // =========================================================================
    // Fee split and balance movement
    // =========================================================================
    // Exemption is OR'd across the parties: either side being exempt removes
    // both fees for the whole transfer.
    let exempt = token.is_excluded_from_fee(from) || token.is_excluded_from_fee(to);
    let breakdown = transfer_balances(token, from, to, amount, exempt)?;

    debug!(%from, %to, %amount, net = %breakdown.net_amount, "transfer applied");
    events.push(TokenEvent::Transfer {
        from,
        to,
        amount: breakdown.net_amount,
    });

    Ok((
        TransferResult {
            amount,
            net_amount: breakdown.net_amount,
            tax_fee: breakdown.tax_fee,
            liquidity_fee: breakdown.liquidity_fee,
            conversion,
        },
        events,
    ))
}

/// Move balances for one transfer at a single sampled rate.
///
/// Debits the sender by the gross amount, credits the recipient with the net
/// amount, credits the contract account with the liquidity fee, and retires
/// the tax fee from the share pool. Callers are responsible for validation;
/// the liquidity controller uses this directly (with fees suspended) for its
/// internal conversion moves, which are not orchestrated transfers and are
/// not bound by the transaction limit.
pub(crate) fn transfer_balances(
    token: &mut ReflectiveToken,
    from: Address,
    to: Address,
    amount: Amount,
    exempt: bool,
) -> TokenResult<FeeBreakdown> {
    let rate = token.ledger.current_rate();
    let breakdown = split_transfer_amount(amount, &token.fees, exempt);
    let shares = shares_for_breakdown(&breakdown, rate).ok_or(TokenError::Overflow)?;

    token.ledger.debit(from, amount, shares.gross_shares)?;
    token
        .ledger
        .credit(to, breakdown.net_amount, shares.net_shares)?;

    if breakdown.liquidity_fee > 0 {
        token.ledger.credit(
            token.contract_account,
            breakdown.liquidity_fee,
            shares.liquidity_shares,
        )?;
    }
    if breakdown.tax_fee > 0 {
        token
            .ledger
            .retire_shares(shares.tax_shares, breakdown.tax_fee)?;
    }

    Ok(breakdown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::GenesisConfig;
    use crate::liquidity::{LiquidityReceipt, RouterError, SwapRouter};

    const SUPPLY: Amount = 1_000_000;

    fn addr(n: u8) -> Address {
        Address::new([n; 32])
    }

    fn owner() -> Address {
        addr(1)
    }

    /// Router that must never be reached
    struct UnreachableRouter;

    impl SwapRouter for UnreachableRouter {
        fn swap_exact_tokens_for_reference(
            &mut self,
            _amount_in: Amount,
            _recipient: Address,
        ) -> Result<Amount, RouterError> {
            panic!("router must not be invoked");
        }

        fn add_liquidity(
            &mut self,
            _token_amount: Amount,
            _reference_amount: Amount,
            _min_token: Amount,
            _min_reference: Amount,
            _recipient: Address,
        ) -> Result<LiquidityReceipt, RouterError> {
            panic!("router must not be invoked");
        }
    }

    fn test_config() -> GenesisConfig {
        GenesisConfig {
            name: "Reflect".to_string(),
            symbol: "RFX".to_string(),
            decimals: 6,
            total_supply: SUPPLY,
            tax_fee_percent: 5,
            liquidity_fee_percent: 5,
            max_tx_percent: 100,
            min_tokens_before_swap_bps: 5,
            swap_and_liquify_enabled: false,
        }
    }

    fn deploy() -> ReflectiveToken {
        ReflectiveToken::new(test_config(), owner(), addr(2), addr(3))
            .unwrap()
            .0
    }

    fn transfer(
        token: &mut ReflectiveToken,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> TokenResult<(TransferResult, Vec<TokenEvent>)> {
        execute_transfer(token, &mut UnreachableRouter, from, to, amount)
    }

    // ===== VALIDATION TESTS =====

    #[test]
    fn test_zero_address_is_rejected() {
        let mut token = deploy();
        assert_eq!(
            transfer(&mut token, owner(), Address::zero(), 1_000).unwrap_err(),
            TokenError::ZeroAddress
        );
        assert_eq!(
            transfer(&mut token, Address::zero(), addr(10), 1_000).unwrap_err(),
            TokenError::ZeroAddress
        );
    }

    #[test]
    fn test_zero_amount_is_rejected() {
        let mut token = deploy();
        assert!(matches!(
            transfer(&mut token, owner(), addr(10), 0),
            Err(TokenError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_insufficient_balance_is_rejected_without_mutation() {
        let mut token = deploy();
        let result = transfer(&mut token, addr(10), addr(11), 1_000);
        assert_eq!(
            result.unwrap_err(),
            TokenError::InsufficientBalance {
                have: 0,
                need: 1_000
            }
        );
        assert_eq!(token.balance_of(owner()), SUPPLY);
        assert_eq!(token.total_fees(), 0);
    }

    #[test]
    fn test_max_tx_limit_boundary() {
        let mut token = deploy();
        transfer(&mut token, owner(), addr(10), 20_001).unwrap();
        token.set_max_tx_percent(owner(), 1).unwrap();

        // Exactly at the limit passes; one unit over fails.
        transfer(&mut token, addr(10), addr(11), 10_000).unwrap();
        assert_eq!(
            transfer(&mut token, addr(10), addr(11), 10_001).unwrap_err(),
            TokenError::TxLimitExceeded {
                amount: 10_001,
                max: 10_000
            }
        );
    }

    #[test]
    fn test_owner_is_not_bound_by_max_tx_limit() {
        let mut token = deploy();
        token.set_max_tx_percent(owner(), 1).unwrap();
        transfer(&mut token, owner(), addr(10), 500_000).unwrap();
        assert_eq!(token.balance_of(addr(10)), 500_000);
    }

    // ===== FEE APPLICATION TESTS =====

    #[test]
    fn test_exempt_transfer_delivers_exact_amount() {
        let mut token = deploy();
        let shares_before = token.ledger.total_shares();

        // The owner is fee-exempt by default; exemption is OR'd.
        let (result, events) = transfer(&mut token, owner(), addr(10), 100_000).unwrap();
        assert_eq!(result.net_amount, 100_000);
        assert_eq!(result.tax_fee, 0);
        assert_eq!(result.liquidity_fee, 0);
        assert_eq!(token.balance_of(addr(10)), 100_000);
        assert_eq!(token.ledger.total_shares(), shares_before);
        assert_eq!(token.total_fees(), 0);
        assert_eq!(
            events,
            vec![TokenEvent::Transfer {
                from: owner(),
                to: addr(10),
                amount: 100_000
            }]
        );
    }

    #[test]
    fn test_worked_tokenomics_example() {
        let mut token = deploy();
        transfer(&mut token, owner(), addr(10), 100_000).unwrap();

        let (result, _) = transfer(&mut token, addr(10), addr(11), 10_000).unwrap();
        assert_eq!(result.net_amount, 9_000);
        assert_eq!(result.tax_fee, 500);
        assert_eq!(result.liquidity_fee, 500);
        assert_eq!(token.total_fees(), 500);

        // The contract accumulated the liquidity fee; every participating
        // balance also absorbed its slice of the retired tax fee.
        assert_eq!(token.balance_of(token.contract_account()), 500);
        assert_eq!(token.balance_of(addr(11)), 9_004);
        assert_eq!(token.balance_of(addr(10)), 90_045);
        assert_eq!(token.balance_of(owner()), 900_450);
    }

    #[test]
    fn test_supply_conservation_over_taxed_transfers() {
        let mut token = deploy();
        for (n, amount) in [(10u8, 100_000u128), (11, 100_000), (12, 100_000)] {
            transfer(&mut token, owner(), addr(n), amount).unwrap();
        }

        transfer(&mut token, addr(10), addr(11), 9_999).unwrap();
        transfer(&mut token, addr(11), addr(12), 5_000).unwrap();
        transfer(&mut token, addr(12), addr(10), 1_234).unwrap();

        let holders = [owner(), addr(10), addr(11), addr(12), token.contract_account()];
        let sum: Amount = holders.iter().map(|a| token.balance_of(*a)).sum();
        assert!(
            SUPPLY - sum <= 3,
            "sum {} drifted more than 1 unit per transfer",
            sum
        );
    }

    #[test]
    fn test_reflection_preview_matches_delivered_balance() {
        let mut token = deploy();
        transfer(&mut token, owner(), addr(10), 100_000).unwrap();

        let predicted = token.reflection_from_token(10_000, true).unwrap();
        transfer(&mut token, addr(10), addr(11), 10_000).unwrap();
        assert_eq!(
            token.balance_of(addr(11)),
            token.token_from_reflection(predicted).unwrap()
        );
    }

    #[test]
    fn test_excluded_sender_spends_explicit_balance() {
        let mut token = deploy();
        transfer(&mut token, owner(), addr(10), 50_000).unwrap();
        token.set_excluded_from_reward(owner(), addr(10), true).unwrap();

        let predicted = token.reflection_from_token(10_000, true).unwrap();
        transfer(&mut token, addr(10), addr(11), 10_000).unwrap();

        // The excluded sender pays the full amount and earns no reflection.
        assert_eq!(token.balance_of(addr(10)), 40_000);
        assert_eq!(
            token.balance_of(addr(11)),
            token.token_from_reflection(predicted).unwrap()
        );
    }

    #[test]
    fn test_excluded_recipient_receives_exact_net_amount() {
        let mut token = deploy();
        transfer(&mut token, owner(), addr(10), 50_000).unwrap();
        token.set_excluded_from_reward(owner(), addr(11), true).unwrap();

        transfer(&mut token, addr(10), addr(11), 10_000).unwrap();

        // Explicit balances do not absorb the retired tax fee.
        assert_eq!(token.balance_of(addr(11)), 9_000);
    }
}
