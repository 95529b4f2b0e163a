//! Liquidity Controller
//!
//! Converts the contract account's accumulated liquidity fees into
//! external-pool liquidity: half of the balance is swapped for the reference
//! asset, then both halves are supplied to the pool and the pool-share
//! receipt is forwarded to the owner.
//!
//! The whole conversion runs under a scoped lock so a nested call re-entering
//! through the external router cannot start a second conversion, and with
//! fees suspended so the internal moves that reach the external calls are not
//! themselves taxed. Lock release and fee restoration happen on every exit
//! path, including router failure.
//!
//! External calls are best-effort: a router failure surfaces as
//! `LiquidityConversionFailed` and leaves already-committed ledger mutations
//! in place.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use lib_types::{Address, Amount};

use crate::contract::ReflectiveToken;
use crate::errors::{TokenError, TokenResult};
use crate::events::TokenEvent;
use crate::transfer::transfer_balances;

// =============================================================================
// EXTERNAL COLLABORATOR SEAM
// =============================================================================

/// Failure reported by an external router call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct RouterError(pub String);

/// Receipt for a completed add-liquidity call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityReceipt {
    /// Pool shares minted to the recipient
    pub pool_shares_minted: Amount,
    /// Tokens actually deposited
    pub token_deposited: Amount,
    /// Reference-asset units actually deposited
    pub reference_deposited: Amount,
}

/// External decentralized-exchange router capabilities.
///
/// Implementations own deadline and slippage enforcement; the ledger core
/// never fabricates a clock and passes zero minimums.
pub trait SwapRouter {
    /// Swap an exact token amount for the reference asset, crediting the
    /// proceeds to `recipient`
    fn swap_exact_tokens_for_reference(
        &mut self,
        amount_in: Amount,
        recipient: Address,
    ) -> Result<Amount, RouterError>;

    /// Supply tokens plus reference asset as pool liquidity, minting the
    /// pool-share receipt to `recipient`
    fn add_liquidity(
        &mut self,
        token_amount: Amount,
        reference_amount: Amount,
        min_token: Amount,
        min_reference: Amount,
        recipient: Address,
    ) -> Result<LiquidityReceipt, RouterError>;
}

// =============================================================================
// CONTROLLER STATE
// =============================================================================

/// Liquidity controller state: `Idle` or `Converting` (lock held)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityState {
    pub(crate) in_swap_and_liquify: bool,
}

/// Summary of one completed conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquifyOutcome {
    pub tokens_swapped: Amount,
    pub reference_received: Amount,
    pub tokens_into_liquidity: Amount,
}

// =============================================================================
// CONVERSION
// =============================================================================

/// Convert the contract account's accumulated balance into pool liquidity
pub(crate) fn swap_and_liquify(
    token: &mut ReflectiveToken,
    router: &mut dyn SwapRouter,
) -> TokenResult<(LiquifyOutcome, Vec<TokenEvent>)> {
    with_conversion_lock(token, |token| {
        token.with_fees_suspended(|token| run_conversion(token, router))
    })
}

/// Scoped acquisition of the conversion lock.
///
/// The flag is cleared on every exit path; callers never touch it directly.
fn with_conversion_lock<T>(
    token: &mut ReflectiveToken,
    f: impl FnOnce(&mut ReflectiveToken) -> TokenResult<T>,
) -> TokenResult<T> {
    if token.liquidity.in_swap_and_liquify {
        return Err(TokenError::LiquidityConversionFailed(
            "conversion already in progress".to_string(),
        ));
    }
    token.liquidity.in_swap_and_liquify = true;
    let result = f(token);
    token.liquidity.in_swap_and_liquify = false;
    result
}

fn run_conversion(
    token: &mut ReflectiveToken,
    router: &mut dyn SwapRouter,
) -> TokenResult<(LiquifyOutcome, Vec<TokenEvent>)> {
    let contract = token.contract_account;
    let pair = token.pair_account;
    let owner = token.owner;

    let balance = token.ledger.balance_of(contract);
    let half = balance / 2;
    let other_half = balance - half;
    if half == 0 {
        return Err(TokenError::LiquidityConversionFailed(
            "contract balance too small to split".to_string(),
        ));
    }

    let mut events = Vec::new();

    // Swap leg: hand the first half to the pool, collect the reference asset.
    // Fees are suspended, so the internal move delivers the amount whole.
    let swap_leg = transfer_balances(token, contract, pair, half, false)?;
    events.push(TokenEvent::Transfer {
        from: contract,
        to: pair,
        amount: swap_leg.net_amount,
    });
    let reference_received = router
        .swap_exact_tokens_for_reference(half, contract)
        .map_err(|e| TokenError::LiquidityConversionFailed(e.to_string()))?;

    // Liquidity leg: supply the second half plus the proceeds; the receipt
    // goes to the owner, not the contract.
    let liquidity_leg = transfer_balances(token, contract, pair, other_half, false)?;
    events.push(TokenEvent::Transfer {
        from: contract,
        to: pair,
        amount: liquidity_leg.net_amount,
    });
    let receipt = router
        .add_liquidity(other_half, reference_received, 0, 0, owner)
        .map_err(|e| TokenError::LiquidityConversionFailed(e.to_string()))?;

    info!(
        tokens_swapped = %half,
        reference_received = %reference_received,
        tokens_into_liquidity = %other_half,
        pool_shares_minted = %receipt.pool_shares_minted,
        "swap and liquify performed"
    );

    events.push(TokenEvent::SwapAndLiquifyPerformed {
        tokens_swapped: half,
        reference_received,
        tokens_into_liquidity: other_half,
    });

    Ok((
        LiquifyOutcome {
            tokens_swapped: half,
            reference_received,
            tokens_into_liquidity: other_half,
        },
        events,
    ))
}
