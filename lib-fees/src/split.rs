//! Transfer fee split (pure function)
//!
//! # Rules (enforced in code)
//!
//! - Either party being fee-exempt waives both fees for the whole transfer
//! - `tax = amount * tax_fee_percent / 100`, truncating toward zero
//! - `liquidity = amount * liquidity_fee_percent / 100`, truncating toward zero
//! - `net = amount - tax - liquidity`
//! - No floats, no remainder redistribution
//!
//! The share-side conversion takes the rate as an argument so the caller can
//! sample it exactly once per transfer and reuse it for every leg.

use lib_types::{Amount, FeeBreakdown, FeePolicy, ShareBreakdown};

/// Split a transfer amount into net delivery, tax fee, and liquidity fee.
///
/// `exempt` short-circuits both fees; it is the OR of the two parties'
/// fee-exemption flags (either side being exempt removes both fees for the
/// whole transfer).
pub fn split_transfer_amount(amount: Amount, policy: &FeePolicy, exempt: bool) -> FeeBreakdown {
    if exempt {
        return FeeBreakdown {
            net_amount: amount,
            tax_fee: 0,
            liquidity_fee: 0,
        };
    }

    let tax_fee = amount
        .saturating_mul(policy.tax_fee_percent as Amount)
        / 100;
    let liquidity_fee = amount
        .saturating_mul(policy.liquidity_fee_percent as Amount)
        / 100;
    let net_amount = amount
        .saturating_sub(tax_fee)
        .saturating_sub(liquidity_fee);

    FeeBreakdown {
        net_amount,
        tax_fee,
        liquidity_fee,
    }
}

/// Convert a token-side breakdown into its share-side mirror at one rate.
///
/// Returns `None` on arithmetic overflow. The gross leg is derived from the
/// original transfer amount (`net + tax + liquidity`), so the four legs are
/// consistent by construction: `gross = net + tax + liquidity` holds on the
/// share side as well.
pub fn shares_for_breakdown(breakdown: &FeeBreakdown, rate: Amount) -> Option<ShareBreakdown> {
    let net_shares = breakdown.net_amount.checked_mul(rate)?;
    let tax_shares = breakdown.tax_fee.checked_mul(rate)?;
    let liquidity_shares = breakdown.liquidity_fee.checked_mul(rate)?;
    let gross_shares = net_shares
        .checked_add(tax_shares)?
        .checked_add(liquidity_shares)?;

    Some(ShareBreakdown {
        gross_shares,
        net_shares,
        tax_shares,
        liquidity_shares,
    })
}
