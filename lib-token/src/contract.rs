//! Reflection Token Surface
//!
//! `ReflectiveToken` ties the rate ledger, fee policy, and liquidity
//! controller together behind the token-standard surface. It is a single
//! owned value; every operation takes the caller explicitly — there is no
//! ambient environment and no static state.
//!
//! # Privileged operations
//!
//! Administrative operations are guarded by the owner account fixed at
//! genesis. Ownership transfer mechanics are out of scope; the check is
//! exactly "is the caller the privileged account".

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::info;

use lib_types::{Address, Amount, Bps, FeePolicy, Percent};

use crate::errors::{TokenError, TokenResult};
use crate::events::TokenEvent;
use crate::ledger::RateLedger;
use crate::liquidity::{LiquidityState, SwapRouter};
use crate::transfer::{execute_transfer, TransferResult};

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Token identity fixed at genesis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    /// Display precision; a design parameter, not a universal constant
    pub decimals: u8,
}

/// Genesis parameters
///
/// `max_tx_amount` and `min_tokens_before_swap` are derived from the percent
/// and basis-point fields against the genesis supply; afterwards they are
/// absolute values managed by the owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisConfig {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: Amount,
    pub tax_fee_percent: Percent,
    pub liquidity_fee_percent: Percent,
    pub max_tx_percent: Percent,
    pub min_tokens_before_swap_bps: Bps,
    pub swap_and_liquify_enabled: bool,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            name: "Reflect".to_string(),
            symbol: "RFX".to_string(),
            decimals: 6,
            total_supply: 1_000_000_000_000,
            tax_fee_percent: 5,
            liquidity_fee_percent: 5,
            max_tx_percent: 1,
            min_tokens_before_swap_bps: 5,
            swap_and_liquify_enabled: true,
        }
    }
}

// =============================================================================
// TOKEN
// =============================================================================

/// The reflection token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReflectiveToken {
    metadata: TokenMetadata,
    /// Privileged account; receives the genesis supply and all pool-share receipts
    pub(crate) owner: Address,
    /// The contract's own account; accumulates liquidity fees
    pub(crate) contract_account: Address,
    /// External pool-pair account, wired once at genesis
    pub(crate) pair_account: Address,
    pub(crate) fees: FeePolicy,
    pub(crate) ledger: RateLedger,
    excluded_from_fee: HashSet<Address>,
    allowances: HashMap<Address, HashMap<Address, Amount>>,
    pub(crate) liquidity: LiquidityState,
}

impl ReflectiveToken {
    /// Deploy the token, assigning the whole supply to the owner.
    ///
    /// The owner and the contract account start fee-exempt. Returns the
    /// genesis transfer event alongside the token.
    pub fn new(
        config: GenesisConfig,
        owner: Address,
        contract_account: Address,
        pair_account: Address,
    ) -> TokenResult<(Self, TokenEvent)> {
        if owner.is_zero() || contract_account.is_zero() || pair_account.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        if config.tax_fee_percent.saturating_add(config.liquidity_fee_percent) > 100 {
            return Err(TokenError::InvalidAmount(
                "combined fee percents exceed 100".to_string(),
            ));
        }
        if config.max_tx_percent > 100 {
            return Err(TokenError::InvalidAmount(
                "max transaction percent exceeds 100".to_string(),
            ));
        }

        let total_supply = config.total_supply;
        let ledger = RateLedger::new(total_supply, owner)?;
        let fees = FeePolicy {
            tax_fee_percent: config.tax_fee_percent,
            liquidity_fee_percent: config.liquidity_fee_percent,
            max_tx_amount: total_supply * config.max_tx_percent as Amount / 100,
            min_tokens_before_swap: total_supply * config.min_tokens_before_swap_bps as Amount
                / 10_000,
            swap_and_liquify_enabled: config.swap_and_liquify_enabled,
        };

        let mut excluded_from_fee = HashSet::new();
        excluded_from_fee.insert(owner);
        excluded_from_fee.insert(contract_account);

        info!(
            name = %config.name,
            symbol = %config.symbol,
            total_supply = %total_supply,
            "token deployed"
        );

        let token = Self {
            metadata: TokenMetadata {
                name: config.name,
                symbol: config.symbol,
                decimals: config.decimals,
            },
            owner,
            contract_account,
            pair_account,
            fees,
            ledger,
            excluded_from_fee,
            allowances: HashMap::new(),
            liquidity: LiquidityState::default(),
        };
        let genesis_event = TokenEvent::Transfer {
            from: Address::zero(),
            to: owner,
            amount: total_supply,
        };
        Ok((token, genesis_event))
    }

    // =========================================================================
    // Token-standard read surface
    // =========================================================================

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn symbol(&self) -> &str {
        &self.metadata.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.metadata.decimals
    }

    pub fn total_supply(&self) -> Amount {
        self.ledger.total_supply()
    }

    pub fn balance_of(&self, account: Address) -> Amount {
        self.ledger.balance_of(account)
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> Amount {
        self.allowances
            .get(&owner)
            .and_then(|spenders| spenders.get(&spender))
            .copied()
            .unwrap_or(0)
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn contract_account(&self) -> Address {
        self.contract_account
    }

    pub fn pair_account(&self) -> Address {
        self.pair_account
    }

    pub fn fee_policy(&self) -> &FeePolicy {
        &self.fees
    }

    /// Whether the liquidity controller currently holds its conversion lock
    pub fn is_converting(&self) -> bool {
        self.liquidity.in_swap_and_liquify
    }

    // =========================================================================
    // Reflection surface
    // =========================================================================

    pub fn total_fees(&self) -> Amount {
        self.ledger.total_fees_collected()
    }

    pub fn is_excluded_from_reward(&self, account: Address) -> bool {
        self.ledger.is_excluded_from_reward(account)
    }

    pub fn is_excluded_from_fee(&self, account: Address) -> bool {
        self.excluded_from_fee.contains(&account)
    }

    /// Share-pool equivalent of a token amount; with `deduct_transfer_fee`
    /// set, previews the shares a taxed transfer of this size would deliver
    pub fn reflection_from_token(
        &self,
        amount: Amount,
        deduct_transfer_fee: bool,
    ) -> TokenResult<Amount> {
        self.ledger
            .reflection_from_token(amount, deduct_transfer_fee, &self.fees)
    }

    pub fn token_from_reflection(&self, share_amount: Amount) -> TokenResult<Amount> {
        self.ledger.token_from_reflection(share_amount)
    }

    // =========================================================================
    // Transfers and allowances
    // =========================================================================

    pub fn transfer(
        &mut self,
        router: &mut dyn SwapRouter,
        caller: Address,
        to: Address,
        amount: Amount,
    ) -> TokenResult<(TransferResult, Vec<TokenEvent>)> {
        execute_transfer(self, router, caller, to, amount)
    }

    /// Spend `caller`'s allowance on `from`'s balance.
    ///
    /// The allowance is checked up front and decremented only after the
    /// transfer commits.
    pub fn transfer_from(
        &mut self,
        router: &mut dyn SwapRouter,
        caller: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> TokenResult<(TransferResult, Vec<TokenEvent>)> {
        let have = self.allowance(from, caller);
        if have < amount {
            return Err(TokenError::InsufficientAllowance { have, need: amount });
        }
        let outcome = execute_transfer(self, router, from, to, amount)?;
        self.allowances
            .entry(from)
            .or_default()
            .insert(caller, have - amount);
        Ok(outcome)
    }

    pub fn approve(
        &mut self,
        caller: Address,
        spender: Address,
        amount: Amount,
    ) -> TokenResult<TokenEvent> {
        if caller.is_zero() || spender.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        self.allowances
            .entry(caller)
            .or_default()
            .insert(spender, amount);
        Ok(TokenEvent::Approval {
            owner: caller,
            spender,
            amount,
        })
    }

    pub fn increase_allowance(
        &mut self,
        caller: Address,
        spender: Address,
        delta: Amount,
    ) -> TokenResult<TokenEvent> {
        let updated = self
            .allowance(caller, spender)
            .checked_add(delta)
            .ok_or(TokenError::Overflow)?;
        self.approve(caller, spender, updated)
    }

    pub fn decrease_allowance(
        &mut self,
        caller: Address,
        spender: Address,
        delta: Amount,
    ) -> TokenResult<TokenEvent> {
        let have = self.allowance(caller, spender);
        if have < delta {
            return Err(TokenError::InsufficientAllowance { have, need: delta });
        }
        self.approve(caller, spender, have - delta)
    }

    // =========================================================================
    // Privileged operations
    // =========================================================================

    fn ensure_owner(&self, caller: Address) -> TokenResult<()> {
        if caller != self.owner {
            return Err(TokenError::NotOwner);
        }
        Ok(())
    }

    pub fn set_tax_fee_percent(&mut self, caller: Address, percent: Percent) -> TokenResult<()> {
        self.ensure_owner(caller)?;
        if percent.saturating_add(self.fees.liquidity_fee_percent) > 100 {
            return Err(TokenError::InvalidAmount(
                "combined fee percents exceed 100".to_string(),
            ));
        }
        self.fees.tax_fee_percent = percent;
        Ok(())
    }

    pub fn set_liquidity_fee_percent(
        &mut self,
        caller: Address,
        percent: Percent,
    ) -> TokenResult<()> {
        self.ensure_owner(caller)?;
        if percent.saturating_add(self.fees.tax_fee_percent) > 100 {
            return Err(TokenError::InvalidAmount(
                "combined fee percents exceed 100".to_string(),
            ));
        }
        self.fees.liquidity_fee_percent = percent;
        Ok(())
    }

    /// Recompute the absolute transaction cap from the current supply.
    ///
    /// The cap is fixed at this moment; it is not re-derived afterwards.
    pub fn set_max_tx_percent(&mut self, caller: Address, percent: Percent) -> TokenResult<()> {
        self.ensure_owner(caller)?;
        if percent > 100 {
            return Err(TokenError::InvalidAmount(
                "max transaction percent exceeds 100".to_string(),
            ));
        }
        self.fees.max_tx_amount = self.ledger.total_supply() * percent as Amount / 100;
        Ok(())
    }

    pub fn set_min_tokens_before_swap(
        &mut self,
        caller: Address,
        value: Amount,
    ) -> TokenResult<TokenEvent> {
        self.ensure_owner(caller)?;
        self.fees.min_tokens_before_swap = value;
        Ok(TokenEvent::MinTokensBeforeSwapUpdated { new_value: value })
    }

    pub fn set_swap_and_liquify_enabled(
        &mut self,
        caller: Address,
        enabled: bool,
    ) -> TokenResult<TokenEvent> {
        self.ensure_owner(caller)?;
        self.fees.swap_and_liquify_enabled = enabled;
        Ok(TokenEvent::SwapAndLiquifyEnabledUpdated { enabled })
    }

    pub fn set_excluded_from_fee(
        &mut self,
        caller: Address,
        account: Address,
        excluded: bool,
    ) -> TokenResult<()> {
        self.ensure_owner(caller)?;
        if excluded {
            self.excluded_from_fee.insert(account);
        } else {
            self.excluded_from_fee.remove(&account);
        }
        Ok(())
    }

    pub fn set_excluded_from_reward(
        &mut self,
        caller: Address,
        account: Address,
        excluded: bool,
    ) -> TokenResult<()> {
        self.ensure_owner(caller)?;
        self.ledger.set_excluded_from_reward(account, excluded)
    }

    /// Debit the caller and retire the whole amount as a tax share,
    /// inflating every other participating balance proportionally
    pub fn redistribute(&mut self, caller: Address, amount: Amount) -> TokenResult<()> {
        self.ensure_owner(caller)?;
        let have = self.ledger.balance_of(caller);
        if have < amount {
            return Err(TokenError::InsufficientBalance { have, need: amount });
        }
        let rate = self.ledger.current_rate();
        let shares = amount.checked_mul(rate).ok_or(TokenError::Overflow)?;
        self.ledger.debit(caller, amount, shares)?;
        self.ledger.retire_shares(shares, amount)?;
        info!(%caller, %amount, "redistributed to holders");
        Ok(())
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    /// Run `f` with both fee percents zeroed, restoring the prior values on
    /// every exit path.
    ///
    /// Used for the liquidity controller's internal conversion moves so
    /// liquidity provision is never itself taxed.
    pub(crate) fn with_fees_suspended<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> TokenResult<T>,
    ) -> TokenResult<T> {
        let saved = (self.fees.tax_fee_percent, self.fees.liquidity_fee_percent);
        self.fees.tax_fee_percent = 0;
        self.fees.liquidity_fee_percent = 0;
        let result = f(self);
        self.fees.tax_fee_percent = saved.0;
        self.fees.liquidity_fee_percent = saved.1;
        result
    }
}
