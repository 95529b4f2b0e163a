//! Token Events
//!
//! Every state change a client could care about is reported as an event.
//! Mutating operations return their events alongside their result values;
//! nothing is buffered inside the ledger.

use lib_types::{Address, Amount};
use serde::{Deserialize, Serialize};

/// Events raised by token operations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TokenEvent {
    /// Value moved between two accounts (amount is the net delivery)
    Transfer {
        from: Address,
        to: Address,
        amount: Amount,
    },

    /// Allowance set for a spender
    Approval {
        owner: Address,
        spender: Address,
        amount: Amount,
    },

    /// The liquidity-controller arming threshold changed
    MinTokensBeforeSwapUpdated { new_value: Amount },

    /// The liquidity feature was enabled or disabled
    SwapAndLiquifyEnabledUpdated { enabled: bool },

    /// A batched liquidity conversion completed
    SwapAndLiquifyPerformed {
        tokens_swapped: Amount,
        reference_received: Amount,
        tokens_into_liquidity: Amount,
    },
}
