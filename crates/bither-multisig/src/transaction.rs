//! Multisig transaction records and call payloads.

use bither_core::error::QuorumError;
use bither_core::types::{Address, Amount};
use serde::{Deserialize, Serialize};

/// Operation carried by a multisig transaction.
///
/// `Approve` is sent to a token contract (the transaction's destination).
/// The governance calls act on the wallet itself and are only valid when
/// the destination is the wallet's own address.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub enum Call {
    /// No payload: a plain native-currency transfer of `value`.
    #[default]
    None,
    /// Set `spender`'s allowance over the wallet's balance of the
    /// destination token.
    Approve { spender: Address, amount: Amount },
    AddOwner { owner: Address },
    /// Drops `owner`; lowers `required` if it would exceed the owner count.
    RemoveOwner { owner: Address },
    ReplaceOwner { owner: Address, new_owner: Address },
    ChangeRequirement { required: usize },
}

impl Call {
    pub fn is_governance(&self) -> bool {
        matches!(
            self,
            Call::AddOwner { .. }
                | Call::RemoveOwner { .. }
                | Call::ReplaceOwner { .. }
                | Call::ChangeRequirement { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Call::None => "none",
            Call::Approve { .. } => "approve",
            Call::AddOwner { .. } => "add_owner",
            Call::RemoveOwner { .. } => "remove_owner",
            Call::ReplaceOwner { .. } => "replace_owner",
            Call::ChangeRequirement { .. } => "change_requirement",
        }
    }
}

/// A submitted transaction. Never deleted; `executed` flips to `true` at
/// most once.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MultiSigTransaction {
    pub id: u64,
    pub destination: Address,
    /// Native currency sent to `destination` on execution.
    pub value: Amount,
    pub call: Call,
    pub executed: bool,
}

/// Outcome of an execution attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Execution {
    /// Executed by this attempt.
    Executed,
    /// Already executed earlier; nothing happened.
    AlreadyExecuted,
    AwaitingConfirmations { have: usize, need: usize },
    /// The operation failed; the transaction stays pending.
    Failed(QuorumError),
}

impl Execution {
    pub fn is_executed(&self) -> bool {
        matches!(self, Execution::Executed)
    }
}
