use super::identifier::Identifier;
use serde::{Deserialize, Serialize};

/// Identifiers of every record created by one bundle run.
///
/// `purs_transaction_id` names the outer transaction record that links the
/// ledger entries, not the store's transaction boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierBundle {
    pub primary_payment_id: Identifier,
    pub customer_ledger_entry_id: Identifier,
    pub purs_transaction_id: Identifier,
    /// Present only when the purchase settled over the instant rail with a positive amount.
    pub primary_fed_now_payment_id: Option<Identifier>,
    /// Present only when a positive promotion amount was supplied.
    pub promotion_ledger_entry_id: Option<Identifier>,
}

impl IdentifierBundle {
    /// Ledger entries created by the run, in creation order. These are the
    /// entries linked to `purs_transaction_id`.
    pub fn ledger_entry_ids(&self) -> Vec<Identifier> {
        std::iter::once(self.customer_ledger_entry_id)
            .chain(self.promotion_ledger_entry_id)
            .collect()
    }
}
