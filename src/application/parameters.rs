//! Builds the named parameter sets for each write of a bundle run.
//!
//! Every function returns a fresh [`ParameterSet`]; sets handed to the
//! executor are never modified afterwards.

use crate::domain::identifier::Identifier;
use crate::domain::parameters::{ParameterSet, SqlValue};
use crate::domain::purchase::{PromotionInput, PurchaseInput};
use crate::error::EncodingError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Layout of `datePaid`, UTC with seconds precision.
pub const DATE_PAID_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Identifiers generated before the payment row is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentIds {
    pub payment_id: Identifier,
    pub customer_ledger_entry_id: Identifier,
    /// Candidate instant-payment id. The payment row always carries it, even
    /// when no instant-payment record is created.
    pub fed_now_payment_id: Identifier,
}

/// Parameters of the payment row. The customer ledger entry reuses them.
pub fn payment_parameters(
    purchase: &PurchaseInput,
    ids: &PaymentIds,
    now: DateTime<Utc>,
) -> Result<ParameterSet, EncodingError> {
    let date_paid = if purchase.settles_instantly() {
        SqlValue::Null
    } else {
        SqlValue::String(now.format(DATE_PAID_FORMAT).to_string())
    };

    Ok(ParameterSet::new()
        .with("payerId", hex_blob("payer", &purchase.payer)?)
        .with("payeeId", hex_blob("payee", &purchase.payee)?)
        .with("paymentAmount", double("amount", purchase.amount)?)
        .with(
            "interactionTypeId",
            SqlValue::Long(purchase.interaction_type.code()),
        )
        .with("paymentId", id_blob(&ids.payment_id))
        .with("datePaid", date_paid)
        .with("ledgerId", id_blob(&ids.customer_ledger_entry_id))
        .with("developerId", hex_blob("developer", &purchase.developer)?)
        .with("paymentMethod", SqlValue::Long(purchase.payment_method.code()))
        .with(
            "paymentStatus",
            SqlValue::Long(purchase.payment_status().code()),
        )
        .with("fedNowPaymentId", id_blob(&ids.fed_now_payment_id)))
}

/// Parameters of the instant-payment row: the payment parameters plus both
/// bank accounts.
pub fn fed_now_parameters(payment: &ParameterSet, purchase: &PurchaseInput) -> ParameterSet {
    payment
        .clone()
        .with(
            "payerAccountId",
            SqlValue::String(purchase.payer_account.clone()),
        )
        .with(
            "payeeAccountId",
            SqlValue::String(purchase.payee_account.clone()),
        )
}

pub fn ledger_parameters(payment: &ParameterSet) -> ParameterSet {
    payment.clone()
}

/// Parameters of the promotion ledger entry. The developer funds the
/// promotion, so it is written as the payer.
pub fn promotion_parameters(
    purchase: &PurchaseInput,
    promotion: &PromotionInput,
    ledger_id: &Identifier,
) -> Result<ParameterSet, EncodingError> {
    Ok(ParameterSet::new()
        .with("payerId", hex_blob("developer", &purchase.developer)?)
        .with("payeeId", hex_blob("payee", &purchase.payee)?)
        .with("amount", double("promo_amount", promotion.promo_amount)?)
        .with(
            "interactionTypeId",
            SqlValue::Long(purchase.interaction_type.code()),
        )
        .with("ledgerId", id_blob(ledger_id))
        .with("developerId", hex_blob("developer", &purchase.developer)?))
}

/// One `(transactionId, ledgerId)` set per ledger entry, in the given order.
pub fn link_parameter_sets(
    transaction_id: &Identifier,
    ledger_entry_ids: &[Identifier],
) -> Vec<ParameterSet> {
    ledger_entry_ids
        .iter()
        .map(|ledger_id| {
            ParameterSet::new()
                .with("transactionId", id_blob(transaction_id))
                .with("ledgerId", id_blob(ledger_id))
        })
        .collect()
}

fn hex_blob(field: &'static str, value: &str) -> Result<SqlValue, EncodingError> {
    hex::decode(value)
        .map(SqlValue::Blob)
        .map_err(|source| EncodingError::InvalidHex { field, source })
}

fn id_blob(id: &Identifier) -> SqlValue {
    SqlValue::Blob(id.as_bytes().to_vec())
}

fn double(field: &'static str, value: Decimal) -> Result<SqlValue, EncodingError> {
    value
        .to_f64()
        .filter(|v| v.is_finite())
        .map(SqlValue::Double)
        .ok_or(EncodingError::AmountNotRepresentable { field, value })
}
