use crate::error::ValidationError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Rail used to move the money for a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Instant settlement through FedNow.
    Instant,
    Card,
}

impl PaymentMethod {
    pub fn code(self) -> i64 {
        match self {
            PaymentMethod::Instant => 0,
            PaymentMethod::Card => 1,
        }
    }
}

impl TryFrom<i64> for PaymentMethod {
    type Error = ValidationError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(PaymentMethod::Instant),
            1 => Ok(PaymentMethod::Card),
            other => Err(ValidationError::UnknownPaymentMethod(other)),
        }
    }
}

/// Channel through which the purchase happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InteractionType(pub u8);

impl InteractionType {
    pub const MOBILE: Self = Self(0);

    pub fn code(self) -> i64 {
        i64::from(self.0)
    }
}

impl TryFrom<i64> for InteractionType {
    type Error = ValidationError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        u8::try_from(code)
            .map(Self)
            .map_err(|_| ValidationError::InteractionTypeOutOfRange(code))
    }
}

/// Settlement state written with the payment row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Completed,
    Pending,
}

impl PaymentStatus {
    pub fn code(self) -> i64 {
        match self {
            PaymentStatus::Completed => 4,
            PaymentStatus::Pending => 5,
        }
    }
}

/// A single purchase to be recorded.
///
/// Party identifiers (`payer`, `payee`, `developer`) are hex strings written
/// to the store as raw bytes. Bank account identifiers are passed through as
/// plain strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseInput {
    pub payer: String,
    pub payee: String,
    pub payer_account: String,
    pub payee_account: String,
    pub developer: String,
    pub amount: Decimal,
    pub interaction_type: InteractionType,
    pub payment_method: PaymentMethod,
}

impl PurchaseInput {
    /// True when the purchase settles over the instant rail and money moves,
    /// i.e. an instant-payment record is created and the payment stays pending.
    pub fn settles_instantly(&self) -> bool {
        self.payment_method == PaymentMethod::Instant && self.amount > Decimal::ZERO
    }

    pub fn payment_status(&self) -> PaymentStatus {
        if self.settles_instantly() {
            PaymentStatus::Pending
        } else {
            PaymentStatus::Completed
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.amount < Decimal::ZERO {
            return Err(ValidationError::NegativeAmount {
                field: "amount",
                value: self.amount,
            });
        }
        validate_hex_identifier("payer", &self.payer)?;
        validate_hex_identifier("payee", &self.payee)?;
        validate_hex_identifier("developer", &self.developer)?;
        Ok(())
    }
}

/// Promotion attached to a purchase. A positive amount creates a promotion
/// ledger entry funded by the developer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PromotionInput {
    pub promo_amount: Decimal,
}

impl PromotionInput {
    pub fn new(promo_amount: Decimal) -> Self {
        Self { promo_amount }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.promo_amount > Decimal::ZERO
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.promo_amount < Decimal::ZERO {
            return Err(ValidationError::NegativeAmount {
                field: "promo_amount",
                value: self.promo_amount,
            });
        }
        Ok(())
    }
}

fn validate_hex_identifier(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::MissingIdentifier { field });
    }
    hex::decode(value)
        .map(|_| ())
        .map_err(|_| ValidationError::InvalidIdentifier {
            field,
            value: value.to_string(),
        })
}
