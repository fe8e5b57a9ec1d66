use crate::domain::purchase::{InteractionType, PaymentMethod, PromotionInput, PurchaseInput};
use crate::error::{Error, Result, ValidationError};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One row of the purchases CSV.
///
/// Codes are read as plain integers so that unknown values surface as
/// validation errors rather than CSV errors.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct PurchaseRecord {
    pub payer: String,
    pub payee: String,
    pub payer_account: String,
    pub payee_account: String,
    pub developer: String,
    pub amount: Decimal,
    pub interaction_type: i64,
    pub payment_method: i64,
    #[serde(default)]
    pub promo_amount: Option<Decimal>,
}

impl PurchaseRecord {
    pub fn into_inputs(self) -> Result<(PurchaseInput, PromotionInput), ValidationError> {
        let purchase = PurchaseInput {
            payer: self.payer,
            payee: self.payee,
            payer_account: self.payer_account,
            payee_account: self.payee_account,
            developer: self.developer,
            amount: self.amount,
            interaction_type: InteractionType::try_from(self.interaction_type)?,
            payment_method: PaymentMethod::try_from(self.payment_method)?,
        };
        let promotion = PromotionInput::new(self.promo_amount.unwrap_or(Decimal::ZERO));
        purchase.validate()?;
        promotion.validate()?;
        Ok((purchase, promotion))
    }
}

/// Reads purchases from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over validated
/// purchase and promotion inputs. It trims whitespace and accepts rows that
/// omit the trailing promotion column.
pub struct PurchaseReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> PurchaseReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads, deserializes and validates purchases, one per row.
    pub fn purchases(self) -> impl Iterator<Item = Result<(PurchaseInput, PromotionInput)>> {
        self.reader.into_deserialize().map(|result| {
            let record: PurchaseRecord = result?;
            record.into_inputs().map_err(Error::from)
        })
    }
}
