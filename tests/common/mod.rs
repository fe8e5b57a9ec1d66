#![allow(dead_code)]

use purs_ptb::application::orchestrator::PtbOrchestrator;
use purs_ptb::domain::bundle::IdentifierBundle;
use purs_ptb::domain::identifier::Identifier;
use purs_ptb::domain::parameters::{ParameterSet, SqlValue};
use purs_ptb::domain::ports::{TransactionContext, TransactionalExecutor};
use purs_ptb::domain::purchase::{InteractionType, PaymentMethod, PromotionInput, PurchaseInput};
use purs_ptb::infrastructure::in_memory::{ExecutedStatement, InMemoryExecutor};
use rust_decimal::Decimal;
use std::fs::File;
use std::io::Error;
use std::path::Path;

pub const PAYER: &str = "a1b2c3d4";
pub const PAYEE: &str = "e5f60718";
pub const DEVELOPER: &str = "0d0e0f10";
pub const PAYER_ACCOUNT: &str = "payer-acct-1";
pub const PAYEE_ACCOUNT: &str = "payee-acct-1";

pub const CSV_HEADER: [&str; 9] = [
    "payer",
    "payee",
    "payer_account",
    "payee_account",
    "developer",
    "amount",
    "interaction_type",
    "payment_method",
    "promo_amount",
];

pub fn purchase(amount: Decimal, payment_method: PaymentMethod) -> PurchaseInput {
    PurchaseInput {
        payer: PAYER.to_string(),
        payee: PAYEE.to_string(),
        payer_account: PAYER_ACCOUNT.to_string(),
        payee_account: PAYEE_ACCOUNT.to_string(),
        developer: DEVELOPER.to_string(),
        amount,
        interaction_type: InteractionType(123),
        payment_method,
    }
}

pub fn hex_blob(value: &str) -> SqlValue {
    SqlValue::Blob(hex::decode(value).unwrap())
}

pub fn id_blob(id: &Identifier) -> SqlValue {
    SqlValue::Blob(id.as_bytes().to_vec())
}

/// A finished run together with the statements it issued.
pub struct Run {
    pub bundle: IdentifierBundle,
    pub executor: InMemoryExecutor,
    pub ctx: TransactionContext,
    pub statements: Vec<ExecutedStatement>,
}

impl Run {
    pub fn singles(&self) -> Vec<&ExecutedStatement> {
        self.statements.iter().filter(|s| !s.batched).collect()
    }

    pub fn batches(&self) -> Vec<&ExecutedStatement> {
        self.statements.iter().filter(|s| s.batched).collect()
    }

    pub fn link_sets(&self) -> &[ParameterSet] {
        &self.batches()[0].parameter_sets
    }
}

pub async fn run_bundle(amount: Decimal, payment_method: PaymentMethod, promo: Decimal) -> Run {
    let executor = InMemoryExecutor::new();
    let orchestrator = PtbOrchestrator::new(Box::new(executor.clone()));
    let ctx = executor.begin().await.unwrap();

    let bundle = orchestrator
        .run(
            &purchase(amount, payment_method),
            &PromotionInput::new(promo),
            &ctx,
        )
        .await
        .expect("bundle run failed");
    let statements = executor.statements_in(&ctx).await;

    Run {
        bundle,
        executor,
        ctx,
        statements,
    }
}

/// Writes `rows` purchases cycling through every combination of instant
/// payment and promotion.
pub fn generate_csv(path: &Path, rows: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(CSV_HEADER)?;

    for i in 0..rows {
        let (amount, method, promo) = match i % 4 {
            0 => ("1", "0", "1"),
            1 => ("0", "0", "1"),
            2 => ("1", "0", "0"),
            _ => ("0", "1", "0"),
        };
        wtr.write_record([
            PAYER,
            PAYEE,
            PAYER_ACCOUNT,
            PAYEE_ACCOUNT,
            DEVELOPER,
            amount,
            "0",
            method,
            promo,
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
