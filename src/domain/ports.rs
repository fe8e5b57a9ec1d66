use super::parameters::ParameterSet;
use crate::error::ExecutorError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The writes a bundle run can issue. Statement text lives with the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Statement {
    InsertPayment,
    InsertFedNowPayment,
    InsertLedgerEntry,
    InsertPromoLedgerEntry,
    InsertTransaction,
}

impl Statement {
    pub fn name(self) -> &'static str {
        match self {
            Statement::InsertPayment => "INSERT_PAYMENT",
            Statement::InsertFedNowPayment => "INSERT_FED_NOW_PAYMENT",
            Statement::InsertLedgerEntry => "INSERT_LEDGER_ENTRY",
            Statement::InsertPromoLedgerEntry => "INSERT_PROMO_LEDGER_ENTRY",
            Statement::InsertTransaction => "INSERT_TRANSACTION",
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Opaque handle of a store transaction opened by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionContext {
    id: String,
}

impl TransactionContext {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for TransactionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Runs parameterized writes inside a caller-supplied transaction.
#[async_trait]
pub trait StatementExecutor: Send + Sync {
    async fn execute_single(
        &self,
        statement: Statement,
        parameters: ParameterSet,
        ctx: &TransactionContext,
    ) -> Result<(), ExecutorError>;

    /// Applies every parameter set against `statement` as one batch: all or none.
    async fn execute_batch(
        &self,
        statement: Statement,
        parameter_sets: Vec<ParameterSet>,
        ctx: &TransactionContext,
    ) -> Result<(), ExecutorError>;
}

/// An executor that can also open and close transactions on behalf of a caller.
#[async_trait]
pub trait TransactionalExecutor: StatementExecutor {
    async fn begin(&self) -> Result<TransactionContext, ExecutorError>;
    async fn commit(&self, ctx: TransactionContext) -> Result<(), ExecutorError>;
    async fn rollback(&self, ctx: TransactionContext) -> Result<(), ExecutorError>;
}

pub type StatementExecutorBox = Box<dyn StatementExecutor>;
