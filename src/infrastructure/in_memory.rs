use crate::config::ConnectionConfig;
use crate::domain::parameters::ParameterSet;
use crate::domain::ports::{
    Statement, StatementExecutor, TransactionContext, TransactionalExecutor,
};
use crate::error::ExecutorError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Connection target and transaction a request was issued against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    pub database: Option<String>,
    pub secret_arn: Option<String>,
    pub resource_arn: Option<String>,
    pub transaction_id: String,
}

/// A statement accepted by the executor.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedStatement {
    pub statement: Statement,
    pub target: RequestTarget,
    /// One set for single executions, one per row for batches.
    pub parameter_sets: Vec<ParameterSet>,
    pub batched: bool,
}

#[derive(Default)]
struct Journal {
    next_transaction: u64,
    open: HashMap<String, Vec<ExecutedStatement>>,
    aborted: HashSet<String>,
    committed: Vec<ExecutedStatement>,
    failures: HashMap<Statement, String>,
}

/// A thread-safe in-memory statement executor.
///
/// Stages accepted statements per open transaction in execution order and
/// moves them to the committed log on commit; a rollback drops them. Failures can be
/// injected per statement, and an open transaction can be aborted from the
/// outside to model cancellation.
#[derive(Default, Clone)]
pub struct InMemoryExecutor {
    config: Arc<ConnectionConfig>,
    journal: Arc<RwLock<Journal>>,
}

impl InMemoryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ConnectionConfig) -> Self {
        Self {
            config: Arc::new(config),
            journal: Arc::default(),
        }
    }

    /// Makes every later execution of `statement` fail with `reason`.
    pub async fn fail_on(&self, statement: Statement, reason: impl Into<String>) {
        let mut journal = self.journal.write().await;
        journal.failures.insert(statement, reason.into());
    }

    /// Aborts an open transaction. Later writes and the commit fail; only a
    /// rollback is accepted.
    pub async fn abort(&self, ctx: &TransactionContext) {
        let mut journal = self.journal.write().await;
        if journal.open.contains_key(ctx.id()) {
            journal.aborted.insert(ctx.id().to_string());
        }
    }

    /// Committed statements followed by those staged in open transactions.
    /// Rolled-back statements are gone.
    pub async fn executed(&self) -> Vec<ExecutedStatement> {
        let journal = self.journal.read().await;
        journal
            .committed
            .iter()
            .chain(journal.open.values().flatten())
            .cloned()
            .collect()
    }

    /// Statements of one transaction in execution order, staged or committed.
    pub async fn statements_in(&self, ctx: &TransactionContext) -> Vec<ExecutedStatement> {
        let journal = self.journal.read().await;
        match journal.open.get(ctx.id()) {
            Some(staged) => staged.clone(),
            None => journal
                .committed
                .iter()
                .filter(|s| s.target.transaction_id == ctx.id())
                .cloned()
                .collect(),
        }
    }

    pub async fn committed(&self) -> Vec<ExecutedStatement> {
        self.journal.read().await.committed.clone()
    }

    async fn record(
        &self,
        statement: Statement,
        parameter_sets: Vec<ParameterSet>,
        batched: bool,
        ctx: &TransactionContext,
    ) -> Result<(), ExecutorError> {
        let mut journal = self.journal.write().await;
        if journal.aborted.contains(ctx.id()) {
            return Err(ExecutorError::TransactionAborted(ctx.id().to_string()));
        }
        if !journal.open.contains_key(ctx.id()) {
            return Err(ExecutorError::UnknownTransaction(ctx.id().to_string()));
        }
        if let Some(reason) = journal.failures.get(&statement) {
            return Err(ExecutorError::Rejected {
                statement,
                reason: reason.clone(),
            });
        }
        if parameter_sets.is_empty() {
            return Err(ExecutorError::Rejected {
                statement,
                reason: "no parameter sets".to_string(),
            });
        }

        let executed = ExecutedStatement {
            statement,
            target: RequestTarget {
                database: self.config.database.clone(),
                secret_arn: self.config.secret_arn.clone(),
                resource_arn: self.config.resource_arn.clone(),
                transaction_id: ctx.id().to_string(),
            },
            parameter_sets,
            batched,
        };
        if let Some(staged) = journal.open.get_mut(ctx.id()) {
            staged.push(executed);
        }
        Ok(())
    }
}

#[async_trait]
impl StatementExecutor for InMemoryExecutor {
    async fn execute_single(
        &self,
        statement: Statement,
        parameters: ParameterSet,
        ctx: &TransactionContext,
    ) -> Result<(), ExecutorError> {
        self.record(statement, vec![parameters], false, ctx).await
    }

    async fn execute_batch(
        &self,
        statement: Statement,
        parameter_sets: Vec<ParameterSet>,
        ctx: &TransactionContext,
    ) -> Result<(), ExecutorError> {
        self.record(statement, parameter_sets, true, ctx).await
    }
}

#[async_trait]
impl TransactionalExecutor for InMemoryExecutor {
    async fn begin(&self) -> Result<TransactionContext, ExecutorError> {
        let mut journal = self.journal.write().await;
        journal.next_transaction += 1;
        let id = format!("tx-{}", journal.next_transaction);
        journal.open.insert(id.clone(), Vec::new());
        Ok(TransactionContext::new(id))
    }

    async fn commit(&self, ctx: TransactionContext) -> Result<(), ExecutorError> {
        let mut journal = self.journal.write().await;
        if journal.aborted.contains(ctx.id()) {
            return Err(ExecutorError::TransactionAborted(ctx.id().to_string()));
        }
        let staged = journal
            .open
            .remove(ctx.id())
            .ok_or_else(|| ExecutorError::UnknownTransaction(ctx.id().to_string()))?;
        journal.committed.extend(staged);
        Ok(())
    }

    async fn rollback(&self, ctx: TransactionContext) -> Result<(), ExecutorError> {
        let mut journal = self.journal.write().await;
        journal.aborted.remove(ctx.id());
        journal
            .open
            .remove(ctx.id())
            .map(|_| ())
            .ok_or_else(|| ExecutorError::UnknownTransaction(ctx.id().to_string()))
    }
}
