use crate::domain::parameters::ParameterSet;
use crate::domain::ports::{
    Statement, StatementExecutor, TransactionContext, TransactionalExecutor,
};
use crate::error::ExecutorError;
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Column Family for payment rows.
pub const CF_PAYMENTS: &str = "payments";
/// Column Family for instant-payment rows.
pub const CF_FED_NOW_PAYMENTS: &str = "fed_now_payments";
/// Column Family for customer and promotion ledger entries.
pub const CF_LEDGER_ENTRIES: &str = "ledger_entries";
/// Column Family for transaction/ledger entry links.
pub const CF_TRANSACTION_LINKS: &str = "transaction_links";

const COLUMN_FAMILIES: [&str; 4] = [
    CF_PAYMENTS,
    CF_FED_NOW_PAYMENTS,
    CF_LEDGER_ENTRIES,
    CF_TRANSACTION_LINKS,
];

fn column_family(statement: Statement) -> &'static str {
    match statement {
        Statement::InsertPayment => CF_PAYMENTS,
        Statement::InsertFedNowPayment => CF_FED_NOW_PAYMENTS,
        Statement::InsertLedgerEntry | Statement::InsertPromoLedgerEntry => CF_LEDGER_ENTRIES,
        Statement::InsertTransaction => CF_TRANSACTION_LINKS,
    }
}

/// Parameters whose blobs, concatenated, form the row key.
fn key_columns(statement: Statement) -> &'static [&'static str] {
    match statement {
        Statement::InsertPayment => &["paymentId"],
        Statement::InsertFedNowPayment => &["fedNowPaymentId"],
        Statement::InsertLedgerEntry | Statement::InsertPromoLedgerEntry => &["ledgerId"],
        Statement::InsertTransaction => &["transactionId", "ledgerId"],
    }
}

/// A persistent statement executor backed by RocksDB.
///
/// Each record kind lives in its own Column Family, stored as JSON under its
/// identifier. Writes are staged in a per-transaction `WriteBatch` and applied
/// atomically on commit. A key is written at most once: repeats within a
/// transaction are rejected when staged, and keys committed by another
/// transaction in the meantime fail the commit.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbExecutor {
    db: Arc<DB>,
    pending: Arc<Mutex<HashMap<String, PendingTransaction>>>,
}

/// Writes staged by one open transaction.
#[derive(Default)]
struct PendingTransaction {
    batch: WriteBatch,
    keys: HashSet<(&'static str, Vec<u8>)>,
}

impl RocksDbExecutor {
    /// Opens or creates a RocksDB instance at the specified path, creating the
    /// record Column Families if missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ExecutorError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect::<Vec<_>>();
        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            pending: Arc::default(),
        })
    }

    /// Committed rows of one Column Family.
    pub fn records(&self, cf_name: &'static str) -> Result<Vec<ParameterSet>, ExecutorError> {
        let cf = self.handle(cf_name)?;
        let mut records = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            records.push(serde_json::from_slice(&value)?);
        }
        Ok(records)
    }

    fn handle(&self, cf_name: &'static str) -> Result<&ColumnFamily, ExecutorError> {
        self.db
            .cf_handle(cf_name)
            .ok_or(ExecutorError::MissingColumnFamily(cf_name))
    }

    async fn stage(
        &self,
        statement: Statement,
        parameter_sets: Vec<ParameterSet>,
        ctx: &TransactionContext,
    ) -> Result<(), ExecutorError> {
        if parameter_sets.is_empty() {
            return Err(ExecutorError::Rejected {
                statement,
                reason: "no parameter sets".to_string(),
            });
        }

        let mut pending = self.pending.lock().await;
        let staged = pending
            .get_mut(ctx.id())
            .ok_or_else(|| ExecutorError::UnknownTransaction(ctx.id().to_string()))?;
        let cf_name = column_family(statement);
        let cf = self.handle(cf_name)?;

        // Encode every row before touching the batch so a rejected row leaves it unchanged.
        let mut rows = Vec::with_capacity(parameter_sets.len());
        let mut keys = HashSet::with_capacity(parameter_sets.len());
        for parameters in &parameter_sets {
            let key = record_key(statement, parameters)?;
            let repeated =
                staged.keys.contains(&(cf_name, key.clone())) || !keys.insert(key.clone());
            if repeated || self.db.get_pinned_cf(cf, &key)?.is_some() {
                return Err(ExecutorError::Rejected {
                    statement,
                    reason: format!("duplicate key {}", hex::encode(&key)),
                });
            }
            rows.push((key, serde_json::to_vec(parameters)?));
        }
        for (key, value) in rows {
            staged.batch.put_cf(cf, &key, value);
            staged.keys.insert((cf_name, key));
        }
        Ok(())
    }

    /// Fails with the first staged key that is already in the database.
    fn check_conflicts(&self, staged: &PendingTransaction) -> Result<(), ExecutorError> {
        for (cf_name, key) in &staged.keys {
            let cf = self.handle(*cf_name)?;
            if self.db.get_pinned_cf(cf, key)?.is_some() {
                return Err(ExecutorError::Conflict {
                    column_family: *cf_name,
                    key: hex::encode(key),
                });
            }
        }
        Ok(())
    }
}

fn record_key(statement: Statement, parameters: &ParameterSet) -> Result<Vec<u8>, ExecutorError> {
    let mut key = Vec::new();
    for column in key_columns(statement) {
        let blob = parameters
            .get(column)
            .and_then(|value| value.as_blob())
            .ok_or_else(|| ExecutorError::Rejected {
                statement,
                reason: format!("missing key parameter {column}"),
            })?;
        key.extend_from_slice(blob);
    }
    Ok(key)
}

#[async_trait]
impl StatementExecutor for RocksDbExecutor {
    async fn execute_single(
        &self,
        statement: Statement,
        parameters: ParameterSet,
        ctx: &TransactionContext,
    ) -> Result<(), ExecutorError> {
        self.stage(statement, vec![parameters], ctx).await
    }

    async fn execute_batch(
        &self,
        statement: Statement,
        parameter_sets: Vec<ParameterSet>,
        ctx: &TransactionContext,
    ) -> Result<(), ExecutorError> {
        self.stage(statement, parameter_sets, ctx).await
    }
}

#[async_trait]
impl TransactionalExecutor for RocksDbExecutor {
    async fn begin(&self) -> Result<TransactionContext, ExecutorError> {
        let id = Uuid::new_v4().simple().to_string();
        self.pending
            .lock()
            .await
            .insert(id.clone(), PendingTransaction::default());
        Ok(TransactionContext::new(id))
    }

    async fn commit(&self, ctx: TransactionContext) -> Result<(), ExecutorError> {
        // Held until the batch is written so no other commit lands in between.
        let mut pending = self.pending.lock().await;
        let staged = pending
            .remove(ctx.id())
            .ok_or_else(|| ExecutorError::UnknownTransaction(ctx.id().to_string()))?;
        self.check_conflicts(&staged)?;
        self.db.write(staged.batch)?;
        Ok(())
    }

    async fn rollback(&self, ctx: TransactionContext) -> Result<(), ExecutorError> {
        self.pending
            .lock()
            .await
            .remove(ctx.id())
            .map(|_| ())
            .ok_or_else(|| ExecutorError::UnknownTransaction(ctx.id().to_string()))
    }
}
