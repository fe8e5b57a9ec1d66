use crate::application::orchestrator::Step;
use crate::domain::ports::Statement;
use rust_decimal::Decimal;
use thiserror::Error;

/// Malformed or out-of-range caller input, detected before any write.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field} must not be negative, got {value}")]
    NegativeAmount { field: &'static str, value: Decimal },
    #[error("unknown payment method code {0}")]
    UnknownPaymentMethod(i64),
    #[error("interaction type code {0} is out of range")]
    InteractionTypeOutOfRange(i64),
    #[error("{field} is required")]
    MissingIdentifier { field: &'static str },
    #[error("{field} is not a valid hex identifier: {value:?}")]
    InvalidIdentifier { field: &'static str, value: String },
}

/// Failure translating a domain value into its statement parameter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodingError {
    #[error("{field} is not valid hex: {source}")]
    InvalidHex {
        field: &'static str,
        #[source]
        source: hex::FromHexError,
    },
    #[error("{field} cannot be represented as a double: {value}")]
    AmountNotRepresentable { field: &'static str, value: Decimal },
}

/// Failure reported by a statement executor.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("transaction {0} is not open")]
    UnknownTransaction(String),
    #[error("transaction {0} was aborted")]
    TransactionAborted(String),
    #[error("{statement} rejected: {reason}")]
    Rejected { statement: Statement, reason: String },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("storage error: {0}")]
    Storage(#[from] rocksdb::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("column family {0} not found")]
    MissingColumnFamily(&'static str),
    #[cfg(feature = "storage-rocksdb")]
    #[error("key {key} in {column_family} was committed by another transaction")]
    Conflict {
        column_family: &'static str,
        key: String,
    },
}

/// Failure of a single bundle run.
///
/// Encoding and executor failures carry the step at which the run stopped.
#[derive(Error, Debug)]
pub enum PtbError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
    #[error("{step} failed to encode parameters: {source}")]
    Encoding {
        step: Step,
        #[source]
        source: EncodingError,
    },
    #[error("{step} failed: {source}")]
    Executor {
        step: Step,
        #[source]
        source: ExecutorError,
    },
}

impl PtbError {
    /// The step that failed, or `None` when the input was rejected up front.
    pub fn step(&self) -> Option<Step> {
        match self {
            PtbError::Validation(_) => None,
            PtbError::Encoding { step, .. } | PtbError::Executor { step, .. } => Some(*step),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Ptb(#[from] PtbError),
    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
