use clap::Parser;
use miette::{IntoDiagnostic, Result};
use purs_ptb::application::orchestrator::PtbOrchestrator;
use purs_ptb::config::ConnectionConfig;
use purs_ptb::domain::bundle::IdentifierBundle;
use purs_ptb::domain::ports::TransactionalExecutor;
use purs_ptb::domain::purchase::{PromotionInput, PurchaseInput};
use purs_ptb::infrastructure::in_memory::InMemoryExecutor;
#[cfg(feature = "storage-rocksdb")]
use purs_ptb::infrastructure::rocksdb::RocksDbExecutor;
use purs_ptb::interfaces::csv::bundle_writer::BundleWriter;
use purs_ptb::interfaces::csv::purchase_reader::PurchaseReader;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input purchases CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Log filter level for diagnostics written to stderr
    #[arg(long, env = "PTB_LOG", default_value = "warn")]
    log_level: String,

    #[command(flatten)]
    connection: ConnectionConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(format!("purs_ptb={}", cli.log_level))
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();

    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = PurchaseReader::new(file);

    let stdout = io::stdout();
    let mut writer = BundleWriter::new(stdout.lock());

    match cli.db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(db_path) => {
            let executor = RocksDbExecutor::open(db_path).into_diagnostic()?;
            record_purchases(executor, reader, &mut writer).await?;
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            warn!(
                "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to in-memory storage."
            );
            let executor = InMemoryExecutor::with_config(cli.connection);
            record_purchases(executor, reader, &mut writer).await?;
        }
        None => {
            let executor = InMemoryExecutor::with_config(cli.connection);
            record_purchases(executor, reader, &mut writer).await?;
        }
    }
    Ok(())
}

/// Records one bundle per purchase row, each in its own transaction, and
/// prints the identifiers of every committed bundle. Returns the number of
/// recorded and failed rows.
async fn record_purchases<E, R, W>(
    executor: E,
    reader: PurchaseReader<R>,
    writer: &mut BundleWriter<W>,
) -> Result<(usize, usize)>
where
    E: TransactionalExecutor + Clone + 'static,
    R: Read,
    W: Write,
{
    let orchestrator = PtbOrchestrator::new(Box::new(executor.clone()));
    let (mut recorded, mut failed) = (0usize, 0usize);

    for (index, inputs) in reader.purchases().enumerate() {
        let row = index + 1;
        let (purchase, promotion) = match inputs {
            Ok(inputs) => inputs,
            Err(e) => {
                error!(row, error = %e, "Error reading purchase");
                failed += 1;
                continue;
            }
        };

        match record_purchase(&executor, &orchestrator, &purchase, &promotion).await {
            Ok(bundle) => {
                writer.write_bundle(&bundle).into_diagnostic()?;
                recorded += 1;
            }
            Err(e) => {
                error!(row, error = %e, "Error recording purchase");
                failed += 1;
            }
        }
    }

    writer.flush().into_diagnostic()?;
    info!(recorded, failed, "finished recording purchases");
    Ok((recorded, failed))
}

/// Runs one bundle in a fresh transaction, committing on success and rolling
/// back otherwise.
async fn record_purchase<E: TransactionalExecutor>(
    executor: &E,
    orchestrator: &PtbOrchestrator,
    purchase: &PurchaseInput,
    promotion: &PromotionInput,
) -> purs_ptb::error::Result<IdentifierBundle> {
    let ctx = executor.begin().await?;
    match orchestrator.run(purchase, promotion, &ctx).await {
        Ok(bundle) => {
            executor.commit(ctx).await?;
            Ok(bundle)
        }
        Err(e) => {
            if let Err(rollback) = executor.rollback(ctx).await {
                warn!(error = %rollback, "rollback failed");
            }
            Err(e.into())
        }
    }
}
