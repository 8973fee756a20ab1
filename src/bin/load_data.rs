//! Bulk data loader
//!
//! 기존 시스템에서 내보낸 고객/대출 CSV를 PostgreSQL 장부에 적재.
//!
//! ```text
//! load-data --customers data/customer_data.csv --loans data/loan_data.csv
//! ```
//!
//! 고객을 먼저 적재해야 대출 행의 고객 참조가 해결됨.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use credit_approval_api::{BulkImporter, Config, Database};

#[derive(Debug, Parser)]
#[command(name = "load-data", about = "Load customer and loan CSV exports into the ledger")]
struct Args {
    /// 고객 CSV 경로
    #[arg(long, env = "CUSTOMER_DATA")]
    customers: Option<PathBuf>,

    /// 대출 CSV 경로
    #[arg(long, env = "LOAN_DATA")]
    loans: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "credit_approval_api=info,load_data=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;

    let db = Database::connect(&config.database_url)
        .await
        .context("failed to connect to database")?;
    db.run_migrations().await?;

    let importer = BulkImporter::new(Arc::new(db));

    if let Some(path) = &args.customers {
        let file = File::open(path)
            .with_context(|| format!("cannot open {}", path.display()))?;
        let report = importer.import_customers(file).await?;
        tracing::info!(?report, path = %path.display(), "Customers loaded");
    }

    if let Some(path) = &args.loans {
        let file = File::open(path)
            .with_context(|| format!("cannot open {}", path.display()))?;
        let report = importer.import_loans(file).await?;
        tracing::info!(?report, path = %path.display(), "Loans loaded");
    }

    if args.customers.is_none() && args.loans.is_none() {
        tracing::warn!("Nothing to load: pass --customers and/or --loans");
    }

    Ok(())
}
