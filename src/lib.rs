//! Credit Approval API Library
//!
//! # Overview
//!
//! 고객 등록, 대출 적격성 판정, 대출 발행/조회를 제공하는 백엔드 API.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                         API                              │
//! │                                                          │
//! │  ┌─────────┐  ┌──────────┐  ┌─────────┐  ┌─────────┐    │
//! │  │ Routes  │→ │ Services │→ │ Engine  │  │  Types  │    │
//! │  └─────────┘  └────┬─────┘  └─────────┘  └─────────┘    │
//! │                    │                                     │
//! │                    ▼                                     │
//! │              ┌──────────┐                                │
//! │              │  Ledger  │  (PostgreSQL | in-memory)      │
//! │              └──────────┘                                │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `config`: 환경 설정 관리
//! - `error`: 에러 타입 및 HTTP 매핑
//! - `engine`: 신용 점수, 승인 판정, EMI 계산 (순수 함수)
//! - `db`: 고객/대출 장부 (Repository trait + 구현체)
//! - `services`: 대출 발행 조율, CSV 적재
//! - `routes`: HTTP 엔드포인트 핸들러
//! - `types`: 공통 타입 정의
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use credit_approval_api::{routes, AppState, Config, Database};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let db = Database::connect(&config.database_url).await?;
//!     let app = routes::router(AppState::new(Arc::new(db), config));
//!
//!     // ... 서버 시작
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod routes;
pub mod services;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use db::{Database, Ledger, MemoryLedger};
pub use error::ApiError;
pub use services::{BulkImporter, LoanService};

/// 애플리케이션 전역 상태
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<dyn Ledger>,
    pub loans: Arc<LoanService>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(ledger: Arc<dyn Ledger>, config: Config) -> Self {
        Self {
            loans: Arc::new(LoanService::new(Arc::clone(&ledger))),
            ledger,
            config: Arc::new(config),
        }
    }
}
