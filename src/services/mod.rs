//! Services Module
//!
//! 비즈니스 로직을 담당하는 서비스 레이어
//!
//! # Services
//! - `LoanService`: 고객 등록, 적격성 판정, 대출 발행/조회
//! - `BulkImporter`: CSV 고객/대출 데이터 적재

mod import;
mod loan_service;

pub use import::{BulkImporter, ImportError, ImportReport};
pub use loan_service::{Eligibility, LoanOutcome, LoanService, ServiceError, ServiceResult};
