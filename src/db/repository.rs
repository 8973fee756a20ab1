//! Repository Pattern Implementation
//!
//! # Interview Q&A
//!
//! Q: Repository 패턴이란?
//! A: 데이터 접근 로직을 추상화하는 패턴
//!
//!    장점:
//!    - 비즈니스 로직과 데이터 접근 분리
//!    - 테스트 시 in-memory 구현으로 교체 가능
//!    - DB 교체 시 영향 최소화
//!
//!    ```rust,ignore
//!    // Service 레이어
//!    let customer = ledger.get_customer(id).await?;
//!
//!    // PostgreSQL 구현: Database
//!    // In-memory 구현: MemoryLedger
//!    ```
//!
//! Q: 대출 생성과 부채 갱신은 왜 한 메서드(`commit_loan`)인가?
//! A: 둘 중 하나만 반영되면 `current_debt` 불변식이 깨짐
//!    - 하나의 트랜잭션에서 INSERT + UPDATE
//!    - 커밋 직전에 부채 합계를 다시 읽어 한도 재검증

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use super::models::{Customer, CustomerUpdate, Loan, NewCustomer, NewLoan};
use crate::types::{CustomerId, LoanId};

/// 저장소 에러
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// 커밋 시점 재검증 실패 (동시 발행으로 한도 초과)
    #[error("customer {customer_id} would exceed the approved limit")]
    LimitExceeded { customer_id: CustomerId },

    #[error("invalid record: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl LedgerError {
    pub fn customer_not_found(id: CustomerId) -> Self {
        LedgerError::NotFound {
            entity: "Customer",
            id,
        }
    }

    pub fn loan_not_found(id: LoanId) -> Self {
        LedgerError::NotFound { entity: "Loan", id }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Customer Ledger
#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn get_customer(&self, id: CustomerId) -> LedgerResult<Option<Customer>>;

    /// `approved_limit`이 `None`이면 월 소득 × 36
    async fn create_customer(&self, customer: NewCustomer) -> LedgerResult<Customer>;

    async fn update_customer(
        &self,
        id: CustomerId,
        update: CustomerUpdate,
    ) -> LedgerResult<Customer>;
}

/// Loan Ledger
#[async_trait]
pub trait LoanStore: Send + Sync {
    async fn get_loan(&self, id: LoanId) -> LedgerResult<Option<Loan>>;

    /// 고객 부채는 건드리지 않음. 발행 흐름은 `Ledger::commit_loan` 사용.
    async fn create_loan(&self, loan: NewLoan) -> LedgerResult<Loan>;

    /// id 기준 update-or-create (import용)
    async fn upsert_loan(&self, loan: Loan) -> LedgerResult<Loan>;

    /// id 오름차순
    async fn list_loans_by_customer(&self, customer_id: CustomerId) -> LedgerResult<Vec<Loan>>;

    /// 승인된 대출 원금 합계 (없으면 0)
    async fn sum_approved_loan_amount(&self, customer_id: CustomerId) -> LedgerResult<Decimal>;
}

/// 두 장부를 묶는 원자적 연산
#[async_trait]
pub trait Ledger: CustomerStore + LoanStore {
    /// 대출 생성 + `current_debt` 증가를 하나의 단위로 커밋
    ///
    /// 커밋 직전 승인 부채 합계를 다시 읽어 `합계 + 원금 > 한도`이면
    /// `LedgerError::LimitExceeded`로 중단. 고객이 없으면 `NotFound`.
    async fn commit_loan(&self, loan: NewLoan) -> LedgerResult<Loan>;

    async fn health_check(&self) -> LedgerResult<()>;

    fn backend(&self) -> &'static str;
}
