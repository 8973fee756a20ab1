//! Loan Service
//!
//! 고객 조회 → 승인 부채 합계 → 엔진 판정 → 커밋 을 조율하는 얇은 레이어.
//!
//! # Interview Q&A
//!
//! Q: 같은 고객에 대한 동시 대출 요청은 어떻게 처리하는가?
//! A: 두 단계로 방어
//!
//!    1. 프로세스 내부: 고객별 `tokio::sync::Mutex`
//!       - 조회 → 판정 → 커밋 전체 구간을 직렬화
//!       - 다른 고객의 요청은 서로 막지 않음
//!    2. 저장소: `Ledger::commit_loan`이 트랜잭션 안에서 부채를 재조회
//!       - 여러 인스턴스가 같은 DB를 쓰는 경우까지 커버
//!       - 재검증 실패 시 `LedgerError::LimitExceeded` (아무것도 기록되지 않음)
//!
//! Q: 왜 거절은 에러가 아닌가?
//! A: 정책상 거절은 정상 결과 (200 OK + approval=false)
//!    - 에러는 잘못된 입력(400)과 존재하지 않는 리소스(404)뿐

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::db::{
    Customer, CustomerStore, Ledger, LedgerError, Loan, LoanStore, NewCustomer, NewLoan,
};
use crate::engine::{self, Decision, EngineError, LoanTerms, Rejection};
use crate::types::{CustomerId, LoanId};

/// 서비스 에러
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// 적격성 조회 결과 (저장 없음)
#[derive(Debug, Clone)]
pub struct Eligibility {
    pub customer: Customer,
    pub existing_debt: Decimal,
    pub terms: LoanTerms,
    pub decision: Decision,
}

/// 대출 생성 결과
#[derive(Debug, Clone)]
pub enum LoanOutcome {
    Approved { loan: Loan, credit_score: u8 },
    Rejected {
        customer: Customer,
        credit_score: u8,
        reason: Rejection,
    },
}

/// 대출 발행 서비스
pub struct LoanService {
    ledger: Arc<dyn Ledger>,
    /// 고객별 발행 lock
    issuance_locks: DashMap<CustomerId, Arc<Mutex<()>>>,
}

impl LoanService {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self {
            ledger,
            issuance_locks: DashMap::new(),
        }
    }

    pub fn ledger(&self) -> &Arc<dyn Ledger> {
        &self.ledger
    }

    /// 고객 등록
    ///
    /// 승인 한도 = 월 소득 × 36, 현재 부채 = 0
    pub async fn register_customer(&self, customer: NewCustomer) -> ServiceResult<Customer> {
        validate_new_customer(&customer)?;
        let approved_limit = engine::approved_limit_for(customer.monthly_income)?;

        let customer = NewCustomer {
            id: None,
            approved_limit: Some(approved_limit),
            current_debt: Decimal::ZERO,
            ..customer
        };
        let created = self.ledger.create_customer(customer).await?;

        tracing::info!(
            customer_id = created.id,
            approved_limit = %created.approved_limit,
            "Customer registered"
        );
        Ok(created)
    }

    /// 적격성 조회 (저장하지 않음)
    pub async fn check_eligibility(
        &self,
        customer_id: CustomerId,
        terms: LoanTerms,
    ) -> ServiceResult<Eligibility> {
        let customer = self.load_customer(customer_id).await?;
        let existing_debt = self.ledger.sum_approved_loan_amount(customer_id).await?;
        let decision = engine::evaluate(existing_debt, customer.approved_limit, &terms)?;

        tracing::info!(
            customer_id,
            credit_score = decision.credit_score(),
            approved = decision.is_approved(),
            "Eligibility evaluated"
        );

        Ok(Eligibility {
            customer,
            existing_debt,
            terms,
            decision,
        })
    }

    /// 대출 생성
    ///
    /// # Flow
    ///
    /// 1. 고객 존재 확인 (없는 id로는 lock을 만들지 않음)
    /// 2. 고객별 lock 획득
    /// 3. 고객 재조회 + 승인 부채 합계 + 엔진 판정
    /// 4. 승인 시 `commit_loan` (대출 INSERT + 부채 증가, 원자적)
    /// 5. 대기자가 없으면 lock 항목 제거
    pub async fn create_loan(
        &self,
        customer_id: CustomerId,
        terms: LoanTerms,
    ) -> ServiceResult<LoanOutcome> {
        self.load_customer(customer_id).await?;

        let lock = self.issuance_lock(customer_id);
        let outcome = {
            let _guard = lock.lock().await;
            self.issue_locked(customer_id, terms).await
        };
        drop(lock);
        self.release_issuance_lock(customer_id);

        outcome
    }

    /// 고객 lock을 잡은 상태에서 판정 + 커밋
    async fn issue_locked(
        &self,
        customer_id: CustomerId,
        terms: LoanTerms,
    ) -> ServiceResult<LoanOutcome> {
        let eligibility = self.check_eligibility(customer_id, terms).await?;

        let monthly_installment = match eligibility.decision {
            Decision::Approved {
                monthly_installment,
                ..
            } => monthly_installment,
            Decision::Rejected {
                credit_score,
                reason,
            } => {
                return Ok(LoanOutcome::Rejected {
                    customer: eligibility.customer,
                    credit_score,
                    reason,
                });
            }
        };

        let loan = self
            .ledger
            .commit_loan(NewLoan {
                customer_id,
                loan_amount: terms.amount,
                interest_rate: terms.annual_rate_percent,
                tenure: terms.tenure_months,
                monthly_repayment: monthly_installment,
                is_approved: true,
                start_date: Utc::now().date_naive(),
                end_date: None,
            })
            .await?;

        tracing::info!(
            loan_id = loan.id,
            customer_id,
            amount = %loan.loan_amount,
            "Loan issued"
        );

        Ok(LoanOutcome::Approved {
            loan,
            credit_score: eligibility.decision.credit_score(),
        })
    }

    /// 대출 단건 조회 (고객 정보 포함)
    pub async fn get_loan(&self, loan_id: LoanId) -> ServiceResult<(Loan, Customer)> {
        let loan = self
            .ledger
            .get_loan(loan_id)
            .await?
            .ok_or_else(|| LedgerError::loan_not_found(loan_id))?;
        let customer = self.load_customer(loan.customer_id).await?;
        Ok((loan, customer))
    }

    /// 고객의 전체 대출 목록
    pub async fn list_loans(&self, customer_id: CustomerId) -> ServiceResult<(Customer, Vec<Loan>)> {
        let customer = self.load_customer(customer_id).await?;
        let loans = self.ledger.list_loans_by_customer(customer_id).await?;
        Ok((customer, loans))
    }

    async fn load_customer(&self, customer_id: CustomerId) -> ServiceResult<Customer> {
        let customer = self
            .ledger
            .get_customer(customer_id)
            .await?
            .ok_or_else(|| LedgerError::customer_not_found(customer_id))?;
        Ok(customer)
    }

    fn issuance_lock(&self, customer_id: CustomerId) -> Arc<Mutex<()>> {
        self.issuance_locks
            .entry(customer_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// 맵 외에 아무도 들고 있지 않은 lock만 제거
    ///
    /// `remove_if`와 `entry`는 같은 shard lock을 잡으므로 검사 도중 새 대기자가 끼어들 수 없음.
    fn release_issuance_lock(&self, customer_id: CustomerId) {
        self.issuance_locks
            .remove_if(&customer_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

fn validate_new_customer(customer: &NewCustomer) -> Result<(), EngineError> {
    let invalid = |msg: &str| Err(EngineError::InvalidInput(msg.to_string()));

    if customer.first_name.trim().is_empty() || customer.last_name.trim().is_empty() {
        return invalid("first_name and last_name are required");
    }
    if customer.phone_number.trim().is_empty() {
        return invalid("phone_number is required");
    }
    if customer.age <= 0 {
        return invalid("age must be positive");
    }
    if customer.monthly_income.is_sign_negative() && !customer.monthly_income.is_zero() {
        return invalid("monthly_income must not be negative");
    }
    engine::check_precision(
        "monthly_income",
        customer.monthly_income,
        engine::MONEY_SCALE,
        engine::MAX_MONTHLY_INCOME,
    )
}
