//! Database Module
//!
//! # Interview Q&A
//!
//! Q: 왜 PostgreSQL을 선택했는가?
//! A: 신용/대출 장부에 적합한 이유
//!
//!    1. ACID 트랜잭션: 대출 생성과 부채 갱신을 원자적으로 처리
//!    2. 행 잠금: `SELECT ... FOR UPDATE`로 고객 단위 직렬화
//!    3. NUMERIC 타입: 금액을 오차 없이 저장
//!    4. 외래 키 + CASCADE: 고객-대출 관계 보장
//!
//! Q: 커넥션 풀은 어떻게 관리하는가?
//! A: SQLx의 PgPool 사용
//!    - 최소/최대 커넥션 수 설정
//!    - 커넥션 재사용 (오버헤드 감소)
//!    - 타임아웃 처리
//!
//! Q: in-memory 구현(`MemoryLedger`)은 왜 있는가?
//! A: DB 없이 전체 흐름(라우터 포함)을 테스트하기 위함
//!    - `LEDGER_BACKEND=memory`로 로컬 실행도 가능

mod memory;
mod models;
mod repository;

pub use memory::MemoryLedger;
pub use models::*;
pub use repository::{CustomerStore, Ledger, LedgerError, LedgerResult, LoanStore};

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::engine;
use crate::types::{CustomerId, LoanId};

/// PostgreSQL 장부
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 데이터베이스 연결
    ///
    /// # Connection Pool Settings
    ///
    /// - max_connections: 10 (트래픽에 따라 조정)
    /// - min_connections: 1 (idle 시 최소 유지)
    /// - acquire_timeout: 3초 (커넥션 획득 대기)
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(std::time::Duration::from_secs(3))
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// 마이그레이션 실행
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await?;
        Ok(())
    }

    /// 명시적 id로 INSERT한 뒤 시퀀스를 최대 id로 맞춤
    async fn sync_sequence(&self, table: &str) -> LedgerResult<()> {
        let sql = format!(
            "SELECT setval(pg_get_serial_sequence('{table}', 'id'), \
             GREATEST((SELECT MAX(id) FROM {table}), 1))"
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl CustomerStore for Database {
    async fn get_customer(&self, id: CustomerId) -> LedgerResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT
                id, first_name, last_name, age, monthly_income,
                phone_number, approved_limit, current_debt
            FROM customers
            WHERE id = $1
            "#
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    async fn create_customer(&self, customer: NewCustomer) -> LedgerResult<Customer> {
        let approved_limit = match customer.approved_limit {
            Some(limit) => limit,
            None => engine::approved_limit_for(customer.monthly_income)
                .map_err(|err| LedgerError::Validation(err.to_string()))?,
        };

        let created = match customer.id {
            Some(id) => {
                let created = sqlx::query_as::<_, Customer>(
                    r#"
                    INSERT INTO customers (
                        id, first_name, last_name, age, monthly_income,
                        phone_number, approved_limit, current_debt
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    RETURNING
                        id, first_name, last_name, age, monthly_income,
                        phone_number, approved_limit, current_debt
                    "#
                )
                .bind(id)
                .bind(&customer.first_name)
                .bind(&customer.last_name)
                .bind(customer.age)
                .bind(customer.monthly_income)
                .bind(&customer.phone_number)
                .bind(approved_limit)
                .bind(customer.current_debt)
                .fetch_one(&self.pool)
                .await?;

                self.sync_sequence("customers").await?;
                created
            }
            None => {
                sqlx::query_as::<_, Customer>(
                    r#"
                    INSERT INTO customers (
                        first_name, last_name, age, monthly_income,
                        phone_number, approved_limit, current_debt
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    RETURNING
                        id, first_name, last_name, age, monthly_income,
                        phone_number, approved_limit, current_debt
                    "#
                )
                .bind(&customer.first_name)
                .bind(&customer.last_name)
                .bind(customer.age)
                .bind(customer.monthly_income)
                .bind(&customer.phone_number)
                .bind(approved_limit)
                .bind(customer.current_debt)
                .fetch_one(&self.pool)
                .await?
            }
        };

        Ok(created)
    }

    async fn update_customer(
        &self,
        id: CustomerId,
        update: CustomerUpdate,
    ) -> LedgerResult<Customer> {
        let mut tx = self.pool.begin().await?;

        let mut customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT
                id, first_name, last_name, age, monthly_income,
                phone_number, approved_limit, current_debt
            FROM customers
            WHERE id = $1
            FOR UPDATE
            "#
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| LedgerError::customer_not_found(id))?;

        update.apply(&mut customer);

        sqlx::query(
            r#"
            UPDATE customers SET
                first_name = $2,
                last_name = $3,
                age = $4,
                monthly_income = $5,
                phone_number = $6,
                approved_limit = $7,
                current_debt = $8
            WHERE id = $1
            "#
        )
        .bind(id)
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(customer.age)
        .bind(customer.monthly_income)
        .bind(&customer.phone_number)
        .bind(customer.approved_limit)
        .bind(customer.current_debt)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(customer)
    }
}

#[async_trait]
impl LoanStore for Database {
    async fn get_loan(&self, id: LoanId) -> LedgerResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            SELECT
                id, customer_id, loan_amount, interest_rate, tenure,
                monthly_repayment, is_approved, start_date, end_date
            FROM loans
            WHERE id = $1
            "#
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(loan)
    }

    async fn create_loan(&self, loan: NewLoan) -> LedgerResult<Loan> {
        let created = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (
                customer_id, loan_amount, interest_rate, tenure,
                monthly_repayment, is_approved, start_date, end_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING
                id, customer_id, loan_amount, interest_rate, tenure,
                monthly_repayment, is_approved, start_date, end_date
            "#
        )
        .bind(loan.customer_id)
        .bind(loan.loan_amount)
        .bind(loan.interest_rate)
        .bind(loan.tenure)
        .bind(loan.monthly_repayment)
        .bind(loan.is_approved)
        .bind(loan.start_date)
        .bind(loan.end_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn upsert_loan(&self, loan: Loan) -> LedgerResult<Loan> {
        let saved = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (
                id, customer_id, loan_amount, interest_rate, tenure,
                monthly_repayment, is_approved, start_date, end_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id)
            DO UPDATE SET
                customer_id = EXCLUDED.customer_id,
                loan_amount = EXCLUDED.loan_amount,
                interest_rate = EXCLUDED.interest_rate,
                tenure = EXCLUDED.tenure,
                monthly_repayment = EXCLUDED.monthly_repayment,
                is_approved = EXCLUDED.is_approved,
                start_date = EXCLUDED.start_date,
                end_date = EXCLUDED.end_date
            RETURNING
                id, customer_id, loan_amount, interest_rate, tenure,
                monthly_repayment, is_approved, start_date, end_date
            "#
        )
        .bind(loan.id)
        .bind(loan.customer_id)
        .bind(loan.loan_amount)
        .bind(loan.interest_rate)
        .bind(loan.tenure)
        .bind(loan.monthly_repayment)
        .bind(loan.is_approved)
        .bind(loan.start_date)
        .bind(loan.end_date)
        .fetch_one(&self.pool)
        .await?;

        self.sync_sequence("loans").await?;
        Ok(saved)
    }

    async fn list_loans_by_customer(&self, customer_id: CustomerId) -> LedgerResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            r#"
            SELECT
                id, customer_id, loan_amount, interest_rate, tenure,
                monthly_repayment, is_approved, start_date, end_date
            FROM loans
            WHERE customer_id = $1
            ORDER BY id
            "#
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    async fn sum_approved_loan_amount(&self, customer_id: CustomerId) -> LedgerResult<Decimal> {
        let total: (Decimal,) = sqlx::query_as(
            "SELECT COALESCE(SUM(loan_amount), 0) FROM loans WHERE customer_id = $1 AND is_approved"
        )
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total.0)
    }
}

#[async_trait]
impl Ledger for Database {
    /// # Transaction
    ///
    /// ```text
    /// BEGIN
    ///   SELECT approved_limit ... FOR UPDATE   -- 같은 고객의 다른 발행은 여기서 대기
    ///   SELECT SUM(loan_amount) ...            -- 잠금 이후 재조회
    ///   INSERT INTO loans ...
    ///   UPDATE customers SET current_debt = current_debt + amount
    /// COMMIT
    /// ```
    async fn commit_loan(&self, loan: NewLoan) -> LedgerResult<Loan> {
        if !loan.is_approved {
            return Err(LedgerError::Validation(
                "only approved loans can be committed".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let (approved_limit,): (Decimal,) = sqlx::query_as(
            "SELECT approved_limit FROM customers WHERE id = $1 FOR UPDATE"
        )
        .bind(loan.customer_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| LedgerError::customer_not_found(loan.customer_id))?;

        let (existing_debt,): (Decimal,) = sqlx::query_as(
            "SELECT COALESCE(SUM(loan_amount), 0) FROM loans WHERE customer_id = $1 AND is_approved"
        )
        .bind(loan.customer_id)
        .fetch_one(&mut *tx)
        .await?;

        if existing_debt + loan.loan_amount > approved_limit {
            // tx drop → rollback
            return Err(LedgerError::LimitExceeded {
                customer_id: loan.customer_id,
            });
        }

        let created = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (
                customer_id, loan_amount, interest_rate, tenure,
                monthly_repayment, is_approved, start_date, end_date
            )
            VALUES ($1, $2, $3, $4, $5, TRUE, $6, $7)
            RETURNING
                id, customer_id, loan_amount, interest_rate, tenure,
                monthly_repayment, is_approved, start_date, end_date
            "#
        )
        .bind(loan.customer_id)
        .bind(loan.loan_amount)
        .bind(loan.interest_rate)
        .bind(loan.tenure)
        .bind(loan.monthly_repayment)
        .bind(loan.start_date)
        .bind(loan.end_date)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE customers SET current_debt = current_debt + $2 WHERE id = $1")
            .bind(loan.customer_id)
            .bind(loan.loan_amount)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn health_check(&self) -> LedgerResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
