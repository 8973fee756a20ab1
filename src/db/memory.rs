//! In-memory Ledger
//!
//! PostgreSQL 없이 동작하는 장부 구현. 테스트와 로컬 개발용.
//! 모든 테이블을 하나의 `RwLock` 뒤에 두어 `commit_loan`이 원자적으로 동작함.

use std::collections::BTreeMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use super::models::{Customer, CustomerUpdate, Loan, NewCustomer, NewLoan};
use super::repository::{CustomerStore, Ledger, LedgerError, LedgerResult, LoanStore};
use crate::engine;
use crate::types::{CustomerId, LoanId};

#[derive(Default)]
struct Tables {
    customers: BTreeMap<CustomerId, Customer>,
    loans: BTreeMap<LoanId, Loan>,
}

impl Tables {
    fn next_customer_id(&self) -> CustomerId {
        self.customers.keys().next_back().map_or(1, |id| id + 1)
    }

    fn next_loan_id(&self) -> LoanId {
        self.loans.keys().next_back().map_or(1, |id| id + 1)
    }

    fn approved_debt(&self, customer_id: CustomerId) -> Decimal {
        self.loans
            .values()
            .filter(|loan| loan.customer_id == customer_id && loan.is_approved)
            .map(|loan| loan.loan_amount)
            .sum()
    }
}

/// In-memory 장부
#[derive(Default)]
pub struct MemoryLedger {
    tables: RwLock<Tables>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CustomerStore for MemoryLedger {
    async fn get_customer(&self, id: CustomerId) -> LedgerResult<Option<Customer>> {
        let tables = self.tables.read().await;
        Ok(tables.customers.get(&id).cloned())
    }

    async fn create_customer(&self, customer: NewCustomer) -> LedgerResult<Customer> {
        let mut tables = self.tables.write().await;

        let id = match customer.id {
            Some(id) if tables.customers.contains_key(&id) => {
                return Err(LedgerError::Validation(format!(
                    "customer {} already exists",
                    id
                )));
            }
            Some(id) => id,
            None => tables.next_customer_id(),
        };

        let approved_limit = match customer.approved_limit {
            Some(limit) => limit,
            None => engine::approved_limit_for(customer.monthly_income)
                .map_err(|err| LedgerError::Validation(err.to_string()))?,
        };

        let created = Customer {
            id,
            approved_limit,
            first_name: customer.first_name,
            last_name: customer.last_name,
            age: customer.age,
            monthly_income: customer.monthly_income,
            phone_number: customer.phone_number,
            current_debt: customer.current_debt,
        };
        tables.customers.insert(id, created.clone());
        Ok(created)
    }

    async fn update_customer(
        &self,
        id: CustomerId,
        update: CustomerUpdate,
    ) -> LedgerResult<Customer> {
        let mut tables = self.tables.write().await;
        let customer = tables
            .customers
            .get_mut(&id)
            .ok_or_else(|| LedgerError::customer_not_found(id))?;
        update.apply(customer);
        Ok(customer.clone())
    }
}

#[async_trait]
impl LoanStore for MemoryLedger {
    async fn get_loan(&self, id: LoanId) -> LedgerResult<Option<Loan>> {
        let tables = self.tables.read().await;
        Ok(tables.loans.get(&id).cloned())
    }

    async fn create_loan(&self, loan: NewLoan) -> LedgerResult<Loan> {
        let mut tables = self.tables.write().await;
        if !tables.customers.contains_key(&loan.customer_id) {
            return Err(LedgerError::customer_not_found(loan.customer_id));
        }
        let created = loan.with_id(tables.next_loan_id());
        tables.loans.insert(created.id, created.clone());
        Ok(created)
    }

    async fn upsert_loan(&self, loan: Loan) -> LedgerResult<Loan> {
        let mut tables = self.tables.write().await;
        if !tables.customers.contains_key(&loan.customer_id) {
            return Err(LedgerError::customer_not_found(loan.customer_id));
        }
        tables.loans.insert(loan.id, loan.clone());
        Ok(loan)
    }

    async fn list_loans_by_customer(&self, customer_id: CustomerId) -> LedgerResult<Vec<Loan>> {
        let tables = self.tables.read().await;
        Ok(tables
            .loans
            .values()
            .filter(|loan| loan.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn sum_approved_loan_amount(&self, customer_id: CustomerId) -> LedgerResult<Decimal> {
        let tables = self.tables.read().await;
        Ok(tables.approved_debt(customer_id))
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn commit_loan(&self, loan: NewLoan) -> LedgerResult<Loan> {
        if !loan.is_approved {
            return Err(LedgerError::Validation(
                "only approved loans can be committed".to_string(),
            ));
        }

        let mut tables = self.tables.write().await;

        let approved_limit = tables
            .customers
            .get(&loan.customer_id)
            .map(|c| c.approved_limit)
            .ok_or_else(|| LedgerError::customer_not_found(loan.customer_id))?;

        if tables.approved_debt(loan.customer_id) + loan.loan_amount > approved_limit {
            return Err(LedgerError::LimitExceeded {
                customer_id: loan.customer_id,
            });
        }

        let created = loan.with_id(tables.next_loan_id());
        tables.loans.insert(created.id, created.clone());
        if let Some(customer) = tables.customers.get_mut(&created.customer_id) {
            customer.current_debt += created.loan_amount;
        }
        Ok(created)
    }

    async fn health_check(&self) -> LedgerResult<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
