//! Database Models
//!
//! Customer and loan records as stored in the ledger.
//! Money columns are NUMERIC and map to `rust_decimal::Decimal`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

use crate::types::{CustomerId, LoanId};

/// 고객
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Customer {
    pub id: CustomerId,
    pub first_name: String,
    pub last_name: String,
    pub age: i32,
    pub monthly_income: Decimal,
    /// 형식 검증 없음
    pub phone_number: String,
    /// 신용 한도 (월 소득 × 36 또는 import 값)
    pub approved_limit: Decimal,
    /// 승인된 대출 원금 합계
    pub current_debt: Decimal,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// 신규 고객 입력
///
/// `id`는 import 시에만 지정. `approved_limit`이 없으면 저장소가 소득 × 36으로 채움.
#[derive(Debug, Clone, Default)]
pub struct NewCustomer {
    pub id: Option<CustomerId>,
    pub first_name: String,
    pub last_name: String,
    pub age: i32,
    pub monthly_income: Decimal,
    pub phone_number: String,
    pub approved_limit: Option<Decimal>,
    pub current_debt: Decimal,
}

/// 고객 부분 수정
#[derive(Debug, Clone, Default)]
pub struct CustomerUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: Option<i32>,
    pub monthly_income: Option<Decimal>,
    pub phone_number: Option<String>,
    pub approved_limit: Option<Decimal>,
    pub current_debt: Option<Decimal>,
}

impl CustomerUpdate {
    pub(crate) fn apply(self, customer: &mut Customer) {
        if let Some(v) = self.first_name {
            customer.first_name = v;
        }
        if let Some(v) = self.last_name {
            customer.last_name = v;
        }
        if let Some(v) = self.age {
            customer.age = v;
        }
        if let Some(v) = self.monthly_income {
            customer.monthly_income = v;
        }
        if let Some(v) = self.phone_number {
            customer.phone_number = v;
        }
        if let Some(v) = self.approved_limit {
            customer.approved_limit = v;
        }
        if let Some(v) = self.current_debt {
            customer.current_debt = v;
        }
    }
}

/// 대출
///
/// 생성 이후 금액/이율/기간/상환액은 변경되지 않음.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Loan {
    pub id: LoanId,
    pub customer_id: CustomerId,
    pub loan_amount: Decimal,
    /// 연이율 (%)
    pub interest_rate: Decimal,
    /// 개월
    pub tenure: i32,
    /// 생성 시점에 계산된 EMI
    pub monthly_repayment: Decimal,
    pub is_approved: bool,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

/// 신규 대출 입력
#[derive(Debug, Clone)]
pub struct NewLoan {
    pub customer_id: CustomerId,
    pub loan_amount: Decimal,
    pub interest_rate: Decimal,
    pub tenure: i32,
    pub monthly_repayment: Decimal,
    pub is_approved: bool,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl NewLoan {
    pub(crate) fn with_id(self, id: LoanId) -> Loan {
        Loan {
            id,
            customer_id: self.customer_id,
            loan_amount: self.loan_amount,
            interest_rate: self.interest_rate,
            tenure: self.tenure,
            monthly_repayment: self.monthly_repayment,
            is_approved: self.is_approved,
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}
