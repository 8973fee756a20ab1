//! Loan Endpoints
//!
//! Eligibility checks, loan issuance and loan queries.
//! Policy rejections are returned as 200 with `approval: false`; only
//! malformed input (400) and unknown ids (404) are errors.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    db::Loan,
    engine::Decision,
    error::ApiError,
    services::LoanOutcome,
    types::{CustomerId, LoanId, LoanRequest},
    AppState,
};

// ============ Request/Response Types ============

/// 적격성 조회 응답
#[derive(Debug, Serialize)]
pub struct EligibilityResponse {
    pub customer_id: CustomerId,
    pub approval: bool,
    pub credit_score: u8,
    pub interest_rate: Decimal,
    /// 승인 시에만
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_installment: Option<Decimal>,
    /// 거절 시에만
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// 대출 생성 응답
#[derive(Debug, Serialize)]
pub struct CreateLoanResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_id: Option<LoanId>,
    pub customer_id: CustomerId,
    pub approval: bool,
    pub credit_score: u8,
    pub loan_amount: Decimal,
    pub interest_rate: Decimal,
    pub tenure: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_installment: Option<Decimal>,
    pub message: String,
}

/// 대출 단건 조회 응답
#[derive(Debug, Serialize)]
pub struct LoanDetailResponse {
    pub loan_id: LoanId,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub loan_amount: Decimal,
    pub interest_rate: Decimal,
    pub tenure: i32,
    pub monthly_repayment: Decimal,
    pub is_approved: bool,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

/// 고객별 대출 목록 응답
#[derive(Debug, Serialize)]
pub struct CustomerLoansResponse {
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub total_loans: usize,
    pub loans: Vec<LoanSummary>,
}

#[derive(Debug, Serialize)]
pub struct LoanSummary {
    pub loan_id: LoanId,
    pub loan_amount: Decimal,
    pub interest_rate: Decimal,
    pub tenure: i32,
    pub monthly_repayment: Decimal,
    pub is_approved: bool,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl From<Loan> for LoanSummary {
    fn from(loan: Loan) -> Self {
        Self {
            loan_id: loan.id,
            loan_amount: loan.loan_amount,
            interest_rate: loan.interest_rate,
            tenure: loan.tenure,
            monthly_repayment: loan.monthly_repayment,
            is_approved: loan.is_approved,
            start_date: loan.start_date,
            end_date: loan.end_date,
        }
    }
}

// ============ Handlers ============

/// POST /check-eligibility
///
/// 대출 가능 여부만 판정 (저장하지 않음)
///
/// # Response
///
/// ```json
/// {
///   "customer_id": 1,
///   "approval": true,
///   "credit_score": 100,
///   "interest_rate": "10",
///   "monthly_installment": "8791.59"
/// }
/// ```
pub async fn check_eligibility(
    State(state): State<AppState>,
    payload: Result<Json<LoanRequest>, JsonRejection>,
) -> Result<Json<EligibilityResponse>, ApiError> {
    let Json(req) = payload?;

    let eligibility = state
        .loans
        .check_eligibility(req.customer_id, req.terms())
        .await?;

    let response = match eligibility.decision {
        Decision::Approved {
            credit_score,
            monthly_installment,
        } => EligibilityResponse {
            customer_id: req.customer_id,
            approval: true,
            credit_score,
            interest_rate: req.interest_rate,
            monthly_installment: Some(monthly_installment),
            reason: None,
        },
        Decision::Rejected {
            credit_score,
            reason,
        } => EligibilityResponse {
            customer_id: req.customer_id,
            approval: false,
            credit_score,
            interest_rate: req.interest_rate,
            monthly_installment: None,
            reason: Some(reason.message().to_string()),
        },
    };

    Ok(Json(response))
}

/// POST /create-loan
///
/// 승인 시 201 + 대출 정보, 거절 시 200 + 사유
pub async fn create_loan(
    State(state): State<AppState>,
    payload: Result<Json<LoanRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateLoanResponse>), ApiError> {
    let Json(req) = payload?;

    let outcome = state.loans.create_loan(req.customer_id, req.terms()).await?;

    let (status, response) = match outcome {
        LoanOutcome::Approved { loan, credit_score } => (
            StatusCode::CREATED,
            CreateLoanResponse {
                loan_id: Some(loan.id),
                customer_id: loan.customer_id,
                approval: true,
                credit_score,
                loan_amount: loan.loan_amount,
                interest_rate: loan.interest_rate,
                tenure: loan.tenure,
                monthly_installment: Some(loan.monthly_repayment),
                message: "Loan approved successfully".to_string(),
            },
        ),
        LoanOutcome::Rejected {
            customer,
            credit_score,
            reason,
        } => (
            StatusCode::OK,
            CreateLoanResponse {
                loan_id: None,
                customer_id: customer.id,
                approval: false,
                credit_score,
                loan_amount: req.loan_amount,
                interest_rate: req.interest_rate,
                tenure: req.tenure,
                monthly_installment: None,
                message: reason.message().to_string(),
            },
        ),
    };

    Ok((status, Json(response)))
}

/// GET /view-loan/:loan_id
pub async fn view_loan(
    State(state): State<AppState>,
    loan_id: Result<Path<LoanId>, PathRejection>,
) -> Result<Json<LoanDetailResponse>, ApiError> {
    let Path(loan_id) = loan_id?;

    let (loan, customer) = state.loans.get_loan(loan_id).await?;

    Ok(Json(LoanDetailResponse {
        loan_id: loan.id,
        customer_id: customer.id,
        customer_name: customer.full_name(),
        loan_amount: loan.loan_amount,
        interest_rate: loan.interest_rate,
        tenure: loan.tenure,
        monthly_repayment: loan.monthly_repayment,
        is_approved: loan.is_approved,
        start_date: loan.start_date,
        end_date: loan.end_date,
    }))
}

/// GET /view-loans/:customer_id
pub async fn view_loans(
    State(state): State<AppState>,
    customer_id: Result<Path<CustomerId>, PathRejection>,
) -> Result<Json<CustomerLoansResponse>, ApiError> {
    let Path(customer_id) = customer_id?;

    let (customer, loans) = state.loans.list_loans(customer_id).await?;
    let loans: Vec<LoanSummary> = loans.into_iter().map(LoanSummary::from).collect();

    Ok(Json(CustomerLoansResponse {
        customer_id: customer.id,
        customer_name: customer.full_name(),
        total_loans: loans.len(),
        loans,
    }))
}
