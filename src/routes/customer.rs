//! Customer Endpoints
//!
//! Customer registration. The approved limit is derived from income
//! (36 × monthly income) and is never taken from the request.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{db::{Customer, NewCustomer}, error::ApiError, AppState};

// ============ Request/Response Types ============

/// 고객 등록 요청
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub age: i32,
    /// 월 소득
    pub monthly_income: Decimal,
    pub phone_number: String,
}

// ============ Handlers ============

/// POST /register
///
/// # Response (201)
///
/// ```json
/// {
///   "id": 1,
///   "first_name": "Ada",
///   "last_name": "Lovelace",
///   "age": 36,
///   "monthly_income": "50000",
///   "phone_number": "9876543210",
///   "approved_limit": "1800000",
///   "current_debt": "0"
/// }
/// ```
pub async fn register_customer(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Customer>), ApiError> {
    let Json(req) = payload?;

    let customer = state
        .loans
        .register_customer(NewCustomer {
            first_name: req.first_name,
            last_name: req.last_name,
            age: req.age,
            monthly_income: req.monthly_income,
            phone_number: req.phone_number,
            ..Default::default()
        })
        .await?;

    Ok((StatusCode::CREATED, Json(customer)))
}
