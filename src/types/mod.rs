//! Common Types Module
//!
//! 애플리케이션 전반에서 사용되는 공통 타입 정의

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::engine::LoanTerms;

/// 고객 식별자 (BIGSERIAL)
pub type CustomerId = i64;

/// 대출 식별자 (BIGSERIAL)
pub type LoanId = i64;

/// 대출 요청
///
/// `/check-eligibility`, `/create-loan` 공통 본문.
/// Decimal 필드는 JSON 숫자와 문자열 모두 허용.
#[derive(Debug, Clone, Deserialize)]
pub struct LoanRequest {
    pub customer_id: CustomerId,
    pub loan_amount: Decimal,
    /// 연이율 (%)
    pub interest_rate: Decimal,
    /// 개월
    pub tenure: i32,
}

impl LoanRequest {
    pub fn terms(&self) -> LoanTerms {
        LoanTerms::new(self.loan_amount, self.interest_rate, self.tenure)
    }
}
