//! Eligibility & Loan-Issuance Engine
//!
//! 신용 점수 산정, 한도 검사, EMI(원리금 균등 상환액) 계산을 담당하는 순수 함수 모음.
//! 저장소에 전혀 의존하지 않으므로 DB 없이 단독으로 테스트 가능.
//!
//! # Interview Q&A
//!
//! Q: 왜 엔진을 저장소와 분리했는가?
//! A: 결정 로직만 순수 함수로 격리
//!    - 입력: 기존 승인 부채, 승인 한도, 대출 조건
//!    - 출력: 신용 점수 + 승인/거절 결정 + EMI
//!    - 부채 합계 조회와 커밋은 호출자(LoanService)의 책임
//!
//! Q: 금액 계산에 f64를 쓰지 않는 이유는?
//! A: 이진 부동소수점은 0.1 같은 값을 정확히 표현하지 못함
//!    - `rust_decimal::Decimal` (28자리 고정소수점) 사용
//!    - 반올림 모드를 명시적으로 지정 가능 (half-up)
//!
//! # EMI Formula
//!
//! ```text
//! r   = annual_rate_percent / 1200
//! EMI = P × r × (1+r)^n / ((1+r)^n − 1)      (r > 0)
//! EMI = P / n                                (r = 0)
//! ```

use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};
use rust_decimal_macros::dec;
use thiserror::Error;

/// 신용 점수 시작값
pub const MAX_CREDIT_SCORE: u8 = 100;

/// 이 점수 미만이면 거절
pub const MIN_APPROVAL_SCORE: u8 = 50;

/// 승인 한도 = 월 소득 × 36
pub const LIMIT_INCOME_MULTIPLIER: Decimal = dec!(36);

/// 금액 컬럼 정밀도: NUMERIC(20, 2)
pub const MONEY_SCALE: u32 = 2;
pub const MAX_MONEY: Decimal = dec!(999999999999999999.99);

/// 월 소득 컬럼 정밀도: NUMERIC(18, 2). × 36 결과도 MAX_MONEY 안에 들어옴.
pub const MAX_MONTHLY_INCOME: Decimal = dec!(9999999999999999.99);

/// 이율 컬럼 정밀도: NUMERIC(12, 4)
pub const RATE_SCALE: u32 = 4;
pub const MAX_INTEREST_RATE: Decimal = dec!(99999999.9999);

const HIGH_UTILISATION: Decimal = dec!(0.8);
const HIGH_UTILISATION_PENALTY: u8 = 40;
const MEDIUM_UTILISATION: Decimal = dec!(0.5);
const MEDIUM_UTILISATION_PENALTY: u8 = 20;

/// 엔진 입력 오류
///
/// 정책상 거절(`Decision::Rejected`)은 에러가 아님. 입력 자체가 잘못된 경우만 해당.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// 대출 조건
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanTerms {
    /// 대출 원금
    pub amount: Decimal,
    /// 연이율 (%)
    pub annual_rate_percent: Decimal,
    /// 상환 기간 (개월)
    pub tenure_months: i32,
}

impl LoanTerms {
    pub fn new(amount: Decimal, annual_rate_percent: Decimal, tenure_months: i32) -> Self {
        Self {
            amount,
            annual_rate_percent,
            tenure_months,
        }
    }

    fn validate(&self) -> Result<(), EngineError> {
        if self.amount <= Decimal::ZERO {
            return Err(EngineError::InvalidInput(
                "loan amount must be positive".to_string(),
            ));
        }
        if self.tenure_months <= 0 {
            return Err(EngineError::InvalidInput(
                "tenure must be at least one month".to_string(),
            ));
        }
        if self.annual_rate_percent.is_sign_negative() && !self.annual_rate_percent.is_zero() {
            return Err(EngineError::InvalidInput(
                "interest rate must not be negative".to_string(),
            ));
        }
        check_precision("loan amount", self.amount, MONEY_SCALE, MAX_MONEY)?;
        check_precision(
            "interest rate",
            self.annual_rate_percent,
            RATE_SCALE,
            MAX_INTEREST_RATE,
        )?;
        Ok(())
    }
}

/// 거절 사유
///
/// 두 조건은 독립적으로 평가되며 둘 다 참일 수 있음.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejection {
    pub low_credit_score: bool,
    pub limit_exceeded: bool,
}

impl Rejection {
    /// 클라이언트에 노출할 사유 메시지
    pub fn message(&self) -> &'static str {
        match (self.low_credit_score, self.limit_exceeded) {
            (true, true) => "Credit score too low and loan exceeds approved limit",
            (true, false) => "Credit score too low",
            (false, true) => "Loan exceeds approved limit",
            (false, false) => "Loan rejected",
        }
    }
}

/// 엔진 판정 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approved {
        credit_score: u8,
        monthly_installment: Decimal,
    },
    Rejected {
        credit_score: u8,
        reason: Rejection,
    },
}

impl Decision {
    pub fn credit_score(&self) -> u8 {
        match self {
            Decision::Approved { credit_score, .. } | Decision::Rejected { credit_score, .. } => {
                *credit_score
            }
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Decision::Approved { .. })
    }
}

/// 대출 승인 여부 판정
///
/// # Flow
///
/// 1. 입력 검증 (원금 > 0, 기간 ≥ 1, 이율 ≥ 0, 부채/한도 ≥ 0)
/// 2. 기존 부채 비율로 신용 점수 산정
/// 3. 점수 < 50 또는 원금 > (한도 − 부채) 이면 거절
/// 4. 승인 시 EMI 계산 (소수점 2자리, half-up)
///
/// 남은 한도와 정확히 같은 금액은 승인됨 (`>` 비교).
pub fn evaluate(
    existing_approved_debt: Decimal,
    approved_limit: Decimal,
    terms: &LoanTerms,
) -> Result<Decision, EngineError> {
    terms.validate()?;
    if existing_approved_debt.is_sign_negative() && !existing_approved_debt.is_zero() {
        return Err(EngineError::InvalidInput(
            "existing debt must not be negative".to_string(),
        ));
    }
    if approved_limit.is_sign_negative() && !approved_limit.is_zero() {
        return Err(EngineError::InvalidInput(
            "approved limit must not be negative".to_string(),
        ));
    }

    let credit_score = credit_score(existing_approved_debt, approved_limit);
    let remaining_limit = approved_limit - existing_approved_debt;

    let reason = Rejection {
        low_credit_score: credit_score < MIN_APPROVAL_SCORE,
        limit_exceeded: terms.amount > remaining_limit,
    };
    if reason.low_credit_score || reason.limit_exceeded {
        return Ok(Decision::Rejected {
            credit_score,
            reason,
        });
    }

    Ok(Decision::Approved {
        credit_score,
        monthly_installment: monthly_installment(terms)?,
    })
}

/// 부채 비율 기반 신용 점수 (0-100)
///
/// 0.8 구간을 먼저 검사하므로 두 감점은 중복 적용되지 않음.
pub fn credit_score(existing_approved_debt: Decimal, approved_limit: Decimal) -> u8 {
    if existing_approved_debt > approved_limit * HIGH_UTILISATION {
        MAX_CREDIT_SCORE - HIGH_UTILISATION_PENALTY
    } else if existing_approved_debt > approved_limit * MEDIUM_UTILISATION {
        MAX_CREDIT_SCORE - MEDIUM_UTILISATION_PENALTY
    } else {
        MAX_CREDIT_SCORE
    }
}

/// 원리금 균등 상환액 (EMI)
///
/// 무이자(r = 0)는 공식의 분모가 0이 되므로 원금 / 기간 으로 처리.
pub fn monthly_installment(terms: &LoanTerms) -> Result<Decimal, EngineError> {
    terms.validate()?;

    let overflow = || EngineError::InvalidInput("loan terms overflow decimal range".to_string());
    let principal = terms.amount;
    let months = Decimal::from(terms.tenure_months);

    let emi = if terms.annual_rate_percent.is_zero() {
        principal.checked_div(months).ok_or_else(overflow)?
    } else {
        let r = terms.annual_rate_percent / dec!(1200);
        let growth = (Decimal::ONE + r)
            .checked_powu(terms.tenure_months as u64)
            .ok_or_else(overflow)?;
        let numerator = principal
            .checked_mul(r)
            .and_then(|v| v.checked_mul(growth))
            .ok_or_else(overflow)?;
        numerator
            .checked_div(growth - Decimal::ONE)
            .ok_or_else(overflow)?
    };

    let emi = round_money(emi);
    if emi > MAX_MONEY {
        return Err(overflow());
    }
    Ok(emi)
}

/// 승인 한도 산정 (월 소득 × 36)
pub fn approved_limit_for(monthly_income: Decimal) -> Result<Decimal, EngineError> {
    check_precision("monthly income", monthly_income, MONEY_SCALE, MAX_MONTHLY_INCOME)?;
    monthly_income
        .checked_mul(LIMIT_INCOME_MULTIPLIER)
        .ok_or_else(|| EngineError::InvalidInput("monthly income is too large".to_string()))
}

/// 저장 컬럼에 그대로 들어가는 값인지 확인 (반올림/절삭 없이)
///
/// 뒤쪽 0은 무시: "10.000"은 scale 2 금액으로 허용.
pub fn check_precision(
    field: &str,
    value: Decimal,
    max_scale: u32,
    max_value: Decimal,
) -> Result<(), EngineError> {
    if value.normalize().scale() > max_scale {
        return Err(EngineError::InvalidInput(format!(
            "{} allows at most {} decimal places",
            field, max_scale
        )));
    }
    if value > max_value {
        return Err(EngineError::InvalidInput(format!(
            "{} must not exceed {}",
            field, max_value
        )));
    }
    Ok(())
}

/// 금액 반올림: 소수점 2자리, half-up
///
/// 입력은 항상 0 이상이므로 MidpointAwayFromZero == half-up.
/// 결과는 항상 scale 2 ("1000" → "1000.00").
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(amount: Decimal, rate: Decimal, tenure: i32) -> LoanTerms {
        LoanTerms::new(amount, rate, tenure)
    }

    #[test]
    fn test_score_full_when_debt_at_most_half_limit() {
        assert_eq!(credit_score(dec!(0), dec!(100000)), 100);
        assert_eq!(credit_score(dec!(30000), dec!(100000)), 100);
        // 경계값: 정확히 50%는 감점 없음
        assert_eq!(credit_score(dec!(50000), dec!(100000)), 100);
    }

    #[test]
    fn test_score_medium_band() {
        assert_eq!(credit_score(dec!(50000.01), dec!(100000)), 80);
        assert_eq!(credit_score(dec!(70000), dec!(100000)), 80);
        assert_eq!(credit_score(dec!(80000), dec!(100000)), 80);
    }

    #[test]
    fn test_score_high_band() {
        assert_eq!(credit_score(dec!(80000.01), dec!(100000)), 60);
        assert_eq!(credit_score(dec!(250000), dec!(100000)), 60);
    }

    #[test]
    fn test_zero_limit_with_debt_scores_lowest_band() {
        assert_eq!(credit_score(dec!(1), dec!(0)), 60);
        assert_eq!(credit_score(dec!(0), dec!(0)), 100);
    }

    #[test]
    fn test_never_rejected_on_score_alone() {
        let limit = dec!(100000);
        let mut debt = Decimal::ZERO;
        while debt <= dec!(200000) {
            let decision = evaluate(debt, limit, &terms(dec!(1), dec!(10), 12)).unwrap();
            if let Decision::Rejected { reason, .. } = decision {
                assert!(!reason.low_credit_score);
                assert!(reason.limit_exceeded);
            }
            debt += dec!(2500);
        }
    }

    #[test]
    fn test_emi_standard_amortization() {
        let emi = monthly_installment(&terms(dec!(100000), dec!(10), 12)).unwrap();
        assert_eq!(emi, dec!(8791.59));
    }

    #[test]
    fn test_emi_zero_rate_is_linear() {
        let emi = monthly_installment(&terms(dec!(12000), dec!(0), 12)).unwrap();
        assert_eq!(emi, dec!(1000.00));
        assert_eq!(emi.to_string(), "1000.00");
    }

    #[test]
    fn test_emi_rounds_half_up() {
        // 100.05 / 2 = 50.025 → 50.03 (half-even이면 50.02)
        let emi = monthly_installment(&terms(dec!(100.05), dec!(0), 2)).unwrap();
        assert_eq!(emi, dec!(50.03));

        assert_eq!(round_money(dec!(10.004)), dec!(10.00));
        assert_eq!(round_money(dec!(10.015)), dec!(10.02));
    }

    #[test]
    fn test_single_month_loan_repays_principal_plus_interest() {
        // n = 1 → EMI = P × (1 + r)
        let emi = monthly_installment(&terms(dec!(1200), dec!(12), 1)).unwrap();
        assert_eq!(emi, dec!(1212.00));
    }

    #[test]
    fn test_exact_remaining_limit_is_approved() {
        let decision = evaluate(dec!(40000), dec!(100000), &terms(dec!(60000), dec!(10), 12)).unwrap();
        assert!(decision.is_approved());
        assert_eq!(decision.credit_score(), 100);
    }

    #[test]
    fn test_over_remaining_limit_is_rejected() {
        let decision =
            evaluate(dec!(40000), dec!(100000), &terms(dec!(60000.01), dec!(10), 12)).unwrap();
        match decision {
            Decision::Rejected { credit_score, reason } => {
                assert_eq!(credit_score, 100);
                assert!(reason.limit_exceeded);
                assert!(!reason.low_credit_score);
                assert_eq!(reason.message(), "Loan exceeds approved limit");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_approved_decision_carries_score_and_emi() {
        let decision = evaluate(dec!(60000), dec!(100000), &terms(dec!(12000), dec!(0), 12)).unwrap();
        assert_eq!(
            decision,
            Decision::Approved {
                credit_score: 80,
                monthly_installment: dec!(1000.00),
            }
        );
    }

    #[test]
    fn test_invalid_inputs_are_errors_not_rejections() {
        let limit = dec!(100000);
        assert!(matches!(
            evaluate(dec!(0), limit, &terms(dec!(0), dec!(10), 12)),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            evaluate(dec!(0), limit, &terms(dec!(-5), dec!(10), 12)),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            evaluate(dec!(0), limit, &terms(dec!(1000), dec!(10), 0)),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            evaluate(dec!(0), limit, &terms(dec!(1000), dec!(-1), 12)),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            evaluate(dec!(-1), limit, &terms(dec!(1000), dec!(10), 12)),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_invalid_input_wins_over_rejection() {
        // 한도 초과여도 입력 오류가 먼저
        let result = evaluate(dec!(0), dec!(0), &terms(dec!(1000), dec!(10), -3));
        assert!(result.is_err());
    }

    #[test]
    fn test_approved_limit_is_36_times_income() {
        assert_eq!(approved_limit_for(dec!(50000)).unwrap(), dec!(1800000));
        assert_eq!(approved_limit_for(dec!(0)).unwrap(), dec!(0));
        assert_eq!(
            approved_limit_for(MAX_MONTHLY_INCOME).unwrap(),
            dec!(359999999999999999.64)
        );
    }

    #[test]
    fn test_approved_limit_rejects_out_of_range_income() {
        assert!(matches!(
            approved_limit_for(Decimal::MAX),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(approved_limit_for(dec!(10000000000000000)).is_err());
        assert!(approved_limit_for(dec!(1000.005)).is_err());
    }

    #[test]
    fn test_amount_and_rate_must_fit_stored_precision() {
        let limit = dec!(100000);
        // 0.001은 NUMERIC(20, 2)에 저장하면 0.00이 됨
        assert!(matches!(
            evaluate(dec!(0), limit, &terms(dec!(0.001), dec!(10), 12)),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            evaluate(dec!(0), limit, &terms(dec!(1000), dec!(10.00005), 12)),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(evaluate(dec!(0), limit, &terms(dec!(1000), dec!(100000000), 12)).is_err());

        // 뒤쪽 0만 있는 경우는 허용
        let decision = evaluate(dec!(0), limit, &terms(dec!(1000.000), dec!(10.50000), 12)).unwrap();
        assert!(decision.is_approved());
        assert!(evaluate(dec!(0), limit, &terms(dec!(1000.01), dec!(10.1234), 12)).is_ok());
    }

    #[test]
    fn test_huge_emi_is_invalid_input_not_panic() {
        let result = monthly_installment(&terms(MAX_MONEY, MAX_INTEREST_RATE, 360));
        assert!(matches!(result, Err(EngineError::InvalidInput(_))));
    }

    #[test]
    fn test_rejection_messages() {
        let both = Rejection {
            low_credit_score: true,
            limit_exceeded: true,
        };
        assert_eq!(
            both.message(),
            "Credit score too low and loan exceeds approved limit"
        );
    }
}
