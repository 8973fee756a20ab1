//! API Routes Module
//!
//! 모든 HTTP 엔드포인트 정의
//!
//! # Routes
//! - `/health` - 헬스 체크
//! - `/register` - 고객 등록
//! - `/check-eligibility` - 대출 적격성 판정
//! - `/create-loan` - 대출 발행
//! - `/view-loan/:loan_id`, `/view-loans/:customer_id` - 대출 조회

pub mod customer;
pub mod health;
pub mod loan;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;

/// 라우터 생성
///
/// # Route Structure
///
/// ```text
/// GET  /health                    - 서버 상태 확인
///
/// POST /register                  - 고객 등록 (승인 한도 = 소득 × 36)
/// POST /check-eligibility         - 적격성 판정 (저장 없음)
/// POST /create-loan               - 대출 발행
///
/// GET  /view-loan/:loan_id        - 대출 단건 조회
/// GET  /view-loans/:customer_id   - 고객별 대출 목록
/// ```
pub fn router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))

        // Customer
        .route("/register", post(customer::register_customer))

        // Loan
        .route("/check-eligibility", post(loan::check_eligibility))
        .route("/create-loan", post(loan::create_loan))
        .route("/view-loan/:loan_id", get(loan::view_loan))
        .route("/view-loans/:customer_id", get(loan::view_loans))

        // 미들웨어
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state))

        // 상태 주입
        .with_state(state)
}

/// CORS 설정
///
/// 프로덕션: `ALLOWED_ORIGINS`에 명시된 도메인만 허용
/// 개발: localhost 허용
fn cors_layer(state: &AppState) -> CorsLayer {
    if state.config.is_production() {
        let origins: Vec<HeaderValue> = state
            .config
            .allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(%origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE])
    } else {
        CorsLayer::new()
            .allow_origin([
                HeaderValue::from_static("http://localhost:5173"),  // Vite dev server
                HeaderValue::from_static("http://localhost:3000"),  // Alternative
                HeaderValue::from_static("http://127.0.0.1:5173"),
            ])
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
