//! Bulk Import Service
//!
//! 기존 시스템에서 내보낸 CSV(고객/대출)를 장부에 적재.
//!
//! # Row Failure Policy
//!
//! 행 단위 best-effort:
//! - 참조하는 고객이 없는 대출 행 → 경고 로그 후 skip, 배치는 계속
//! - 파싱 불가 행 → 동일하게 skip
//! - CSV 자체를 읽을 수 없거나 저장소 오류 → 배치 중단

use std::collections::BTreeSet;
use std::io::Read;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::db::{CustomerStore, CustomerUpdate, Ledger, LedgerError, Loan, LoanStore, NewCustomer};
use crate::types::{CustomerId, LoanId};

/// Import 에러 (배치 중단)
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// 배치 결과
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// 고객 CSV 행
#[derive(Debug, Deserialize)]
struct CustomerRow {
    #[serde(rename = "Customer ID")]
    customer_id: CustomerId,
    #[serde(rename = "First Name")]
    first_name: String,
    #[serde(rename = "Last Name")]
    last_name: String,
    #[serde(rename = "Age")]
    age: i32,
    #[serde(rename = "Phone Number")]
    phone_number: String,
    #[serde(rename = "Monthly Salary")]
    monthly_salary: Decimal,
    #[serde(rename = "Approved Limit")]
    approved_limit: Decimal,
    #[serde(rename = "Current Debt", default)]
    current_debt: Option<Decimal>,
}

/// 대출 CSV 행 (그 외 컬럼은 무시)
#[derive(Debug, Deserialize)]
struct LoanRow {
    #[serde(rename = "Customer ID")]
    customer_id: CustomerId,
    #[serde(rename = "Loan ID")]
    loan_id: LoanId,
    #[serde(rename = "Loan Amount")]
    loan_amount: Decimal,
    #[serde(rename = "Tenure")]
    tenure: i32,
    #[serde(rename = "Interest Rate")]
    interest_rate: Decimal,
    #[serde(rename = "Monthly payment")]
    monthly_payment: Decimal,
    #[serde(rename = "Date of Approval")]
    date_of_approval: String,
    #[serde(rename = "End Date", default)]
    end_date: Option<String>,
}

/// CSV 적재기
pub struct BulkImporter {
    ledger: Arc<dyn Ledger>,
}

impl BulkImporter {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    /// 고객 적재 (get-or-create)
    ///
    /// 이미 존재하는 id는 건드리지 않고 skip으로 집계.
    pub async fn import_customers<R: Read>(&self, reader: R) -> Result<ImportReport, ImportError> {
        let mut report = ImportReport::default();
        let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

        for (index, result) in csv.deserialize::<CustomerRow>().enumerate() {
            let row = match result {
                Ok(row) => row,
                Err(err) if err.is_io_error() => return Err(err.into()),
                Err(err) => {
                    tracing::warn!(row = index + 1, error = %err, "Skipping unreadable customer row");
                    report.skipped += 1;
                    continue;
                }
            };

            if self.ledger.get_customer(row.customer_id).await?.is_some() {
                report.skipped += 1;
                continue;
            }

            self.ledger
                .create_customer(NewCustomer {
                    id: Some(row.customer_id),
                    first_name: row.first_name,
                    last_name: row.last_name,
                    age: row.age,
                    monthly_income: row.monthly_salary,
                    phone_number: row.phone_number,
                    approved_limit: Some(row.approved_limit),
                    current_debt: row.current_debt.unwrap_or(Decimal::ZERO),
                })
                .await?;
            report.inserted += 1;
        }

        tracing::info!(
            inserted = report.inserted,
            skipped = report.skipped,
            "Customer import finished"
        );
        Ok(report)
    }

    /// 대출 적재 (update-or-create, 모두 승인 상태)
    ///
    /// 적재 후 영향받은 고객의 `current_debt`를 승인 대출 합계로 재계산.
    /// 다른 고객으로 옮겨진 대출은 이전 고객도 재계산 대상.
    /// 배치가 중간에 실패해도 이미 반영된 고객은 재계산한 뒤 에러를 반환.
    pub async fn import_loans<R: Read>(&self, reader: R) -> Result<ImportReport, ImportError> {
        let mut report = ImportReport::default();
        let mut touched = BTreeSet::new();

        let loaded = self.upsert_loan_rows(reader, &mut report, &mut touched).await;
        let rederived = self.rederive_debt(&touched).await;
        loaded?;
        rederived?;

        tracing::info!(
            inserted = report.inserted,
            updated = report.updated,
            skipped = report.skipped,
            customers = touched.len(),
            "Loan import finished"
        );
        Ok(report)
    }

    async fn upsert_loan_rows<R: Read>(
        &self,
        reader: R,
        report: &mut ImportReport,
        touched: &mut BTreeSet<CustomerId>,
    ) -> Result<(), ImportError> {
        let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

        for (index, result) in csv.deserialize::<LoanRow>().enumerate() {
            let row = match result {
                Ok(row) => row,
                Err(err) if err.is_io_error() => return Err(err.into()),
                Err(err) => {
                    tracing::warn!(row = index + 1, error = %err, "Skipping unreadable loan row");
                    report.skipped += 1;
                    continue;
                }
            };

            if self.ledger.get_customer(row.customer_id).await?.is_none() {
                tracing::warn!(
                    loan_id = row.loan_id,
                    customer_id = row.customer_id,
                    "Customer not found, skipping loan"
                );
                report.skipped += 1;
                continue;
            }

            let loan = match row.into_loan() {
                Ok(loan) => loan,
                Err(reason) => {
                    tracing::warn!(row = index + 1, %reason, "Skipping invalid loan row");
                    report.skipped += 1;
                    continue;
                }
            };

            let previous = self.ledger.get_loan(loan.id).await?;
            if let Some(previous) = &previous {
                touched.insert(previous.customer_id);
            }
            touched.insert(loan.customer_id);
            self.ledger.upsert_loan(loan).await?;

            if previous.is_some() {
                report.updated += 1;
            } else {
                report.inserted += 1;
            }
        }

        Ok(())
    }

    /// `current_debt` = 승인 대출 원금 합계
    async fn rederive_debt(&self, customers: &BTreeSet<CustomerId>) -> Result<(), ImportError> {
        for &customer_id in customers {
            let debt = self.ledger.sum_approved_loan_amount(customer_id).await?;
            self.ledger
                .update_customer(
                    customer_id,
                    CustomerUpdate {
                        current_debt: Some(debt),
                        ..Default::default()
                    },
                )
                .await?;
        }
        Ok(())
    }
}

impl LoanRow {
    fn into_loan(self) -> Result<Loan, String> {
        if self.tenure <= 0 {
            return Err(format!("tenure must be positive, got {}", self.tenure));
        }
        let start_date = parse_date(&self.date_of_approval)?;
        let end_date = match self.end_date.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(parse_date(raw)?),
        };

        Ok(Loan {
            id: self.loan_id,
            customer_id: self.customer_id,
            loan_amount: self.loan_amount,
            interest_rate: self.interest_rate,
            tenure: self.tenure,
            monthly_repayment: self.monthly_payment,
            is_approved: true,
            start_date,
            end_date,
        })
    }
}

/// 스프레드시트 export에서 흔한 날짜 형식들
fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    // "2022-03-17 00:00:00" 같은 timestamp 형식은 날짜 부분만 사용
    let date_part = raw.split_whitespace().next().unwrap_or(raw);
    ["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
        .ok_or_else(|| format!("unrecognised date '{}'", raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryLedger;
    use rust_decimal_macros::dec;

    const CUSTOMERS: &str = "\
Customer ID,First Name,Last Name,Age,Phone Number,Monthly Salary,Approved Limit
1,Aaron,Garcia,63,9629317944,300000,10800000
2,Adna,Cruz,41,9607112867,48000,1700000
";

    const LOANS: &str = "\
Customer ID,Loan ID,Loan Amount,Tenure,Interest Rate,Monthly payment,EMIs paid on Time,Date of Approval,End Date
1,7798,900000,138,16.06,39978,95,2019-12-28,2031-06-28
1,1210,300000,12,10,26375,12,2022-03-17 00:00:00,
2,5001,50000,24,8.5,2273,10,17/03/2022,17/03/2024
99,4242,1000,12,10,88,12,2022-01-01,2023-01-01
";

    async fn importer_with_customers() -> (BulkImporter, Arc<MemoryLedger>) {
        let ledger = Arc::new(MemoryLedger::new());
        let importer = BulkImporter::new(ledger.clone());
        importer.import_customers(CUSTOMERS.as_bytes()).await.unwrap();
        (importer, ledger)
    }

    #[tokio::test]
    async fn test_import_customers_keeps_ids_and_limits() {
        let (importer, ledger) = importer_with_customers().await;

        let customer = ledger.get_customer(2).await.unwrap().unwrap();
        assert_eq!(customer.full_name(), "Adna Cruz");
        // import 값은 그대로 (36배 규칙 적용 안 함)
        assert_eq!(customer.approved_limit, dec!(1700000));
        assert_eq!(customer.current_debt, dec!(0));

        // 두 번째 실행은 모두 skip
        let report = importer.import_customers(CUSTOMERS.as_bytes()).await.unwrap();
        assert_eq!(report, ImportReport { inserted: 0, updated: 0, skipped: 2 });
    }

    #[tokio::test]
    async fn test_import_loans_skips_missing_customer_and_continues() {
        let (importer, ledger) = importer_with_customers().await;

        let report = importer.import_loans(LOANS.as_bytes()).await.unwrap();
        assert_eq!(report, ImportReport { inserted: 3, updated: 0, skipped: 1 });

        assert!(ledger.get_loan(4242).await.unwrap().is_none());

        let loan = ledger.get_loan(1210).await.unwrap().unwrap();
        assert!(loan.is_approved);
        assert_eq!(loan.start_date, NaiveDate::from_ymd_opt(2022, 3, 17).unwrap());
        assert_eq!(loan.end_date, None);

        let loan = ledger.get_loan(5001).await.unwrap().unwrap();
        assert_eq!(loan.end_date, NaiveDate::from_ymd_opt(2024, 3, 17));
    }

    #[tokio::test]
    async fn test_import_loans_rederives_current_debt() {
        let (importer, ledger) = importer_with_customers().await;
        importer.import_loans(LOANS.as_bytes()).await.unwrap();

        let customer = ledger.get_customer(1).await.unwrap().unwrap();
        assert_eq!(customer.current_debt, dec!(1200000));
        assert_eq!(
            ledger.sum_approved_loan_amount(1).await.unwrap(),
            customer.current_debt
        );
    }

    #[tokio::test]
    async fn test_reimporting_loans_updates_in_place() {
        let (importer, ledger) = importer_with_customers().await;
        importer.import_loans(LOANS.as_bytes()).await.unwrap();

        let report = importer.import_loans(LOANS.as_bytes()).await.unwrap();
        assert_eq!(report, ImportReport { inserted: 0, updated: 3, skipped: 1 });
        assert_eq!(ledger.list_loans_by_customer(1).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unreadable_rows_are_skipped() {
        let (importer, _ledger) = importer_with_customers().await;
        let loans = "\
Customer ID,Loan ID,Loan Amount,Tenure,Interest Rate,Monthly payment,Date of Approval,End Date
1,10,not-a-number,12,10,100,2022-01-01,
1,11,1000,12,10,88,yesterday,
1,12,1000,12,10,88,2022-01-01,
";
        let report = importer.import_loans(loans.as_bytes()).await.unwrap();
        assert_eq!(report, ImportReport { inserted: 1, updated: 0, skipped: 2 });
    }

    #[tokio::test]
    async fn test_moving_loan_to_another_customer_rederives_both() {
        let (importer, ledger) = importer_with_customers().await;
        let header = "Customer ID,Loan ID,Loan Amount,Tenure,Interest Rate,Monthly payment,Date of Approval,End Date\n";

        let first = format!("{}1,50,40000,12,10,3516,2022-01-01,\n", header);
        importer.import_loans(first.as_bytes()).await.unwrap();
        assert_eq!(ledger.get_customer(1).await.unwrap().unwrap().current_debt, dec!(40000));

        let moved = format!("{}2,50,40000,12,10,3516,2022-01-01,\n", header);
        let report = importer.import_loans(moved.as_bytes()).await.unwrap();
        assert_eq!(report, ImportReport { inserted: 0, updated: 1, skipped: 0 });

        for id in [1, 2] {
            let customer = ledger.get_customer(id).await.unwrap().unwrap();
            assert_eq!(
                ledger.sum_approved_loan_amount(id).await.unwrap(),
                customer.current_debt
            );
        }
        assert_eq!(ledger.get_customer(1).await.unwrap().unwrap().current_debt, dec!(0));
        assert_eq!(ledger.get_customer(2).await.unwrap().unwrap().current_debt, dec!(40000));
    }

    /// 앞부분을 다 읽은 뒤 I/O 에러를 내는 reader
    struct BrokenSource;

    impl Read for BrokenSource {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "connection reset"))
        }
    }

    #[tokio::test]
    async fn test_failed_batch_still_rederives_loaded_customers() {
        let (importer, ledger) = importer_with_customers().await;
        let loans = "\
Customer ID,Loan ID,Loan Amount,Tenure,Interest Rate,Monthly payment,Date of Approval,End Date
1,60,25000,12,10,2198,2022-01-01,
1,61,5000,12,10,440,2022-02-01,
";
        let result = importer
            .import_loans(loans.as_bytes().chain(BrokenSource))
            .await;
        assert!(matches!(result, Err(ImportError::Csv(_))));

        let customer = ledger.get_customer(1).await.unwrap().unwrap();
        assert_eq!(ledger.list_loans_by_customer(1).await.unwrap().len(), 2);
        assert_eq!(customer.current_debt, dec!(30000));
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2022, 3, 17).unwrap();
        assert_eq!(parse_date("2022-03-17").unwrap(), expected);
        assert_eq!(parse_date("2022-03-17 00:00:00").unwrap(), expected);
        assert_eq!(parse_date("17/03/2022").unwrap(), expected);
        assert!(parse_date("tomorrow").is_err());
    }
}
