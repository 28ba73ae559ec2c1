//! CSV ingest for training data and applicant batches.
//!
//! - **Strict schema**: every feature column (plus `Loan_Status` for training)
//!   must be present in the header, matched case-insensitively.
//! - **Row-level validation**: bad rows are skipped and reported with their
//!   line number; they never abort the whole load.
//! - Empty cells and `NA`/`NaN` markers are missing values. Training rows keep
//!   them as `None` for imputation; applicant rows must be complete.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::warn;

use crate::domain::{
    ApplicantRecord, Feature, FinancialContext, Label, RawRecord, ScoringRequest, TrainingRow,
};
use crate::error::{AppError, ScoringError};

pub const LABEL_COLUMN: &str = "Loan_Status";
pub const ID_COLUMN: &str = "Loan_ID";
pub const EXISTING_DEBT_COLUMN: &str = "Existing_Debt";
pub const INTEREST_RATE_COLUMN: &str = "Interest_Rate";

const MISSING_MARKERS: [&str; 4] = ["na", "nan", "null", "none"];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub id: Option<String>,
    pub message: String,
}

/// Parsed training rows plus what was skipped.
#[derive(Debug, Clone)]
pub struct TrainingData {
    pub rows: Vec<TrainingRow>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

impl TrainingData {
    pub fn rows_used(&self) -> usize {
        self.rows.len()
    }
}

/// Parsed applicant batch plus what was skipped.
#[derive(Debug, Clone)]
pub struct ApplicantBatch {
    pub requests: Vec<ScoringRequest>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load a labeled training CSV from disk.
pub fn load_training_csv(path: &Path) -> Result<TrainingData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    Ok(read_training_rows(file)?)
}

/// Load an applicant batch CSV from disk.
pub fn load_applicants_csv(path: &Path, defaults: FinancialContext) -> Result<ApplicantBatch, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    Ok(read_applicants(file, defaults)?)
}

/// Parse labeled rows from any reader.
pub fn read_training_rows<R: Read>(source: R) -> Result<TrainingData, ScoringError> {
    let mut reader = csv_reader(source);
    let header_map = read_header_map(&mut reader)?;
    ensure_columns(&header_map, Feature::ALL.iter().map(|f| f.column()))?;
    ensure_columns(&header_map, [LABEL_COLUMN])?;

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    id: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let id = get_optional(&record, &header_map, ID_COLUMN).map(str::to_string);
        match parse_training_row(&record, &header_map) {
            Ok(row) => rows.push(row),
            Err(message) => row_errors.push(RowError { line, id, message }),
        }
    }

    report_skipped("training", &row_errors);
    if rows.is_empty() {
        return Err(ScoringError::EmptyDataset(format!(
            "no valid training rows ({rows_read} read, {} rejected)",
            row_errors.len()
        )));
    }

    Ok(TrainingData {
        rows,
        row_errors,
        rows_read,
    })
}

/// Parse complete applicant rows from any reader.
///
/// `Existing_Debt` and `Interest_Rate` columns are optional; blank cells fall
/// back to `defaults`.
pub fn read_applicants<R: Read>(
    source: R,
    defaults: FinancialContext,
) -> Result<ApplicantBatch, ScoringError> {
    let mut reader = csv_reader(source);
    let header_map = read_header_map(&mut reader)?;
    ensure_columns(&header_map, Feature::ALL.iter().map(|f| f.column()))?;

    let mut requests = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    id: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let id = get_optional(&record, &header_map, ID_COLUMN).map(str::to_string);
        match parse_applicant_row(&record, &header_map, defaults) {
            Ok((applicant, context)) => requests.push(ScoringRequest {
                id: Some(id.unwrap_or_else(|| format!("row-{line}"))),
                applicant,
                context,
            }),
            Err(message) => row_errors.push(RowError { line, id, message }),
        }
    }

    report_skipped("applicant", &row_errors);
    if requests.is_empty() {
        return Err(ScoringError::EmptyDataset(format!(
            "no valid applicant rows ({rows_read} read, {} rejected)",
            row_errors.len()
        )));
    }

    Ok(ApplicantBatch {
        requests,
        row_errors,
        rows_read,
    })
}

fn csv_reader<R: Read>(source: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source)
}

fn read_header_map<R: Read>(reader: &mut csv::Reader<R>) -> Result<HashMap<String, usize>, ScoringError> {
    let headers = reader
        .headers()
        .map_err(|e| ScoringError::MissingData {
            column: format!("<header row: {e}>"),
        })?
        .clone();
    Ok(build_header_map(&headers))
}

fn report_skipped(kind: &str, row_errors: &[RowError]) {
    if row_errors.is_empty() {
        return;
    }
    warn!(kind, skipped = row_errors.len(), "skipped invalid CSV rows");
    for err in row_errors {
        warn!(line = err.line, id = err.id.as_deref().unwrap_or("-"), "{}", err.message);
    }
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn ensure_columns<'a>(
    header_map: &HashMap<String, usize>,
    columns: impl IntoIterator<Item = &'a str>,
) -> Result<(), ScoringError> {
    for column in columns {
        if !header_map.contains_key(&column.to_ascii_lowercase()) {
            return Err(ScoringError::MissingData {
                column: column.to_string(),
            });
        }
    }
    Ok(())
}

fn parse_training_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<TrainingRow, String> {
    let status = get_optional(record, header_map, LABEL_COLUMN)
        .ok_or_else(|| format!("Missing `{LABEL_COLUMN}` value."))?;
    let label = Label::from_status(status)
        .ok_or_else(|| format!("Invalid `{LABEL_COLUMN}` '{status}' (expected Y or N)."))?;

    let cat = |feature: Feature| get_optional(record, header_map, feature.column()).map(str::to_string);
    let num = |feature: Feature| parse_opt_f64(get_optional(record, header_map, feature.column()), feature.column());

    let raw = RawRecord {
        gender: cat(Feature::Gender),
        married: cat(Feature::Married),
        dependents: cat(Feature::Dependents),
        education: cat(Feature::Education),
        self_employed: cat(Feature::SelfEmployed),
        applicant_income: num(Feature::ApplicantIncome)?,
        coapplicant_income: num(Feature::CoapplicantIncome)?,
        loan_amount: num(Feature::LoanAmount)?,
        loan_amount_term: num(Feature::LoanAmountTerm)?,
        credit_history: num(Feature::CreditHistory)?,
        property_area: cat(Feature::PropertyArea),
    };
    Ok(TrainingRow { record: raw, label })
}

fn parse_applicant_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    defaults: FinancialContext,
) -> Result<(ApplicantRecord, FinancialContext), String> {
    let cat = |feature: Feature| get_required(record, header_map, feature.column()).map(str::to_string);
    let num = |feature: Feature| -> Result<f64, String> {
        let column = feature.column();
        parse_opt_f64(Some(get_required(record, header_map, column)?), column)?
            .ok_or_else(|| format!("Missing required value: `{column}`"))
    };

    let applicant = ApplicantRecord {
        gender: cat(Feature::Gender)?,
        married: cat(Feature::Married)?,
        dependents: cat(Feature::Dependents)?,
        education: cat(Feature::Education)?,
        self_employed: cat(Feature::SelfEmployed)?,
        applicant_income: num(Feature::ApplicantIncome)?,
        coapplicant_income: num(Feature::CoapplicantIncome)?,
        loan_amount: num(Feature::LoanAmount)?,
        loan_amount_term: num(Feature::LoanAmountTerm)?,
        credit_history: num(Feature::CreditHistory)?,
        property_area: cat(Feature::PropertyArea)?,
    };

    let existing_debt = parse_opt_f64(get_optional(record, header_map, EXISTING_DEBT_COLUMN), EXISTING_DEBT_COLUMN)?
        .unwrap_or(defaults.existing_debt);
    let annual_interest_rate_pct =
        parse_opt_f64(get_optional(record, header_map, INTEREST_RATE_COLUMN), INTEREST_RATE_COLUMN)?
            .unwrap_or(defaults.annual_interest_rate_pct);

    Ok((
        applicant,
        FinancialContext {
            existing_debt,
            annual_interest_rate_pct,
        },
    ))
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    get_optional(record, header_map, name).ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(&name.to_ascii_lowercase())?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty() && !is_missing_marker(s))
}

fn is_missing_marker(s: &str) -> bool {
    MISSING_MARKERS.iter().any(|m| s.eq_ignore_ascii_case(m))
}

/// Missing stays `None`; present but unparseable is a row error.
fn parse_opt_f64(s: Option<&str>, column: &str) -> Result<Option<f64>, String> {
    let Some(s) = s else { return Ok(None) };
    let v = s
        .parse::<f64>()
        .map_err(|_| format!("Invalid number '{s}' in `{column}`."))?;
    if !v.is_finite() {
        return Err(format!("Non-finite value '{s}' in `{column}`."));
    }
    // Every numeric column (incomes, amounts, term, flags, debt, rate) is >= 0.
    if v < 0.0 {
        return Err(format!("Negative value '{s}' in `{column}`."));
    }
    Ok(Some(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Loan_ID,Gender,Married,Dependents,Education,Self_Employed,ApplicantIncome,CoapplicantIncome,LoanAmount,Loan_Amount_Term,Credit_History,Property_Area,Loan_Status";

    #[test]
    fn reads_rows_and_keeps_missing_cells() {
        let csv = format!(
            "{HEADER}\n\
             LP001,Male,No,0,Graduate,No,5849,0,,360,1,Urban,Y\n\
             LP002,Female,Yes,3+,Not Graduate,NA,4583,1508,128,360,NaN,Rural,N\n"
        );
        let data = read_training_rows(csv.as_bytes()).unwrap();
        assert_eq!(data.rows_read, 2);
        assert_eq!(data.rows_used(), 2);
        assert!(data.row_errors.is_empty());

        let first = &data.rows[0];
        assert_eq!(first.label, Label::Approve);
        assert_eq!(first.record.loan_amount, None);
        assert_eq!(first.record.applicant_income, Some(5849.0));

        let second = &data.rows[1];
        assert_eq!(second.label, Label::Reject);
        assert_eq!(second.record.dependents.as_deref(), Some("3+"));
        assert_eq!(second.record.self_employed, None);
        assert_eq!(second.record.credit_history, None);
    }

    #[test]
    fn bad_rows_are_reported_not_fatal() {
        let csv = format!(
            "{HEADER}\n\
             LP001,Male,No,0,Graduate,No,abc,0,100,360,1,Urban,Y\n\
             LP002,Male,No,0,Graduate,No,4000,0,100,360,1,Urban,Maybe\n\
             LP003,Male,No,0,Graduate,No,4000,0,100,360,1,Urban,N\n"
        );
        let data = read_training_rows(csv.as_bytes()).unwrap();
        assert_eq!(data.rows_used(), 1);
        assert_eq!(data.row_errors.len(), 2);
        assert_eq!(data.row_errors[0].line, 2);
        assert_eq!(data.row_errors[0].id.as_deref(), Some("LP001"));
        assert!(data.row_errors[0].message.contains("ApplicantIncome"));
        assert_eq!(data.row_errors[1].line, 3);
    }

    #[test]
    fn negative_amounts_are_row_errors() {
        let csv = format!(
            "{HEADER}\n\
             LP001,Male,No,0,Graduate,No,-5,0,100,360,1,Urban,Y\n\
             LP002,Male,No,0,Graduate,No,4000,0,100,360,1,Urban,N\n"
        );
        let data = read_training_rows(csv.as_bytes()).unwrap();
        assert_eq!(data.rows_used(), 1);
        assert_eq!(data.row_errors.len(), 1);
        assert_eq!(data.row_errors[0].line, 2);
        assert!(data.row_errors[0].message.contains("Negative value '-5' in `ApplicantIncome`"));

        let applicants = "Gender,Married,Dependents,Education,Self_Employed,ApplicantIncome,CoapplicantIncome,LoanAmount,Loan_Amount_Term,Credit_History,Property_Area,Existing_Debt\n\
                          Male,Yes,0,Graduate,No,5000,0,100,360,1,Urban,-1\n\
                          Male,Yes,0,Graduate,No,5000,0,100,360,1,Urban,0\n";
        let batch = read_applicants(applicants.as_bytes(), FinancialContext::default()).unwrap();
        assert_eq!(batch.requests.len(), 1);
        assert_eq!(batch.row_errors[0].line, 2);
        assert!(batch.row_errors[0].message.contains("Existing_Debt"));
    }

    #[test]
    fn header_matching_ignores_case_and_bom() {
        let csv = "\u{feff}gender,MARRIED,dependents,education,self_employed,applicantincome,\
                   coapplicantincome,loanamount,loan_amount_term,credit_history,property_area,loan_status\n\
                   Male,Yes,1,Graduate,No,3000,0,66,360,1,Urban,Y\n";
        let data = read_training_rows(csv.as_bytes()).unwrap();
        assert_eq!(data.rows[0].record.gender.as_deref(), Some("Male"));
    }

    #[test]
    fn missing_column_is_missing_data() {
        let csv = "Gender,Married,Loan_Status\nMale,Yes,Y\n";
        let err = read_training_rows(csv.as_bytes()).unwrap_err();
        assert_eq!(
            err,
            ScoringError::MissingData {
                column: "Dependents".to_string()
            }
        );
    }

    #[test]
    fn no_valid_rows_is_empty_dataset() {
        let csv = format!("{HEADER}\nLP1,Male,No,0,Graduate,No,1,0,1,360,1,Urban,?\n");
        assert!(matches!(
            read_training_rows(csv.as_bytes()),
            Err(ScoringError::EmptyDataset(_))
        ));
    }

    #[test]
    fn applicant_batch_uses_optional_context_columns() {
        let csv = "Loan_ID,Gender,Married,Dependents,Education,Self_Employed,ApplicantIncome,CoapplicantIncome,LoanAmount,Loan_Amount_Term,Credit_History,Property_Area,Existing_Debt,Interest_Rate\n\
                   A1,Male,Yes,0,Graduate,No,5000,0,100,360,1,Urban,250,9.5\n\
                   A2,Female,No,1,Graduate,No,4000,500,80,360,1,Rural,,\n\
                   A3,Female,No,1,Graduate,No,,500,80,360,1,Rural,,\n";
        let batch = read_applicants(csv.as_bytes(), FinancialContext::default()).unwrap();
        assert_eq!(batch.rows_read, 3);
        assert_eq!(batch.requests.len(), 2);
        assert_eq!(batch.row_errors.len(), 1);
        assert_eq!(batch.row_errors[0].line, 4);

        let first = &batch.requests[0];
        assert_eq!(first.id.as_deref(), Some("A1"));
        assert_eq!(first.context.existing_debt, 250.0);
        assert_eq!(first.context.annual_interest_rate_pct, 9.5);

        let second = &batch.requests[1];
        assert_eq!(second.context, FinancialContext::default());
        assert_eq!(second.applicant.coapplicant_income, 500.0);
    }
}
