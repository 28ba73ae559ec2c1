//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - used in-memory during training and scoring
//! - printed by the report layer
//! - exported to JSON

use serde::{Deserialize, Serialize};

/// One input feature, in the fixed order used by every feature vector.
///
/// The order matches the training CSV columns after dropping `Loan_ID` and
/// `Loan_Status`. Training rows and live queries both go through
/// [`Feature::ALL`], so the order cannot drift between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Feature {
    Gender,
    Married,
    Dependents,
    Education,
    SelfEmployed,
    ApplicantIncome,
    CoapplicantIncome,
    LoanAmount,
    LoanAmountTerm,
    CreditHistory,
    PropertyArea,
}

impl Feature {
    pub const ALL: [Feature; 11] = [
        Feature::Gender,
        Feature::Married,
        Feature::Dependents,
        Feature::Education,
        Feature::SelfEmployed,
        Feature::ApplicantIncome,
        Feature::CoapplicantIncome,
        Feature::LoanAmount,
        Feature::LoanAmountTerm,
        Feature::CreditHistory,
        Feature::PropertyArea,
    ];

    pub const CATEGORICAL: [Feature; 6] = [
        Feature::Gender,
        Feature::Married,
        Feature::Dependents,
        Feature::Education,
        Feature::SelfEmployed,
        Feature::PropertyArea,
    ];

    /// Column header used by the dataset.
    pub fn column(self) -> &'static str {
        match self {
            Feature::Gender => "Gender",
            Feature::Married => "Married",
            Feature::Dependents => "Dependents",
            Feature::Education => "Education",
            Feature::SelfEmployed => "Self_Employed",
            Feature::ApplicantIncome => "ApplicantIncome",
            Feature::CoapplicantIncome => "CoapplicantIncome",
            Feature::LoanAmount => "LoanAmount",
            Feature::LoanAmountTerm => "Loan_Amount_Term",
            Feature::CreditHistory => "Credit_History",
            Feature::PropertyArea => "Property_Area",
        }
    }

    pub fn is_categorical(self) -> bool {
        Feature::CATEGORICAL.contains(&self)
    }

    /// Position of this feature inside a feature vector.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

/// Binary class label. `Loan_Status` `Y` maps to `Approve`, `N` to `Reject`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Reject = 0,
    Approve = 1,
}

impl Label {
    pub fn from_status(status: &str) -> Option<Label> {
        match status.trim() {
            "Y" | "y" => Some(Label::Approve),
            "N" | "n" => Some(Label::Reject),
            _ => None,
        }
    }

    pub fn as_index(self) -> usize {
        self as usize
    }

    /// `+1` / `-1` target used by margin classifiers.
    pub fn sign(self) -> f64 {
        match self {
            Label::Approve => 1.0,
            Label::Reject => -1.0,
        }
    }
}

/// Two-class probability distribution (`reject + approve == 1`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    pub reject: f64,
    pub approve: f64,
}

impl ClassProbabilities {
    pub fn from_approve(p_approve: f64) -> Self {
        let approve = p_approve.clamp(0.0, 1.0);
        Self {
            reject: 1.0 - approve,
            approve,
        }
    }

    pub fn of(&self, label: Label) -> f64 {
        match label {
            Label::Approve => self.approve,
            Label::Reject => self.reject,
        }
    }
}

/// A raw dataset row. Any cell may be missing before imputation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub gender: Option<String>,
    pub married: Option<String>,
    pub dependents: Option<String>,
    pub education: Option<String>,
    pub self_employed: Option<String>,
    pub applicant_income: Option<f64>,
    pub coapplicant_income: Option<f64>,
    pub loan_amount: Option<f64>,
    pub loan_amount_term: Option<f64>,
    pub credit_history: Option<f64>,
    pub property_area: Option<String>,
}

impl RawRecord {
    pub fn categorical(&self, feature: Feature) -> Option<&str> {
        let value = match feature {
            Feature::Gender => &self.gender,
            Feature::Married => &self.married,
            Feature::Dependents => &self.dependents,
            Feature::Education => &self.education,
            Feature::SelfEmployed => &self.self_employed,
            Feature::PropertyArea => &self.property_area,
            _ => return None,
        };
        value.as_deref()
    }

    pub fn numeric(&self, feature: Feature) -> Option<f64> {
        match feature {
            Feature::ApplicantIncome => self.applicant_income,
            Feature::CoapplicantIncome => self.coapplicant_income,
            Feature::LoanAmount => self.loan_amount,
            Feature::LoanAmountTerm => self.loan_amount_term,
            Feature::CreditHistory => self.credit_history,
            _ => None,
        }
    }
}

/// A labelled training row.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRow {
    pub record: RawRecord,
    pub label: Label,
}

/// A complete applicant record (no missing values).
///
/// Categorical fields hold the original labels (`"Male"`, `"3+"`, `"Semiurban"`...);
/// the preprocessor validates them against the training-time encodings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicantRecord {
    pub gender: String,
    pub married: String,
    pub dependents: String,
    pub education: String,
    pub self_employed: String,
    /// Monthly income.
    pub applicant_income: f64,
    /// Monthly income.
    pub coapplicant_income: f64,
    /// Loan amount in thousands.
    pub loan_amount: f64,
    /// Term in months.
    pub loan_amount_term: f64,
    /// 1.0 = meets guidelines, 0.0 = does not.
    pub credit_history: f64,
    pub property_area: String,
}

impl ApplicantRecord {
    pub fn categorical(&self, feature: Feature) -> Option<&str> {
        match feature {
            Feature::Gender => Some(&self.gender),
            Feature::Married => Some(&self.married),
            Feature::Dependents => Some(&self.dependents),
            Feature::Education => Some(&self.education),
            Feature::SelfEmployed => Some(&self.self_employed),
            Feature::PropertyArea => Some(&self.property_area),
            _ => None,
        }
    }

    pub fn numeric(&self, feature: Feature) -> Option<f64> {
        match feature {
            Feature::ApplicantIncome => Some(self.applicant_income),
            Feature::CoapplicantIncome => Some(self.coapplicant_income),
            Feature::LoanAmount => Some(self.loan_amount),
            Feature::LoanAmountTerm => Some(self.loan_amount_term),
            Feature::CreditHistory => Some(self.credit_history),
            _ => None,
        }
    }

    /// Human-readable value of a feature (original label for categoricals).
    pub fn display_value(&self, feature: Feature) -> String {
        match self.categorical(feature) {
            Some(label) => label.to_string(),
            None => self
                .numeric(feature)
                .map(|v| format!("{v}"))
                .unwrap_or_default(),
        }
    }
}

/// Financial context supplied with a scoring request, not part of the model input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinancialContext {
    /// Existing monthly debt payments.
    pub existing_debt: f64,
    /// Annual interest rate in percent (e.g. `8.5`).
    pub annual_interest_rate_pct: f64,
}

impl Default for FinancialContext {
    fn default() -> Self {
        Self {
            existing_debt: 0.0,
            annual_interest_rate_pct: 8.5,
        }
    }
}

/// One scoring request: applicant plus financial context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringRequest {
    /// Free-form identifier carried through batch scoring.
    pub id: Option<String>,
    pub applicant: ApplicantRecord,
    pub context: FinancialContext,
}

/// Output of the financial feasibility evaluator.
///
/// Ratios are percentages and are `f64::INFINITY` when total income is zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeasibilityResult {
    pub monthly_emi: f64,
    pub total_income: f64,
    pub loan_to_income_ratio: f64,
    pub debt_to_income_ratio: f64,
    /// EMI as a share of total income (0..).
    pub emi_income_share: f64,
    pub loan_to_income_ok: bool,
    pub debt_to_income_ok: bool,
    pub affordable: bool,
    pub financially_feasible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactDirection {
    Positive,
    Negative,
}

impl ImpactDirection {
    pub fn of(impact: f64) -> Self {
        if impact > 0.0 {
            ImpactDirection::Positive
        } else {
            ImpactDirection::Negative
        }
    }

    pub fn verb(self) -> &'static str {
        match self {
            ImpactDirection::Positive => "positively",
            ImpactDirection::Negative => "negatively",
        }
    }
}

/// Local linear contribution of one feature to a single prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImpact {
    pub feature: Feature,
    /// `scaled_value * weight`.
    pub impact: f64,
    pub direction: ImpactDirection,
    /// Original (pre-encoding) value for display.
    pub display_value: String,
}

/// Which sub-verdict(s) drove the final decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    Approved,
    RejectedByModel,
    RejectedByAffordability,
    RejectedByBoth,
}

impl DecisionOutcome {
    pub fn display_name(self) -> &'static str {
        match self {
            DecisionOutcome::Approved => "APPROVED",
            DecisionOutcome::RejectedByModel => "REJECTED (predictive model)",
            DecisionOutcome::RejectedByAffordability => "REJECTED (financial feasibility checks)",
            DecisionOutcome::RejectedByBoth => "REJECTED (model and financial feasibility)",
        }
    }
}

/// Actionable hint attached to a rejected decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Suggestion {
    ImproveCreditHistory,
    IncreaseIncomeOrReduceLoan,
    LongerTerm,
    ReduceExistingDebt,
    /// Affordable loan amount, in thousands.
    SmallerLoan { affordable_amount: f64 },
    PropertyArea,
}

impl Suggestion {
    pub fn message(&self) -> String {
        match self {
            Suggestion::ImproveCreditHistory => {
                "Improving your credit history could significantly increase approval chances".to_string()
            }
            Suggestion::IncreaseIncomeOrReduceLoan => {
                "Consider either increasing your income or applying for a smaller loan amount".to_string()
            }
            Suggestion::LongerTerm => "Consider a longer loan term to reduce your monthly EMI".to_string(),
            Suggestion::ReduceExistingDebt => {
                "Work on reducing your existing debt before applying for this loan".to_string()
            }
            Suggestion::SmallerLoan { affordable_amount } => format!(
                "A loan amount of approximately {affordable_amount:.2}K would be more affordable"
            ),
            Suggestion::PropertyArea => "Property area appears to negatively impact your approval; \
                 consider properties in areas with higher approval rates"
                .to_string(),
        }
    }
}

/// Final result for one scoring request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResult {
    pub model_label: Label,
    pub model_probabilities: ClassProbabilities,
    pub feasibility: FeasibilityResult,
    pub final_approval: bool,
    pub outcome: DecisionOutcome,
    /// Top-k features by descending absolute impact.
    pub feature_impacts: Vec<FeatureImpact>,
    /// Empty when approved.
    pub suggestions: Vec<Suggestion>,
}

impl DecisionResult {
    /// Probability shown next to the verdict.
    ///
    /// P(approve) when approved or when only affordability failed, else P(reject).
    pub fn headline_confidence(&self) -> (Label, f64) {
        match self.outcome {
            DecisionOutcome::Approved | DecisionOutcome::RejectedByAffordability => {
                (Label::Approve, self.model_probabilities.approve)
            }
            DecisionOutcome::RejectedByModel | DecisionOutcome::RejectedByBoth => {
                (Label::Reject, self.model_probabilities.reject)
            }
        }
    }
}

/// Binary confusion matrix, rows = actual, columns = predicted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tn: usize,
    pub fp: usize,
    pub fn_count: usize,
    pub tp: usize,
}

impl ConfusionMatrix {
    /// `[[tn, fp], [fn, tp]]`.
    pub fn as_rows(&self) -> [[usize; 2]; 2] {
        [[self.tn, self.fp], [self.fn_count, self.tp]]
    }

    pub fn total(&self) -> usize {
        self.tn + self.fp + self.fn_count + self.tp
    }
}

/// Held-out evaluation metrics. Positive class = `Approve`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub confusion: ConfusionMatrix,
}

/// Summary of the dataset a model was trained on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetStats {
    pub n_rows: usize,
    pub n_train: usize,
    pub n_test: usize,
    pub approval_rate: f64,
    /// Per-class training weights, indexed by `Label::as_index`.
    pub class_weights: [f64; 2],
}
