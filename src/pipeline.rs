//! Train once, then score requests against the frozen artifacts.
//!
//! Training:
//! raw rows -> impute/encode (full dataset) -> seeded split -> scaler (train
//! partition only) -> classifier -> held-out metrics
//!
//! Scoring (per request, read-only over the artifacts):
//! applicant -> encode -> scale -> classifier label + probabilities
//!           \-> feasibility gate --------------------/-> decide + explain
//!
//! [`TrainedArtifacts`] is immutable after [`train`] returns and is `Send +
//! Sync`, so batch scoring fans out with rayon without any locking.

use nalgebra::DMatrix;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::classify::{self, LinearClassifier, balanced_class_weights, train_test_split};
use crate::decision;
use crate::domain::{
    ApplicantRecord, DatasetStats, DecisionResult, Feature, Label, ModelMetrics, RawRecord,
    ScoringConfig, ScoringRequest, TrainConfig, TrainingRow,
};
use crate::error::ScoringError;
use crate::feasibility;
use crate::preprocess::{FeatureVector, Preprocessor, ScalerParams};

/// Everything learned during training. Never mutated afterwards.
#[derive(Debug)]
pub struct TrainedArtifacts {
    preprocessor: Preprocessor,
    scaler: ScalerParams,
    model: Box<dyn LinearClassifier>,
    metrics: ModelMetrics,
    stats: DatasetStats,
    config: TrainConfig,
}

/// Fit preprocessing, scaler and classifier on labeled rows.
pub fn train(rows: &[TrainingRow], config: &TrainConfig) -> Result<TrainedArtifacts, ScoringError> {
    config.validate()?;
    if rows.is_empty() {
        return Err(ScoringError::EmptyDataset("no labeled rows to train on".to_string()));
    }

    let raw: Vec<RawRecord> = rows.iter().map(|r| r.record.clone()).collect();
    let labels: Vec<Label> = rows.iter().map(|r| r.label).collect();

    let preprocessor = Preprocessor::fit(&raw)?;
    let completed: Vec<ApplicantRecord> = raw.iter().map(|r| preprocessor.complete(r)).collect();
    let features = preprocessor.transform_all(&completed)?;

    let split = train_test_split(rows.len(), config.test_fraction, config.seed)?;
    let (x_train, y_train) = partition(&features, &labels, &split.train);
    let (x_test, y_test) = partition(&features, &labels, &split.test);

    let scaler = ScalerParams::fit(&x_train, preprocessor.feature_order())?;
    let x_train = scaler.transform_matrix(&x_train)?;
    let x_test = scaler.transform_matrix(&x_test)?;

    let class_weights = balanced_class_weights(&y_train)?;
    let model = classify::trainer_for(config).fit(&x_train, &y_train)?;
    let metrics = classify::evaluate(model.as_ref(), &x_test, &y_test)?;

    let approvals = labels.iter().filter(|&&l| l == Label::Approve).count();
    let stats = DatasetStats {
        n_rows: rows.len(),
        n_train: y_train.len(),
        n_test: y_test.len(),
        approval_rate: approvals as f64 / rows.len() as f64,
        class_weights,
    };

    info!(
        model = model.spec().display_name(),
        rows = stats.n_rows,
        train = stats.n_train,
        test = stats.n_test,
        accuracy = metrics.accuracy,
        f1 = metrics.f1,
        "model trained"
    );

    Ok(TrainedArtifacts {
        preprocessor,
        scaler,
        model,
        metrics,
        stats,
        config: *config,
    })
}

fn partition(features: &DMatrix<f64>, labels: &[Label], indices: &[usize]) -> (DMatrix<f64>, Vec<Label>) {
    (
        features.select_rows(indices.iter()),
        indices.iter().map(|&i| labels[i]).collect(),
    )
}

impl TrainedArtifacts {
    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    pub fn scaler(&self) -> &ScalerParams {
        &self.scaler
    }

    pub fn model(&self) -> &dyn LinearClassifier {
        self.model.as_ref()
    }

    pub fn metrics(&self) -> &ModelMetrics {
        &self.metrics
    }

    pub fn stats(&self) -> &DatasetStats {
        &self.stats
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn feature_order(&self) -> &'static [Feature] {
        self.preprocessor.feature_order()
    }

    /// Encode and scale one applicant.
    pub fn scaled_features(&self, applicant: &ApplicantRecord) -> Result<FeatureVector, ScoringError> {
        let x = self.preprocessor.transform(applicant)?;
        self.scaler.transform(&x)
    }

    /// Model weights paired with their feature, by descending magnitude.
    pub fn global_feature_weights(&self) -> Vec<(Feature, f64)> {
        let mut weights: Vec<(Feature, f64)> = self
            .feature_order()
            .iter()
            .copied()
            .zip(self.model.weights().iter().copied())
            .collect();
        weights.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
        weights
    }

    /// Score one request: model verdict, feasibility gate, final decision,
    /// top-k attributions and (when rejected) suggestions.
    pub fn score(
        &self,
        request: &ScoringRequest,
        config: &ScoringConfig,
    ) -> Result<DecisionResult, ScoringError> {
        config.policy.validate()?;
        let applicant = &request.applicant;

        let scaled = self.scaled_features(applicant)?;
        let model_label = self.model.predict(&scaled);
        let model_probabilities = self.model.predict_probability(&scaled);

        let feasibility =
            feasibility::evaluate_applicant(applicant, &request.context, &config.policy)?;
        let final_approval = decision::decide(model_label, &feasibility);
        let outcome = decision::outcome(model_label, feasibility.financially_feasible);

        let ranked = decision::rank_feature_impacts(
            &scaled,
            self.model.weights(),
            self.feature_order(),
            applicant,
        )?;
        let suggestions = if final_approval {
            Vec::new()
        } else {
            decision::suggestions(applicant, &request.context, &feasibility, &ranked, &config.policy)
        };

        debug!(
            id = request.id.as_deref().unwrap_or("-"),
            ?model_label,
            p_approve = model_probabilities.approve,
            feasible = feasibility.financially_feasible,
            final_approval,
            "scored request"
        );

        Ok(DecisionResult {
            model_label,
            model_probabilities,
            feasibility,
            final_approval,
            outcome,
            feature_impacts: decision::top_k(ranked, config.top_k),
            suggestions,
        })
    }

    /// Score many requests in parallel. Order of results matches `requests`;
    /// a failing request does not affect the others.
    pub fn score_batch(
        &self,
        requests: &[ScoringRequest],
        config: &ScoringConfig,
    ) -> Vec<Result<DecisionResult, ScoringError>> {
        requests.par_iter().map(|r| self.score(r, config)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic;
    use crate::domain::{DecisionOutcome, FinancialContext};

    fn trained() -> TrainedArtifacts {
        let rows = synthetic::generate(300, 42).unwrap();
        train(&rows, &TrainConfig::default()).unwrap()
    }

    fn request(applicant: ApplicantRecord) -> ScoringRequest {
        ScoringRequest {
            id: Some("t".to_string()),
            applicant,
            context: FinancialContext::default(),
        }
    }

    fn good_applicant() -> ApplicantRecord {
        ApplicantRecord {
            gender: "Male".to_string(),
            married: "Yes".to_string(),
            dependents: "0".to_string(),
            education: "Graduate".to_string(),
            self_employed: "No".to_string(),
            applicant_income: 5000.0,
            coapplicant_income: 0.0,
            loan_amount: 100.0,
            loan_amount_term: 360.0,
            credit_history: 1.0,
            property_area: "Semiurban".to_string(),
        }
    }

    #[test]
    fn training_reports_split_and_metrics() {
        let artifacts = trained();
        let stats = artifacts.stats();
        assert_eq!(stats.n_rows, 300);
        assert_eq!(stats.n_test, 60);
        assert_eq!(stats.n_train, 240);
        assert_eq!(artifacts.metrics().confusion.total(), 60);
        assert!(artifacts.metrics().accuracy > 0.5);
        assert_eq!(artifacts.scaler().n_features(), 11);
        assert_eq!(artifacts.global_feature_weights().len(), 11);
    }

    #[test]
    fn scoring_is_deterministic() {
        let artifacts = trained();
        let req = request(good_applicant());
        let a = artifacts.score(&req, &ScoringConfig::default()).unwrap();
        let b = artifacts.score(&req, &ScoringConfig::default()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.feature_impacts.len(), 5);
        assert_eq!(a.final_approval, decision::decide(a.model_label, &a.feasibility));
    }

    #[test]
    fn zero_income_is_rejected_whatever_the_model_says() {
        let artifacts = trained();
        let mut applicant = good_applicant();
        applicant.applicant_income = 0.0;
        let result = artifacts.score(&request(applicant), &ScoringConfig::default()).unwrap();
        assert!(!result.feasibility.financially_feasible);
        assert!(!result.final_approval);
        assert!(matches!(
            result.outcome,
            DecisionOutcome::RejectedByAffordability | DecisionOutcome::RejectedByBoth
        ));
        assert!(!result.suggestions.is_empty());
    }

    #[test]
    fn unknown_category_fails_only_that_request() {
        let artifacts = trained();
        let mut odd = good_applicant();
        odd.gender = "Other".to_string();
        let results = artifacts.score_batch(
            &[request(good_applicant()), request(odd), request(good_applicant())],
            &ScoringConfig::default(),
        );
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(ScoringError::UnknownCategory { feature: Feature::Gender, .. })
        ));
        assert_eq!(results[0].as_ref().ok(), results[2].as_ref().ok());
    }

    #[test]
    fn single_class_dataset_cannot_train() {
        let rows: Vec<TrainingRow> = synthetic::generate(50, 1)
            .unwrap()
            .into_iter()
            .map(|mut r| {
                r.label = Label::Approve;
                r
            })
            .collect();
        assert!(matches!(
            train(&rows, &TrainConfig::default()),
            Err(ScoringError::Training(_))
        ));
    }
}
