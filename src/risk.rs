use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::ScoringError;
use crate::models::{
    AssessmentInput, AssessmentRecord, ConfidenceDistribution, FeatureVector, RiskLabel,
};

const CLASS_COUNT: usize = RiskLabel::ALL.len();

/// Pre-fit normalization applied to raw features before classification.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn arity(&self) -> usize {
        self.mean.len()
    }

    fn check(&self) -> Result<(), String> {
        if self.mean.is_empty() {
            return Err("scaler has no features".to_string());
        }
        if self.mean.len() != self.scale.len() {
            return Err(format!(
                "scaler mean has {} values but scale has {}",
                self.mean.len(),
                self.scale.len()
            ));
        }
        if self.mean.iter().chain(&self.scale).any(|v| !v.is_finite()) {
            return Err("scaler contains non-finite parameters".to_string());
        }
        Ok(())
    }

    pub fn transform(&self, features: &[f64]) -> Vec<f64> {
        features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mean, scale))| {
                // Constant features were fit with zero variance.
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                (x - mean) / scale
            })
            .collect()
    }
}

/// Serialized classifier, tagged by `kind` in the artifact.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classifier {
    LogisticRegression {
        coefficients: Vec<Vec<f64>>,
        intercepts: Vec<f64>,
    },
    NearestCentroid {
        centroids: Vec<Vec<f64>>,
    },
}

impl Classifier {
    fn rows(&self) -> &[Vec<f64>] {
        match self {
            Classifier::LogisticRegression { coefficients, .. } => coefficients,
            Classifier::NearestCentroid { centroids } => centroids,
        }
    }

    pub fn arity(&self) -> usize {
        self.rows().first().map(Vec::len).unwrap_or(0)
    }

    fn check(&self) -> Result<(), String> {
        let rows = self.rows();
        if rows.len() != CLASS_COUNT {
            return Err(format!(
                "classifier has {} classes, expected {CLASS_COUNT}",
                rows.len()
            ));
        }
        let arity = self.arity();
        if arity == 0 {
            return Err("classifier has no features".to_string());
        }
        if rows.iter().any(|row| row.len() != arity) {
            return Err("classifier rows have differing lengths".to_string());
        }
        if let Classifier::LogisticRegression { intercepts, .. } = self {
            if intercepts.len() != CLASS_COUNT {
                return Err(format!(
                    "classifier has {} intercepts, expected {CLASS_COUNT}",
                    intercepts.len()
                ));
            }
            if intercepts.iter().any(|v| !v.is_finite()) {
                return Err("classifier contains non-finite parameters".to_string());
            }
        }
        if rows.iter().flatten().any(|v| !v.is_finite()) {
            return Err("classifier contains non-finite parameters".to_string());
        }
        Ok(())
    }

    /// Per-class decision values; the highest wins.
    fn decision_function(&self, scaled: &[f64]) -> Vec<f64> {
        match self {
            Classifier::LogisticRegression {
                coefficients,
                intercepts,
            } => coefficients
                .iter()
                .zip(intercepts)
                .map(|(row, intercept)| {
                    row.iter().zip(scaled).map(|(w, x)| w * x).sum::<f64>() + intercept
                })
                .collect(),
            Classifier::NearestCentroid { centroids } => centroids
                .iter()
                .map(|centroid| {
                    let distance: f64 = centroid
                        .iter()
                        .zip(scaled)
                        .map(|(c, x)| (c - x).powi(2))
                        .sum();
                    -distance
                })
                .collect(),
        }
    }

    /// `None` when the decision values overflow and no class can be ranked.
    pub fn predict(&self, scaled: &[f64]) -> Option<(usize, Option<[f64; CLASS_COUNT]>)> {
        let decision = self.decision_function(scaled);
        if decision.iter().any(|value| !value.is_finite()) {
            return None;
        }
        let class = argmax(&decision);
        let probabilities = match self {
            Classifier::LogisticRegression { .. } => Some(softmax(&decision)),
            Classifier::NearestCentroid { .. } => None,
        };
        Some((class, probabilities))
    }
}

/// Lowest index wins ties, so equal evidence never escalates the label.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (index, value) in values.iter().enumerate().skip(1) {
        if *value > values[best] {
            best = index;
        }
    }
    best
}

fn softmax(decision: &[f64]) -> [f64; CLASS_COUNT] {
    let max = decision.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut out = [0.0; CLASS_COUNT];
    let mut total = 0.0;
    for (slot, value) in out.iter_mut().zip(decision) {
        *slot = (value - max).exp();
        total += *slot;
    }
    for slot in out.iter_mut() {
        *slot /= total;
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreResult {
    pub label: RiskLabel,
    pub confidence: Option<ConfidenceDistribution>,
}

/// Scaler and classifier loaded as a pair.
///
/// The two artifacts must come from the same training run. Nothing in the
/// files records that pairing, so only matching arity is checked.
#[derive(Debug, Clone)]
pub struct RiskScorer {
    scaler: StandardScaler,
    classifier: Classifier,
}

impl RiskScorer {
    pub fn load(model_path: &Path, scaler_path: &Path) -> Result<Self, ScoringError> {
        let classifier: Classifier = load_artifact("model", model_path)?;
        let scaler: StandardScaler = load_artifact("scaler", scaler_path)?;
        classifier.check().map_err(|reason| unavailable("model", model_path, reason))?;
        scaler.check().map_err(|reason| unavailable("scaler", scaler_path, reason))?;
        if scaler.arity() != classifier.arity() {
            return Err(unavailable(
                "scaler",
                scaler_path,
                format!(
                    "scaler expects {} features but model expects {}",
                    scaler.arity(),
                    classifier.arity()
                ),
            ));
        }
        log::debug!(
            "loaded {}-feature risk model from {}",
            classifier.arity(),
            model_path.display()
        );
        Ok(Self { scaler, classifier })
    }

    pub fn arity(&self) -> usize {
        self.classifier.arity()
    }

    pub fn score(&self, features: &[f64]) -> Result<ScoreResult, ScoringError> {
        if features.len() != self.arity() {
            return Err(ScoringError::FeatureShape {
                expected: self.arity(),
                actual: features.len(),
            });
        }
        if let Some((index, value)) = features
            .iter()
            .copied()
            .enumerate()
            .find(|(_, value)| !value.is_finite())
        {
            return Err(ScoringError::InvalidFeatureValue { index, value });
        }

        let scaled = self.scaler.transform(features);
        let Some((class, probabilities)) = self.classifier.predict(&scaled) else {
            // Blame the input with the largest magnitude.
            let (index, value) = features
                .iter()
                .copied()
                .enumerate()
                .fold((0, features[0]), |best, (index, value)| {
                    if value.abs() > best.1.abs() {
                        (index, value)
                    } else {
                        best
                    }
                });
            return Err(ScoringError::InvalidFeatureValue { index, value });
        };
        // Load-time checks guarantee exactly one decision value per label.
        Ok(ScoreResult {
            label: RiskLabel::ALL[class],
            confidence: probabilities.map(ConfidenceDistribution),
        })
    }

    pub fn score_features(&self, features: &FeatureVector) -> Result<ScoreResult, ScoringError> {
        self.score(&features.to_array())
    }
}

/// Scores a submission and stamps it into a record ready to append.
pub fn assess(
    scorer: &RiskScorer,
    input: AssessmentInput,
) -> Result<AssessmentRecord, ScoringError> {
    let result = scorer.score_features(&input.features())?;
    Ok(input.into_record(result.label, result.confidence))
}

fn unavailable(artifact: &'static str, path: &Path, reason: String) -> ScoringError {
    ScoringError::ModelUnavailable {
        artifact,
        path: path.to_path_buf(),
        reason,
    }
}

fn load_artifact<T: DeserializeOwned>(
    artifact: &'static str,
    path: &Path,
) -> Result<T, ScoringError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| unavailable(artifact, path, err.to_string()))?;
    serde_json::from_str(&raw).map_err(|err| unavailable(artifact, path, err.to_string()))
}

/// Display text and follow-up actions shown alongside a label.
pub struct Guidance {
    pub display_name: &'static str,
    pub headline: &'static str,
    pub actions: [&'static str; 3],
}

pub fn guidance(label: RiskLabel) -> Guidance {
    match label {
        RiskLabel::Low => Guidance {
            display_name: "Low Risk",
            headline: "Student is performing well. Continue current teaching methods.",
            actions: [
                "Maintain current academic support",
                "Consider enrichment activities",
                "Regular progress monitoring",
            ],
        },
        RiskLabel::Medium => Guidance {
            display_name: "Medium Risk",
            headline: "Student may need additional support.",
            actions: [
                "Provide targeted interventions",
                "Increase one-on-one support",
                "Monitor progress weekly",
            ],
        },
        RiskLabel::High => Guidance {
            display_name: "High Risk",
            headline: "Student requires immediate intervention.",
            actions: [
                "Implement intensive support program",
                "Daily progress monitoring",
                "Consider specialist evaluation",
            ],
        },
    }
}
