use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RecordError;

/// Tolerance used when checking that a confidence distribution sums to one.
pub const CONFIDENCE_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLabel {
    Low,
    Medium,
    High,
}

impl RiskLabel {
    /// Indexed by the classifier's integer class.
    pub const ALL: [RiskLabel; 3] = [RiskLabel::Low, RiskLabel::Medium, RiskLabel::High];

    pub fn class_index(self) -> usize {
        match self {
            RiskLabel::Low => 0,
            RiskLabel::Medium => 1,
            RiskLabel::High => 2,
        }
    }
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RiskLabel::Low => "Low",
            RiskLabel::Medium => "Medium",
            RiskLabel::High => "High",
        };
        f.write_str(name)
    }
}

/// Per-class probabilities in `[Low, Medium, High]` order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceDistribution(pub [f64; 3]);

impl ConfidenceDistribution {
    pub fn validate(&self) -> Result<(), RecordError> {
        if let Some(bad) = self.0.iter().find(|p| !p.is_finite() || **p < 0.0) {
            return Err(RecordError::Confidence(format!(
                "probability {bad} is negative or not finite"
            )));
        }
        let total: f64 = self.0.iter().sum();
        if (total - 1.0).abs() > CONFIDENCE_TOLERANCE {
            return Err(RecordError::Confidence(format!(
                "probabilities sum to {total}, expected 1"
            )));
        }
        Ok(())
    }

    pub fn top(&self) -> f64 {
        self.0.iter().copied().fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GradeLevel {
    #[serde(rename = "Grade 1")]
    Grade1,
    #[serde(rename = "Grade 2")]
    Grade2,
    #[serde(rename = "Grade 3")]
    Grade3,
    #[serde(rename = "Grade 4")]
    Grade4,
    #[serde(rename = "Grade 5")]
    Grade5,
}

impl GradeLevel {
    pub fn number(self) -> u8 {
        match self {
            GradeLevel::Grade1 => 1,
            GradeLevel::Grade2 => 2,
            GradeLevel::Grade3 => 3,
            GradeLevel::Grade4 => 4,
            GradeLevel::Grade5 => 5,
        }
    }
}

impl fmt::Display for GradeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Grade {}", self.number())
    }
}

impl FromStr for GradeLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let digits = trimmed
            .strip_prefix("Grade")
            .or_else(|| trimmed.strip_prefix("grade"))
            .unwrap_or(trimmed)
            .trim();
        match digits {
            "1" => Ok(GradeLevel::Grade1),
            "2" => Ok(GradeLevel::Grade2),
            "3" => Ok(GradeLevel::Grade3),
            "4" => Ok(GradeLevel::Grade4),
            "5" => Ok(GradeLevel::Grade5),
            _ => Err(format!("unknown grade level '{value}', expected Grade 1 to Grade 5")),
        }
    }
}

/// The six scorer inputs, in the order the model was trained on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub math: f64,
    pub reading: f64,
    pub writing: f64,
    pub attendance: f64,
    pub behavior: f64,
    pub literacy: f64,
}

impl FeatureVector {
    pub const LEN: usize = 6;

    pub fn new(scores: &AcademicScores, attendance: u8, behavior: u8, literacy: u8) -> Self {
        Self {
            math: f64::from(scores.math),
            reading: f64::from(scores.reading),
            writing: f64::from(scores.writing),
            attendance: f64::from(attendance),
            behavior: f64::from(behavior),
            literacy: f64::from(literacy),
        }
    }

    pub fn to_array(&self) -> [f64; Self::LEN] {
        [
            self.math,
            self.reading,
            self.writing,
            self.attendance,
            self.behavior,
            self.literacy,
        ]
    }
}

/// What a teacher submits before the scorer has assigned a label.
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentInput {
    pub student_name: String,
    pub teacher_name: Option<String>,
    pub grade_level: GradeLevel,
    pub assessment_date: NaiveDate,
    pub scores: AcademicScores,
    pub attendance: u8,
    pub behavior: u8,
    pub literacy: u8,
    pub teacher_notes: String,
}

impl AssessmentInput {
    pub fn features(&self) -> FeatureVector {
        FeatureVector::new(&self.scores, self.attendance, self.behavior, self.literacy)
    }

    /// Stamps the input with its label and submission time.
    pub fn into_record(
        self,
        risk_level: RiskLabel,
        confidence: Option<ConfidenceDistribution>,
    ) -> AssessmentRecord {
        AssessmentRecord {
            student_name: self.student_name,
            teacher_name: self.teacher_name,
            grade_level: self.grade_level,
            assessment_date: self.assessment_date,
            scores: self.scores,
            attendance: self.attendance,
            behavior: self.behavior,
            literacy: self.literacy,
            teacher_notes: self.teacher_notes,
            risk_level,
            confidence,
            submitted_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcademicScores {
    pub math: u8,
    pub reading: u8,
    pub writing: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRecord {
    pub student_name: String,
    pub teacher_name: Option<String>,
    pub grade_level: GradeLevel,
    pub assessment_date: NaiveDate,
    pub scores: AcademicScores,
    pub attendance: u8,
    pub behavior: u8,
    pub literacy: u8,
    pub teacher_notes: String,
    pub risk_level: RiskLabel,
    pub confidence: Option<ConfidenceDistribution>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub child_name: String,
    pub observation_date: NaiveDate,
    pub homework_completion: u8,
    pub reading_minutes: u16,
    pub focus: u8,
    pub mood: u8,
    pub energy: u8,
    pub subjects_struggled: String,
    pub wins: String,
    pub challenges: String,
    pub submitted_at: DateTime<Utc>,
}

/// A persisted submission kind whose invariants can be checked before it is written.
pub trait Record {
    fn validate(&self) -> Result<(), RecordError>;
}

fn check_range(field: &'static str, value: i64, min: i64, max: i64) -> Result<(), RecordError> {
    if value < min || value > max {
        return Err(RecordError::OutOfRange {
            field,
            min,
            max,
            value,
        });
    }
    Ok(())
}

fn check_present(field: &'static str, value: &str) -> Result<(), RecordError> {
    if value.trim().is_empty() {
        return Err(RecordError::Empty { field });
    }
    Ok(())
}

impl Record for AssessmentRecord {
    fn validate(&self) -> Result<(), RecordError> {
        check_present("student_name", &self.student_name)?;
        check_range("math", i64::from(self.scores.math), 0, 100)?;
        check_range("reading", i64::from(self.scores.reading), 0, 100)?;
        check_range("writing", i64::from(self.scores.writing), 0, 100)?;
        check_range("attendance", i64::from(self.attendance), 0, 100)?;
        check_range("behavior", i64::from(self.behavior), 1, 5)?;
        check_range("literacy", i64::from(self.literacy), 1, 10)?;
        if let Some(confidence) = &self.confidence {
            confidence.validate()?;
        }
        Ok(())
    }
}

impl Record for ObservationRecord {
    fn validate(&self) -> Result<(), RecordError> {
        check_present("child_name", &self.child_name)?;
        check_range("homework_completion", i64::from(self.homework_completion), 0, 100)?;
        check_range("reading_minutes", i64::from(self.reading_minutes), 0, 240)?;
        check_range("focus", i64::from(self.focus), 1, 5)?;
        check_range("mood", i64::from(self.mood), 1, 5)?;
        check_range("energy", i64::from(self.energy), 1, 5)?;
        Ok(())
    }
}
