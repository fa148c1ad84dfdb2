use std::path::Path;

use anyhow::Context;
use chrono::{NaiveDate, Utc};

use crate::models::{AcademicScores, AssessmentInput, AssessmentRecord, GradeLevel, Record};
use crate::risk::{self, RiskScorer};
use crate::store::JsonArrayStore;

/// Scores every row of an assessment CSV and appends the results.
///
/// Stops at the first bad row; rows before it stay appended.
pub fn import_csv(
    scorer: &RiskScorer,
    store: &JsonArrayStore<AssessmentRecord>,
    csv_path: &Path,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        student_name: String,
        grade_level: String,
        math: u8,
        reading: u8,
        writing: u8,
        attendance: u8,
        behavior: u8,
        literacy: u8,
        teacher_name: Option<String>,
        assessment_date: Option<NaiveDate>,
        teacher_notes: Option<String>,
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut imported = 0usize;

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let line = index + 2;
        let row = result.with_context(|| format!("row {line}: malformed assessment"))?;
        let grade_level: GradeLevel = row
            .grade_level
            .parse()
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("row {line}: bad grade level"))?;

        let input = AssessmentInput {
            student_name: row.student_name,
            teacher_name: row.teacher_name.filter(|name| !name.is_empty()),
            grade_level,
            assessment_date: row
                .assessment_date
                .unwrap_or_else(|| Utc::now().date_naive()),
            scores: AcademicScores {
                math: row.math,
                reading: row.reading,
                writing: row.writing,
            },
            attendance: row.attendance,
            behavior: row.behavior,
            literacy: row.literacy,
            teacher_notes: row.teacher_notes.unwrap_or_default(),
        };

        let record = risk::assess(scorer, input)
            .with_context(|| format!("row {line}: scoring failed"))?;
        record
            .validate()
            .with_context(|| format!("row {line}: invalid assessment"))?;
        store
            .append(record)
            .with_context(|| format!("row {line}: failed to save assessment"))?;
        imported += 1;
    }

    log::debug!("imported {imported} assessments from {}", csv_path.display());
    Ok(imported)
}
