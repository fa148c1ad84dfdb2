use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::models::{AssessmentRecord, GradeLevel, ObservationRecord, RiskLabel};
use crate::risk;

#[derive(Debug, Clone, PartialEq)]
pub struct GradeSummary {
    pub grade_level: GradeLevel,
    pub count: usize,
    pub avg_math: f64,
    pub avg_reading: f64,
    pub avg_writing: f64,
}

pub fn risk_mix(assessments: &[AssessmentRecord]) -> [usize; 3] {
    let mut counts = [0usize; 3];
    for record in assessments {
        counts[record.risk_level.class_index()] += 1;
    }
    counts
}

pub fn summarize_by_grade(assessments: &[AssessmentRecord]) -> Vec<GradeSummary> {
    let mut map: BTreeMap<GradeLevel, (usize, [u32; 3])> = BTreeMap::new();

    for record in assessments {
        let entry = map.entry(record.grade_level).or_insert((0, [0; 3]));
        entry.0 += 1;
        entry.1[0] += u32::from(record.scores.math);
        entry.1[1] += u32::from(record.scores.reading);
        entry.1[2] += u32::from(record.scores.writing);
    }

    map.into_iter()
        .map(|(grade_level, (count, totals))| {
            let avg = |total: u32| total as f64 / count as f64;
            GradeSummary {
                grade_level,
                count,
                avg_math: avg(totals[0]),
                avg_reading: avg(totals[1]),
                avg_writing: avg(totals[2]),
            }
        })
        .collect()
}

pub fn build_report(
    generated_at: DateTime<Utc>,
    assessments: &[AssessmentRecord],
    observations: &[ObservationRecord],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Student Early Warning Report");
    let _ = writeln!(
        output,
        "Generated {} from {} assessments and {} home observations",
        generated_at.format("%Y-%m-%d %H:%M UTC"),
        assessments.len(),
        observations.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk Mix");

    if assessments.is_empty() {
        let _ = writeln!(output, "No assessments recorded yet.");
    } else {
        let counts = risk_mix(assessments);
        for label in RiskLabel::ALL {
            let count = counts[label.class_index()];
            let share = count as f64 / assessments.len() as f64 * 100.0;
            let _ = writeln!(
                output,
                "- {}: {} students ({:.0}%)",
                risk::guidance(label).display_name,
                count,
                share
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Average Scores by Grade");

    let grades = summarize_by_grade(assessments);
    if grades.is_empty() {
        let _ = writeln!(output, "No assessments recorded yet.");
    } else {
        for grade in grades.iter() {
            let _ = writeln!(
                output,
                "- {} ({} assessed): math {:.1}, reading {:.1}, writing {:.1}",
                grade.grade_level, grade.count, grade.avg_math, grade.avg_reading, grade.avg_writing
            );
        }
    }

    let mut flagged: Vec<&AssessmentRecord> = assessments
        .iter()
        .filter(|record| record.risk_level != RiskLabel::Low)
        .collect();
    flagged.sort_by(|a, b| {
        b.risk_level
            .class_index()
            .cmp(&a.risk_level.class_index())
            .then(b.submitted_at.cmp(&a.submitted_at))
    });
    let _ = writeln!(output);
    let _ = writeln!(output, "## Students Needing Support");

    if flagged.is_empty() {
        let _ = writeln!(output, "No students currently flagged.");
    } else {
        for record in flagged.iter().take(10) {
            let confidence = record
                .confidence
                .map(|c| format!(", confidence {:.0}%", c.top() * 100.0))
                .unwrap_or_default();
            let _ = writeln!(
                output,
                "- {} ({}) {} risk on {}{}",
                record.student_name,
                record.grade_level,
                record.risk_level,
                record.assessment_date,
                confidence
            );
        }
    }

    let mut recent: Vec<&ObservationRecord> = observations.iter().collect();
    recent.sort_by(|a, b| b.observation_date.cmp(&a.observation_date));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Home Observations");

    if recent.is_empty() {
        let _ = writeln!(output, "No observations recorded yet.");
    } else {
        for observation in recent.iter().take(5) {
            let _ = writeln!(
                output,
                "- {} on {}: focus {}/5, mood {}/5, energy {}/5, homework {}%, reading {} min",
                observation.child_name,
                observation.observation_date,
                observation.focus,
                observation.mood,
                observation.energy,
                observation.homework_completion,
                observation.reading_minutes
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::{ahmed, observation};

    #[test]
    fn empty_stores_render_placeholders() {
        let report = build_report(Utc::now(), &[], &[]);
        assert!(report.contains("No assessments recorded yet."));
        assert!(report.contains("No students currently flagged."));
        assert!(report.contains("No observations recorded yet."));
    }

    #[test]
    fn grades_average_their_scores() {
        let mut second = ahmed();
        second.scores.math = 65;
        let summaries = summarize_by_grade(&[ahmed(), second]);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].count, 2);
        assert!((summaries[0].avg_math - 75.0).abs() < 0.001);
        assert!((summaries[0].avg_reading - 80.0).abs() < 0.001);
    }

    #[test]
    fn flagged_students_list_high_before_medium() {
        let mut medium = ahmed();
        medium.student_name = "Hodan".to_string();
        medium.risk_level = RiskLabel::Medium;
        let mut high = ahmed();
        high.student_name = "Warsame".to_string();
        high.risk_level = RiskLabel::High;
        high.confidence = None;

        let records = vec![ahmed(), medium, high];
        assert_eq!(risk_mix(&records), [1, 1, 1]);

        let report = build_report(Utc::now(), &records, &[observation("Hodan", 3)]);
        let warsame = report.find("- Warsame").unwrap();
        let hodan = report.find("- Hodan (").unwrap();
        assert!(warsame < hodan);
        assert!(!report.contains("- Ahmed ("));
        assert!(report.contains("- Low Risk: 1 students (33%)"));
        assert!(report.contains("focus 3/5, mood 4/5, energy 2/5"));
    }
}
