use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};

mod config;
mod error;
mod import;
mod models;
mod report;
mod risk;
mod settings;
mod store;

use config::AppConfig;
use models::{AcademicScores, AssessmentInput, GradeLevel, ObservationRecord};
use risk::RiskScorer;
use settings::{AppSettings, Language};
use store::RecordStore;

#[derive(Parser)]
#[command(name = "eduscan-early-warning")]
#[command(about = "Student risk assessments and home observations for EduScan", long_about = None)]
struct Cli {
    /// Directory holding record and settings files [env: EDUSCAN_DATA_DIR]
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Directory holding model.json and scaler.json [env: EDUSCAN_MODEL_DIR]
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum HistoryKind {
    Assessments,
    Observations,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a student and record the assessment
    Assess {
        #[arg(long)]
        student: String,
        #[arg(long)]
        teacher: Option<String>,
        /// Grade 1 to Grade 5 (or just the number)
        #[arg(long)]
        grade: GradeLevel,
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        math: u8,
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        reading: u8,
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        writing: u8,
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        attendance: u8,
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        behavior: u8,
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=10))]
        literacy: u8,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Record a parent's home observation
    Observe {
        #[arg(long)]
        child: String,
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Homework completed, in percent
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        homework: u8,
        #[arg(long, value_parser = clap::value_parser!(u16).range(0..=240))]
        reading_minutes: u16,
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        focus: u8,
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        mood: u8,
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        energy: u8,
        #[arg(long, default_value = "")]
        struggled: String,
        #[arg(long, default_value = "")]
        wins: String,
        #[arg(long, default_value = "")]
        challenges: String,
    },
    /// List stored records, most recent last
    History {
        #[arg(value_enum)]
        kind: HistoryKind,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Score and record assessments from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Show or change application settings
    Settings {
        #[arg(long, value_enum)]
        language: Option<Language>,
        #[arg(long)]
        theme: Option<String>,
        #[arg(long)]
        offline: Option<bool>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = AppConfig::resolve(cli.data_dir, cli.model_dir);
    let store = RecordStore::open(&config.data_dir);

    match cli.command {
        Commands::Assess {
            student,
            teacher,
            grade,
            date,
            math,
            reading,
            writing,
            attendance,
            behavior,
            literacy,
            notes,
        } => {
            let scorer = RiskScorer::load(&config.model_path, &config.scaler_path)?;
            let input = AssessmentInput {
                student_name: student,
                teacher_name: teacher,
                grade_level: grade,
                assessment_date: date.unwrap_or_else(|| Utc::now().date_naive()),
                scores: AcademicScores {
                    math,
                    reading,
                    writing,
                },
                attendance,
                behavior,
                literacy,
                teacher_notes: notes,
            };
            let record = risk::assess(&scorer, input)?;
            let guidance = risk::guidance(record.risk_level);

            println!(
                "Assessment results for {} ({})",
                record.student_name, record.grade_level
            );
            match record.confidence {
                Some(confidence) => println!(
                    "Risk level: {} (confidence {:.1}%)",
                    guidance.display_name,
                    confidence.top() * 100.0
                ),
                None => println!("Risk level: {}", guidance.display_name),
            }
            println!("{}", guidance.headline);
            for action in guidance.actions {
                println!("- {action}");
            }

            store
                .assessments
                .append(record)
                .context("assessment scored but could not be saved; resubmit to retry")?;
            println!("Saved to {}.", store.assessments.path().display());
        }
        Commands::Observe {
            child,
            date,
            homework,
            reading_minutes,
            focus,
            mood,
            energy,
            struggled,
            wins,
            challenges,
        } => {
            let observation = ObservationRecord {
                child_name: child,
                observation_date: date.unwrap_or_else(|| Utc::now().date_naive()),
                homework_completion: homework,
                reading_minutes,
                focus,
                mood,
                energy,
                subjects_struggled: struggled,
                wins,
                challenges,
                submitted_at: Utc::now(),
            };
            store
                .observations
                .append(observation)
                .context("observation could not be saved; resubmit to retry")?;
            println!("Observation saved.");
        }
        Commands::History { kind, limit } => match kind {
            HistoryKind::Assessments => {
                let records = store.assessments.load_all();
                if records.is_empty() {
                    println!("No assessments recorded yet.");
                    return Ok(());
                }
                for record in records.iter().skip(records.len().saturating_sub(limit)) {
                    println!(
                        "- {} ({}) on {}: {} risk, math {} reading {} writing {}, attendance {}%",
                        record.student_name,
                        record.grade_level,
                        record.assessment_date,
                        record.risk_level,
                        record.scores.math,
                        record.scores.reading,
                        record.scores.writing,
                        record.attendance
                    );
                }
            }
            HistoryKind::Observations => {
                let records = store.observations.load_all();
                if records.is_empty() {
                    println!("No observations recorded yet.");
                    return Ok(());
                }
                for record in records.iter().skip(records.len().saturating_sub(limit)) {
                    println!(
                        "- {} on {}: focus {}/5, mood {}/5, energy {}/5, homework {}%",
                        record.child_name,
                        record.observation_date,
                        record.focus,
                        record.mood,
                        record.energy,
                        record.homework_completion
                    );
                }
            }
        },
        Commands::Import { csv } => {
            let scorer = RiskScorer::load(&config.model_path, &config.scaler_path)?;
            let imported = import::import_csv(&scorer, &store.assessments, &csv)?;
            println!("Imported {imported} assessments from {}.", csv.display());
        }
        Commands::Report { out } => {
            let report = report::build_report(
                Utc::now(),
                &store.assessments.load_all(),
                &store.observations.load_all(),
            );
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Settings {
            language,
            theme,
            offline,
        } => {
            let path = config.settings_path();
            let mut settings = AppSettings::load(&path);
            let changed = language.is_some() || theme.is_some() || offline.is_some();
            if let Some(language) = language {
                settings.language = language;
            }
            if let Some(theme) = theme {
                settings.theme = theme;
            }
            if let Some(offline) = offline {
                settings.offline_mode = offline;
            }
            if changed {
                settings.save(&path)?;
            }
            println!(
                "language: {:?}\ntheme: {}\noffline mode: {}",
                settings.language, settings.theme, settings.offline_mode
            );
        }
    }

    Ok(())
}
