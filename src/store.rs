use std::fs;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StorageWriteError;
use crate::models::{AssessmentRecord, ObservationRecord, Record};

pub const ASSESSMENTS_FILE: &str = "student_assessments.json";
pub const OBSERVATIONS_FILE: &str = "parent_observations.json";

/// Why a read came back empty. Never leaves this module.
#[derive(Debug)]
enum StorageReadError {
    Missing,
    Io(std::io::Error),
    Parse(serde_json::Error),
}

/// Append-only collection of records stored as a single JSON array.
///
/// Appends are a read-modify-write of the whole file with no locking: two
/// processes appending to the same file can lose one another's records.
#[derive(Debug, Clone)]
pub struct JsonArrayStore<T> {
    path: PathBuf,
    _record: PhantomData<T>,
}

impl<T> JsonArrayStore<T>
where
    T: Record + Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn read(&self) -> Result<Vec<T>, StorageReadError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Err(StorageReadError::Missing),
            Err(err) => return Err(StorageReadError::Io(err)),
        };
        serde_json::from_str(&raw).map_err(StorageReadError::Parse)
    }

    /// Every stored record in insertion order. Unreadable files count as empty.
    pub fn load_all(&self) -> Vec<T> {
        match self.read() {
            Ok(records) => records,
            Err(StorageReadError::Missing) => Vec::new(),
            Err(StorageReadError::Io(err)) => {
                log::warn!("ignoring unreadable {}: {err}", self.path.display());
                Vec::new()
            }
            Err(StorageReadError::Parse(err)) => {
                log::warn!("ignoring malformed {}: {err}", self.path.display());
                Vec::new()
            }
        }
    }

    pub fn append(&self, record: T) -> Result<(), StorageWriteError> {
        record.validate()?;

        let mut records = match self.read() {
            Ok(records) => records,
            Err(StorageReadError::Missing) => Vec::new(),
            Err(StorageReadError::Io(source)) => {
                return Err(StorageWriteError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
            Err(StorageReadError::Parse(_)) => {
                return Err(StorageWriteError::UnreadableExisting {
                    path: self.path.clone(),
                })
            }
        };
        records.push(record);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StorageWriteError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let body = serde_json::to_string_pretty(&records)?;
        // A failed write must never leave a truncated array in place.
        let staging = self.staging_path();
        fs::write(&staging, body)
            .and_then(|()| fs::rename(&staging, &self.path))
            .map_err(|source| {
                let _ = fs::remove_file(&staging);
                StorageWriteError::Io {
                    path: self.path.clone(),
                    source,
                }
            })?;
        log::debug!(
            "appended record {} to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// The two record collections kept under one data directory.
#[derive(Debug, Clone)]
pub struct RecordStore {
    pub assessments: JsonArrayStore<AssessmentRecord>,
    pub observations: JsonArrayStore<ObservationRecord>,
}

impl RecordStore {
    pub fn open(data_dir: &Path) -> Self {
        Self {
            assessments: JsonArrayStore::new(data_dir.join(ASSESSMENTS_FILE)),
            observations: JsonArrayStore::new(data_dir.join(OBSERVATIONS_FILE)),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::{NaiveDate, Utc};

    use super::*;
    use crate::models::{AcademicScores, ConfidenceDistribution, GradeLevel, RiskLabel};

    pub(crate) fn ahmed() -> AssessmentRecord {
        AssessmentRecord {
            student_name: "Ahmed".to_string(),
            teacher_name: Some("Faadumo".to_string()),
            grade_level: GradeLevel::Grade4,
            assessment_date: NaiveDate::from_ymd_opt(2026, 2, 10).unwrap(),
            scores: AcademicScores {
                math: 85,
                reading: 80,
                writing: 75,
            },
            attendance: 90,
            behavior: 4,
            literacy: 6,
            teacher_notes: String::new(),
            risk_level: RiskLabel::Low,
            confidence: Some(ConfidenceDistribution([0.7, 0.2, 0.1])),
            submitted_at: Utc::now(),
        }
    }

    pub(crate) fn observation(child: &str, day: u32) -> ObservationRecord {
        ObservationRecord {
            child_name: child.to_string(),
            observation_date: NaiveDate::from_ymd_opt(2026, 2, day).unwrap(),
            homework_completion: 80,
            reading_minutes: 25,
            focus: 3,
            mood: 4,
            energy: 2,
            subjects_struggled: "Xisaab".to_string(),
            wins: "Wuxuu akhriyay buug cusub".to_string(),
            challenges: "صعوبة في التركيز بعد المدرسة".to_string(),
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn append_to_empty_store_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RecordStore::open(tmp.path());
        let record = ahmed();

        store.assessments.append(record.clone()).unwrap();

        let loaded = store.assessments.load_all();
        assert_eq!(loaded, vec![record]);
    }

    #[test]
    fn append_preserves_insertion_order() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RecordStore::open(tmp.path());
        for day in 1..=3 {
            store
                .observations
                .append(observation("Hodan", day))
                .unwrap();
        }
        let days: Vec<u32> = store
            .observations
            .load_all()
            .iter()
            .map(|o| chrono::Datelike::day(&o.observation_date))
            .collect();
        assert_eq!(days, vec![1, 2, 3]);
    }

    #[test]
    fn non_latin_text_round_trips_unescaped() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RecordStore::open(tmp.path());
        let record = observation("Cabdullaahi", 5);
        store.observations.append(record.clone()).unwrap();

        let loaded = store.observations.load_all();
        assert_eq!(loaded.last(), Some(&record));

        let raw = fs::read_to_string(store.observations.path()).unwrap();
        assert!(raw.contains("صعوبة في التركيز بعد المدرسة"));
        assert!(!raw.contains("\\u"));
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RecordStore::open(&tmp.path().join("never-created"));
        assert!(store.assessments.load_all().is_empty());
    }

    #[test]
    fn malformed_file_loads_as_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RecordStore::open(tmp.path());
        fs::write(store.assessments.path(), "[{\"student_name\": ").unwrap();
        assert!(store.assessments.load_all().is_empty());
    }

    #[test]
    fn append_refuses_to_overwrite_malformed_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RecordStore::open(tmp.path());
        fs::write(store.assessments.path(), "not json").unwrap();

        let err = store.assessments.append(ahmed()).unwrap_err();
        assert!(matches!(err, StorageWriteError::UnreadableExisting { .. }));
        assert_eq!(
            fs::read_to_string(store.assessments.path()).unwrap(),
            "not json"
        );
    }

    #[test]
    fn repeated_loads_are_identical() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RecordStore::open(tmp.path());
        store.assessments.append(ahmed()).unwrap();
        store.assessments.append(ahmed()).unwrap();
        assert_eq!(store.assessments.load_all(), store.assessments.load_all());
    }

    #[test]
    fn append_creates_missing_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RecordStore::open(&tmp.path().join("nested").join("data"));
        store.observations.append(observation("Hodan", 9)).unwrap();
        assert_eq!(store.observations.load_all().len(), 1);
    }

    #[test]
    fn invalid_records_are_not_written() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RecordStore::open(tmp.path());
        let mut record = ahmed();
        record.confidence = Some(ConfidenceDistribution([0.5, 0.5, 0.5]));

        let err = store.assessments.append(record).unwrap_err();
        assert!(matches!(err, StorageWriteError::InvalidRecord(_)));
        assert!(!store.assessments.path().exists());
    }

    #[test]
    fn unreachable_data_dir_is_reported_as_io_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, "file, not a directory").unwrap();
        let store = RecordStore::open(&blocker);

        let err = store.assessments.append(ahmed()).unwrap_err();
        assert!(matches!(err, StorageWriteError::Io { .. }));
    }

    #[test]
    fn failed_write_keeps_existing_history() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RecordStore::open(tmp.path());
        store.assessments.append(ahmed()).unwrap();
        let before = fs::read_to_string(store.assessments.path()).unwrap();

        // Occupy the staging slot so only the write step can fail.
        fs::create_dir(store.assessments.staging_path()).unwrap();
        let err = store.assessments.append(ahmed()).unwrap_err();
        assert!(matches!(err, StorageWriteError::Io { .. }));

        assert_eq!(fs::read_to_string(store.assessments.path()).unwrap(), before);
        assert_eq!(store.assessments.load_all().len(), 1);
    }

    #[test]
    fn successful_append_leaves_no_staging_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RecordStore::open(tmp.path());
        store.assessments.append(ahmed()).unwrap();
        assert!(!store.assessments.staging_path().exists());
    }
}
