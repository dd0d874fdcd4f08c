//! In-process exam directory.

use std::path::Path;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;

use testtrust_core::error::AppError;
use testtrust_core::result::AppResult;
use testtrust_core::traits::directory::ExamDirectory;
use testtrust_core::types::exam::{ExamSummary, StudentProfile};
use testtrust_core::types::id::{ExamId, StudentId};

/// Seed file contents for [`MemoryExamDirectory::load_seed`].
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectorySeed {
    /// Exams to insert.
    #[serde(default)]
    pub exams: Vec<ExamSummary>,
    /// Students to insert.
    #[serde(default)]
    pub students: Vec<StudentProfile>,
}

/// Exam directory held in memory.
///
/// Used by integration tests and when the server runs without the exam
/// administration service.
#[derive(Debug, Default)]
pub struct MemoryExamDirectory {
    exams: DashMap<ExamId, ExamSummary>,
    students: DashMap<StudentId, StudentProfile>,
}

impl MemoryExamDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an exam.
    pub fn insert_exam(&self, exam: ExamSummary) {
        self.exams.insert(exam.id.clone(), exam);
    }

    /// Insert or replace a student.
    pub fn insert_student(&self, student: StudentProfile) {
        self.students.insert(student.id.clone(), student);
    }

    /// Insert everything in a seed.
    pub fn apply_seed(&self, seed: DirectorySeed) {
        for exam in seed.exams {
            self.insert_exam(exam);
        }
        for student in seed.students {
            self.insert_student(student);
        }
    }

    /// Load a JSON seed file. Returns the number of exams loaded.
    pub fn load_seed(&self, path: impl AsRef<Path>) -> AppResult<usize> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::with_source(
                testtrust_core::error::ErrorKind::Configuration,
                format!("Cannot read directory seed {}", path.display()),
                e,
            )
        })?;
        let seed: DirectorySeed = serde_json::from_str(&raw)?;
        let exams = seed.exams.len();
        self.apply_seed(seed);
        Ok(exams)
    }

    /// Enroll a known student into a known exam. Returns `false` if the exam is missing.
    pub fn enroll(&self, exam_id: &ExamId, student_id: &StudentId) -> bool {
        match self.exams.get_mut(exam_id) {
            Some(mut exam) => {
                if !exam.student_ids.contains(student_id) {
                    exam.student_ids.push(student_id.clone());
                    exam.student_count = exam.student_ids.len() as u32;
                }
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl ExamDirectory for MemoryExamDirectory {
    async fn get_exam_by_id(&self, exam_id: &ExamId) -> AppResult<Option<ExamSummary>> {
        Ok(self.exams.get(exam_id).map(|e| e.value().clone()))
    }

    async fn get_student(&self, student_id: &StudentId) -> AppResult<Option<StudentProfile>> {
        Ok(self.students.get(student_id).map(|s| s.value().clone()))
    }

    async fn list_exam_students(&self, exam_id: &ExamId) -> AppResult<Vec<StudentProfile>> {
        let ids = match self.exams.get(exam_id) {
            Some(exam) => exam.student_ids.clone(),
            None => return Ok(Vec::new()),
        };

        Ok(ids
            .iter()
            .map(|id| {
                self.students
                    .get(id)
                    .map(|s| s.value().clone())
                    .unwrap_or_else(|| StudentProfile {
                        id: id.clone(),
                        name: id.to_string(),
                        registration_number: None,
                        department: None,
                    })
            })
            .collect())
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}
