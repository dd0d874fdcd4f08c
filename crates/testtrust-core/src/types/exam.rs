//! Exam and student records returned by the exam administration service.

use serde::{Deserialize, Serialize};

use super::id::{ExamId, StudentId};

/// Exam metadata needed by the session core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSummary {
    /// Exam identifier.
    #[serde(alias = "_id")]
    pub id: ExamId,
    /// Subject name.
    pub subject: String,
    /// Owning department.
    #[serde(default)]
    pub department: String,
    /// Academic year the exam targets.
    #[serde(default)]
    pub year: String,
    /// Duration in minutes.
    #[serde(default)]
    pub duration: u32,
    /// Number of students enrolled for the exam.
    #[serde(default)]
    pub student_count: u32,
    /// Students enrolled for the exam, when the directory provides them.
    #[serde(default)]
    pub student_ids: Vec<StudentId>,
}

/// Student identity as known by the exam administration service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    /// Student identifier.
    #[serde(alias = "_id")]
    pub id: StudentId,
    /// Display name.
    pub name: String,
    /// Registration / matriculation number.
    #[serde(default)]
    pub registration_number: Option<String>,
    /// Department.
    #[serde(default)]
    pub department: Option<String>,
}

/// Workstation metadata reported by the student exam client on join.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    /// Workstation hostname.
    #[serde(default)]
    pub hostname: Option<String>,
    /// Operating system / platform string.
    #[serde(default)]
    pub platform: Option<String>,
    /// Exam client version.
    #[serde(default)]
    pub app_version: Option<String>,
}
