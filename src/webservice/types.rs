//! Typed outputs of the Moodle webservice functions.
//!
//! Only the fields the gateway and its usecases rely on are modelled; Moodle
//! sends many more and those are ignored rather than rejected.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Warning {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub itemid: Option<i64>,
    pub warningcode: String,
    pub message: String,
}

/// Moodle reports grades as numbers in some functions and as decimal strings
/// (`"85.00000"`) in others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum GradeValue {
    Number(f64),
    Text(String),
}

impl GradeValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            GradeValue::Number(n) => Some(*n),
            GradeValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl From<f64> for GradeValue {
    fn from(value: f64) -> Self {
        GradeValue::Number(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EnrolledUser {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub firstname: String,
    pub lastname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fullname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Assignment {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<i64>,
    pub name: String,
    pub duedate: i64,
    pub allowsubmissionsfromdate: i64,
    /// Maximum grade; negative values reference a scale.
    pub grade: f64,
    pub timemodified: i64,
    pub cutoffdate: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CourseAssignments {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fullname: Option<String>,
    pub assignments: Vec<Assignment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AssignmentsResponse {
    pub courses: Vec<CourseAssignments>,
    #[serde(default)]
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Quiz {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<i64>,
    pub name: String,
    pub timeopen: i64,
    pub timeclose: i64,
    pub grade: f64,
    pub timemodified: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QuizzesResponse {
    pub quizzes: Vec<Quiz>,
    #[serde(default)]
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Submission {
    pub id: i64,
    pub userid: i64,
    pub status: String,
    pub timemodified: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timecreated: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attemptnumber: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradingstatus: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradefordisplay: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AssignmentSubmissions {
    pub assignmentid: i64,
    pub submissions: Vec<Submission>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubmissionsResponse {
    pub assignments: Vec<AssignmentSubmissions>,
    #[serde(default)]
    pub warnings: Vec<Warning>,
}

impl SubmissionsResponse {
    /// Submissions of every returned assignment, each paired with its assignment id.
    pub fn into_flat(self) -> Vec<(i64, Submission)> {
        self.assignments
            .into_iter()
            .flat_map(|a| {
                let id = a.assignmentid;
                a.submissions.into_iter().map(move |s| (id, s))
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GradeRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub userid: i64,
    pub grade: GradeValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grader: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timemodified: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AssignmentGrades {
    pub assignmentid: i64,
    pub grades: Vec<GradeRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AssignmentGradesResponse {
    pub assignments: Vec<AssignmentGrades>,
    #[serde(default)]
    pub warnings: Vec<Warning>,
}

impl AssignmentGradesResponse {
    pub fn into_flat(self) -> Vec<(i64, GradeRecord)> {
        self.assignments
            .into_iter()
            .flat_map(|a| {
                let id = a.assignmentid;
                a.grades.into_iter().map(move |g| (id, g))
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CourseGrade {
    pub userid: i64,
    pub grade: GradeValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CourseGradesResponse {
    pub grades: Vec<CourseGrade>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StoredFile {
    pub filename: String,
    pub fileurl: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filesize: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FileArea {
    pub area: String,
    #[serde(default)]
    pub files: Vec<StoredFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EditorField {
    pub name: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubmissionPlugin {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub fileareas: Vec<FileArea>,
    #[serde(default)]
    pub editorfields: Vec<EditorField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AttemptSubmission {
    pub id: i64,
    pub userid: i64,
    pub status: String,
    pub timemodified: i64,
    #[serde(default)]
    pub plugins: Vec<SubmissionPlugin>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LastAttempt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission: Option<AttemptSubmission>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradingstatus: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FeedbackGrade {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<GradeValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grader: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubmissionFeedback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<FeedbackGrade>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradefordisplay: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradeddate: Option<i64>,
    #[serde(default)]
    pub plugins: Vec<SubmissionPlugin>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubmissionStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lastattempt: Option<LastAttempt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<SubmissionFeedback>,
    #[serde(default)]
    pub warnings: Vec<Warning>,
}

impl SubmissionStatus {
    /// Online text of the latest attempt, if the student typed any.
    pub fn submission_text(&self) -> Option<String> {
        let submission = self.lastattempt.as_ref()?.submission.as_ref()?;
        let texts: Vec<&str> = submission
            .plugins
            .iter()
            .filter(|p| p.kind == "onlinetext")
            .flat_map(|p| p.editorfields.iter())
            .map(|f| f.text.as_str())
            .filter(|t| !t.is_empty())
            .collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.join("\n"))
        }
    }

    /// Files attached to the latest attempt.
    pub fn submitted_files(&self) -> Vec<&StoredFile> {
        self.lastattempt
            .iter()
            .filter_map(|a| a.submission.as_ref())
            .flat_map(|s| s.plugins.iter())
            .flat_map(|p| p.fileareas.iter())
            .flat_map(|area| area.files.iter())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QuizBestGrade {
    pub hasgrade: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<GradeValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradetopass: Option<f64>,
    #[serde(default)]
    pub warnings: Vec<Warning>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn grade_value_accepts_numbers_and_decimal_strings() {
        let n: GradeValue = serde_json::from_value(json!(85)).unwrap();
        let s: GradeValue = serde_json::from_value(json!("72.50000")).unwrap();
        assert_eq!(n.as_f64(), Some(85.0));
        assert_eq!(s.as_f64(), Some(72.5));
        assert_eq!(GradeValue::Text("-".into()).as_f64(), None);
    }

    #[test]
    fn submission_status_extracts_text_and_files() {
        let status: SubmissionStatus = serde_json::from_value(json!({
            "lastattempt": {
                "submission": {
                    "id": 4, "userid": 7, "status": "submitted", "timemodified": 1704067200,
                    "plugins": [
                        {"type": "onlinetext", "name": "Online text",
                         "editorfields": [{"name": "onlinetext", "text": "<p>My essay</p>", "format": 1}]},
                        {"type": "file", "name": "File submissions",
                         "fileareas": [{"area": "submission_files", "files": [
                            {"filename": "essay.pdf", "fileurl": "https://moodle.test/essay.pdf", "filesize": 1024, "mimetype": "application/pdf"}
                         ]}]}
                    ]
                },
                "gradingstatus": "notgraded"
            },
            "warnings": []
        }))
        .unwrap();

        assert_eq!(status.submission_text().as_deref(), Some("<p>My essay</p>"));
        let files = status.submitted_files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].filename, "essay.pdf");
    }

    #[test]
    fn flattening_pairs_records_with_their_assignment() {
        let grades: AssignmentGradesResponse = serde_json::from_value(json!({
            "assignments": [
                {"assignmentid": 3, "grades": [{"userid": 1, "grade": "85.00000"}]},
                {"assignmentid": 4, "grades": [{"userid": 1, "grade": 60}]}
            ]
        }))
        .unwrap();
        let flat = grades.into_flat();
        assert_eq!(flat.len(), 2);
        assert_eq!(flat[0].0, 3);
        assert_eq!(flat[1].1.grade.as_f64(), Some(60.0));
    }
}
