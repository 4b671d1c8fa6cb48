//! Typed query parameters, one type per webservice function.
//!
//! The JSON Schema derived from each type is what caller input is validated
//! against, so constraints live in the `schemars` attributes below.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Conversion from the caller-facing query to the parameter tree sent on the wire.
///
/// Most queries travel exactly as they serialize; the few whose Moodle shape
/// differs from what callers provide override [`WireQuery::wire_value`].
pub trait WireQuery: Serialize {
    fn wire_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Filter options understood by `core_enrol_get_enrolled_users`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "name", content = "value", rename_all = "lowercase")]
pub enum EnrolledUsersOption {
    WithCapability(String),
    GroupId(i64),
    OnlyActive(bool),
    OnlySuspended(bool),
    /// Comma separated list, e.g. `"id, fullname, email"`.
    UserFields(String),
    LimitFrom(i64),
    LimitNumber(i64),
    SortBy(String),
    SortDirection(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EnrolledUsersQuery {
    #[schemars(length(min = 1))]
    pub courseid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<EnrolledUsersOption>>,
}

impl EnrolledUsersQuery {
    pub fn for_course(courseid: impl Into<String>) -> Self {
        Self {
            courseid: courseid.into(),
            options: None,
        }
    }

    pub fn with_option(mut self, option: EnrolledUsersOption) -> Self {
        self.options.get_or_insert_with(Vec::new).push(option);
        self
    }
}

impl WireQuery for EnrolledUsersQuery {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CourseIdsQuery {
    #[schemars(length(min = 1), inner(length(min = 1)))]
    pub courseids: Vec<String>,
}

impl CourseIdsQuery {
    pub fn single(courseid: impl Into<String>) -> Self {
        Self {
            courseids: vec![courseid.into()],
        }
    }
}

impl WireQuery for CourseIdsQuery {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubmissionsQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignmentids: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<i64>,
}

impl WireQuery for SubmissionsQuery {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AssignmentGradesQuery {
    pub assignmentids: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<i64>,
}

impl WireQuery for AssignmentGradesQuery {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CourseGradesQuery {
    #[schemars(length(min = 1))]
    pub courseid: String,
    #[schemars(length(min = 1))]
    pub component: String,
    #[schemars(range(min = 1))]
    pub activityid: i64,
}

impl WireQuery for CourseGradesQuery {}

fn default_attempt_number() -> i64 {
    -1
}

fn default_apply_to_all() -> bool {
    true
}

/// Grade plus feedback comment for one student's assignment attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SaveGradeQuery {
    #[schemars(range(min = 1))]
    pub assignmentid: i64,
    #[schemars(range(min = 1))]
    pub userid: i64,
    pub grade: f64,
    #[serde(default)]
    pub feedback: String,
    #[serde(default = "default_attempt_number")]
    pub attemptnumber: i64,
    #[serde(default)]
    pub addattempt: bool,
    #[serde(default)]
    pub workflowstate: String,
    #[serde(default = "default_apply_to_all")]
    pub applytoall: bool,
}

impl SaveGradeQuery {
    pub fn new(assignmentid: i64, userid: i64, grade: f64, feedback: impl Into<String>) -> Self {
        Self {
            assignmentid,
            userid,
            grade,
            feedback: feedback.into(),
            attemptnumber: default_attempt_number(),
            addattempt: false,
            workflowstate: String::new(),
            applytoall: default_apply_to_all(),
        }
    }
}

impl WireQuery for SaveGradeQuery {
    // Feedback comments are carried by the assignfeedback_comments plugin.
    fn wire_value(&self) -> Result<Value, serde_json::Error> {
        Ok(json!({
            "assignmentid": self.assignmentid,
            "userid": self.userid,
            "grade": self.grade,
            "attemptnumber": self.attemptnumber,
            "addattempt": self.addattempt,
            "workflowstate": self.workflowstate,
            "applytoall": self.applytoall,
            "plugindata": {
                "assignfeedbackcomments_editor": {
                    "text": self.feedback,
                    "format": 1
                }
            }
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubmissionStatusQuery {
    #[schemars(range(min = 1))]
    pub assignid: i64,
    #[schemars(range(min = 1))]
    pub userid: i64,
}

impl WireQuery for SubmissionStatusQuery {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QuizBestGradeQuery {
    #[schemars(range(min = 1))]
    pub quizid: i64,
    #[schemars(range(min = 1))]
    pub userid: i64,
}

impl WireQuery for QuizBestGradeQuery {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Enrolment {
    #[schemars(range(min = 1))]
    pub userid: i64,
    #[schemars(range(min = 1))]
    pub courseid: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roleid: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UnenrolUsersQuery {
    #[schemars(length(min = 1))]
    pub enrolments: Vec<Enrolment>,
}

impl UnenrolUsersQuery {
    pub fn single(userid: i64, courseid: i64) -> Self {
        Self {
            enrolments: vec![Enrolment {
                userid,
                courseid,
                roleid: None,
            }],
        }
    }
}

impl WireQuery for UnenrolUsersQuery {}
