//! The closed set of Moodle webservice functions exposed by the gateway.
//!
//! Every [`Operation`] is bound at compile time to a typed query and a typed
//! output through the [`Webservice`] trait; [`registry`] compiles the JSON
//! Schemas derived from those types into validators.

pub mod queries;
pub mod registry;
pub mod types;

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use queries::WireQuery;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    CoreEnrolGetEnrolledUsers,
    ModAssignGetAssignments,
    ModQuizGetQuizzesByCourses,
    ModAssignGetSubmissions,
    ModAssignGetGrades,
    CoreGradesGetGrades,
    ModAssignSaveGrade,
    ModAssignGetSubmissionStatus,
    ModQuizGetUserBestGrade,
    EnrolManualUnenrolUsers,
}

impl Operation {
    pub const ALL: [Operation; 10] = [
        Operation::CoreEnrolGetEnrolledUsers,
        Operation::ModAssignGetAssignments,
        Operation::ModQuizGetQuizzesByCourses,
        Operation::ModAssignGetSubmissions,
        Operation::ModAssignGetGrades,
        Operation::CoreGradesGetGrades,
        Operation::ModAssignSaveGrade,
        Operation::ModAssignGetSubmissionStatus,
        Operation::ModQuizGetUserBestGrade,
        Operation::EnrolManualUnenrolUsers,
    ];

    /// The `wsfunction` value Moodle knows this operation by.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Operation::CoreEnrolGetEnrolledUsers => "core_enrol_get_enrolled_users",
            Operation::ModAssignGetAssignments => "mod_assign_get_assignments",
            Operation::ModQuizGetQuizzesByCourses => "mod_quiz_get_quizzes_by_courses",
            Operation::ModAssignGetSubmissions => "mod_assign_get_submissions",
            Operation::ModAssignGetGrades => "mod_assign_get_grades",
            Operation::CoreGradesGetGrades => "core_grades_get_grades",
            Operation::ModAssignSaveGrade => "mod_assign_save_grade",
            Operation::ModAssignGetSubmissionStatus => "mod_assign_get_submission_status",
            Operation::ModQuizGetUserBestGrade => "mod_quiz_get_user_best_grade",
            Operation::EnrolManualUnenrolUsers => "enrol_manual_unenrol_users",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for Operation {
    type Err = GatewayError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .iter()
            .copied()
            .find(|op| op.wire_name() == name)
            .ok_or_else(|| GatewayError::UnknownOperation(name.to_string()))
    }
}

/// Compile-time binding of an operation to its query and output types.
pub trait Webservice {
    const OPERATION: Operation;
    type Query: WireQuery + DeserializeOwned + JsonSchema + Send + Sync;
    type Output: Serialize + DeserializeOwned + JsonSchema + Send;
}

pub struct GetEnrolledUsers;
pub struct GetAssignments;
pub struct GetQuizzesByCourses;
pub struct GetSubmissions;
pub struct GetAssignmentGrades;
pub struct GetCourseGrades;
pub struct SaveGrade;
pub struct GetSubmissionStatus;
pub struct GetUserBestQuizGrade;
pub struct UnenrolUsers;

impl Webservice for GetEnrolledUsers {
    const OPERATION: Operation = Operation::CoreEnrolGetEnrolledUsers;
    type Query = queries::EnrolledUsersQuery;
    type Output = Vec<types::EnrolledUser>;
}

impl Webservice for GetAssignments {
    const OPERATION: Operation = Operation::ModAssignGetAssignments;
    type Query = queries::CourseIdsQuery;
    type Output = types::AssignmentsResponse;
}

impl Webservice for GetQuizzesByCourses {
    const OPERATION: Operation = Operation::ModQuizGetQuizzesByCourses;
    type Query = queries::CourseIdsQuery;
    type Output = types::QuizzesResponse;
}

impl Webservice for GetSubmissions {
    const OPERATION: Operation = Operation::ModAssignGetSubmissions;
    type Query = queries::SubmissionsQuery;
    type Output = types::SubmissionsResponse;
}

impl Webservice for GetAssignmentGrades {
    const OPERATION: Operation = Operation::ModAssignGetGrades;
    type Query = queries::AssignmentGradesQuery;
    type Output = types::AssignmentGradesResponse;
}

impl Webservice for GetCourseGrades {
    const OPERATION: Operation = Operation::CoreGradesGetGrades;
    type Query = queries::CourseGradesQuery;
    type Output = types::CourseGradesResponse;
}

impl Webservice for SaveGrade {
    const OPERATION: Operation = Operation::ModAssignSaveGrade;
    type Query = queries::SaveGradeQuery;
    type Output = serde_json::Value;
}

impl Webservice for GetSubmissionStatus {
    const OPERATION: Operation = Operation::ModAssignGetSubmissionStatus;
    type Query = queries::SubmissionStatusQuery;
    type Output = types::SubmissionStatus;
}

impl Webservice for GetUserBestQuizGrade {
    const OPERATION: Operation = Operation::ModQuizGetUserBestGrade;
    type Query = queries::QuizBestGradeQuery;
    type Output = types::QuizBestGrade;
}

impl Webservice for UnenrolUsers {
    const OPERATION: Operation = Operation::EnrolManualUnenrolUsers;
    type Query = queries::UnenrolUsersQuery;
    type Output = serde_json::Value;
}
