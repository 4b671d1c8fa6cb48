use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use crate::error::Result;
use crate::gateway::Gateway;
use crate::webservice::queries::{
    CourseIdsQuery, EnrolledUsersQuery, QuizBestGradeQuery, SaveGradeQuery, SubmissionStatusQuery,
};
use crate::webservice::types::{
    Assignment, EnrolledUser, QuizBestGrade, Quiz, StoredFile, SubmissionStatus,
};

/// Submission status plus the pieces a reviewer usually wants up front.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionContent {
    pub text: Option<String>,
    pub files: Vec<StoredFile>,
    pub status: SubmissionStatus,
}

/// Single-course helpers for assistant-style callers.
pub struct CourseUseCase {
    gateway: Arc<Gateway>,
}

impl CourseUseCase {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    pub async fn students(&self, course_id: &str) -> Result<Vec<EnrolledUser>> {
        self.gateway
            .get_enrolled_users(&EnrolledUsersQuery::for_course(course_id))
            .await
    }

    /// Assignments of the first returned course; empty when the course has none.
    pub async fn assignments(&self, course_id: &str) -> Result<Vec<Assignment>> {
        let response = self
            .gateway
            .get_assignments(&CourseIdsQuery::single(course_id))
            .await?;
        Ok(response
            .courses
            .into_iter()
            .next()
            .map(|course| course.assignments)
            .unwrap_or_default())
    }

    pub async fn quizzes(&self, course_id: &str) -> Result<Vec<Quiz>> {
        let response = self
            .gateway
            .get_quizzes_by_courses(&CourseIdsQuery::single(course_id))
            .await?;
        Ok(response.quizzes)
    }

    #[instrument(skip(self, feedback))]
    pub async fn provide_feedback(
        &self,
        assignment_id: i64,
        student_id: i64,
        grade: f64,
        feedback: &str,
    ) -> Result<Value> {
        self.gateway
            .save_grade(&SaveGradeQuery::new(assignment_id, student_id, grade, feedback))
            .await
    }

    pub async fn submission_content(&self, assignment_id: i64, student_id: i64) -> Result<SubmissionContent> {
        let status = self
            .gateway
            .get_submission_status(&SubmissionStatusQuery {
                assignid: assignment_id,
                userid: student_id,
            })
            .await?;
        Ok(SubmissionContent {
            text: status.submission_text(),
            files: status.submitted_files().into_iter().cloned().collect(),
            status,
        })
    }

    pub async fn quiz_grade(&self, quiz_id: i64, student_id: i64) -> Result<QuizBestGrade> {
        self.gateway
            .get_user_best_quiz_grade(&QuizBestGradeQuery {
                quizid: quiz_id,
                userid: student_id,
            })
            .await
    }
}
