use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, info, instrument};

use crate::constants::NOT_GRADED;
use crate::error::Result;
use crate::gateway::Gateway;
use crate::observability::metrics;
use crate::webservice::queries::{AssignmentGradesQuery, SubmissionsQuery};
use crate::webservice::types::{GradeRecord, Submission};

/// Grade attached to a submission. Serializes as the number, or as the
/// `"Not graded"` sentinel when no grade record matched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GradeMark {
    Graded(f64),
    NotGraded,
}

impl Serialize for GradeMark {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            GradeMark::Graded(grade) => serializer.serialize_f64(*grade),
            GradeMark::NotGraded => serializer.serialize_str(NOT_GRADED),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionsFilter {
    #[serde(default)]
    pub assignment_id: Option<i64>,
    #[serde(default)]
    pub student_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradedSubmission {
    pub assignmentid: i64,
    #[serde(flatten)]
    pub submission: Submission,
    /// ISO-8601 rendering of `timemodified`; `None` when out of range.
    pub submitted_at: Option<String>,
    pub grade: GradeMark,
}

/// Seconds since the epoch as `2024-01-01T00:00:00.000Z`.
pub fn iso_timestamp(secs: i64) -> Option<String> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Attaches to each submission the first grade with the same user and assignment.
///
/// Moodle stores a cleared grade as `-1`, so negative values count as not graded.
///
/// When `student_id` is set, other users' submissions are dropped first.
pub fn join_with_grades(
    submissions: Vec<(i64, Submission)>,
    grades: &[(i64, GradeRecord)],
    student_id: Option<i64>,
) -> Vec<GradedSubmission> {
    submissions
        .into_iter()
        .filter(|(_, s)| student_id.map_or(true, |id| s.userid == id))
        .map(|(assignmentid, submission)| {
            let grade = grades
                .iter()
                .find(|(aid, g)| *aid == assignmentid && g.userid == submission.userid)
                .and_then(|(_, g)| g.grade.as_f64())
                .filter(|grade| *grade >= 0.0)
                .map_or(GradeMark::NotGraded, GradeMark::Graded);
            GradedSubmission {
                assignmentid,
                submitted_at: iso_timestamp(submission.timemodified),
                submission,
                grade,
            }
        })
        .collect()
}

/// Submissions joined with their grades. Either fetch failing aborts the whole run.
pub struct SubmissionsWithGradesUseCase {
    gateway: Arc<Gateway>,
}

impl SubmissionsWithGradesUseCase {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    #[instrument(skip(self))]
    pub async fn execute(&self, filter: &SubmissionsFilter) -> Result<Vec<GradedSubmission>> {
        let outcome = self.run(filter).await;
        metrics::usecase::run("submissions_with_grades", if outcome.is_ok() { "ok" } else { "aborted" });
        outcome
    }

    async fn run(&self, filter: &SubmissionsFilter) -> Result<Vec<GradedSubmission>> {
        let query = SubmissionsQuery {
            assignmentids: filter.assignment_id.map(|id| vec![id]),
            ..Default::default()
        };
        let submissions = self.gateway.get_submissions(&query).await?.into_flat();

        let assignmentids: Vec<i64> = match filter.assignment_id {
            Some(id) => vec![id],
            None => submissions
                .iter()
                .map(|(aid, _)| *aid)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
        };
        if assignmentids.is_empty() {
            debug!("no submissions returned; skipping grade fetch");
            return Ok(Vec::new());
        }

        let grades = self
            .gateway
            .get_assignment_grades(&AssignmentGradesQuery {
                assignmentids,
                since: None,
            })
            .await?
            .into_flat();

        let joined = join_with_grades(submissions, &grades, filter.student_id);
        info!(submissions = joined.len(), grades = grades.len(), "joined submissions with grades");
        Ok(joined)
    }
}
