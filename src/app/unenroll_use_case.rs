use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::error::{ErrorDetail, Result};
use crate::gateway::Gateway;
use crate::observability::metrics;
use crate::webservice::queries::{EnrolledUsersOption, EnrolledUsersQuery, UnenrolUsersQuery};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnenrolStatus {
    Unenrolled,
    Failed { error: ErrorDetail },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnenrolOutcome {
    pub userid: i64,
    #[serde(flatten)]
    pub status: UnenrolStatus,
}

impl UnenrolOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, UnenrolStatus::Unenrolled)
    }
}

/// Removes every suspended user from a course, one unenrolment call per user.
///
/// Only the suspended-users fetch can abort the run; per-user failures are
/// collected as outcomes. Outcome order follows completion, not input order.
pub struct UnenrollSuspendedUseCase {
    gateway: Arc<Gateway>,
    concurrency: usize,
}

impl UnenrollSuspendedUseCase {
    pub fn new(gateway: Arc<Gateway>, concurrency: usize) -> Self {
        Self {
            gateway,
            concurrency: concurrency.max(1),
        }
    }

    #[instrument(skip(self))]
    pub async fn execute(&self, course_id: i64) -> Result<Vec<UnenrolOutcome>> {
        let query = EnrolledUsersQuery::for_course(course_id.to_string())
            .with_option(EnrolledUsersOption::OnlySuspended(true));
        let suspended = match self.gateway.get_enrolled_users(&query).await {
            Ok(users) => users,
            Err(e) => {
                metrics::usecase::run("unenroll_suspended", "aborted");
                return Err(e);
            }
        };
        info!(course_id, suspended = suspended.len(), "unenrolling suspended users");

        let outcomes: Vec<UnenrolOutcome> = stream::iter(suspended.into_iter().map(|user| user.id))
            .map(|userid| self.unenrol_one(course_id, userid))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        metrics::usecase::run("unenroll_suspended", "ok");
        Ok(outcomes)
    }

    async fn unenrol_one(&self, course_id: i64, userid: i64) -> UnenrolOutcome {
        let status = match self
            .gateway
            .unenrol_users(&UnenrolUsersQuery::single(userid, course_id))
            .await
        {
            Ok(_) => UnenrolStatus::Unenrolled,
            Err(e) => {
                warn!(userid, course_id, error = %e, "unenrolment failed");
                UnenrolStatus::Failed {
                    error: ErrorDetail::from(&e),
                }
            }
        };
        metrics::usecase::unenrol_outcome(matches!(status, UnenrolStatus::Unenrolled));
        UnenrolOutcome { userid, status }
    }
}
