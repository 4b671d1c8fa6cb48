//! The gateway: validate query → build request → execute → classify response.
//!
//! A [`Gateway`] is immutable after construction and holds no shared mutable
//! state, so one instance can serve concurrent callers behind an `Arc`.

use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::app::ports::TransportPort;
use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result, SchemaIssue};
use crate::infra::http_client::ReqwestTransport;
use crate::observability::metrics;
use crate::request::RequestBuilder;
use crate::response::{classify, ResponseMode, Validated};
use crate::webservice::queries::{
    AssignmentGradesQuery, CourseGradesQuery, CourseIdsQuery, EnrolledUsersQuery,
    QuizBestGradeQuery, SaveGradeQuery, SubmissionStatusQuery, SubmissionsQuery,
    UnenrolUsersQuery,
};
use crate::webservice::registry::{self, Descriptor};
use crate::webservice::types::{
    AssignmentGradesResponse, AssignmentsResponse, CourseGradesResponse, EnrolledUser,
    QuizBestGrade, QuizzesResponse, SubmissionStatus, SubmissionsResponse,
};
use crate::webservice::{
    GetAssignmentGrades, GetAssignments, GetCourseGrades, GetEnrolledUsers,
    GetQuizzesByCourses, GetSubmissionStatus, GetSubmissions, GetUserBestQuizGrade, SaveGrade,
    UnenrolUsers, Webservice,
};

pub struct Gateway {
    builder: RequestBuilder,
    transport: Arc<dyn TransportPort>,
    mode: ResponseMode,
}

impl Gateway {
    /// Gateway over the production `reqwest` transport.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let config = config.clone().validated()?;
        let transport = ReqwestTransport::new(config.timeout())
            .map_err(|e| GatewayError::Config(format!("cannot build HTTP client: {}", e)))?;
        Self::with_transport(&config, Arc::new(transport))
    }

    /// Fails with [`GatewayError::Config`] when base URL or token is missing.
    pub fn with_transport(config: &GatewayConfig, transport: Arc<dyn TransportPort>) -> Result<Self> {
        let config = config.clone().validated()?;
        Ok(Self {
            builder: RequestBuilder::new(&config.base_url, config.token, config.encoding),
            transport,
            mode: config.response_mode,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.builder.endpoint()
    }

    pub fn mode(&self) -> ResponseMode {
        self.mode
    }

    /// Typed call. In safe mode shape drift comes back as `Ok(Validated::Invalid)`.
    pub async fn call<W: Webservice>(&self, query: &W::Query) -> Result<Validated<W::Output>> {
        let descriptor = registry::descriptor(W::OPERATION);
        let input = serde_json::to_value(query).map_err(|e| GatewayError::InvalidQuery {
            operation: W::OPERATION,
            issues: vec![SchemaIssue {
                path: String::new(),
                message: e.to_string(),
            }],
        })?;
        self.run(descriptor, input).await
    }

    /// Typed call with shape drift folded into [`GatewayError::Shape`].
    pub async fn invoke<W: Webservice>(&self, query: &W::Query) -> Result<W::Output> {
        self.call::<W>(query)
            .await?
            .into_result(registry::descriptor(W::OPERATION))
    }

    /// String-keyed entry point for routers and tool servers holding untyped JSON.
    pub async fn call_named(&self, name: &str, input: Value) -> Result<Validated<Value>> {
        let descriptor = registry::lookup(name)?;
        self.run(descriptor, input).await
    }

    pub async fn invoke_named(&self, name: &str, input: Value) -> Result<Value> {
        let descriptor = registry::lookup(name)?;
        self.run(descriptor, input).await?.into_result(descriptor)
    }

    #[instrument(skip_all, fields(operation = %descriptor.operation))]
    async fn run<T: DeserializeOwned>(&self, descriptor: &'static Descriptor, input: Value) -> Result<Validated<T>> {
        let started = Instant::now();
        let outcome = self.exchange(descriptor, input).await.and_then(|raw| classify(descriptor, raw, self.mode));

        let name = descriptor.name();
        metrics::gateway::call_duration(name, started.elapsed().as_secs_f64());
        match &outcome {
            Ok(Validated::Valid(_)) => metrics::gateway::call_success(name),
            Ok(Validated::Invalid { .. }) => metrics::gateway::call_error(name, "invalid_response"),
            Err(e) => metrics::gateway::call_error(name, e.kind().as_str()),
        }
        outcome
    }

    async fn exchange(&self, descriptor: &'static Descriptor, input: Value) -> Result<Value> {
        // Query validation happens before anything touches the network
        let wire_query = descriptor.prepare_query(input)?;
        let request = self.builder.build(descriptor.operation, &wire_query);
        debug!(url = %request.redacted_url(), "dispatching webservice call");
        self.transport
            .execute(&request)
            .await
            .map_err(|source| GatewayError::Transport {
                operation: descriptor.operation,
                source,
            })
    }

    pub async fn get_enrolled_users(&self, query: &EnrolledUsersQuery) -> Result<Vec<EnrolledUser>> {
        self.invoke::<GetEnrolledUsers>(query).await
    }

    pub async fn get_assignments(&self, query: &CourseIdsQuery) -> Result<AssignmentsResponse> {
        self.invoke::<GetAssignments>(query).await
    }

    pub async fn get_quizzes_by_courses(&self, query: &CourseIdsQuery) -> Result<QuizzesResponse> {
        self.invoke::<GetQuizzesByCourses>(query).await
    }

    pub async fn get_submissions(&self, query: &SubmissionsQuery) -> Result<SubmissionsResponse> {
        self.invoke::<GetSubmissions>(query).await
    }

    pub async fn get_assignment_grades(&self, query: &AssignmentGradesQuery) -> Result<AssignmentGradesResponse> {
        self.invoke::<GetAssignmentGrades>(query).await
    }

    pub async fn get_course_grades(&self, query: &CourseGradesQuery) -> Result<CourseGradesResponse> {
        self.invoke::<GetCourseGrades>(query).await
    }

    pub async fn save_grade(&self, query: &SaveGradeQuery) -> Result<Value> {
        self.invoke::<SaveGrade>(query).await
    }

    pub async fn get_submission_status(&self, query: &SubmissionStatusQuery) -> Result<SubmissionStatus> {
        self.invoke::<GetSubmissionStatus>(query).await
    }

    pub async fn get_user_best_quiz_grade(&self, query: &QuizBestGradeQuery) -> Result<QuizBestGrade> {
        self.invoke::<GetUserBestQuizGrade>(query).await
    }

    pub async fn unenrol_users(&self, query: &UnenrolUsersQuery) -> Result<Value> {
        self.invoke::<UnenrolUsers>(query).await
    }
}
