use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use moodle_gateway::app::course_use_case::CourseUseCase;
use moodle_gateway::app::envelope::{FanOutEnvelope, UsecaseEnvelope};
use moodle_gateway::app::submissions_use_case::{SubmissionsFilter, SubmissionsWithGradesUseCase};
use moodle_gateway::app::unenroll_use_case::UnenrollSuspendedUseCase;
use moodle_gateway::observability::{self, metrics};
use moodle_gateway::webservice::registry;
use moodle_gateway::{Gateway, GatewayConfig};

#[derive(Parser)]
#[command(name = "moodle-gateway")]
#[command(about = "Schema-validated client for the Moodle REST webservice API")]
#[command(version)]
struct Cli {
    /// TOML file with a [moodle] table; MOODLE_* environment variables are used otherwise
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Also write JSON logs to a daily-rotated file in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    /// Print a Prometheus snapshot of the run's metrics to stderr at exit
    #[arg(long, global = true)]
    print_metrics: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported webservice functions
    Operations {
        /// Include the query and output JSON schemas
        #[arg(long)]
        schemas: bool,
    },
    #[command(flatten)]
    Gateway(GatewayCommand),
}

/// Commands that need a configured gateway
#[derive(Subcommand)]
enum GatewayCommand {
    /// Call any supported function with a JSON query
    Call {
        operation: String,
        #[arg(long, default_value = "{}")]
        query: String,
    },
    /// Users enrolled in a course
    Students {
        #[arg(long)]
        course: String,
    },
    /// Assignments of a course
    Assignments {
        #[arg(long)]
        course: String,
    },
    /// Quizzes of a course
    Quizzes {
        #[arg(long)]
        course: String,
    },
    /// Submissions joined with their grades
    Submissions {
        #[arg(long)]
        assignment: Option<i64>,
        #[arg(long)]
        student: Option<i64>,
    },
    /// Grade a submission and leave a feedback comment
    Feedback {
        #[arg(long)]
        assignment: i64,
        #[arg(long)]
        student: i64,
        #[arg(long)]
        grade: f64,
        #[arg(long, default_value = "")]
        feedback: String,
    },
    /// Text and files of a student's submission
    SubmissionContent {
        #[arg(long)]
        assignment: i64,
        #[arg(long)]
        student: i64,
    },
    /// A student's best grade on a quiz
    QuizGrade {
        #[arg(long)]
        quiz: i64,
        #[arg(long)]
        student: i64,
    },
    /// Unenrol every suspended user of a course
    UnenrollSuspended {
        #[arg(long)]
        course: i64,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Prints a usecase envelope and reports whether it succeeded.
fn emit<T: Serialize>(envelope: UsecaseEnvelope<T>) -> Result<bool> {
    print_json(&envelope)?;
    Ok(envelope.success)
}

fn list_operations(schemas: bool) -> Result<bool> {
    let listing: Vec<Value> = registry::supported_operations()
        .map(|name| -> Result<Value> {
            let descriptor = registry::lookup(name)?;
            Ok(if schemas {
                serde_json::json!({
                    "name": name,
                    "query_schema": descriptor.query_schema(),
                    "output_schema": descriptor.output_schema(),
                })
            } else {
                Value::String(name.to_string())
            })
        })
        .collect::<Result<_>>()?;
    print_json(&listing)?;
    Ok(true)
}

async fn run(command: GatewayCommand, config: GatewayConfig) -> Result<bool> {
    let concurrency = config.fanout_concurrency;
    let gateway = Arc::new(Gateway::from_config(&config)?);
    info!(endpoint = %gateway.endpoint(), mode = ?gateway.mode(), "gateway ready");
    let course = CourseUseCase::new(gateway.clone());

    match command {
        GatewayCommand::Call { operation, query } => {
            let input: Value = serde_json::from_str(&query).context("--query must be a JSON object")?;
            let descriptor = match registry::lookup(&operation) {
                Ok(descriptor) => descriptor,
                Err(e) => return emit(UsecaseEnvelope::<Value>::failed(&e)),
            };
            match gateway.call_named(&operation, input).await {
                Ok(validated) => {
                    print_json(&validated.to_envelope(descriptor))?;
                    Ok(validated.is_valid())
                }
                Err(e) => emit(UsecaseEnvelope::<Value>::failed(&e)),
            }
        }
        GatewayCommand::Students { course: id } => emit(UsecaseEnvelope::from(course.students(&id).await)),
        GatewayCommand::Assignments { course: id } => emit(UsecaseEnvelope::from(course.assignments(&id).await)),
        GatewayCommand::Quizzes { course: id } => emit(UsecaseEnvelope::from(course.quizzes(&id).await)),
        GatewayCommand::Submissions { assignment, student } => {
            let filter = SubmissionsFilter {
                assignment_id: assignment,
                student_id: student,
            };
            let usecase = SubmissionsWithGradesUseCase::new(gateway.clone());
            emit(UsecaseEnvelope::from(usecase.execute(&filter).await))
        }
        GatewayCommand::Feedback {
            assignment,
            student,
            grade,
            feedback,
        } => emit(UsecaseEnvelope::from(
            course
                .provide_feedback(assignment, student, grade, &feedback)
                .await,
        )),
        GatewayCommand::SubmissionContent { assignment, student } => {
            emit(UsecaseEnvelope::from(course.submission_content(assignment, student).await))
        }
        GatewayCommand::QuizGrade { quiz, student } => emit(UsecaseEnvelope::from(course.quiz_grade(quiz, student).await)),
        GatewayCommand::UnenrollSuspended { course: id } => {
            let usecase = UnenrollSuspendedUseCase::new(gateway.clone(), concurrency);
            match usecase.execute(id).await {
                Ok(outcomes) => {
                    let envelope = FanOutEnvelope::from_outcomes(outcomes, |o| o.is_success());
                    print_json(&envelope)?;
                    Ok(envelope.failed == 0)
                }
                Err(e) => emit(UsecaseEnvelope::<()>::failed(&e)),
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let _log_guard = observability::init_logging(cli.log_dir.as_deref());

    let metrics_handle = if cli.print_metrics {
        Some(metrics::init().map_err(|e| anyhow::anyhow!("{}", e))?)
    } else {
        None
    };

    let succeeded = match cli.command {
        Commands::Operations { schemas } => list_operations(schemas)?,
        Commands::Gateway(command) => {
            let config = GatewayConfig::load(cli.config.as_deref())
                .context("Failed to load gateway configuration")?;
            run(command, config).await.map_err(|e| {
                error!("{:#}", e);
                e
            })?
        }
    };

    if let Some(handle) = metrics_handle {
        eprintln!("{}", handle.render());
    }

    Ok(if succeeded { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
