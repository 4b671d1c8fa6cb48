//! Static registry of operation descriptors.
//!
//! Schemas are derived from the query/output types with `schemars` and
//! compiled once into `jsonschema` validators on first use.

use jsonschema::JSONSchema;
use once_cell::sync::Lazy;
use schemars::gen::SchemaGenerator;
use serde_json::Value;

use super::queries::WireQuery;
use super::*;
use crate::error::{GatewayError, SchemaIssue};

type PrepareFn = fn(Value) -> Result<Value, serde_json::Error>;

struct Binding {
    query_schema: Value,
    output_schema: Value,
    prepare: PrepareFn,
}

impl Binding {
    fn of<W: Webservice>() -> Self {
        Self {
            query_schema: schema_json(SchemaGenerator::default().into_root_schema_for::<W::Query>()),
            output_schema: schema_json(SchemaGenerator::default().into_root_schema_for::<W::Output>()),
            prepare: prepare_wire::<W>,
        }
    }
}

fn schema_json(schema: schemars::schema::RootSchema) -> Value {
    serde_json::to_value(schema).expect("generated schema serializes")
}

fn prepare_wire<W: Webservice>(input: Value) -> Result<Value, serde_json::Error> {
    let query: W::Query = serde_json::from_value(input)?;
    query.wire_value()
}

fn binding(op: Operation) -> Binding {
    match op {
        Operation::CoreEnrolGetEnrolledUsers => Binding::of::<GetEnrolledUsers>(),
        Operation::ModAssignGetAssignments => Binding::of::<GetAssignments>(),
        Operation::ModQuizGetQuizzesByCourses => Binding::of::<GetQuizzesByCourses>(),
        Operation::ModAssignGetSubmissions => Binding::of::<GetSubmissions>(),
        Operation::ModAssignGetGrades => Binding::of::<GetAssignmentGrades>(),
        Operation::CoreGradesGetGrades => Binding::of::<GetCourseGrades>(),
        Operation::ModAssignSaveGrade => Binding::of::<SaveGrade>(),
        Operation::ModAssignGetSubmissionStatus => Binding::of::<GetSubmissionStatus>(),
        Operation::ModQuizGetUserBestGrade => Binding::of::<GetUserBestQuizGrade>(),
        Operation::EnrolManualUnenrolUsers => Binding::of::<UnenrolUsers>(),
    }
}

// Indexed by `Operation as usize`, which follows `Operation::ALL`.
static BINDINGS: Lazy<Vec<Binding>> = Lazy::new(|| Operation::ALL.iter().map(|op| binding(*op)).collect());

static REGISTRY: Lazy<Vec<Descriptor>> = Lazy::new(|| {
    Operation::ALL
        .iter()
        .zip(BINDINGS.iter())
        .map(|(op, binding)| Descriptor::compile(*op, binding))
        .collect()
});

/// Immutable (operation, query validator, output validator) triple.
pub struct Descriptor {
    pub operation: Operation,
    query_schema: &'static Value,
    output_schema: &'static Value,
    query_validator: JSONSchema,
    output_validator: JSONSchema,
    prepare: PrepareFn,
}

impl Descriptor {
    fn compile(operation: Operation, binding: &'static Binding) -> Self {
        let query_validator = JSONSchema::compile(&binding.query_schema)
            .unwrap_or_else(|e| panic!("query schema of {} must compile: {}", operation, e));
        let output_validator = JSONSchema::compile(&binding.output_schema)
            .unwrap_or_else(|e| panic!("output schema of {} must compile: {}", operation, e));
        Self {
            operation,
            query_schema: &binding.query_schema,
            output_schema: &binding.output_schema,
            query_validator,
            output_validator,
            prepare: binding.prepare,
        }
    }

    pub fn name(&self) -> &'static str {
        self.operation.wire_name()
    }

    /// JSON Schema of the caller-facing query, e.g. for tool parameter declarations.
    pub fn query_schema(&self) -> &'static Value {
        self.query_schema
    }

    pub fn output_schema(&self) -> &'static Value {
        self.output_schema
    }

    pub fn validate_query(&self, input: &Value) -> Result<(), Vec<SchemaIssue>> {
        check(&self.query_validator, input)
    }

    pub fn validate_output(&self, raw: &Value) -> Result<(), Vec<SchemaIssue>> {
        check(&self.output_validator, raw)
    }

    /// Validates caller input and converts it into the parameter tree sent to Moodle.
    pub fn prepare_query(&self, input: Value) -> Result<Value, GatewayError> {
        self.validate_query(&input).map_err(|issues| self.invalid_query(issues))?;
        (self.prepare)(input).map_err(|e| {
            self.invalid_query(vec![SchemaIssue {
                path: String::new(),
                message: e.to_string(),
            }])
        })
    }

    fn invalid_query(&self, issues: Vec<SchemaIssue>) -> GatewayError {
        GatewayError::InvalidQuery {
            operation: self.operation,
            issues,
        }
    }
}

fn check(validator: &JSONSchema, instance: &Value) -> Result<(), Vec<SchemaIssue>> {
    match validator.validate(instance) {
        Ok(()) => Ok(()),
        Err(errors) => Err(errors
            .map(|e| SchemaIssue {
                path: e.instance_path.to_string(),
                message: e.to_string(),
            })
            .collect()),
    }
}

pub fn descriptor(operation: Operation) -> &'static Descriptor {
    &REGISTRY[operation as usize]
}

/// Resolves a `wsfunction` name; names outside the closed set fail with
/// [`GatewayError::UnknownOperation`].
pub fn lookup(name: &str) -> Result<&'static Descriptor, GatewayError> {
    let operation: Operation = name.parse()?;
    Ok(descriptor(operation))
}

pub fn supported_operations() -> impl Iterator<Item = &'static str> {
    Operation::ALL.iter().map(|op| op.wire_name())
}
