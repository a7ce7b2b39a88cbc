//! Dispatch engine: runs a decoded job through its sub-parsers and the
//! top-level parser.
//!
//! Sub-parsers are invoked in input-list order. The first unknown name or
//! failed invocation aborts the job with no partial results; the top-level
//! parser runs only once every sub-parser has produced an output.

use serde_json::Value;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::diagnostics::DiagnosticSink;
use crate::job::{Job, SubParserOutput};
use crate::plugin::{PluginError, PluginSet};

/// Error type for job dispatch
#[derive(Debug, Clone)]
pub enum DispatchError {
    UnknownSubParser(String),
    SubParser {
        sub_parser: String,
        error: PluginError,
    },
    Parser(PluginError),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::UnknownSubParser(name) => {
                write!(f, "Unknown sub-parser: {}", name)
            }
            DispatchError::SubParser { sub_parser, error } => {
                write!(f, "Sub-parser '{}' failed: {}", sub_parser, error)
            }
            DispatchError::Parser(error) => {
                write!(f, "Parser failed: {}", error)
            }
        }
    }
}

impl std::error::Error for DispatchError {}

/// Run one job to completion.
///
/// # Arguments
/// * `job` - The decoded job
/// * `plugins` - The service's plugin set
/// * `diag` - Diagnostic sink scoped to this job's invocation window
///
/// # Returns
/// The top-level parser's result value, ready to serialize as the success
/// reply body.
///
/// # Errors
/// Returns `DispatchError` on the first unknown sub-parser name, the first
/// failed sub-parser invocation, or a top-level parser failure. Every
/// failure aborts the job; no partial results are returned.
pub fn dispatch(
    job: &Job,
    plugins: &PluginSet,
    diag: &DiagnosticSink,
) -> Result<Value, DispatchError> {
    let mut outputs = Vec::with_capacity(job.inputs.len());

    for input in &job.inputs {
        let sub_parser = plugins
            .sub_parser(&input.sub_parser)
            .ok_or_else(|| DispatchError::UnknownSubParser(input.sub_parser.clone()))?;

        let value = run_plugin(|| sub_parser.parse(&input.data, &job.metadata, diag))
            .map_err(|error| DispatchError::SubParser {
                sub_parser: input.sub_parser.clone(),
                error,
            })?;

        outputs.push(SubParserOutput {
            sub_parser: input.sub_parser.clone(),
            value,
        });
    }

    run_plugin(|| plugins.parser().parse(&outputs, &job.metadata, diag))
        .map_err(DispatchError::Parser)
}

/// Invoke a plugin, converting a panic into an execution failure.
///
/// A panicking plugin is reported as that job's failure, not a worker
/// crash.
fn run_plugin<T>(call: impl FnOnce() -> Result<T, PluginError>) -> Result<T, PluginError> {
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result,
        Err(payload) => Err(PluginError::Execution(panic_text(payload.as_ref()))),
    }
}

fn panic_text(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "plugin panicked".to_string()
    }
}
