//! Echo plugin set: a minimal service used for deployment smoke tests.
//!
//! The `echo` sub-parser reports each payload's size and UTF-8 text; the
//! top-level parser groups outputs by sub-parser name and passes the job
//! metadata through.

use serde_json::{json, Value};

use crate::diagnostics::DiagnosticSink;
use crate::job::{Metadata, SubParserOutput};
use crate::plugin::{Parser, PluginError, PluginSet, SubParser};

pub const SERVICE_NAME: &str = "echo";

struct EchoSubParser;

impl SubParser for EchoSubParser {
    fn parse(
        &self,
        data: &[u8],
        _metadata: &Metadata,
        diag: &DiagnosticSink,
    ) -> Result<Value, PluginError> {
        diag.write(&format!("echo: {} bytes", data.len()));
        Ok(json!({
            "size": data.len(),
            "text": String::from_utf8_lossy(data),
        }))
    }
}

struct EchoParser;

impl Parser for EchoParser {
    fn parse(
        &self,
        outputs: &[SubParserOutput],
        metadata: &Metadata,
        _diag: &DiagnosticSink,
    ) -> Result<Value, PluginError> {
        let mut results: serde_json::Map<String, Value> = serde_json::Map::new();
        for output in outputs {
            let slot = results
                .entry(output.sub_parser.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(values) = slot {
                values.push(output.value.clone());
            }
        }

        Ok(json!({
            "results": results,
            "metadata": metadata,
        }))
    }
}

/// Build the echo plugin set
pub fn plugin_set() -> PluginSet {
    let mut set = PluginSet::new(Box::new(EchoParser));
    set.register_sub_parser("echo", Box::new(EchoSubParser));
    set
}
