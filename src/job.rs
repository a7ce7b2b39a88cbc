//! Job decoding: one broker message body becomes one structured parse job.
//!
//! A job carries open metadata plus an ordered list of sub-parser payloads.
//! Decoding is a pure transform with no side effects. Referencing a
//! sub-parser name that is not registered is *not* a decode failure; that
//! check happens at dispatch time.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::Value;
use std::fmt;

/// Open, string-keyed metadata passed through unmodified to every parser
/// invocation.
pub type Metadata = serde_json::Map<String, Value>;

/// Error type for job decoding
#[derive(Debug, Clone)]
pub enum DecodeError {
    InvalidJson(String),
    MissingMetadata,
    MissingData,
    MissingEntryField { index: usize, field: &'static str },
    InvalidEncoding { index: usize, reason: String },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::InvalidJson(msg) => {
                write!(f, "Request body is not valid JSON: {}", msg)
            }
            DecodeError::MissingMetadata => {
                write!(f, "Request body has no 'metadata' object")
            }
            DecodeError::MissingData => {
                write!(f, "Request body has no 'data' array")
            }
            DecodeError::MissingEntryField { index, field } => {
                write!(f, "Data entry {} has no string field '{}'", index, field)
            }
            DecodeError::InvalidEncoding { index, reason } => {
                write!(f, "Data entry {} is not valid base64: {}", index, reason)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// One payload entry of an incoming job: a sub-parser name and the raw
/// bytes it should parse.
#[derive(Debug, Clone, PartialEq)]
pub struct SubParserInput {
    pub sub_parser: String,
    pub data: Vec<u8>,
}

/// The result of running one sub-parser over one payload entry.
///
/// Output order matches input order; the top-level parser may rely on
/// positional semantics of its input list.
#[derive(Debug, Clone, PartialEq)]
pub struct SubParserOutput {
    pub sub_parser: String,
    pub value: Value,
}

/// A decoded parse job: metadata plus ordered sub-parser payloads.
///
/// Lives for the duration of one dispatch and is never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub metadata: Metadata,
    pub inputs: Vec<SubParserInput>,
}

impl Job {
    /// Decode a raw message body into a job.
    ///
    /// # Arguments
    /// * `body` - Raw message body bytes
    ///
    /// # Returns
    /// The decoded job. Decoding is deterministic: the same body always
    /// yields a structurally equal job.
    ///
    /// # Errors
    /// Returns `DecodeError` if the body is not well-formed JSON, the
    /// `metadata` object or `data` array is missing, an entry lacks its
    /// `sub_parser` or `data` string field, or a data field is not valid
    /// base64.
    pub fn decode(body: &[u8]) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| DecodeError::InvalidJson(e.to_string()))?;

        let metadata = value
            .get("metadata")
            .and_then(|m| m.as_object())
            .cloned()
            .ok_or(DecodeError::MissingMetadata)?;

        let entries = value
            .get("data")
            .and_then(|d| d.as_array())
            .ok_or(DecodeError::MissingData)?;

        let mut inputs = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let sub_parser = entry
                .get("sub_parser")
                .and_then(|v| v.as_str())
                .ok_or(DecodeError::MissingEntryField {
                    index,
                    field: "sub_parser",
                })?;

            let encoded = entry
                .get("data")
                .and_then(|v| v.as_str())
                .ok_or(DecodeError::MissingEntryField {
                    index,
                    field: "data",
                })?;

            let data = BASE64
                .decode(encoded)
                .map_err(|e| DecodeError::InvalidEncoding {
                    index,
                    reason: e.to_string(),
                })?;

            inputs.push(SubParserInput {
                sub_parser: sub_parser.to_string(),
                data,
            });
        }

        Ok(Job { metadata, inputs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[test]
    fn test_decode_well_formed_job() {
        let body = body(json!({
            "metadata": {"k": 1},
            "data": [
                {"sub_parser": "x", "data": "QUI="},
                {"sub_parser": "y", "data": ""}
            ]
        }));

        let job = Job::decode(&body).unwrap();

        assert_eq!(job.metadata.get("k"), Some(&json!(1)));
        assert_eq!(job.inputs.len(), 2);
        assert_eq!(job.inputs[0].sub_parser, "x");
        assert_eq!(job.inputs[0].data, b"AB");
        assert_eq!(job.inputs[1].sub_parser, "y");
        assert!(job.inputs[1].data.is_empty());
    }

    #[test]
    fn test_decode_is_deterministic() {
        let body = body(json!({
            "metadata": {"source": "test"},
            "data": [{"sub_parser": "x", "data": "QUI="}]
        }));

        assert_eq!(Job::decode(&body).unwrap(), Job::decode(&body).unwrap());
    }

    #[test]
    fn test_decode_unregistered_name_still_decodes() {
        // Unknown sub-parser names are a dispatch failure, not a decode one.
        let body = body(json!({
            "metadata": {},
            "data": [{"sub_parser": "no-such-parser", "data": "QUI="}]
        }));

        let job = Job::decode(&body).unwrap();
        assert_eq!(job.inputs[0].sub_parser, "no-such-parser");
    }

    #[test]
    fn test_decode_invalid_json() {
        let result = Job::decode(b"{not json");
        assert!(matches!(result, Err(DecodeError::InvalidJson(_))));
    }

    #[test]
    fn test_decode_missing_metadata() {
        let body = body(json!({"data": []}));
        assert!(matches!(Job::decode(&body), Err(DecodeError::MissingMetadata)));
    }

    #[test]
    fn test_decode_metadata_not_an_object() {
        let body = body(json!({"metadata": "oops", "data": []}));
        assert!(matches!(Job::decode(&body), Err(DecodeError::MissingMetadata)));
    }

    #[test]
    fn test_decode_missing_data() {
        let body = body(json!({"metadata": {}}));
        assert!(matches!(Job::decode(&body), Err(DecodeError::MissingData)));
    }

    #[test]
    fn test_decode_entry_missing_sub_parser() {
        let body = body(json!({
            "metadata": {},
            "data": [{"data": "QUI="}]
        }));

        assert!(matches!(
            Job::decode(&body),
            Err(DecodeError::MissingEntryField {
                index: 0,
                field: "sub_parser"
            })
        ));
    }

    #[test]
    fn test_decode_entry_missing_data_field() {
        let body = body(json!({
            "metadata": {},
            "data": [
                {"sub_parser": "x", "data": "QUI="},
                {"sub_parser": "y"}
            ]
        }));

        assert!(matches!(
            Job::decode(&body),
            Err(DecodeError::MissingEntryField {
                index: 1,
                field: "data"
            })
        ));
    }

    #[test]
    fn test_decode_invalid_base64() {
        let body = body(json!({
            "metadata": {},
            "data": [{"sub_parser": "x", "data": "not base64!"}]
        }));

        assert!(matches!(
            Job::decode(&body),
            Err(DecodeError::InvalidEncoding { index: 0, .. })
        ));
    }
}
