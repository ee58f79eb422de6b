//! Wire events of the extraction stream.
//!
//! One JSON object per line, tagged by `"type"`:
//!
//! ```text
//! {"type":"progress","processed_pages":N,"total_pages":M}
//! {"type":"data","extracted_data":[{"text":..,"bbox":[x0,y0,x1,y1],"page_num":..}],"is_complete":bool}
//! {"type":"warning","message":..}
//! {"type":"error","message":..}
//! ```
//!
//! Decoding only checks shape. Whether a chunk is worth displaying is
//! decided later by the accumulator.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::overlay::BBox;

/// Event tags understood by [`decode`].
const KNOWN_TYPES: [&str; 4] = ["progress", "data", "warning", "error"];

/// Longest excerpt of a bad record kept for diagnostics.
const RAW_EXCERPT_CHARS: usize = 120;

/// A text block as sent by the backend, before validation.
///
/// Fields are kept as raw JSON so that one badly typed chunk never takes
/// the rest of its `data` event down with it. Missing fields are `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct RawChunk {
    pub text: Value,
    pub bbox: Value,
    pub page_num: Value,
}

impl From<Value> for RawChunk {
    fn from(value: Value) -> Self {
        let Value::Object(mut fields) = value else {
            return Self::default();
        };
        let mut take = |key: &str| fields.remove(key).unwrap_or(Value::Null);
        Self {
            text: take("text"),
            bbox: take("bbox"),
            page_num: take("page_num"),
        }
    }
}

impl RawChunk {
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_str()
    }

    /// Coordinates in wire order. Anything that is not a number is `None`.
    #[must_use]
    pub fn coords(&self) -> Option<Vec<Option<f64>>> {
        self.bbox
            .as_array()
            .map(|coords| coords.iter().map(Value::as_f64).collect())
    }

    /// 1-based page number, if the wire value is a positive integer.
    #[must_use]
    pub fn page(&self) -> Option<u32> {
        self.page_num
            .as_u64()
            .and_then(|p| u32::try_from(p).ok())
            .filter(|&p| p >= 1)
    }
}

/// A displayable text block with its normalized position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChunk {
    pub text: String,
    pub bbox: BBox,
    pub page_num: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Progress {
        processed_pages: u64,
        total_pages: u64,
    },
    Data {
        #[serde(default)]
        extracted_data: Vec<RawChunk>,
        #[serde(default)]
        is_complete: bool,
    },
    Warning {
        message: String,
    },
    Error {
        message: String,
    },
}

impl StreamEvent {
    /// Wire tag of this event.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Progress { .. } => "progress",
            Self::Data { .. } => "data",
            Self::Warning { .. } => "warning",
            Self::Error { .. } => "error",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FailureReason {
    #[error("invalid JSON: {0}")]
    Syntax(String),

    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("missing \"type\" tag")]
    MissingType,

    #[error("unknown event type {0:?}")]
    UnknownType(String),

    #[error("malformed {kind} event: {detail}")]
    Shape { kind: String, detail: String },
}

/// A record that could not be turned into a [`StreamEvent`].
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{reason}")]
pub struct DecodeFailure {
    pub raw: String,
    pub reason: FailureReason,
}

impl DecodeFailure {
    fn new(raw: &str, reason: FailureReason) -> Self {
        Self { raw: raw.to_string(), reason }
    }

    /// Leading part of the raw record, for log lines.
    #[must_use]
    pub fn excerpt(&self) -> String {
        let trimmed = self.raw.trim();
        if trimmed.chars().count() <= RAW_EXCERPT_CHARS {
            return trimmed.to_string();
        }
        let head: String = trimmed.chars().take(RAW_EXCERPT_CHARS).collect();
        format!("{head}…")
    }
}

/// Decode one NDJSON record.
///
/// Returns `None` for blank records.
pub fn decode(record: &str) -> Option<Result<StreamEvent, DecodeFailure>> {
    let trimmed = record.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(decode_value(trimmed))
}

fn decode_value(record: &str) -> Result<StreamEvent, DecodeFailure> {
    let value: Value = serde_json::from_str(record)
        .map_err(|e| DecodeFailure::new(record, FailureReason::Syntax(e.to_string())))?;

    let Some(object) = value.as_object() else {
        return Err(DecodeFailure::new(record, FailureReason::NotAnObject));
    };
    let kind = match object.get("type") {
        Some(Value::String(kind)) => kind.clone(),
        _ => return Err(DecodeFailure::new(record, FailureReason::MissingType)),
    };
    if !KNOWN_TYPES.contains(&kind.as_str()) {
        return Err(DecodeFailure::new(record, FailureReason::UnknownType(kind)));
    }

    serde_json::from_value(value).map_err(|e| {
        DecodeFailure::new(
            record,
            FailureReason::Shape {
                kind,
                detail: e.to_string(),
            },
        )
    })
}
