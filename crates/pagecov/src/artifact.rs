//! Raw V8 JS coverage artifacts.
//!
//! A [`CoverageArtifact`] is whatever the browser layer returned when
//! recording stopped. It is written to disk exactly as received: no
//! envelope, no version field, no schema check. The typed structs in this
//! module are a read-only view for tools that consume the files later.
//!
//! ## File shape
//!
//! ```text
//! [
//!   {
//!     "scriptId": "17",
//!     "url": "http://127.0.0.1:3000/main.js",
//!     "source": "...",
//!     "functions": [
//!       { "functionName": "", "isBlockCoverage": true,
//!         "ranges": [ { "startOffset": 0, "endOffset": 812, "count": 1 } ] }
//!     ]
//!   }
//! ]
//! ```

use crate::result::PagecovResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fixed file name of the per-test artifact
pub const ARTIFACT_FILE_NAME: &str = "v8-coverage.json";

/// Opaque coverage value returned by stopping a recorder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoverageArtifact(serde_json::Value);

impl CoverageArtifact {
    /// Wrap a raw JSON value
    #[must_use]
    pub const fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// An artifact with no scripts
    #[must_use]
    pub fn empty() -> Self {
        Self(serde_json::Value::Array(Vec::new()))
    }

    /// Borrow the raw value
    #[must_use]
    pub const fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    /// Take the raw value
    #[must_use]
    pub fn into_value(self) -> serde_json::Value {
        self.0
    }

    /// Serialize to compact JSON text, preserving key order
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be serialized
    pub fn to_json(&self) -> PagecovResult<String> {
        Ok(serde_json::to_string(&self.0)?)
    }

    /// Parse an artifact from JSON text
    ///
    /// # Errors
    ///
    /// Returns error if the text is not valid JSON
    pub fn from_json(text: &str) -> PagecovResult<Self> {
        Ok(Self(serde_json::from_str(text)?))
    }

    /// Interpret the artifact as a list of V8 script coverages
    ///
    /// # Errors
    ///
    /// Returns error if the value does not have the V8 shape
    pub fn scripts(&self) -> PagecovResult<Vec<ScriptCoverage>> {
        Ok(serde_json::from_value(self.0.clone())?)
    }
}

impl From<serde_json::Value> for CoverageArtifact {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// A range of bytes in a script with its execution count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageRange {
    /// Start offset (byte position)
    pub start_offset: u32,
    /// End offset (byte position)
    pub end_offset: u32,
    /// Number of times this range was executed
    pub count: u32,
}

/// Coverage data for a single function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCoverage {
    /// Function name (empty for anonymous functions and the script body)
    pub function_name: String,
    /// Ranges within this function
    pub ranges: Vec<CoverageRange>,
    /// Whether ranges are block-granular
    pub is_block_coverage: bool,
}

/// Coverage data for a single script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptCoverage {
    /// Script ID from CDP
    #[serde(default)]
    pub script_id: String,
    /// Script URL
    pub url: String,
    /// Script source, when the browser layer could fetch it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Functions in this script
    pub functions: Vec<FunctionCoverage>,
}

/// Scripts announced by `Debugger.scriptParsed` while recording.
///
/// Only these are reported when recording stops: anonymous scripts and
/// scripts the debugger did not announce during the recording are left
/// out. The source is captured
/// when the script is parsed, since a document the page navigated away from
/// can no longer be asked for it.
#[derive(Debug, Default, Clone)]
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
pub(crate) struct ParsedScripts {
    sources: HashMap<String, Option<String>>,
}

#[cfg_attr(not(feature = "browser"), allow(dead_code))]
impl ParsedScripts {
    /// Note a parsed script. Returns `false` for anonymous scripts, which
    /// are not tracked.
    pub(crate) fn record(&mut self, script_id: &str, url: &str) -> bool {
        if url.is_empty() {
            return false;
        }
        self.sources.entry(script_id.to_string()).or_insert(None);
        true
    }

    /// Attach the source of a tracked script
    pub(crate) fn set_source(&mut self, script_id: &str, source: String) {
        if let Some(slot) = self.sources.get_mut(script_id) {
            *slot = Some(source);
        }
    }

    /// Tracked scripts whose source is still unknown
    pub(crate) fn missing_sources(&self) -> Vec<String> {
        self.sources
            .iter()
            .filter(|(_, source)| source.is_none())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Keep the entries of a `Profiler.takePreciseCoverage` result that
    /// belong to tracked, named scripts and add their `source`
    pub(crate) fn report(&self, entries: Vec<serde_json::Value>) -> Vec<serde_json::Value> {
        entries
            .into_iter()
            .filter_map(|mut entry| {
                let id = entry.get("scriptId")?.as_str()?.to_string();
                let url = entry.get("url")?.as_str()?;
                if url.is_empty() {
                    return None;
                }
                let source = self.sources.get(&id)?;
                if let (Some(source), Some(obj)) = (source, entry.as_object_mut()) {
                    obj.insert(
                        "source".to_string(),
                        serde_json::Value::String(source.clone()),
                    );
                }
                Some(entry)
            })
            .collect()
    }
}
