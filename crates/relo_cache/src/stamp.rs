//! Input stamps.
//!
//! A stamp is a small JSON file next to an output recording which inputs
//! produced it. It complements the digest sidecar: the sidecar proves the
//! output was written completely, the stamp proves it was written from the
//! current inputs.

use std::path::{Path, PathBuf};

use relo_common::ContentHash;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Extension appended to the target file name.
const STAMP_EXT: &str = "inputs";

/// The persisted input fingerprint of one output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputStamp {
    /// Toolchain version that produced the output.
    pub tool_version: String,
    /// Hex form of the input fingerprint.
    pub inputs: String,
}

impl InputStamp {
    /// Creates a stamp for the current toolchain.
    pub fn new(fingerprint: &ContentHash) -> Self {
        Self {
            tool_version: relo_common::TOOL_VERSION.to_string(),
            inputs: fingerprint.to_string(),
        }
    }

    /// Returns `true` if this stamp records `fingerprint` from this toolchain.
    pub fn matches(&self, fingerprint: &ContentHash) -> bool {
        self.tool_version == relo_common::TOOL_VERSION
            && ContentHash::from_hex(&self.inputs).as_ref() == Some(fingerprint)
    }

    /// Path of the stamp belonging to `target`.
    pub fn path_for(target: &Path) -> PathBuf {
        append_extension(target, STAMP_EXT)
    }

    /// Loads the stamp of `target`, returning `None` if it is missing or
    /// unreadable.
    pub fn load(target: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(Self::path_for(target)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Serializes the stamp.
    pub fn to_json(&self) -> Result<String, CacheError> {
        serde_json::to_string_pretty(self).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })
    }
}

/// Appends `.ext` to the full file name (`a.jar` becomes `a.jar.ext`).
pub(crate) fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}
