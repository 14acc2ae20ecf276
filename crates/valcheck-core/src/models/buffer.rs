//! Global buffer catalogue.
//!
//! Every buffer class is materialised once per job from either the works
//! layer or a previously built class. Declaration order is the build order.

use crate::error::{Result, ValcheckError};
use crate::models::geometry::Distance;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Literal used in catalogue entries for the works layer as a buffer source
pub const WORKS_SOURCE: &str = "works";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferStyle {
    /// Two-sided buffer including the source geometry
    Full,
    /// Ring around the source, excluding the source itself
    OutsideOnly,
}

impl fmt::Display for BufferStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferStyle::Full => f.write_str("full"),
            BufferStyle::OutsideOnly => f.write_str("outside_only"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BufferSource {
    Works,
    Buffer(String),
}

impl fmt::Display for BufferSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferSource::Works => f.write_str(WORKS_SOURCE),
            BufferSource::Buffer(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferSpec {
    pub name: String,
    pub source: BufferSource,
    pub distance: Distance,
    pub style: BufferStyle,
}

/// Catalogue entry as written in the matrix file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawBufferEntry {
    pub name: String,
    pub distance: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub style: Option<BufferStyle>,
}

/// Ordered, validated list of buffer classes
#[derive(Debug, Clone, Default, Serialize)]
pub struct BufferCatalogue {
    specs: Vec<BufferSpec>,
}

impl BufferCatalogue {
    /// Validate raw entries.
    ///
    /// Names must be unique and ring sources must name a catalogue entry.
    /// Whether that entry is declared earlier is left to the resolver, which
    /// fails the job when it is not.
    pub fn from_raw(entries: Vec<RawBufferEntry>) -> Result<Self> {
        let names: HashSet<String> = entries.iter().map(|e| e.name.clone()).collect();
        let mut seen = HashSet::new();
        let mut specs = Vec::with_capacity(entries.len());

        for entry in entries {
            let fail = |reason: String| ValcheckError::BufferCatalogue {
                buffer: entry.name.clone(),
                reason,
            };

            if entry.name.trim().is_empty() {
                return Err(fail("buffer name is empty".to_string()));
            }
            if !seen.insert(entry.name.clone()) {
                return Err(fail("duplicate buffer name".to_string()));
            }

            let distance: Distance = entry.distance.parse().map_err(|e| fail(format!("{}", e)))?;

            let source = match entry.source.as_deref().map(str::trim) {
                None | Some("") | Some(WORKS_SOURCE) => BufferSource::Works,
                Some(name) if name == entry.name => {
                    return Err(fail("buffer cannot be sourced from itself".to_string()));
                }
                Some(name) if names.contains(name) => BufferSource::Buffer(name.to_string()),
                Some(name) => {
                    return Err(fail(format!("source '{}' is not in the catalogue", name)));
                }
            };

            let style = match (&source, entry.style) {
                (BufferSource::Works, None) => BufferStyle::Full,
                (BufferSource::Buffer(_), None) => BufferStyle::OutsideOnly,
                (BufferSource::Works, Some(BufferStyle::Full)) => BufferStyle::Full,
                (BufferSource::Buffer(_), Some(BufferStyle::OutsideOnly)) => {
                    BufferStyle::OutsideOnly
                }
                (source, Some(style)) => {
                    return Err(fail(format!(
                        "style '{}' is not supported for source '{}'",
                        style, source
                    )));
                }
            };

            specs.push(BufferSpec { name: entry.name.clone(), source, distance, style });
        }

        Ok(Self { specs })
    }

    pub fn specs(&self) -> &[BufferSpec] {
        &self.specs
    }

    pub fn get(&self, name: &str) -> Option<&BufferSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|s| s.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
