// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Trace trees and annotation records attached to steps.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::step::StepReferences;

/// Normalize a trace id so UUID (`8-4-4-4-12`) and bare hex forms compare equal.
pub fn normalize_trace_id(trace_id: &str) -> String {
    trace_id
        .chars()
        .filter(|c| *c != '-')
        .collect::<String>()
        .to_ascii_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeRef {
    pub id: String,
}

/// A trace tree as returned by the observability query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceTree {
    pub tree: TreeRef,
    #[serde(default)]
    pub nodes: Value,
}

impl TraceTree {
    pub fn trace_key(&self) -> String {
        normalize_trace_id(&self.tree.id)
    }
}

/// Trace/span pair identifying where an annotation was recorded.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AnnotationLink {
    pub trace_id: String,
    pub span_id: String,
}

impl AnnotationLink {
    /// Same link with its trace id normalized, for use as a lookup key.
    pub fn normalized(&self) -> Self {
        Self {
            trace_id: normalize_trace_id(&self.trace_id),
            span_id: self.span_id.clone(),
        }
    }
}

/// An annotation record as returned by the annotations query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRaw {
    pub trace_id: String,
    pub span_id: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub references: StepReferences,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

impl AnnotationRaw {
    pub fn trace_key(&self) -> String {
        normalize_trace_id(&self.trace_id)
    }

    /// Normalized link this annotation was recorded under.
    pub fn link_key(&self) -> AnnotationLink {
        AnnotationLink {
            trace_id: self.trace_key(),
            span_id: self.span_id.clone(),
        }
    }
}
