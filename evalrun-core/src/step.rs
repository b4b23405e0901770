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

//! Step records as produced by the evaluation service.
//!
//! A step is one recorded unit of work inside a scenario: the input binding,
//! a model invocation or an evaluator annotation. Steps are read-only once
//! fetched and live for a single enrichment pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::observability::AnnotationLink;

/// Pointer to another entity (evaluator, testset, revision, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl EntityRef {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn by_slug(slug: impl Into<String>) -> Self {
        Self {
            slug: Some(slug.into()),
            ..Default::default()
        }
    }
}

/// References attached to a step, keyed by role (`evaluator`, `testset`, ...).
///
/// The service sends `null` both for the whole map and for individual roles;
/// both are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StepReferences(pub BTreeMap<String, EntityRef>);

impl<'de> Deserialize<'de> for StepReferences {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<BTreeMap<String, Option<EntityRef>>>::deserialize(deserializer)?;
        Ok(Self(
            raw.unwrap_or_default()
                .into_iter()
                .filter_map(|(role, entity)| entity.map(|e| (role, e)))
                .collect(),
        ))
    }
}

impl StepReferences {
    pub fn get(&self, role: &str) -> Option<&EntityRef> {
        self.0.get(role)
    }

    /// Builder used when assembling references by hand.
    pub fn with(mut self, role: impl Into<String>, entity: EntityRef) -> Self {
        self.0.insert(role.into(), entity);
        self
    }

    pub fn evaluator(&self) -> Option<&EntityRef> {
        self.get("evaluator")
    }

    pub fn testset(&self) -> Option<&EntityRef> {
        self.get("testset")
    }

    pub fn testcase(&self) -> Option<&EntityRef> {
        self.get("testcase")
    }

    pub fn application_revision(&self) -> Option<&EntityRef> {
        self.get("application_revision")
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Execution status reported for a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Queued,
    Running,
    Success,
    Failure,
    Errors,
    Cancelled,
    #[default]
    #[serde(other)]
    Unknown,
}

/// One step record of an evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    pub scenario_id: String,
    pub step_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_idx: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub testcase_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
    #[serde(default)]
    pub status: StepStatus,
    #[serde(default)]
    pub references: StepReferences,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl StepResult {
    pub fn new(scenario_id: impl Into<String>, step_key: impl Into<String>) -> Self {
        Self {
            id: None,
            run_id: None,
            scenario_id: scenario_id.into(),
            step_key: step_key.into(),
            repeat_idx: None,
            testcase_id: None,
            trace_id: None,
            span_id: None,
            status: StepStatus::default(),
            references: StepReferences::default(),
            error: None,
            created_at: None,
        }
    }

    pub fn with_testcase(mut self, testcase_id: impl Into<String>) -> Self {
        self.testcase_id = Some(testcase_id.into());
        self
    }

    pub fn with_trace(mut self, trace_id: impl Into<String>, span_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self.span_id = Some(span_id.into());
        self
    }

    pub fn with_references(mut self, references: StepReferences) -> Self {
        self.references = references;
        self
    }

    /// Testcase the step ran against: the `testcase_id` column, or the
    /// `testcase` reference when the column is empty.
    pub fn testcase_ref(&self) -> Option<&str> {
        self.testcase_id
            .as_deref()
            .or_else(|| self.references.testcase().and_then(|r| r.id.as_deref()))
    }

    /// Trace/span pair under which an annotation for this step is stored.
    pub fn annotation_link(&self) -> Option<AnnotationLink> {
        match (&self.trace_id, &self.span_id) {
            (Some(trace_id), Some(span_id)) => Some(AnnotationLink {
                trace_id: trace_id.clone(),
                span_id: span_id.clone(),
            }),
            _ => None,
        }
    }
}
