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

//! Run index
//!
//! Classification metadata derived once from a run's stored definition
//! (its steps and column mappings) and shared read-only by every scenario
//! batch of that run.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::Result;
use crate::step::StepReferences;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Input,
    Invocation,
    Annotation,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Testset,
    Invocation,
    Annotation,
    #[serde(other)]
    Other,
}

/// A step declared on the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStep {
    pub key: String,
    #[serde(rename = "type")]
    pub kind: StepKind,
    #[serde(default)]
    pub references: StepReferences,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunColumn {
    pub kind: ColumnKind,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStepPath {
    pub key: String,
    #[serde(default)]
    pub path: String,
}

/// Binds a displayed column to a value path inside a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMapping {
    pub column: RunColumn,
    pub step: RunStepPath,
}

/// The `data` section of a stored evaluation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunData {
    #[serde(default)]
    pub steps: Vec<RunStep>,
    #[serde(default)]
    pub mappings: Vec<RunMapping>,
}

impl RunData {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepMeta {
    pub key: String,
    pub kind: StepKind,
    pub refs: StepReferences,
}

/// A column mapping flattened for lookups by step key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub name: String,
    pub kind: ColumnKind,
    pub step_key: String,
    pub path: String,
}

impl ColumnMapping {
    pub fn new(
        name: impl Into<String>,
        kind: ColumnKind,
        step_key: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            step_key: step_key.into(),
            path: path.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunIndex {
    pub steps: BTreeMap<String, StepMeta>,
    pub input_keys: BTreeSet<String>,
    pub invocation_keys: BTreeSet<String>,
    pub annotation_keys: BTreeSet<String>,
    pub columns_by_step: BTreeMap<String, Vec<ColumnMapping>>,
    /// First input step in declaration order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_input_key: Option<String>,
}

impl RunIndex {
    pub fn build(run: &RunData) -> Self {
        let mut index = RunIndex::default();

        for step in &run.steps {
            match step.kind {
                StepKind::Input => {
                    index.input_keys.insert(step.key.clone());
                    if index.first_input_key.is_none() {
                        index.first_input_key = Some(step.key.clone());
                    }
                }
                StepKind::Invocation => {
                    index.invocation_keys.insert(step.key.clone());
                }
                StepKind::Annotation => {
                    index.annotation_keys.insert(step.key.clone());
                }
                StepKind::Other => {}
            }
            index.steps.insert(
                step.key.clone(),
                StepMeta {
                    key: step.key.clone(),
                    kind: step.kind,
                    refs: step.references.clone(),
                },
            );
        }

        for mapping in &run.mappings {
            index
                .columns_by_step
                .entry(mapping.step.key.clone())
                .or_default()
                .push(ColumnMapping {
                    name: mapping.column.name.clone(),
                    kind: mapping.column.kind,
                    step_key: mapping.step.key.clone(),
                    path: mapping.step.path.clone(),
                });
        }

        index
    }

    pub fn kind_of(&self, step_key: &str) -> Option<StepKind> {
        self.steps.get(step_key).map(|meta| meta.kind)
    }

    pub fn refs_of(&self, step_key: &str) -> Option<&StepReferences> {
        self.steps.get(step_key).map(|meta| &meta.refs)
    }

    pub fn columns_for(&self, step_key: &str) -> &[ColumnMapping] {
        self.columns_by_step
            .get(step_key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First declared input step key, used when a scenario has no input step.
    pub fn primary_input_key(&self) -> Option<&str> {
        self.first_input_key
            .as_deref()
            .or_else(|| self.input_keys.iter().next().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUN_JSON: &str = r#"{
        "steps": [
            {"key": "testset-abc", "type": "input", "references": {"testset": {"id": "ts-1"}}},
            {"key": "app-rev", "type": "invocation", "references": {"application_revision": {"id": "rev-1"}}},
            {"key": "app-rev.exact_match", "type": "annotation", "references": {"evaluator": {"slug": "exact_match"}}},
            {"key": "custom", "type": "webhook"}
        ],
        "mappings": [
            {"column": {"kind": "testset", "name": "country"}, "step": {"key": "testset-abc", "path": "data.country"}},
            {"column": {"kind": "testset", "name": "correct_answer"}, "step": {"key": "testset-abc", "path": "data.correct_answer"}},
            {"column": {"kind": "invocation", "name": "outputs"}, "step": {"key": "app-rev", "path": "attributes.ag.data.outputs"}}
        ]
    }"#;

    #[test]
    fn test_build_from_run_data() {
        let run = RunData::from_json_str(RUN_JSON).unwrap();
        let index = RunIndex::build(&run);

        assert!(index.input_keys.contains("testset-abc"));
        assert!(index.invocation_keys.contains("app-rev"));
        assert!(index.annotation_keys.contains("app-rev.exact_match"));
        assert_eq!(index.kind_of("custom"), Some(StepKind::Other));
        assert_eq!(index.kind_of("missing"), None);

        let columns = index.columns_for("testset-abc");
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].name, "country");
        assert_eq!(columns[1].path, "data.correct_answer");
        assert!(index.columns_for("nothing").is_empty());

        assert_eq!(index.primary_input_key(), Some("testset-abc"));
    }

    #[test]
    fn test_primary_input_follows_declaration_order() {
        let run = RunData::from_json_str(
            r#"{"steps": [
                {"key": "zeta-input", "type": "input"},
                {"key": "alpha-input", "type": "input"}
            ]}"#,
        )
        .unwrap();
        let index = RunIndex::build(&run);
        assert_eq!(index.primary_input_key(), Some("zeta-input"));
        assert_eq!(
            index
                .refs_of("app-rev")
                .and_then(|r| r.application_revision())
                .and_then(|r| r.id.as_deref()),
            Some("rev-1")
        );
    }
}
