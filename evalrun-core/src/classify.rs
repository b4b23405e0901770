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

//! Step classification
//!
//! Partitions a scenario's steps into input, invocation and annotation
//! groups. Input and invocation membership comes straight from the run
//! index; annotations are matched against the evaluator registry with an
//! explicit [`EvaluatorMatch`] so the slug fallbacks stay auditable.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::run_index::{RunIndex, StepKind};
use crate::step::StepResult;
use crate::variant::EvaluatorDto;

/// How an annotation step was tied to an evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum EvaluatorMatch {
    /// The step's evaluator reference id is registered.
    Id(String),
    /// Matched on the referenced slug or on the step key's last segment.
    Slug(String),
    Unmatched,
}

impl EvaluatorMatch {
    pub fn is_matched(&self) -> bool {
        !matches!(self, EvaluatorMatch::Unmatched)
    }
}

/// Steps of one scenario grouped by role.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioSteps {
    pub input_steps: Vec<StepResult>,
    pub invocation_steps: Vec<StepResult>,
    pub annotation_steps: Vec<(StepResult, EvaluatorMatch)>,
    /// Steps that fit no group; kept rather than forced into one.
    pub unclassified_steps: Vec<StepResult>,
}

impl ScenarioSteps {
    pub fn len(&self) -> usize {
        self.input_steps.len()
            + self.invocation_steps.len()
            + self.annotation_steps.len()
            + self.unclassified_steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolve the evaluator behind `step`: id, then referenced slug, then the
/// last dot-segment of the step key read as a slug.
pub fn match_evaluator(step: &StepResult, evaluators: &[EvaluatorDto]) -> EvaluatorMatch {
    let reference = step.references.evaluator();

    if let Some(id) = reference.and_then(|r| r.id.as_deref()) {
        if evaluators.iter().any(|e| e.id == id) {
            return EvaluatorMatch::Id(id.to_string());
        }
    }

    if let Some(slug) = reference.and_then(|r| r.slug.as_deref()) {
        if evaluators.iter().any(|e| e.slug == slug) {
            return EvaluatorMatch::Slug(slug.to_string());
        }
    }

    let tail = step.step_key.rsplit('.').next().unwrap_or_default();
    if !tail.is_empty() && evaluators.iter().any(|e| e.slug == tail) {
        return EvaluatorMatch::Slug(tail.to_string());
    }

    EvaluatorMatch::Unmatched
}

/// Partition `steps` using the run index and the evaluator registry.
///
/// A step is an annotation when the run declares its key as one, or when it
/// matches a registered evaluator. Steps that are neither declared nor
/// matched end up in `unclassified_steps`.
pub fn identify_scenario_steps(
    steps: Vec<StepResult>,
    run_index: &RunIndex,
    evaluators: &[EvaluatorDto],
) -> ScenarioSteps {
    let mut grouped = ScenarioSteps::default();

    for step in steps {
        let kind = run_index.kind_of(&step.step_key);
        if kind == Some(StepKind::Input) {
            grouped.input_steps.push(step);
        } else if kind == Some(StepKind::Invocation) {
            grouped.invocation_steps.push(step);
        } else {
            let matched = match_evaluator(&step, evaluators);
            if kind == Some(StepKind::Annotation) || matched.is_matched() {
                grouped.annotation_steps.push((step, matched));
            } else {
                debug!(
                    step_key = %step.step_key,
                    scenario_id = %step.scenario_id,
                    "step matches no input, invocation or evaluator"
                );
                grouped.unclassified_steps.push(step);
            }
        }
    }

    grouped
}
