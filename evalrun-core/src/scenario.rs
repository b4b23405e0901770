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

//! Scenario enrichment
//!
//! Runs the pure part of the pipeline for one scenario: classification,
//! reference resolution, input / ground-truth mapping and request
//! reconstruction. Trace and annotation data are attached later by the
//! client once they have been fetched.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use crate::classify::{identify_scenario_steps, EvaluatorMatch};
use crate::mapping::compute_inputs_and_ground_truth;
use crate::observability::{AnnotationRaw, TraceTree};
use crate::references::{derive_testset_and_revision, referenced_id};
use crate::request::{prepare_request, PreparedRequest};
use crate::run_index::RunIndex;
use crate::step::StepResult;
use crate::testset::{PreviewTestcase, PreviewTestset};
use crate::variant::{EnhancedVariant, EvaluatorDto};
use crate::JsonObject;

/// A step with everything the UI needs to render it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedStep {
    #[serde(flatten)]
    pub step: StepResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<JsonObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ground_truth: Option<JsonObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub testcase: Option<PreviewTestcase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<TraceTree>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<AnnotationRaw>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<PreparedRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluator: Option<EvaluatorMatch>,
}

impl From<StepResult> for EnrichedStep {
    fn from(step: StepResult) -> Self {
        Self {
            step,
            inputs: None,
            ground_truth: None,
            testcase: None,
            trace: None,
            annotation: None,
            request: None,
            evaluator: None,
        }
    }
}

/// Enriched steps of one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioStepsResult {
    pub scenario_id: String,
    pub input_steps: Vec<EnrichedStep>,
    pub invocation_steps: Vec<EnrichedStep>,
    pub annotation_steps: Vec<EnrichedStep>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unclassified_steps: Vec<EnrichedStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub testset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_id: Option<String>,
}

impl ScenarioStepsResult {
    pub fn empty(scenario_id: impl Into<String>) -> Self {
        Self {
            scenario_id: scenario_id.into(),
            input_steps: Vec::new(),
            invocation_steps: Vec::new(),
            annotation_steps: Vec::new(),
            unclassified_steps: Vec::new(),
            testset_id: None,
            revision_id: None,
        }
    }

    pub fn step_count(&self) -> usize {
        self.input_steps.len()
            + self.invocation_steps.len()
            + self.annotation_steps.len()
            + self.unclassified_steps.len()
    }
}

/// Inputs, ground truth and testcase shared by the steps of a scenario.
#[derive(Default)]
struct ScenarioData {
    inputs: Option<JsonObject>,
    ground_truth: Option<JsonObject>,
    testcase: Option<PreviewTestcase>,
}

impl ScenarioData {
    fn apply(&self, step: &mut EnrichedStep) {
        step.inputs = self.inputs.clone();
        step.ground_truth = self.ground_truth.clone();
        if step.testcase.is_none() {
            step.testcase = self.testcase.clone();
        }
    }
}

/// Per-batch view over the run's reference data.
pub struct ScenarioEnricher<'a> {
    run_index: &'a RunIndex,
    evaluators: &'a [EvaluatorDto],
    testsets: &'a [PreviewTestset],
    variants: &'a [EnhancedVariant],
    testcases: HashMap<&'a str, &'a PreviewTestcase>,
}

impl<'a> ScenarioEnricher<'a> {
    pub fn new(
        run_index: &'a RunIndex,
        evaluators: &'a [EvaluatorDto],
        testsets: &'a [PreviewTestset],
        variants: &'a [EnhancedVariant],
    ) -> Self {
        let testcases = testsets
            .iter()
            .flat_map(|ts| ts.testcases.iter())
            .map(|tc| (tc.id.as_str(), tc))
            .collect();

        Self {
            run_index,
            evaluators,
            testsets,
            variants,
            testcases,
        }
    }

    /// Make testcases that belong to no known testset resolvable too.
    pub fn with_testcases(mut self, extra: &'a [PreviewTestcase]) -> Self {
        for testcase in extra {
            self.testcases.entry(testcase.id.as_str()).or_insert(testcase);
        }
        self
    }

    fn testcase(&self, testcase_id: Option<&str>) -> Option<&'a PreviewTestcase> {
        testcase_id.and_then(|id| self.testcases.get(id).copied())
    }

    fn revision_for(
        &self,
        step: &StepResult,
        fallback: Option<&'a EnhancedVariant>,
    ) -> Option<&'a EnhancedVariant> {
        referenced_id(step, self.run_index, |r| r.application_revision())
            .and_then(|id| self.variants.iter().find(|v| v.id == id))
            .or(fallback)
    }

    pub fn enrich(&self, scenario_id: &str, steps: Vec<StepResult>) -> ScenarioStepsResult {
        let grouped = identify_scenario_steps(steps, self.run_index, self.evaluators);
        let resolved = derive_testset_and_revision(
            &grouped.input_steps,
            &grouped.invocation_steps,
            self.run_index,
            self.testsets,
            self.variants,
        );
        let revision = resolved.revision();
        let input_param_names = revision
            .map(EnhancedVariant::input_param_names)
            .unwrap_or_default();

        let mut input_steps = Vec::with_capacity(grouped.input_steps.len());
        let mut shared = ScenarioData::default();

        for step in grouped.input_steps {
            let testcase = self.testcase(step.testcase_ref());
            let mut enriched = EnrichedStep::from(step);
            if let Some(testcase) = testcase {
                let (inputs, ground_truth) = compute_inputs_and_ground_truth(
                    testcase,
                    self.run_index.columns_for(&enriched.step.step_key),
                    &enriched.step.step_key,
                    &input_param_names,
                );
                enriched.inputs = Some(inputs);
                enriched.ground_truth = Some(ground_truth);
                enriched.testcase = Some(testcase.clone());
                if shared.testcase.is_none() {
                    shared = ScenarioData {
                        inputs: enriched.inputs.clone(),
                        ground_truth: enriched.ground_truth.clone(),
                        testcase: enriched.testcase.clone(),
                    };
                }
            }
            input_steps.push(enriched);
        }

        if shared.testcase.is_none() {
            shared = self.scenario_data_without_input_step(
                grouped
                    .invocation_steps
                    .iter()
                    .chain(grouped.annotation_steps.iter().map(|(s, _)| s)),
                &input_param_names,
            );
        }

        let invocation_steps = grouped
            .invocation_steps
            .into_iter()
            .map(|step| {
                let step_revision = self.revision_for(&step, revision);
                let mut enriched = EnrichedStep::from(step);
                shared.apply(&mut enriched);
                if let (Some(rev), Some(inputs)) = (step_revision, shared.inputs.as_ref()) {
                    match prepare_request(rev, inputs, &rev.uri) {
                        Ok(request) => enriched.request = Some(request),
                        Err(e) => warn!(
                            scenario_id,
                            step_key = %enriched.step.step_key,
                            "could not rebuild invocation request: {}",
                            e
                        ),
                    }
                }
                enriched
            })
            .collect();

        let annotation_steps = grouped
            .annotation_steps
            .into_iter()
            .map(|(step, matched)| {
                let mut enriched = EnrichedStep::from(step);
                shared.apply(&mut enriched);
                enriched.evaluator = Some(matched);
                enriched
            })
            .collect();

        ScenarioStepsResult {
            scenario_id: scenario_id.to_string(),
            input_steps,
            invocation_steps,
            annotation_steps,
            unclassified_steps: grouped
                .unclassified_steps
                .into_iter()
                .map(EnrichedStep::from)
                .collect(),
            testset_id: resolved.testset().map(|ts| ts.id.clone()),
            revision_id: revision.map(|rev| rev.id.clone()),
        }
    }

    /// Scenarios whose input step is missing still carry a testcase id on
    /// their other steps; map it against the run's primary input step.
    fn scenario_data_without_input_step<'s>(
        &self,
        mut steps: impl Iterator<Item = &'s StepResult>,
        input_param_names: &[String],
    ) -> ScenarioData {
        let testcase = steps.find_map(|step| self.testcase(step.testcase_ref()));
        let (Some(testcase), Some(input_key)) = (testcase, self.run_index.primary_input_key())
        else {
            return ScenarioData::default();
        };

        let (inputs, ground_truth) = compute_inputs_and_ground_truth(
            testcase,
            self.run_index.columns_for(input_key),
            input_key,
            input_param_names,
        );
        ScenarioData {
            inputs: Some(inputs),
            ground_truth: Some(ground_truth),
            testcase: Some(testcase.clone()),
        }
    }
}
