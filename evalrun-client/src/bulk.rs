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

//! Bulk scenario fetching
//!
//! Scenario ids are validated, deduplicated and split into batches. Each
//! batch issues one results query, at most one testcases query, and the
//! trace/annotation lookups in [`crate::enrich`]. Up to
//! `batch_concurrency` batches run at once.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use evalrun_core::{
    merge_testcases, EnhancedVariant, EvaluatorDto, PreviewTestset, RunIndex, ScenarioEnricher,
    ScenarioStepsResult, StepResult,
};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::client::EvalRunClient;
use crate::enrich::enrich_with_observability;
use crate::error::{FetchError, Result};

pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_BATCH_CONCURRENCY: usize = 2;

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_batch_concurrency() -> usize {
    DEFAULT_BATCH_CONCURRENCY
}

/// Run-level data shared read-only by every batch of a fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchContext {
    pub run_id: String,
    #[serde(default)]
    pub evaluators: Vec<EvaluatorDto>,
    #[serde(default)]
    pub testsets: Vec<PreviewTestset>,
    #[serde(default)]
    pub variants: Vec<EnhancedVariant>,
    #[serde(default)]
    pub run_index: RunIndex,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,
}

impl FetchContext {
    pub fn new(run_id: impl Into<String>, run_index: RunIndex) -> Self {
        Self {
            run_id: run_id.into(),
            evaluators: Vec::new(),
            testsets: Vec::new(),
            variants: Vec::new(),
            run_index,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
        }
    }

    pub fn with_evaluators(mut self, evaluators: Vec<EvaluatorDto>) -> Self {
        self.evaluators = evaluators;
        self
    }

    pub fn with_testsets(mut self, testsets: Vec<PreviewTestset>) -> Self {
        self.testsets = testsets;
        self
    }

    pub fn with_variants(mut self, variants: Vec<EnhancedVariant>) -> Self {
        self.variants = variants;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_batch_concurrency(mut self, batch_concurrency: usize) -> Self {
        self.batch_concurrency = batch_concurrency;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.run_id.trim().is_empty() {
            return Err(FetchError::Validation("run_id is required".into()));
        }
        if self.batch_size == 0 {
            return Err(FetchError::Validation("batch_size must be positive".into()));
        }
        if self.batch_concurrency == 0 {
            return Err(FetchError::Validation(
                "batch_concurrency must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Scenario ids are hyphenated UUIDs; placeholder rows such as
/// `skeleton-3` are not.
pub fn is_valid_scenario_id(id: &str) -> bool {
    id.len() == 36 && Uuid::parse_str(id).is_ok()
}

/// Lowercase hyphenated form, as the service reports scenario ids.
fn normalize_scenario_id(id: &str) -> String {
    id.to_ascii_lowercase()
}

/// Keep valid ids, normalized, in first-seen order, dropping duplicates.
fn sanitize_scenario_ids(scenario_ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ids = Vec::with_capacity(scenario_ids.len());
    for id in scenario_ids {
        if !is_valid_scenario_id(id) {
            debug!(scenario_id = %id, "skipping invalid scenario id");
            continue;
        }
        let id = normalize_scenario_id(id);
        if seen.insert(id.clone()) {
            ids.push(id);
        }
    }
    ids
}

/// Fetch and enrich the steps of `scenario_ids`, keyed by scenario id.
///
/// Every valid requested id is present in the result, lowercased, with
/// empty step lists when the run has no steps for it. The first failing
/// batch aborts the whole fetch.
pub async fn fetch_scenario_steps_bulk(
    client: &EvalRunClient,
    scenario_ids: &[String],
    context: &FetchContext,
) -> Result<BTreeMap<String, ScenarioStepsResult>> {
    client.config().validate()?;
    context.validate()?;

    let ids = sanitize_scenario_ids(scenario_ids);
    if ids.is_empty() {
        debug!(
            requested = scenario_ids.len(),
            "no valid scenario ids to fetch"
        );
        return Ok(BTreeMap::new());
    }

    let batches: Vec<Vec<String>> = ids
        .chunks(context.batch_size)
        .map(<[String]>::to_vec)
        .collect();
    let batch_count = batches.len();

    let mut in_flight = stream::iter(batches)
        .map(|batch| process_scenario_batch(client, batch, context))
        .buffer_unordered(context.batch_concurrency);

    let mut scenarios = BTreeMap::new();
    while let Some(batch) = in_flight.next().await {
        scenarios.extend(batch?);
    }

    info!(
        run_id = %context.run_id,
        scenarios = scenarios.len(),
        batches = batch_count,
        "fetched scenario steps"
    );
    Ok(scenarios)
}

async fn process_scenario_batch(
    client: &EvalRunClient,
    scenario_ids: Vec<String>,
    context: &FetchContext,
) -> Result<BTreeMap<String, ScenarioStepsResult>> {
    let steps = client.query_results(&context.run_id, &scenario_ids).await?;

    let known: HashSet<&str> = context
        .testsets
        .iter()
        .flat_map(|ts| ts.testcases.iter().map(|tc| tc.id.as_str()))
        .collect();
    let missing: Vec<String> = steps
        .iter()
        .filter_map(StepResult::testcase_ref)
        .filter(|id| !known.contains(id))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect();

    let fetched = if missing.is_empty() {
        Vec::new()
    } else {
        client.query_testcases(&missing).await?
    };

    let mut results = {
        let testsets = merge_testcases(&context.testsets, &fetched);
        let enricher = ScenarioEnricher::new(
            &context.run_index,
            &context.evaluators,
            &testsets,
            &context.variants,
        )
        .with_testcases(&fetched);

        group_by_scenario(&scenario_ids, steps)
            .into_iter()
            .map(|(scenario_id, steps)| enricher.enrich(&scenario_id, steps))
            .collect::<Vec<_>>()
    };

    enrich_with_observability(client, &mut results).await;

    debug!(
        scenarios = results.len(),
        fetched_testcases = fetched.len(),
        "processed scenario batch"
    );
    Ok(results
        .into_iter()
        .map(|result| (result.scenario_id.clone(), result))
        .collect())
}

fn group_by_scenario(
    scenario_ids: &[String],
    steps: Vec<StepResult>,
) -> BTreeMap<String, Vec<StepResult>> {
    let mut grouped: BTreeMap<String, Vec<StepResult>> = scenario_ids
        .iter()
        .map(|id| (id.clone(), Vec::new()))
        .collect();

    for step in steps {
        match grouped.get_mut(&normalize_scenario_id(&step.scenario_id)) {
            Some(bucket) => bucket.push(step),
            None => debug!(
                scenario_id = %step.scenario_id,
                step_key = %step.step_key,
                "dropping step for unrequested scenario"
            ),
        }
    }
    grouped
}
