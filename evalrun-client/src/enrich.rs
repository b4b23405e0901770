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

//! Trace and annotation enrichment
//!
//! Best-effort: lookup failures are logged and leave steps undecorated.

use std::collections::{BTreeSet, HashMap};

use evalrun_core::{
    normalize_trace_id, AnnotationLink, AnnotationRaw, ScenarioStepsResult, TraceTree,
};
use tracing::{debug, warn};

use crate::client::EvalRunClient;

/// Traces keyed by normalized trace id, annotations by normalized
/// trace/span link.
#[derive(Debug, Clone, Default)]
pub struct ObservabilityMaps {
    pub traces: HashMap<String, TraceTree>,
    pub annotations: HashMap<AnnotationLink, AnnotationRaw>,
}

impl ObservabilityMaps {
    pub fn from_records(traces: Vec<TraceTree>, annotations: Vec<AnnotationRaw>) -> Self {
        Self {
            traces: traces.into_iter().map(|t| (t.trace_key(), t)).collect(),
            annotations: annotations
                .into_iter()
                .map(|a| (a.link_key(), a))
                .collect(),
        }
    }

    pub fn trace(&self, trace_id: &str) -> Option<&TraceTree> {
        self.traces.get(&normalize_trace_id(trace_id))
    }

    pub fn annotation(&self, link: &AnnotationLink) -> Option<&AnnotationRaw> {
        self.annotations.get(&link.normalized())
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty() && self.annotations.is_empty()
    }
}

/// Look up the traces of invocation steps and the annotations of
/// annotation steps across `results`, with at most one query each.
pub async fn fetch_trace_and_annotation_maps(
    client: &EvalRunClient,
    results: &[ScenarioStepsResult],
) -> ObservabilityMaps {
    let trace_ids: Vec<String> = results
        .iter()
        .flat_map(|r| r.invocation_steps.iter())
        .filter_map(|s| s.step.trace_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let links: Vec<AnnotationLink> = results
        .iter()
        .flat_map(|r| r.annotation_steps.iter())
        .filter_map(|s| s.step.annotation_link())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let traces = async {
        if trace_ids.is_empty() {
            return Vec::new();
        }
        client.query_traces(&trace_ids).await.unwrap_or_else(|e| {
            warn!(count = trace_ids.len(), "trace lookup failed: {}", e);
            Vec::new()
        })
    };
    let annotations = async {
        if links.is_empty() {
            return Vec::new();
        }
        client.query_annotations(&links).await.unwrap_or_else(|e| {
            warn!(count = links.len(), "annotation lookup failed: {}", e);
            Vec::new()
        })
    };

    let (traces, annotations) = tokio::join!(traces, annotations);
    debug!(
        traces = traces.len(),
        annotations = annotations.len(),
        "fetched observability records"
    );
    ObservabilityMaps::from_records(traces, annotations)
}

/// Attach traces to invocation steps, and annotations (plus their trace
/// when known) to annotation steps.
pub fn decorate_scenario_result(result: &mut ScenarioStepsResult, maps: &ObservabilityMaps) {
    for step in &mut result.invocation_steps {
        if let Some(trace_id) = step.step.trace_id.as_deref() {
            step.trace = maps.trace(trace_id).cloned();
        }
    }

    for step in &mut result.annotation_steps {
        if let Some(link) = step.step.annotation_link() {
            step.annotation = maps.annotation(&link).cloned();
        }
        if let Some(trace) = step.step.trace_id.as_deref().and_then(|id| maps.trace(id)) {
            step.trace = Some(trace.clone());
        }
    }
}

pub async fn enrich_with_observability(
    client: &EvalRunClient,
    results: &mut [ScenarioStepsResult],
) {
    let maps = fetch_trace_and_annotation_maps(client, results).await;
    if maps.is_empty() {
        return;
    }
    for result in results.iter_mut() {
        decorate_scenario_result(result, &maps);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evalrun_core::{EnrichedStep, StepResult, TreeRef};
    use serde_json::json;

    fn trace(id: &str) -> TraceTree {
        TraceTree {
            tree: TreeRef { id: id.to_string() },
            nodes: json!({"root": {"name": "app"}}),
        }
    }

    fn annotation(trace_id: &str, span_id: &str) -> AnnotationRaw {
        serde_json::from_value(json!({
            "trace_id": trace_id,
            "span_id": span_id,
            "data": {"outputs": {"score": 1}}
        }))
        .unwrap()
    }

    #[test]
    fn test_decorate_matches_uuid_and_hex_ids() {
        let mut result = ScenarioStepsResult::empty("sc-1");
        result.invocation_steps.push(EnrichedStep::from(
            StepResult::new("sc-1", "app")
                .with_trace("0195C2A4-7F1B-7A8E-9D3C-000000000001", "s1"),
        ));
        result.annotation_steps.push(EnrichedStep::from(
            StepResult::new("sc-1", "app.exact")
                .with_trace("0195c2a4-7f1b-7a8e-9d3c-000000000002", "s2"),
        ));

        let maps = ObservabilityMaps::from_records(
            vec![trace("0195c2a47f1b7a8e9d3c000000000001")],
            vec![annotation("0195c2a47f1b7a8e9d3c000000000002", "s2")],
        );
        decorate_scenario_result(&mut result, &maps);

        assert!(result.invocation_steps[0].trace.is_some());
        let annotated = &result.annotation_steps[0];
        assert_eq!(
            annotated.annotation.as_ref().unwrap().data["outputs"]["score"],
            json!(1)
        );
        assert!(annotated.trace.is_none());
    }

    #[test]
    fn test_annotations_on_one_trace_keep_their_span() {
        let mut result = ScenarioStepsResult::empty("sc-1");
        for (key, span) in [("app.exact", "sp1"), ("app.similarity", "sp2")] {
            result.annotation_steps.push(EnrichedStep::from(
                StepResult::new("sc-1", key).with_trace("t1", span),
            ));
        }

        let maps = ObservabilityMaps::from_records(
            Vec::new(),
            vec![annotation("t1", "sp1"), annotation("t1", "sp2")],
        );
        decorate_scenario_result(&mut result, &maps);

        for step in &result.annotation_steps {
            let attached = step.annotation.as_ref().unwrap();
            assert_eq!(Some(&attached.span_id), step.step.span_id.as_ref());
        }
    }

    #[test]
    fn test_decorate_without_trace_id_is_noop() {
        let mut result = ScenarioStepsResult::empty("sc-1");
        result
            .invocation_steps
            .push(EnrichedStep::from(StepResult::new("sc-1", "app")));
        let before = result.clone();

        let maps = ObservabilityMaps::from_records(vec![trace("t1")], Vec::new());
        decorate_scenario_result(&mut result, &maps);
        assert_eq!(result, before);
    }
}
