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

//! Request and response bodies of the evaluation service endpoints.

use evalrun_core::{AnnotationLink, AnnotationRaw, PreviewTestcase, StepResult, TraceTree};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct ResultsFilter {
    pub run_id: String,
    pub run_ids: Vec<String>,
    pub scenario_ids: Vec<String>,
}

/// Cursor settings; the results query is sent without any.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Windowing {}

#[derive(Debug, Clone, Serialize)]
pub struct ResultsQueryRequest {
    pub result: ResultsFilter,
    pub windowing: Windowing,
}

impl ResultsQueryRequest {
    pub fn for_scenarios(run_id: &str, scenario_ids: &[String]) -> Self {
        Self {
            result: ResultsFilter {
                run_id: run_id.to_string(),
                run_ids: vec![run_id.to_string()],
                scenario_ids: scenario_ids.to_vec(),
            },
            windowing: Windowing::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultsQueryResponse {
    #[serde(default)]
    pub results: Vec<StepResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestcasesQueryRequest {
    pub testcase_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestcasesQueryResponse {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub testcases: Vec<PreviewTestcase>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TraceCondition {
    pub field: String,
    pub operator: String,
    pub value: Vec<String>,
}

/// `filtering` query parameter of the traces endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct TraceFiltering {
    pub conditions: Vec<TraceCondition>,
}

impl TraceFiltering {
    pub fn tree_ids(trace_ids: &[String]) -> Self {
        Self {
            conditions: vec![TraceCondition {
                field: "tree.id".to_string(),
                operator: "in".to_string(),
                value: trace_ids.to_vec(),
            }],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TracesResponse {
    #[serde(default)]
    pub trees: Vec<TraceTree>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnnotationsQueryRequest {
    pub annotation_links: Vec<AnnotationLink>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnnotationsQueryResponse {
    #[serde(default)]
    pub annotations: Vec<AnnotationRaw>,
}
