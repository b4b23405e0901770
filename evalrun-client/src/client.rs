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

//! Evaluation service client
//!
//! Thin async wrapper over the four endpoints the enrichment pipeline uses.

use evalrun_core::{AnnotationLink, AnnotationRaw, PreviewTestcase, StepResult, TraceTree};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{FetchError, Result};
use crate::types::*;

const RESULTS_QUERY_PATH: &str = "/preview/evaluations/results/query";
const TESTCASES_QUERY_PATH: &str = "/preview/testcases/query";
const TRACES_PATH: &str = "/observability/v1/traces";
const ANNOTATIONS_QUERY_PATH: &str = "/preview/annotations/query";

/// Async client for the evaluation service.
///
/// # Example
///
/// ```no_run
/// use evalrun_client::{ClientConfig, EvalRunClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ClientConfig::new("https://cloud.example.com/api", "project-1")
///     .with_jwt("token");
/// let client = EvalRunClient::new(config)?;
///
/// let steps = client
///     .query_results("run-1", &["0195c2a4-7f1b-7a8e-9d3c-000000000001".to_string()])
///     .await?;
/// println!("fetched {} steps", steps.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct EvalRunClient {
    config: ClientConfig,
    http_client: HttpClient,
}

impl EvalRunClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(16)
            .build()?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send a request scoped to the configured project and decode the JSON reply.
    async fn request<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&(impl Serialize + ?Sized)>,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.config.api_url.trim_end_matches('/'), path);

        let mut request = self
            .http_client
            .request(method, &url)
            .query(&[("project_id", self.config.project_id.as_str())])
            .header("Content-Type", "application/json");

        if !params.is_empty() {
            request = request.query(params);
        }

        if let Some(jwt) = &self.config.jwt {
            request = request.bearer_auth(jwt);
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FetchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }

    /// Steps recorded for `scenario_ids` within `run_id`.
    pub async fn query_results(
        &self,
        run_id: &str,
        scenario_ids: &[String],
    ) -> Result<Vec<StepResult>> {
        let body = ResultsQueryRequest::for_scenarios(run_id, scenario_ids);
        let response: ResultsQueryResponse = self
            .request(reqwest::Method::POST, RESULTS_QUERY_PATH, Some(&body), &[])
            .await?;
        debug!(
            run_id,
            scenarios = scenario_ids.len(),
            steps = response.results.len(),
            "queried step results"
        );
        Ok(response.results)
    }

    pub async fn query_testcases(&self, testcase_ids: &[String]) -> Result<Vec<PreviewTestcase>> {
        let body = TestcasesQueryRequest {
            testcase_ids: testcase_ids.to_vec(),
        };
        let response: TestcasesQueryResponse = self
            .request(reqwest::Method::POST, TESTCASES_QUERY_PATH, Some(&body), &[])
            .await?;
        debug!(
            requested = testcase_ids.len(),
            count = response.count.unwrap_or(response.testcases.len() as u64),
            "queried testcases"
        );
        Ok(response.testcases)
    }

    /// Trace trees whose root id is one of `trace_ids`.
    pub async fn query_traces(&self, trace_ids: &[String]) -> Result<Vec<TraceTree>> {
        let filtering = serde_json::to_string(&TraceFiltering::tree_ids(trace_ids))?;
        let response: TracesResponse = self
            .request(
                reqwest::Method::GET,
                TRACES_PATH,
                None::<&()>,
                &[("filtering", filtering)],
            )
            .await?;
        Ok(response.trees)
    }

    pub async fn query_annotations(&self, links: &[AnnotationLink]) -> Result<Vec<AnnotationRaw>> {
        let body = AnnotationsQueryRequest {
            annotation_links: links.to_vec(),
        };
        let response: AnnotationsQueryResponse = self
            .request(reqwest::Method::POST, ANNOTATIONS_QUERY_PATH, Some(&body), &[])
            .await?;
        Ok(response.annotations)
    }
}
