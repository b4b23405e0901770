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

//! Bulk fetch against a mock evaluation service.

use evalrun_client::{
    fetch_scenario_steps_bulk, ClientConfig, EvalRunClient, FetchContext, FetchError,
    ScenarioWorker,
};
use evalrun_core::{EnhancedVariant, EvaluatorDto, EvaluatorMatch, RunData, RunIndex};
use mockito::{Matcher, Server};
use serde_json::json;

const SCENARIO_A: &str = "0195c2a4-7f1b-7a8e-9d3c-00000000000a";
const SCENARIO_B: &str = "0195c2a4-7f1b-7a8e-9d3c-00000000000b";
const TRACE_APP: &str = "0195c2a4-7f1b-7a8e-9d3c-0000000000f1";
const TRACE_EVAL: &str = "0195c2a4-7f1b-7a8e-9d3c-0000000000f2";

const RESULTS_PATH: &str = "/preview/evaluations/results/query";
const TESTCASES_PATH: &str = "/preview/testcases/query";
const TRACES_PATH: &str = "/observability/v1/traces";
const ANNOTATIONS_PATH: &str = "/preview/annotations/query";

const RUN_JSON: &str = r#"{
    "steps": [
        {"key": "testset-1", "type": "input", "references": {"testset": {"id": "ts-1"}}},
        {"key": "app", "type": "invocation", "references": {"application_revision": {"id": "rev-1"}}},
        {"key": "app.exact_match", "type": "annotation"}
    ],
    "mappings": [
        {"column": {"kind": "testset", "name": "country"}, "step": {"key": "testset-1", "path": "data.country"}},
        {"column": {"kind": "testset", "name": "capital"}, "step": {"key": "testset-1", "path": "data.capital"}}
    ]
}"#;

fn client(server: &Server) -> EvalRunClient {
    EvalRunClient::new(ClientConfig::new(server.url(), "proj-1").with_jwt("secret")).unwrap()
}

fn context() -> FetchContext {
    let run_index = RunIndex::build(&RunData::from_json_str(RUN_JSON).unwrap());
    let mut revision = EnhancedVariant::new("rev-1").with_input_params(["country"]);
    revision.uri.runtime_prefix = "http://svc/app".to_string();

    FetchContext::new("run-1", run_index)
        .with_evaluators(vec![EvaluatorDto::new("ev-1", "exact_match")])
        .with_variants(vec![revision])
}

fn ids(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

#[tokio::test]
async fn test_empty_id_list_resolves_without_requests() {
    let mut server = Server::new_async().await;
    let results = server
        .mock("POST", RESULTS_PATH)
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let scenarios = fetch_scenario_steps_bulk(&client(&server), &[], &context())
        .await
        .unwrap();

    assert!(scenarios.is_empty());
    results.assert_async().await;
}

#[tokio::test]
async fn test_uppercase_ids_match_service_steps() {
    let mut server = Server::new_async().await;
    let _results = server
        .mock("POST", RESULTS_PATH)
        .match_query(Matcher::Any)
        .match_body(Matcher::PartialJson(json!({
            "result": {"scenario_ids": [SCENARIO_A]}
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"results": [
                {"scenario_id": SCENARIO_A, "step_key": "app"}
            ]})
            .to_string(),
        )
        .create_async()
        .await;

    let scenarios = fetch_scenario_steps_bulk(
        &client(&server),
        &[SCENARIO_A.to_ascii_uppercase()],
        &context(),
    )
    .await
    .unwrap();

    assert_eq!(scenarios.len(), 1);
    assert_eq!(scenarios[SCENARIO_A].invocation_steps.len(), 1);
}

#[tokio::test]
async fn test_no_valid_ids_makes_no_requests() {
    let mut server = Server::new_async().await;
    let results = server
        .mock("POST", RESULTS_PATH)
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let scenarios = fetch_scenario_steps_bulk(
        &client(&server),
        &ids(&["skeleton-0", "skeleton-1"]),
        &context(),
    )
    .await
    .unwrap();

    assert!(scenarios.is_empty());
    results.assert_async().await;
}

#[tokio::test]
async fn test_skeleton_ids_are_not_requested() {
    let mut server = Server::new_async().await;
    let results = server
        .mock("POST", RESULTS_PATH)
        .match_query(Matcher::UrlEncoded("project_id".into(), "proj-1".into()))
        .match_body(Matcher::PartialJson(json!({
            "result": {"run_id": "run-1", "scenario_ids": [SCENARIO_A]}
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"results": []}"#)
        .expect(1)
        .create_async()
        .await;

    let scenarios = fetch_scenario_steps_bulk(
        &client(&server),
        &ids(&["skeleton-3", SCENARIO_A, SCENARIO_A]),
        &context(),
    )
    .await
    .unwrap();

    results.assert_async().await;
    assert_eq!(scenarios.len(), 1);
    assert_eq!(scenarios[SCENARIO_A].step_count(), 0);
}

#[tokio::test]
async fn test_full_enrichment() {
    let mut server = Server::new_async().await;
    let _results = server
        .mock("POST", RESULTS_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"results": [
                {"scenario_id": SCENARIO_A, "step_key": "testset-1", "testcase_id": "tc-1", "status": "success"},
                {"scenario_id": SCENARIO_A, "step_key": "app", "trace_id": TRACE_APP, "span_id": "sp1", "status": "success"},
                {"scenario_id": SCENARIO_A, "step_key": "app.exact_match", "trace_id": TRACE_EVAL, "span_id": "sp2", "status": "success"}
            ]})
            .to_string(),
        )
        .create_async()
        .await;
    let testcases = server
        .mock("POST", TESTCASES_PATH)
        .match_query(Matcher::Any)
        .match_body(Matcher::Json(json!({"testcase_ids": ["tc-1"]})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"count": 1, "testcases": [
                {"id": "tc-1", "testset_id": "ts-1", "data": {"country": "France", "capital": "Paris"}}
            ]})
            .to_string(),
        )
        .create_async()
        .await;
    let traces = server
        .mock("GET", TRACES_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"trees": [
                {"tree": {"id": "0195c2a47f1b7a8e9d3c0000000000f1"}, "nodes": {"root": {"name": "app"}}}
            ]})
            .to_string(),
        )
        .create_async()
        .await;
    let annotations = server
        .mock("POST", ANNOTATIONS_PATH)
        .match_query(Matcher::Any)
        .match_body(Matcher::Json(json!({
            "annotation_links": [{"trace_id": TRACE_EVAL, "span_id": "sp2"}]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"annotations": [
                {"trace_id": "0195C2A47F1B7A8E9D3C0000000000F2", "span_id": "sp2", "data": {"outputs": {"success": true}}}
            ]})
            .to_string(),
        )
        .create_async()
        .await;

    let scenarios = fetch_scenario_steps_bulk(&client(&server), &ids(&[SCENARIO_A]), &context())
        .await
        .unwrap();

    testcases.assert_async().await;
    traces.assert_async().await;
    annotations.assert_async().await;

    let scenario = &scenarios[SCENARIO_A];
    assert_eq!(scenario.revision_id.as_deref(), Some("rev-1"));

    let input = &scenario.input_steps[0];
    assert_eq!(input.inputs.as_ref().unwrap()["country"], json!("France"));
    assert_eq!(input.ground_truth.as_ref().unwrap()["capital"], json!("Paris"));

    let invocation = &scenario.invocation_steps[0];
    assert!(invocation.trace.is_some());
    assert_eq!(
        invocation.request.as_ref().unwrap().request_body["inputs"],
        json!({"country": "France"})
    );

    let annotation = &scenario.annotation_steps[0];
    assert_eq!(
        annotation.evaluator,
        Some(EvaluatorMatch::Slug("exact_match".to_string()))
    );
    assert_eq!(
        annotation.annotation.as_ref().unwrap().data["outputs"]["success"],
        json!(true)
    );
}

#[tokio::test]
async fn test_api_error_aborts_fetch() {
    let mut server = Server::new_async().await;
    let _results = server
        .mock("POST", RESULTS_PATH)
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let err = fetch_scenario_steps_bulk(&client(&server), &ids(&[SCENARIO_A]), &context())
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Api { status: 500, .. }));
}

#[tokio::test]
async fn test_trace_failure_is_swallowed() {
    let mut server = Server::new_async().await;
    let _results = server
        .mock("POST", RESULTS_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"results": [
                {"scenario_id": SCENARIO_A, "step_key": "app", "trace_id": TRACE_APP, "span_id": "sp1"}
            ]})
            .to_string(),
        )
        .create_async()
        .await;
    let traces = server
        .mock("GET", TRACES_PATH)
        .match_query(Matcher::Any)
        .with_status(503)
        .create_async()
        .await;

    let scenarios = fetch_scenario_steps_bulk(&client(&server), &ids(&[SCENARIO_A]), &context())
        .await
        .unwrap();

    traces.assert_async().await;
    let invocation = &scenarios[SCENARIO_A].invocation_steps[0];
    assert!(invocation.trace.is_none());
}

#[tokio::test]
async fn test_batches_follow_batch_size() {
    let mut server = Server::new_async().await;
    let results = server
        .mock("POST", RESULTS_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"results": []}"#)
        .expect(2)
        .create_async()
        .await;

    let scenarios = fetch_scenario_steps_bulk(
        &client(&server),
        &ids(&[SCENARIO_A, SCENARIO_B]),
        &context().with_batch_size(1),
    )
    .await
    .unwrap();

    results.assert_async().await;
    assert_eq!(scenarios.len(), 2);
    assert!(scenarios.contains_key(SCENARIO_B));
}

#[tokio::test]
async fn test_missing_jwt_fails_before_any_request() {
    let mut server = Server::new_async().await;
    let results = server
        .mock("POST", RESULTS_PATH)
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let client = EvalRunClient::new(ClientConfig::new(server.url(), "proj-1")).unwrap();
    let err = fetch_scenario_steps_bulk(&client, &ids(&[SCENARIO_A]), &context())
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Validation(_)));
    results.assert_async().await;
}

#[tokio::test]
async fn test_worker_round_trip() {
    let mut server = Server::new_async().await;
    let _results = server
        .mock("POST", RESULTS_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"results": [
                {"scenario_id": SCENARIO_B, "step_key": "custom-step"}
            ]})
            .to_string(),
        )
        .create_async()
        .await;

    let handle = ScenarioWorker::spawn(client(&server));
    let result = handle
        .fetch(ids(&[SCENARIO_B]), context())
        .await
        .unwrap();

    let scenario = &result.scenarios[SCENARIO_B];
    assert_eq!(scenario.unclassified_steps.len(), 1);
    assert_eq!(scenario.unclassified_steps[0].step.step_key, "custom-step");
}
