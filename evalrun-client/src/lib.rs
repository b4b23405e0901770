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

//! Evalrun Client
//!
//! Fetches evaluation-run scenario steps in batches and enriches them with
//! testcases, reconstructed requests, traces and annotations.
//!
//! # Quick Start
//!
//! ```no_run
//! use evalrun_client::{fetch_scenario_steps_bulk, ClientConfig, EvalRunClient, FetchContext};
//! use evalrun_core::{RunData, RunIndex};
//!
//! # async fn example(run_json: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let client = EvalRunClient::new(ClientConfig::from_env())?;
//! let run_index = RunIndex::build(&RunData::from_json_str(run_json)?);
//! let context = FetchContext::new("run-1", run_index);
//!
//! let ids = vec!["0195c2a4-7f1b-7a8e-9d3c-000000000001".to_string()];
//! let scenarios = fetch_scenario_steps_bulk(&client, &ids, &context).await?;
//! for (id, scenario) in &scenarios {
//!     println!("{id}: {} steps", scenario.step_count());
//! }
//! # Ok(())
//! # }
//! ```

pub mod bulk;
pub mod client;
pub mod config;
pub mod enrich;
pub mod error;
pub mod types;
pub mod worker;

pub use bulk::{
    fetch_scenario_steps_bulk, is_valid_scenario_id, FetchContext, DEFAULT_BATCH_CONCURRENCY,
    DEFAULT_BATCH_SIZE,
};
pub use client::EvalRunClient;
pub use config::{ClientConfig, DEFAULT_API_URL, DEFAULT_TIMEOUT};
pub use enrich::{
    decorate_scenario_result, enrich_with_observability, fetch_trace_and_annotation_maps,
    ObservabilityMaps,
};
pub use error::{FetchError, Result};
pub use worker::{BatchRequest, BatchResult, ScenarioWorker, WorkerHandle};
