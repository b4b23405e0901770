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

//! Evalrun Core
//!
//! Data model and pure functions for turning evaluation-run step records
//! into UI-ready scenarios.
//!
//! ## Pipeline
//!
//! - [`path::resolve_path`]: dot-path lookup tolerant of dotted keys
//! - [`mapping::compute_inputs_and_ground_truth`]: testcase columns to inputs / ground truth
//! - [`classify::identify_scenario_steps`]: input / invocation / annotation split
//! - [`references::derive_testset_and_revision`]: referenced testsets and revisions
//! - [`request::prepare_request`]: rebuild the invocation request body
//! - [`scenario::ScenarioEnricher`]: all of the above for one scenario
//!
//! Nothing here performs I/O; fetching lives in `evalrun-client`.

pub mod classify;
pub mod error;
pub mod mapping;
pub mod observability;
pub mod path;
pub mod references;
pub mod request;
pub mod run_index;
pub mod scenario;
pub mod step;
pub mod testset;
pub mod variant;

/// A JSON object (`{"key": value, ...}`).
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

pub use classify::{identify_scenario_steps, match_evaluator, EvaluatorMatch, ScenarioSteps};
pub use error::{CoreError, Result};
pub use mapping::{compute_inputs_and_ground_truth, is_ground_truth_key, GROUND_TRUTH_KEYS};
pub use observability::{normalize_trace_id, AnnotationLink, AnnotationRaw, TraceTree, TreeRef};
pub use path::resolve_path;
pub use references::{derive_testset_and_revision, ResolvedReferences};
pub use request::{build_endpoint, prepare_request, PreparedRequest};
pub use run_index::{
    ColumnKind, ColumnMapping, RunColumn, RunData, RunIndex, RunMapping, RunStep, RunStepPath,
    StepKind, StepMeta,
};
pub use scenario::{EnrichedStep, ScenarioEnricher, ScenarioStepsResult};
pub use step::{EntityRef, StepReferences, StepResult, StepStatus};
pub use testset::{merge_testcases, PreviewTestcase, PreviewTestset};
pub use variant::{AppType, EnhancedVariant, EvaluatorDto, InputParam, UriInfo};
