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

//! Split a testcase into model inputs and ground truth.

use serde_json::Value;

use crate::path::resolve_path;
use crate::run_index::{ColumnKind, ColumnMapping};
use crate::testset::PreviewTestcase;
use crate::JsonObject;

/// Field names treated as ground truth when the revision's inputs are unknown.
pub const GROUND_TRUTH_KEYS: [&str; 4] =
    ["correct_answer", "expected_output", "ground_truth", "label"];

/// Key never read as a plain input when falling back to `testcase.data`.
const MESSAGES_KEY: &str = "messages";

pub fn is_ground_truth_key(name: &str) -> bool {
    GROUND_TRUTH_KEYS.contains(&name)
}

/// Compute `(inputs, ground_truth)` for `testcase`.
///
/// Only mappings bound to `input_step_key` take part. With known
/// `input_param_names`, matching columns are inputs and the remaining testset
/// columns are ground truth; otherwise [`GROUND_TRUTH_KEYS`] decide. If no
/// input comes out of the mappings, the top-level keys of `testcase.data`
/// are used instead. The two key sets never overlap.
pub fn compute_inputs_and_ground_truth(
    testcase: &PreviewTestcase,
    mappings: &[ColumnMapping],
    input_step_key: &str,
    input_param_names: &[String],
) -> (JsonObject, JsonObject) {
    let mut inputs = JsonObject::new();
    let mut ground_truth = JsonObject::new();
    let root = testcase.to_value();
    let data = Value::Object(testcase.data.clone());

    for mapping in mappings.iter().filter(|m| m.step_key == input_step_key) {
        let Some(value) = resolve_path(&root, &mapping.path)
            .or_else(|| resolve_path(&data, &mapping.path))
        else {
            continue;
        };

        if !input_param_names.is_empty() {
            if input_param_names.iter().any(|name| *name == mapping.name) {
                inputs.insert(mapping.name.clone(), value.clone());
            } else if mapping.kind == ColumnKind::Testset {
                ground_truth.insert(mapping.name.clone(), value.clone());
            }
        } else if is_ground_truth_key(&mapping.name) {
            ground_truth.insert(mapping.name.clone(), value.clone());
        } else {
            inputs.insert(mapping.name.clone(), value.clone());
        }
    }

    if inputs.is_empty() {
        for (key, value) in &testcase.data {
            if key == MESSAGES_KEY || is_ground_truth_key(key) || ground_truth.contains_key(key) {
                continue;
            }
            inputs.insert(key.clone(), value.clone());
        }
    }

    (inputs, ground_truth)
}
