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

//! Testsets and the testcases they contain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::JsonObject;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewTestcase {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub testset_id: Option<String>,
    #[serde(default)]
    pub data: JsonObject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl PreviewTestcase {
    pub fn new(id: impl Into<String>, data: JsonObject) -> Self {
        Self {
            id: id.into(),
            testset_id: None,
            data,
            created_at: None,
        }
    }

    pub fn in_testset(mut self, testset_id: impl Into<String>) -> Self {
        self.testset_id = Some(testset_id.into());
        self
    }

    /// JSON view of the whole testcase, used as the root for path lookups.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewTestset {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default)]
    pub testcases: Vec<PreviewTestcase>,
}

impl PreviewTestset {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            slug: None,
            testcases: Vec::new(),
        }
    }

    pub fn testcase(&self, testcase_id: &str) -> Option<&PreviewTestcase> {
        self.testcases.iter().find(|tc| tc.id == testcase_id)
    }
}

/// Merge freshly fetched testcases into a copy of `testsets`.
///
/// A fetched testcase replaces the entry with the same id inside its testset
/// or is appended to it. Testcases whose testset is not in the collection are
/// left out; callers keep them in their own lookup.
pub fn merge_testcases(
    testsets: &[PreviewTestset],
    fetched: &[PreviewTestcase],
) -> Vec<PreviewTestset> {
    let mut merged = testsets.to_vec();

    for testcase in fetched {
        let Some(testset_id) = testcase.testset_id.as_deref() else {
            continue;
        };
        let Some(testset) = merged.iter_mut().find(|ts| ts.id == testset_id) else {
            continue;
        };
        match testset.testcases.iter_mut().find(|tc| tc.id == testcase.id) {
            Some(existing) => *existing = testcase.clone(),
            None => testset.testcases.push(testcase.clone()),
        }
    }

    merged
}
