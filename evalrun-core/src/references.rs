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

//! Which testsets and revisions a batch of steps refers to.

use std::collections::HashSet;

use crate::run_index::RunIndex;
use crate::step::{EntityRef, StepReferences, StepResult};
use crate::testset::PreviewTestset;
use crate::variant::EnhancedVariant;

/// Subset of the known testsets and revisions referenced by some steps,
/// in the order of the supplied collections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedReferences<'a> {
    pub testsets: Vec<&'a PreviewTestset>,
    pub revisions: Vec<&'a EnhancedVariant>,
}

impl<'a> ResolvedReferences<'a> {
    pub fn testset(&self) -> Option<&'a PreviewTestset> {
        self.testsets.first().copied()
    }

    pub fn revision(&self) -> Option<&'a EnhancedVariant> {
        self.revisions.first().copied()
    }
}

/// Id of the entity playing `role` for `step`: the run's declaration first,
/// the step's own references otherwise.
pub fn referenced_id<'s>(
    step: &'s StepResult,
    run_index: &'s RunIndex,
    role: impl Fn(&StepReferences) -> Option<&EntityRef>,
) -> Option<&'s str> {
    run_index
        .refs_of(&step.step_key)
        .and_then(&role)
        .and_then(|r| r.id.as_deref())
        .or_else(|| role(&step.references).and_then(|r| r.id.as_deref()))
}

pub fn derive_testset_and_revision<'a>(
    input_steps: &[StepResult],
    invocation_steps: &[StepResult],
    run_index: &RunIndex,
    testsets: &'a [PreviewTestset],
    variants: &'a [EnhancedVariant],
) -> ResolvedReferences<'a> {
    let mut testset_ids: HashSet<&str> = HashSet::new();
    let mut revision_ids: HashSet<&str> = HashSet::new();

    for step in input_steps.iter().chain(invocation_steps) {
        if let Some(id) = referenced_id(step, run_index, |r| r.testset()) {
            testset_ids.insert(id);
        }
        if let Some(id) = referenced_id(step, run_index, |r| r.application_revision()) {
            revision_ids.insert(id);
        }
    }

    ResolvedReferences {
        testsets: testsets
            .iter()
            .filter(|ts| testset_ids.contains(ts.id.as_str()))
            .collect(),
        revisions: variants
            .iter()
            .filter(|v| revision_ids.contains(v.id.as_str()))
            .collect(),
    }
}
