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

//! Background scenario worker
//!
//! Runs bulk fetches on a dedicated task so callers (a UI thread, a
//! request handler) only exchange serializable messages with it. Requests
//! are processed one at a time in arrival order; the task exits once every
//! [`WorkerHandle`] has been dropped.

use std::collections::BTreeMap;

use evalrun_core::ScenarioStepsResult;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::bulk::{fetch_scenario_steps_bulk, FetchContext};
use crate::client::EvalRunClient;
use crate::error::{FetchError, Result};

const CHANNEL_BUFFER_SIZE: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub scenario_ids: Vec<String>,
    pub context: FetchContext,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub scenarios: BTreeMap<String, ScenarioStepsResult>,
}

struct Envelope {
    request: BatchRequest,
    reply: oneshot::Sender<Result<BatchResult>>,
}

pub struct ScenarioWorker;

impl ScenarioWorker {
    /// Spawn the worker on the current tokio runtime.
    pub fn spawn(client: EvalRunClient) -> WorkerHandle {
        let (sender, receiver) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        tokio::spawn(worker_loop(client, receiver));
        WorkerHandle { sender }
    }
}

async fn worker_loop(client: EvalRunClient, mut receiver: mpsc::Receiver<Envelope>) {
    while let Some(Envelope { request, reply }) = receiver.recv().await {
        debug!(
            run_id = %request.context.run_id,
            scenarios = request.scenario_ids.len(),
            "worker received batch request"
        );
        let outcome = fetch_scenario_steps_bulk(&client, &request.scenario_ids, &request.context)
            .await
            .map(|scenarios| BatchResult { scenarios });

        if reply.send(outcome).is_err() {
            debug!("batch requester went away before the reply");
        }
    }
    debug!("scenario worker stopped");
}

/// Cloneable sender side of a [`ScenarioWorker`].
#[derive(Clone)]
pub struct WorkerHandle {
    sender: mpsc::Sender<Envelope>,
}

impl WorkerHandle {
    pub async fn request(&self, request: BatchRequest) -> Result<BatchResult> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(Envelope { request, reply })
            .await
            .map_err(|_| FetchError::WorkerClosed)?;
        response.await.map_err(|_| FetchError::WorkerClosed)?
    }

    pub async fn fetch(
        &self,
        scenario_ids: Vec<String>,
        context: FetchContext,
    ) -> Result<BatchResult> {
        self.request(BatchRequest {
            scenario_ids,
            context,
        })
        .await
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
