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

use evalrun_core::CoreError;
use thiserror::Error;

/// Errors from fetching scenario steps.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Required configuration or context is missing. Raised before any request.
    #[error("Invalid fetch context: {0}")]
    Validation(String),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Scenario worker is no longer running")]
    WorkerClosed,
}

pub type Result<T> = std::result::Result<T, FetchError>;
