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

//! Client configuration
//!
//! Built in code with the `with_*` helpers or read from `EVALRUN_*`
//! environment variables.

use std::env;
use std::time::Duration;

use crate::error::{FetchError, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_API_URL: &str = "http://localhost/api";

/// Connection settings for the evaluation service.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API, e.g. `https://cloud.example.com/api`
    pub api_url: String,
    /// Project every query is scoped to
    pub project_id: String,
    /// Bearer token sent as `Authorization: Bearer {jwt}`
    pub jwt: Option<String>,
    /// Request timeout (default: 30 seconds)
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            project_id: project_id.into(),
            jwt: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_jwt(mut self, jwt: impl Into<String>) -> Self {
        self.jwt = Some(jwt.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_env() -> Self {
        Self {
            api_url: env::var("EVALRUN_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            project_id: env::var("EVALRUN_PROJECT_ID").unwrap_or_default(),
            jwt: env::var("EVALRUN_JWT").ok().filter(|jwt| !jwt.is_empty()),
            timeout: env::var("EVALRUN_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
        }
    }

    /// Fail fast when credentials or endpoints are missing.
    pub fn validate(&self) -> Result<()> {
        if self.api_url.trim().is_empty() {
            return Err(FetchError::Validation("api_url is required".into()));
        }
        if self.project_id.trim().is_empty() {
            return Err(FetchError::Validation("project_id is required".into()));
        }
        if self.jwt.as_deref().map_or(true, |jwt| jwt.trim().is_empty()) {
            return Err(FetchError::Validation("jwt is required".into()));
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL, "")
    }
}
