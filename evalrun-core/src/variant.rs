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

//! Application revisions and evaluators referenced by steps.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of application a revision belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppType {
    Chat,
    Custom,
    /// Also used for app types this crate does not know.
    #[default]
    #[serde(other)]
    Completion,
}

/// Where a revision's service is mounted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UriInfo {
    #[serde(default)]
    pub runtime_prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_path: Option<String>,
}

impl UriInfo {
    pub fn new(runtime_prefix: impl Into<String>) -> Self {
        Self {
            runtime_prefix: runtime_prefix.into(),
            route_path: None,
        }
    }

    pub fn with_route(mut self, route_path: impl Into<String>) -> Self {
        self.route_path = Some(route_path.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputParam {
    pub name: String,
}

/// An application revision with its prompt configuration and input schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedVariant {
    /// Revision id; this is what step references point at.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<u64>,
    #[serde(default)]
    pub parameters: Value,
    #[serde(default)]
    pub input_params: Vec<InputParam>,
    #[serde(default)]
    pub is_chat_variant: bool,
    #[serde(default)]
    pub app_type: AppType,
    #[serde(default)]
    pub uri: UriInfo,
}

impl EnhancedVariant {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            variant_id: None,
            variant_name: None,
            revision: None,
            parameters: Value::Null,
            input_params: Vec::new(),
            is_chat_variant: false,
            app_type: AppType::default(),
            uri: UriInfo::default(),
        }
    }

    pub fn with_input_params<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input_params = names
            .into_iter()
            .map(|name| InputParam { name: name.into() })
            .collect();
        self
    }

    pub fn input_param_names(&self) -> Vec<String> {
        self.input_params.iter().map(|p| p.name.clone()).collect()
    }

    pub fn is_chat(&self) -> bool {
        self.is_chat_variant || self.app_type == AppType::Chat
    }
}

/// Evaluator identity, used only for matching annotation steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluatorDto {
    pub id: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl EvaluatorDto {
    pub fn new(id: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            slug: slug.into(),
            name: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_app_type_is_completion() {
        let variant: EnhancedVariant =
            serde_json::from_str(r#"{"id": "rev-1", "app_type": "chat (old)"}"#).unwrap();
        assert_eq!(variant.app_type, AppType::Completion);
        assert!(!variant.is_chat());

        let chat: EnhancedVariant =
            serde_json::from_str(r#"{"id": "rev-2", "app_type": "chat"}"#).unwrap();
        assert!(chat.is_chat());
    }
}
