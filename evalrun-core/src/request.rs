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

//! Rebuild the request body a revision was invoked with.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, Result};
use crate::variant::{AppType, EnhancedVariant, UriInfo};
use crate::JsonObject;

const MESSAGES_KEY: &str = "messages";
const INPUTS_KEY: &str = "inputs";
const CONFIG_KEY: &str = "ag_config";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedRequest {
    pub request_body: Value,
    pub endpoint: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestShape {
    Chat,
    Completion,
    Custom,
}

fn shape_of(revision: &EnhancedVariant) -> RequestShape {
    if revision.app_type == AppType::Custom {
        RequestShape::Custom
    } else if revision.is_chat() {
        RequestShape::Chat
    } else {
        RequestShape::Completion
    }
}

/// `{runtime_prefix}[/{route_path}]/test`
pub fn build_endpoint(uri: &UriInfo) -> String {
    let prefix = uri.runtime_prefix.trim_end_matches('/');
    match uri
        .route_path
        .as_deref()
        .map(|route| route.trim_matches('/'))
        .filter(|route| !route.is_empty())
    {
        Some(route) => format!("{prefix}/{route}/test"),
        None => format!("{prefix}/test"),
    }
}

fn parse_messages(value: &Value) -> Result<Value> {
    match value {
        Value::Array(_) => Ok(value.clone()),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(parsed @ Value::Array(_)) => Ok(parsed),
            _ => Err(CoreError::InvalidMessages),
        },
        _ => Err(CoreError::InvalidMessages),
    }
}

/// Reconstruct the body and endpoint for invoking `revision` with
/// `input_parameters`.
///
/// Chat revisions get `messages` at the top level (decoded when it arrives
/// as a JSON string) and every other parameter under `inputs`. Completion
/// revisions nest everything under `inputs`. Custom apps receive their
/// parameters flat.
pub fn prepare_request(
    revision: &EnhancedVariant,
    input_parameters: &JsonObject,
    uri: &UriInfo,
) -> Result<PreparedRequest> {
    let mut body = JsonObject::new();
    if !revision.parameters.is_null() {
        body.insert(CONFIG_KEY.to_string(), revision.parameters.clone());
    }

    let shape = shape_of(revision);
    if shape == RequestShape::Custom {
        for (key, value) in input_parameters {
            body.insert(key.clone(), value.clone());
        }
    } else {
        let mut inputs = JsonObject::new();
        for (key, value) in input_parameters {
            match (shape, key.as_str(), value) {
                (RequestShape::Chat, MESSAGES_KEY, Value::Null) => {}
                (RequestShape::Chat, MESSAGES_KEY, _) => {
                    body.insert(MESSAGES_KEY.to_string(), parse_messages(value)?);
                }
                (_, INPUTS_KEY, Value::Object(nested)) => {
                    inputs.extend(nested.clone());
                }
                _ => {
                    inputs.insert(key.clone(), value.clone());
                }
            }
        }
        body.insert(INPUTS_KEY.to_string(), Value::Object(inputs));
    }

    Ok(PreparedRequest {
        request_body: Value::Object(body),
        endpoint: build_endpoint(uri),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    fn chat_revision() -> EnhancedVariant {
        let mut revision = EnhancedVariant::new("rev-chat");
        revision.is_chat_variant = true;
        revision.parameters = json!({"prompt": {"llm_config": {"model": "gpt-4o-mini"}}});
        revision
    }

    #[test]
    fn test_chat_messages_string_is_parsed() {
        let uri = UriInfo::new("http://svc/app-1");
        let prepared = prepare_request(
            &chat_revision(),
            &params(json!({
                "messages": r#"[{"role":"user","content":"hi"}]"#,
                "country": "France"
            })),
            &uri,
        )
        .unwrap();

        let body = &prepared.request_body;
        assert!(body["messages"].is_array());
        assert_eq!(body["messages"][0]["content"], json!("hi"));
        assert_eq!(body["inputs"], json!({"country": "France"}));
        assert_eq!(
            body["ag_config"]["prompt"]["llm_config"]["model"],
            json!("gpt-4o-mini")
        );
        assert_eq!(prepared.endpoint, "http://svc/app-1/test");
    }

    #[test]
    fn test_malformed_messages_error() {
        let err = prepare_request(
            &chat_revision(),
            &params(json!({"messages": "[{not json"})),
            &UriInfo::default(),
        )
        .unwrap_err();

        assert!(err.to_string().contains("content not valid for messages"));
    }

    #[test]
    fn test_completion_nests_everything() {
        let revision = EnhancedVariant::new("rev-1");
        let prepared = prepare_request(
            &revision,
            &params(json!({"country": "France", "messages": "kept as is"})),
            &UriInfo::new("http://svc/").with_route("/v1/"),
        )
        .unwrap();

        assert_eq!(
            prepared.request_body,
            json!({"inputs": {"country": "France", "messages": "kept as is"}})
        );
        assert_eq!(prepared.endpoint, "http://svc/v1/test");
    }

    #[test]
    fn test_custom_app_passes_keys_flat() {
        let mut revision = EnhancedVariant::new("rev-custom");
        revision.app_type = AppType::Custom;

        let prepared = prepare_request(
            &revision,
            &params(json!({"topic": "rust", "inputs": {"a": 1}})),
            &UriInfo::new("http://svc"),
        )
        .unwrap();

        assert_eq!(
            prepared.request_body,
            json!({"topic": "rust", "inputs": {"a": 1}})
        );
    }
}
