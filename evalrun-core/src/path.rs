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

//! Dot-path lookup into nested JSON values.

use serde_json::Value;

/// Resolve a dot-separated `path` inside `value`.
///
/// Numeric segments index into arrays. Object keys may themselves contain
/// dots (`{"a": {"b.c": 1}}` resolves `a.b.c`): when the plain walk fails,
/// each object level consumes the longest run of remaining segments that
/// exists as a literal key. An empty path yields `value` itself.
pub fn resolve_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }

    let segments: Vec<&str> = path.split('.').collect();
    walk(value, &segments).or_else(|| walk_longest_match(value, &segments))
}

fn child<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn walk<'a>(value: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    segments
        .iter()
        .try_fold(value, |current, segment| child(current, segment))
}

fn walk_longest_match<'a>(mut value: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    let mut start = 0;

    while start < segments.len() {
        let (next, end) = (start + 1..=segments.len())
            .rev()
            .find_map(|end| child(value, &segments[start..end].join(".")).map(|v| (v, end)))?;
        value = next;
        start = end;
    }

    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_path() {
        let value = json!({"a": {"b": {"c": 3}}});
        assert_eq!(resolve_path(&value, "a.b.c"), Some(&json!(3)));
        assert_eq!(resolve_path(&value, "a.b"), Some(&json!({"c": 3})));
    }

    #[test]
    fn test_dotted_literal_key() {
        let value = json!({"a": {"b.c": 1}});
        assert_eq!(resolve_path(&value, "a.b.c"), Some(&json!(1)));

        let top = json!({"x.y.z": "deep", "x": {"q": 0}});
        assert_eq!(resolve_path(&top, "x.y.z"), Some(&json!("deep")));
    }

    #[test]
    fn test_missing_path_is_none() {
        assert_eq!(resolve_path(&json!({}), "x.y"), None);
        assert_eq!(resolve_path(&json!({"x": 1}), "x.y"), None);
        assert_eq!(resolve_path(&Value::Null, "x"), None);
    }

    #[test]
    fn test_array_index_and_empty_path() {
        let value = json!({"messages": [{"content": "hi"}]});
        assert_eq!(
            resolve_path(&value, "messages.0.content"),
            Some(&json!("hi"))
        );
        assert_eq!(resolve_path(&value, "messages.3"), None);
        assert_eq!(resolve_path(&value, ""), Some(&value));
    }
}
