//! Store path evaluator.

use crate::types::{PathStep, Query};
use serde_json::{Map, Value};

/// Store path evaluator.
pub struct PathEval;

impl PathEval {
    /// Resolve one descriptor against a nested data tree.
    ///
    /// Total over any descriptor/tree pair: a path that does not
    /// resolve yields `None` (or its wrapped form), never an error.
    /// The input tree is never mutated.
    pub fn resolve(query: &Query, data: &Value) -> Option<Value> {
        let result = match Self::walk(&query.store_path, data) {
            None => None,
            // Filters are skipped for null results, same as for absent ones.
            Some(Value::Null) => Some(Value::Null),
            Some(value) => Some(if let Some(just) = &query.just {
                Self::keep(just, value)
            } else if let Some(not) = &query.not {
                Self::exclude(not, value)
            } else {
                value.clone()
            }),
        };
        Self::finish(query, result)
    }

    /// Walk the store path left to right, short-circuiting to absent.
    fn walk<'a>(steps: &[PathStep], data: &'a Value) -> Option<&'a Value> {
        let mut current = data;
        for step in steps {
            current = match step {
                PathStep::Key(key) => current.get(key)?,
                PathStep::Predicate { key, value } => current
                    .as_array()?
                    .iter()
                    .find(|item| Self::field_matches(item, key, value))?,
            };
        }
        Some(current)
    }

    /// Build a new mapping from an inclusion list. Dotted items are
    /// nested lookups stored under their last segment; unmatched items
    /// are simply absent from the output.
    fn keep(just: &[String], value: &Value) -> Value {
        let mut out = Map::new();
        for item in just {
            if item.contains('.') {
                let parts: Vec<&str> = item.split('.').map(str::trim).collect();
                let mut found = Some(value);
                for part in &parts {
                    found = found.and_then(|v| v.get(part));
                }
                if let (Some(found), Some(last)) = (found, parts.last()) {
                    out.insert((*last).to_owned(), found.clone());
                }
            } else if let Some(field) = value.get(item) {
                out.insert(item.clone(), field.clone());
            }
        }
        Value::Object(out)
    }

    /// Apply an exclusion list: plain items omit mapping keys (element
    /// wise across a sequence), `key:value` items drop matching
    /// elements out of a sequence.
    fn exclude(not: &[String], value: &Value) -> Value {
        let mut props: Vec<&str> = Vec::new();
        let mut predicates: Vec<(&str, &str)> = Vec::new();
        for item in not {
            match item.split_once(':') {
                Some((key, val)) => predicates.push((key.trim(), val.trim())),
                None => props.push(item.as_str()),
            }
        }

        let mut result = match value {
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| Self::omit(&props, item)).collect())
            }
            Value::Object(_) => Self::omit(&props, value),
            other => other.clone(),
        };

        for (key, val) in predicates {
            result = match result {
                Value::Array(items) => Value::Array(
                    items
                        .into_iter()
                        .filter(|item| !Self::field_matches(item, key, val))
                        .collect(),
                ),
                other => other,
            };
        }
        result
    }

    /// Omission is a no-op on non-mapping values.
    fn omit(props: &[&str], value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut out = map.clone();
                for prop in props {
                    out.remove(*prop);
                }
                Value::Object(out)
            }
            other => other.clone(),
        }
    }

    /// True when `item[key]` matches `text` under the predicate
    /// coercion rule. Exposed so callers filtering outside the
    /// evaluator share the same rule.
    pub fn field_matches(item: &Value, key: &str, text: &str) -> bool {
        item.get(key).is_some_and(|field| Self::matches(field, text))
    }

    /// Predicate equality: exact string comparison against the
    /// stringified source field. Strings compare verbatim, numbers and
    /// booleans via their display form, everything else never matches.
    fn matches(field: &Value, text: &str) -> bool {
        match field {
            Value::String(s) => s == text,
            Value::Number(n) => n.to_string() == text,
            Value::Bool(b) => b.to_string() == text,
            _ => false,
        }
    }

    /// Wrap the final value under `name` when no `prop_name` was
    /// derived; an absent result wraps to `{name: null}`.
    fn finish(query: &Query, result: Option<Value>) -> Option<Value> {
        match &query.name {
            Some(name) if query.prop_name.is_none() => {
                let mut out = Map::new();
                out.insert(name.clone(), result.unwrap_or(Value::Null));
                Some(Value::Object(out))
            }
            _ => result,
        }
    }
}
