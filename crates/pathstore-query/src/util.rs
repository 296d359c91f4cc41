//! Query descriptor utility helpers.

use crate::types::{ParsedPath, PathStep, Query};

/// Render a descriptor back to canonical expression text.
///
/// Derived names are not re-emitted as aliases, so the output is the
/// canonical spelling rather than the original input.
pub fn query_to_string(query: &Query) -> String {
    let mut out = query.store.clone();
    for step in &query.store_path {
        match step {
            PathStep::Key(key) => {
                out.push('.');
                out.push_str(key);
            }
            PathStep::Predicate { key, value } => {
                out.push_str(&format!(".[{}:{}]", key, value));
            }
        }
    }
    if let Some(just) = &query.just {
        out.push_str(&format!(":just({})", just.join(", ")));
    }
    if let Some(not) = &query.not {
        out.push_str(&format!(":not({})", not.join(", ")));
    }
    if let Some(name) = &query.name {
        let derived = query.prop_name.as_deref() == Some(name)
            || (query.store_path.is_empty() && *name == query.store);
        if !derived {
            out.push_str(&format!(" -- {}", name));
        }
    }
    out
}

/// Store names referenced by an expression, in source order, deduplicated.
pub fn accessed_stores(parsed: &ParsedPath) -> Vec<String> {
    let mut stores: Vec<String> = Vec::new();
    for query in parsed.queries() {
        if !stores.iter().any(|s| s == &query.store) {
            stores.push(query.store.clone());
        }
    }
    stores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn stringify_path_and_filters() {
        let parsed = parse("App.list.[id:2]:not(id, status:archived) -- row").unwrap();
        let query = &parsed.queries()[0];
        assert_eq!(
            query_to_string(query),
            "App.list.[id:2]:not(id, status:archived) -- row"
        );
    }

    #[test]
    fn stringify_skips_derived_names() {
        let parsed = parse("App.config.session").unwrap();
        assert_eq!(query_to_string(&parsed.queries()[0]), "App.config.session");

        let parsed = parse("A | B.a.b").unwrap();
        assert_eq!(query_to_string(&parsed.queries()[0]), "A");
        assert_eq!(query_to_string(&parsed.queries()[1]), "B.a.b");
    }

    #[test]
    fn accessed_stores_dedups_in_order() {
        let parsed = parse("App.a | User.b | App.c").unwrap();
        assert_eq!(accessed_stores(&parsed), vec!["App", "User"]);
    }
}
