//! Environment variable fallback and `${VAR}` reference resolution.
//!
//! Env vars are a **fallback**, not an override: they only apply to fields
//! that no config file set. Embedded defaults do not count as set.

use std::collections::HashMap;
use std::fmt::Write as _;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

/// Supported `IBA_*` env var mappings.
const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "IBA_LOG_LEVEL",
        field_path: "logging.level",
    },
    EnvMapping {
        var_name: "IBA_LOG_FORMAT",
        field_path: "logging.format",
    },
    EnvMapping {
        var_name: "IBA_DEFAULT_TTL_SECS",
        field_path: "intent.default_ttl_secs",
    },
    EnvMapping {
        var_name: "IBA_DRIFT_THRESHOLD",
        field_path: "validator.drift_threshold",
    },
    EnvMapping {
        var_name: "IBA_DRIFT_WINDOW",
        field_path: "validator.drift_window",
    },
    EnvMapping {
        var_name: "IBA_BINDER_ALGORITHM",
        field_path: "binder.algorithm",
    },
    EnvMapping {
        var_name: "IBA_BINDER_KEY_ID",
        field_path: "binder.key_id",
    },
    EnvMapping {
        var_name: "IBA_BINDER_SECRET_PATH",
        field_path: "binder.secret_path",
    },
    EnvMapping {
        var_name: "IBA_BINDER_SIGNING_KEY_PATH",
        field_path: "binder.signing_key_path",
    },
];

/// Apply environment variable fallbacks to fields that were **not** set by
/// any config file layer.
///
/// Returns the number of env vars applied.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        if sources
            .get(mapping.field_path)
            .is_some_and(|layer| *layer != ConfigLayer::Defaults)
        {
            continue;
        }

        if let Some(val) = env_vars.get(mapping.var_name) {
            debug!(
                var = mapping.var_name,
                field = mapping.field_path,
                "applying env var fallback"
            );

            set_field_from_string(merged, mapping.field_path, val);
            sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
            count = count.saturating_add(1);
        }
    }

    count
}

/// Resolve `${VAR}` references within string values in the config tree.
///
/// References that don't resolve are left as-is.
pub fn resolve_env_references<S: ::std::hash::BuildHasher>(
    val: &mut toml::Value,
    env_vars: &HashMap<String, String, S>,
) {
    match val {
        toml::Value::String(s) => {
            *s = resolve_string_refs(s, env_vars);
        },
        toml::Value::Table(table) => {
            for (_, child) in table.iter_mut() {
                resolve_env_references(child, env_vars);
            }
        },
        toml::Value::Array(arr) => {
            for child in arr.iter_mut() {
                resolve_env_references(child, env_vars);
            }
        },
        _ => {},
    }
}

fn resolve_string_refs<S: ::std::hash::BuildHasher>(
    input: &str,
    env_vars: &HashMap<String, String, S>,
) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_name = String::new();
            let mut closed = false;

            for ch in chars.by_ref() {
                if ch == '}' {
                    closed = true;
                    break;
                }
                var_name.push(ch);
            }

            if closed && !var_name.is_empty() {
                if let Some(val) = env_vars.get(&var_name) {
                    result.push_str(val);
                } else {
                    debug!(var = var_name, "unresolved env var reference in config");
                    let _ = write!(result, "${{{var_name}}}");
                }
            } else {
                // Malformed, keep verbatim.
                result.push_str("${");
                result.push_str(&var_name);
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Set a dotted field in the TOML tree, creating intermediate tables.
fn set_field_from_string(root: &mut toml::Value, path: &str, val: &str) {
    let toml_val = coerce_to_toml_value(path, val);
    let Some((parents, leaf)) = path.rsplit_once('.') else {
        if let Some(table) = root.as_table_mut() {
            table.insert(path.to_owned(), toml_val);
        }
        return;
    };

    let mut current = root;
    for segment in parents.split('.') {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry(segment.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }

    if let Some(table) = current.as_table_mut() {
        table.insert(leaf.to_owned(), toml_val);
    }
}

/// Coerce an env var string to the TOML type the field expects.
fn coerce_to_toml_value(path: &str, val: &str) -> toml::Value {
    if matches!(
        path,
        "intent.default_ttl_secs" | "validator.drift_threshold" | "validator.drift_window"
    ) && let Ok(i) = val.parse::<i64>()
    {
        return toml::Value::Integer(i);
    }

    toml::Value::String(val.to_owned())
}

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_apply_env_fallbacks_over_defaults() {
        let mut merged: toml::Value = toml::from_str("[logging]\nlevel = \"info\"").unwrap();
        let mut sources = FieldSources::new();
        sources.insert("logging.level".to_owned(), ConfigLayer::Defaults);
        let env = make_env(&[("IBA_LOG_LEVEL", "debug")]);

        let count = apply_env_fallbacks(&mut merged, &mut sources, &env);

        assert_eq!(count, 1);
        assert_eq!(merged["logging"]["level"].as_str().unwrap(), "debug");
        assert_eq!(
            sources.get("logging.level"),
            Some(&ConfigLayer::Environment)
        );
    }

    #[test]
    fn test_env_fallback_skips_file_values() {
        let mut merged: toml::Value =
            toml::from_str("[validator]\ndrift_threshold = 5").unwrap();
        let mut sources = FieldSources::new();
        sources.insert("validator.drift_threshold".to_owned(), ConfigLayer::File);

        let env = make_env(&[("IBA_DRIFT_THRESHOLD", "9")]);
        let count = apply_env_fallbacks(&mut merged, &mut sources, &env);

        assert_eq!(count, 0);
        assert_eq!(merged["validator"]["drift_threshold"].as_integer(), Some(5));
    }

    #[test]
    fn test_env_fallback_creates_missing_tables() {
        let mut merged = toml::Value::Table(toml::map::Map::new());
        let mut sources = FieldSources::new();
        let env = make_env(&[("IBA_DRIFT_WINDOW", "10"), ("IBA_BINDER_KEY_ID", "k7")]);

        let count = apply_env_fallbacks(&mut merged, &mut sources, &env);

        assert_eq!(count, 2);
        assert_eq!(merged["validator"]["drift_window"].as_integer(), Some(10));
        assert_eq!(merged["binder"]["key_id"].as_str(), Some("k7"));
    }

    #[test]
    fn test_resolve_env_references() {
        let mut val: toml::Value =
            toml::from_str("[binder]\nsecret_path = \"${KEY_DIR}/hmac.key\"").unwrap();
        let env = make_env(&[("KEY_DIR", "/var/lib/iba")]);
        resolve_env_references(&mut val, &env);

        assert_eq!(
            val["binder"]["secret_path"].as_str().unwrap(),
            "/var/lib/iba/hmac.key"
        );
    }

    #[test]
    fn test_resolve_env_references_unresolved() {
        let mut val: toml::Value =
            toml::from_str("[binder]\nkey_id = \"${MISSING_VAR}\"").unwrap();
        resolve_env_references(&mut val, &HashMap::new());

        assert_eq!(val["binder"]["key_id"].as_str().unwrap(), "${MISSING_VAR}");
    }

    #[test]
    fn test_resolve_inside_arrays() {
        let mut val: toml::Value =
            toml::from_str("[binder]\ntrusted_keys = [\"${PEER}\"]").unwrap();
        let env = make_env(&[("PEER", "abcd")]);
        resolve_env_references(&mut val, &env);

        assert_eq!(val["binder"]["trusted_keys"][0].as_str(), Some("abcd"));
    }

    #[test]
    fn test_malformed_reference_kept() {
        assert_eq!(resolve_string_refs("${OPEN", &HashMap::new()), "${OPEN");
    }

    #[test]
    fn test_coerce_integer_and_string() {
        assert_eq!(
            coerce_to_toml_value("validator.drift_threshold", "4").as_integer(),
            Some(4)
        );
        assert_eq!(
            coerce_to_toml_value("validator.drift_threshold", "many").as_str(),
            Some("many")
        );
        assert_eq!(
            coerce_to_toml_value("binder.algorithm", "ed25519").as_str(),
            Some("ed25519")
        );
    }
}
