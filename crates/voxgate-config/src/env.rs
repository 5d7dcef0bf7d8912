use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Expand `{{ env.VAR }}` placeholders in raw config text
///
/// `{{ env.VAR | default("value") }}` falls back to `value` when `VAR` is
/// unset. Comment lines are copied through untouched, so a commented-out
/// secret never has to exist in the environment.
pub fn expand_env(input: &str) -> Result<String, String> {
    fn placeholder() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| {
            Regex::new(r#"\{\{\s*([A-Za-z0-9_.]+)\s*(?:\|\s*default\("([^"]*)"\))?\s*\}\}"#)
                .expect("placeholder pattern is valid")
        })
    }

    let mut failure: Option<String> = None;

    let expanded: Vec<String> = input
        .split('\n')
        .map(|line| {
            if failure.is_some() || line.trim_start().starts_with('#') {
                return line.to_string();
            }

            placeholder()
                .replace_all(line, |captures: &Captures<'_>| {
                    match resolve(&captures[1], captures.get(2).map(|m| m.as_str())) {
                        Ok(value) => value,
                        Err(e) => {
                            failure.get_or_insert(e);
                            String::new()
                        }
                    }
                })
                .into_owned()
        })
        .collect();

    match failure {
        Some(e) => Err(e),
        None => Ok(expanded.join("\n")),
    }
}

fn resolve(key: &str, default: Option<&str>) -> Result<String, String> {
    let Some(var_name) = key.strip_prefix("env.").filter(|name| !name.contains('.')) else {
        return Err(format!("only variables scoped with 'env.' are supported: `{key}`"));
    };

    match (std::env::var(var_name), default) {
        (Ok(value), _) => Ok(value),
        (Err(_), Some(default)) => Ok(default.to_string()),
        (Err(_), None) => Err(format!("environment variable not found: `{var_name}`")),
    }
}
