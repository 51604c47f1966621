//! Settings YAML parsing with environment variable substitution.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::config::settings::GeneratorSettings;

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var regex"));

/// Substitute `${VAR_NAME}` patterns with environment variable values.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set.
pub fn substitute_env_vars(input: &str) -> Result<String> {
    substitute_with(input, |key| std::env::var(key).ok())
}

/// [`substitute_env_vars`] against an arbitrary variable lookup.
///
/// # Errors
///
/// Returns an error naming every referenced variable `lookup` cannot resolve.
pub fn substitute_with<F>(input: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut missing = Vec::new();
    let result = ENV_VAR_RE.replace_all(input, |cap: &regex::Captures<'_>| {
        let var_name = &cap[1];
        lookup(var_name).unwrap_or_else(|| {
            if !missing.iter().any(|m| m == var_name) {
                missing.push(var_name.to_string());
            }
            String::new()
        })
    });

    if !missing.is_empty() {
        anyhow::bail!("Missing environment variable(s): {}", missing.join(", "));
    }

    Ok(result.into_owned())
}

/// Parse a settings YAML string (after env var substitution).
///
/// # Errors
///
/// Returns an error if env var substitution fails or the YAML is invalid.
pub fn parse_settings_str(yaml_str: &str) -> Result<GeneratorSettings> {
    let substituted = substitute_env_vars(yaml_str)?;
    let settings: GeneratorSettings =
        serde_yaml::from_str(&substituted).context("Failed to parse settings YAML")?;
    Ok(settings)
}

/// Parse a settings YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the YAML is invalid.
pub fn parse_settings(path: &Path) -> Result<GeneratorSettings> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
    parse_settings_str(&content)
}

/// Settings from `path` when given, otherwise from the process environment.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or an environment
/// flag is malformed.
pub fn load_settings(path: Option<&Path>) -> Result<GeneratorSettings> {
    match path {
        Some(path) => parse_settings(path)
            .with_context(|| format!("Failed to load settings: {}", path.display())),
        None => GeneratorSettings::from_env(),
    }
}
