use crate::error::StreamwatchError;

use super::types::AppConfig;

/// Expand environment variable references in a string.
///
/// Supported syntaxes:
/// - `${VAR}` - replaced with env var value; error if unset
/// - `${VAR:-fallback}` - replaced with env var value, or fallback if unset or empty
///
/// A `$` not followed by `{` is kept literally.
pub fn expand_env_vars(input: &str) -> Result<String, StreamwatchError> {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or_else(|| {
            env_error(format!("Unclosed variable reference: ${{{after}"))
        })?;
        let expr = &after[..end];

        match expr.split_once(":-") {
            Some((name, fallback)) => match std::env::var(name) {
                Ok(val) if !val.is_empty() => result.push_str(&val),
                _ => result.push_str(fallback),
            },
            None => {
                let val = std::env::var(expr).map_err(|_| {
                    env_error(format!("Environment variable '{expr}' is not set"))
                })?;
                result.push_str(&val);
            }
        }
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    Ok(result)
}

fn expand_opt(value: &mut Option<String>) -> Result<(), StreamwatchError> {
    if let Some(ref mut v) = value {
        *v = expand_env_vars(v)?;
    }
    Ok(())
}

/// Expand environment variables in every string field of the config.
pub fn expand_app_config(config: &mut AppConfig) -> Result<(), StreamwatchError> {
    expand_opt(&mut config.client_id)?;
    expand_opt(&mut config.client_secret)?;
    config.auth_url = expand_env_vars(&config.auth_url)?;
    config.api_base_url = expand_env_vars(&config.api_base_url)?;
    if let Some(ref path) = config.settings_path {
        let expanded = expand_env_vars(&path.to_string_lossy())?;
        config.settings_path = Some(expanded.into());
    }
    Ok(())
}

fn env_error(detail: String) -> StreamwatchError {
    StreamwatchError::ConfigError {
        path: std::path::PathBuf::from("<env>"),
        detail,
    }
}
