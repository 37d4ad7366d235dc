// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! API key resolution shared by the HTTP adapters.

use crate::error::SableError;

/// Resolves an API key: a non-empty configured value wins, then the first
/// non-empty variable in `env_vars`.
///
/// `setting` names the config key in the error message (`anthropic.api_key`).
pub fn resolve_api_key(
    configured: Option<&str>,
    env_vars: &[&str],
    setting: &str,
) -> Result<String, SableError> {
    if let Some(key) = configured
        && !key.is_empty()
    {
        return Ok(key.to_string());
    }

    for var in env_vars {
        if let Ok(value) = std::env::var(var)
            && !value.is_empty()
        {
            return Ok(value);
        }
    }

    Err(SableError::Config(format!(
        "API key not found. Set {setting} in config or one of: {}",
        env_vars.join(", ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_key_wins() {
        let key = resolve_api_key(Some("sk-1"), &["SABLE_TEST_UNSET_KEY"], "x.api_key").unwrap();
        assert_eq!(key, "sk-1");
    }

    #[test]
    fn empty_configured_key_is_ignored() {
        let err = resolve_api_key(Some(""), &["SABLE_TEST_UNSET_KEY_A"], "openai.api_key")
            .unwrap_err()
            .to_string();
        assert!(err.contains("openai.api_key"), "got: {err}");
        assert!(err.contains("SABLE_TEST_UNSET_KEY_A"), "got: {err}");
    }

    #[test]
    fn falls_back_to_process_environment() {
        // PATH is set in every test environment.
        let key = resolve_api_key(None, &["SABLE_TEST_UNSET_KEY_B", "PATH"], "x").unwrap();
        assert!(!key.is_empty());
    }
}
