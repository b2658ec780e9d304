use std::path::PathBuf;

use thiserror::Error;

/// An environment variable required by the application is not set.
#[derive(Debug, Error)]
#[error("Missing environment variable: {0}")]
pub struct MissingEnvVarError(pub String);

/// Reads an environment variable, returning a structured error if it's missing.
///
/// This is a thin wrapper around `std::env::var` that provides a more
/// ergonomic and specific error type for missing variables. A variable that
/// is set but blank is reported as missing too.
///
/// # Arguments
/// * `name` - The name of the environment variable to read.
pub fn get_env_var(name: &str) -> Result<String, MissingEnvVarError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(MissingEnvVarError(name.to_string())),
    }
}

/// Reads an environment variable, falling back to `default` when it is unset or blank.
pub fn env_var_or(name: &str, default: &str) -> String {
    get_env_var(name).unwrap_or_else(|_| default.to_string())
}

/// Resolves a path from an explicit value first, then from the named environment variable.
///
/// Used by binaries that accept both `--flag <PATH>` and an env override.
pub fn path_from_arg_or_env(
    explicit: Option<PathBuf>,
    name: &str,
) -> Result<PathBuf, MissingEnvVarError> {
    match explicit {
        Some(p) => Ok(p),
        None => get_env_var(name).map(PathBuf::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VAR: &str = "SHARED_UTILS_TEST_VAR";

    #[test]
    #[serial]
    fn missing_and_blank_are_errors() {
        unsafe { std::env::remove_var(VAR) };
        let err = get_env_var(VAR).unwrap_err();
        assert_eq!(err.to_string(), format!("Missing environment variable: {VAR}"));

        unsafe { std::env::set_var(VAR, "   ") };
        assert!(get_env_var(VAR).is_err());
        unsafe { std::env::remove_var(VAR) };
    }

    #[test]
    #[serial]
    fn fallback_and_explicit_precedence() {
        unsafe { std::env::set_var(VAR, "/tmp/from_env.toml") };
        assert_eq!(env_var_or(VAR, "x"), "/tmp/from_env.toml");

        let explicit = path_from_arg_or_env(Some(PathBuf::from("cli.toml")), VAR).unwrap();
        assert_eq!(explicit, PathBuf::from("cli.toml"));

        let from_env = path_from_arg_or_env(None, VAR).unwrap();
        assert_eq!(from_env, PathBuf::from("/tmp/from_env.toml"));

        unsafe { std::env::remove_var(VAR) };
        assert_eq!(env_var_or(VAR, "fallback"), "fallback");
        assert!(path_from_arg_or_env(None, VAR).is_err());
    }
}
