use crate::errors::ServerError;
use std::env;

/// Environment variable holding the address the server binds to
pub const BIND_ADDR_VAR: &str = "BOOKSHELF_BIND_ADDR";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:9000";
/// Environment variable holding the longest request line a client may send, in bytes
pub const MAX_LINE_BYTES_VAR: &str = "BOOKSHELF_MAX_LINE_BYTES";
pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind to, e.g. `127.0.0.1:9000`
    pub bind_addr: String,
    /// Longest accepted request line, not counting the newline. Longer lines are answered with a
    /// `fail` reply and skipped.
    pub max_line_bytes: usize,
}

impl Default for ServerConfig {
    #[inline]
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_owned(),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }
}

impl ServerConfig {
    /// Reads the configuration from the process environment. Load `.env` before calling this to
    /// have its values picked up.
    /// # Errors
    /// Fails if a variable is set to an unusable value.
    #[inline]
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup, falling back to defaults for unset
    /// keys.
    /// # Errors
    /// Fails if the bind address is set but blank, or if the line limit is not a positive
    /// integer.
    #[inline]
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(bind_addr) = lookup(BIND_ADDR_VAR) {
            let bind_addr = bind_addr.trim();
            if bind_addr.is_empty() {
                return Err(ServerError::Config(format!("{BIND_ADDR_VAR} is empty")));
            }
            bind_addr.clone_into(&mut config.bind_addr);
        }
        if let Some(max_line_bytes) = lookup(MAX_LINE_BYTES_VAR) {
            config.max_line_bytes = parse_line_limit(&max_line_bytes)?;
        }
        Ok(config)
    }
}

fn parse_line_limit(raw: &str) -> Result<usize, ServerError> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err(ServerError::Config(format!(
            "{MAX_LINE_BYTES_VAR} must be greater than zero"
        ))),
        Ok(limit) => Ok(limit),
        Err(err) => Err(ServerError::Config(format!(
            "{MAX_LINE_BYTES_VAR} is not a byte count ({raw:?}): {err}"
        ))),
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "Tests are predefined and guaranteed to be Some/Ok"
)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unset_uses_default() {
        let config = ServerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.max_line_bytes, 65_536);
    }

    #[test]
    fn set_value_is_trimmed() {
        let config = ServerConfig::from_lookup(|key| {
            (key == BIND_ADDR_VAR).then(|| " 0.0.0.0:8080 ".to_owned())
        })
        .unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
    }

    #[test]
    fn blank_value_is_rejected() {
        let result = ServerConfig::from_lookup(|_| Some("  ".to_owned()));
        assert!(matches!(result, Err(ServerError::Config(_))));
    }

    #[test]
    fn line_limit_is_read_from_env() {
        let config = ServerConfig::from_lookup(|key| {
            (key == MAX_LINE_BYTES_VAR).then(|| " 1024 ".to_owned())
        })
        .unwrap();
        assert_eq!(config.max_line_bytes, 1024);
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
    }

    #[test]
    fn unusable_line_limit_is_rejected() {
        for raw in ["0", "-5", "lots", ""] {
            let result = ServerConfig::from_lookup(|key| {
                (key == MAX_LINE_BYTES_VAR).then(|| raw.to_owned())
            });
            assert!(
                matches!(result, Err(ServerError::Config(_))),
                "{raw:?} should be rejected"
            );
        }
    }
}
