/// Prompt name used when neither `SMASH_PROMPT` nor `chprompt` set one.
pub const DEFAULT_PROMPT: &str = "smash";

/// Log filter used when `SMASH_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Runtime settings read once at start-up.
#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Prompt name restored by a bare `chprompt`.
    pub prompt: String,
    /// `tracing-subscriber` filter directive.
    pub log_filter: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl ShellConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            prompt: lookup("SMASH_PROMPT")
                .filter(|p| !p.trim().is_empty())
                .unwrap_or(defaults.prompt),
            log_filter: lookup("SMASH_LOG")
                .filter(|f| !f.trim().is_empty())
                .unwrap_or(defaults.log_filter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        let config = ShellConfig::from_lookup(|_| None);
        assert_eq!(config.prompt, "smash");
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn env_overrides_and_blank_values_ignored() {
        let config = ShellConfig::from_lookup(|key| match key {
            "SMASH_PROMPT" => Some("mysh".to_string()),
            "SMASH_LOG" => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.prompt, "mysh");
        assert_eq!(config.log_filter, "warn");
    }
}
