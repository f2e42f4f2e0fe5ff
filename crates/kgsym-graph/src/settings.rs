//! Process-wide defaults read from the environment.
//!
//! `KGSYM_DISABLE_CONSISTENCY_CHECKING=true` turns checking off for new
//! graphs and `KGSYM_FIRST_AUTO_KEY` moves the first generated key number.
//! Both are read once; a graph can still toggle checking afterwards.

use once_cell::sync::Lazy;

pub const DISABLE_CONSISTENCY_VAR: &str = "KGSYM_DISABLE_CONSISTENCY_CHECKING";
pub const FIRST_AUTO_KEY_VAR: &str = "KGSYM_FIRST_AUTO_KEY";
pub const DEFAULT_FIRST_AUTO_KEY: u64 = 1000;

static CURRENT: Lazy<Settings> = Lazy::new(Settings::from_env);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub consistency_checking: bool,
    pub first_auto_key: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            consistency_checking: true,
            first_auto_key: DEFAULT_FIRST_AUTO_KEY,
        }
    }
}

impl Settings {
    /// Settings read from the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Settings read through `lookup`, which maps a variable name to its value
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();

        if let Some(value) = lookup(DISABLE_CONSISTENCY_VAR) {
            settings.consistency_checking = !value.trim().eq_ignore_ascii_case("true");
        }

        if let Some(value) = lookup(FIRST_AUTO_KEY_VAR) {
            match value.trim().parse::<u64>() {
                Ok(first) => settings.first_auto_key = first,
                Err(_) => tracing::warn!(
                    variable = FIRST_AUTO_KEY_VAR,
                    %value,
                    "ignoring non-numeric setting"
                ),
            }
        }

        settings
    }

    /// The settings read from the environment on first use
    #[must_use]
    pub fn current() -> &'static Self {
        &CURRENT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[]));
        assert_eq!(settings, Settings::default());
        assert!(settings.consistency_checking);
        assert_eq!(settings.first_auto_key, 1000);
    }

    #[test]
    fn test_disable_is_case_insensitive() {
        let settings = Settings::from_lookup(lookup(&[(DISABLE_CONSISTENCY_VAR, "TRUE")]));
        assert!(!settings.consistency_checking);

        // anything but "true" leaves checking on
        let settings = Settings::from_lookup(lookup(&[(DISABLE_CONSISTENCY_VAR, "1")]));
        assert!(settings.consistency_checking);
    }

    #[test]
    fn test_first_auto_key() {
        let settings = Settings::from_lookup(lookup(&[(FIRST_AUTO_KEY_VAR, "2000")]));
        assert_eq!(settings.first_auto_key, 2000);

        let settings = Settings::from_lookup(lookup(&[(FIRST_AUTO_KEY_VAR, "many")]));
        assert_eq!(settings.first_auto_key, DEFAULT_FIRST_AUTO_KEY);
    }
}
