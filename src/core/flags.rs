//! Feature flags resolved once per run.
//!
//! A flag is a named boolean. Flags come from three layers, lowest first:
//! descriptor `[flags]` defaults, config-file `[flags]`, and command-line
//! toggles. Only the command-line layer can contradict itself.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::core::condition::is_reserved_word;

/// Invalid or contradictory flag input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlagError {
    #[error("feature flag `{name}` is both enabled and disabled")]
    Contradictory { name: String },

    #[error("invalid feature flag toggle `{toggle}`: {reason}")]
    InvalidToggle { toggle: String, reason: String },

    #[error("`{name}` is a reserved word and cannot be used as a feature flag")]
    Reserved { name: String },
}

/// A single explicit toggle, e.g. from `--enable NAME` or `--flag NAME=false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toggle {
    pub name: String,
    pub value: bool,
}

impl Toggle {
    pub fn new(name: impl Into<String>, value: bool) -> Self {
        Toggle {
            name: name.into(),
            value,
        }
    }

    /// Parse `NAME` (enable) or `NAME=<bool>`.
    pub fn parse(toggle: &str) -> Result<Self, FlagError> {
        let (name, value) = match toggle.split_once('=') {
            Some((name, raw)) => (name.trim(), parse_bool(raw.trim()).ok_or_else(|| {
                FlagError::InvalidToggle {
                    toggle: toggle.to_string(),
                    reason: format!("`{}` is not a boolean", raw.trim()),
                }
            })?),
            None => (toggle.trim(), true),
        };

        validate_flag_name(name).map_err(|e| match e {
            FlagError::InvalidToggle { reason, .. } => FlagError::InvalidToggle {
                toggle: toggle.to_string(),
                reason,
            },
            other => other,
        })?;

        Ok(Toggle::new(name, value))
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Check that a flag name is usable inside condition expressions.
pub fn validate_flag_name(name: &str) -> Result<(), FlagError> {
    if name.is_empty() {
        return Err(FlagError::InvalidToggle {
            toggle: name.to_string(),
            reason: "flag name is empty".to_string(),
        });
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(FlagError::InvalidToggle {
            toggle: name.to_string(),
            reason: format!("unexpected character `{}`", c),
        });
    }
    if is_reserved_word(name) {
        return Err(FlagError::Reserved {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// The resolved flag map for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureFlags {
    values: BTreeMap<String, bool>,
}

impl FeatureFlags {
    pub fn new() -> Self {
        FeatureFlags::default()
    }

    /// Resolve defaults beneath explicit toggles.
    ///
    /// Toggles naming the same flag with different values are rejected;
    /// repeating the same value is accepted.
    pub fn resolve<I>(defaults: I, toggles: &[Toggle]) -> Result<Self, FlagError>
    where
        I: IntoIterator<Item = (String, bool)>,
    {
        let mut explicit: BTreeMap<&str, bool> = BTreeMap::new();
        for toggle in toggles {
            validate_flag_name(&toggle.name)?;
            match explicit.insert(&toggle.name, toggle.value) {
                Some(previous) if previous != toggle.value => {
                    return Err(FlagError::Contradictory {
                        name: toggle.name.clone(),
                    });
                }
                _ => {}
            }
        }

        let mut flags = FeatureFlags::new();
        for (name, value) in defaults {
            validate_flag_name(&name)?;
            flags.values.insert(name, value);
        }
        for (name, value) in explicit {
            flags.values.insert(name.to_string(), value);
        }
        Ok(flags)
    }

    /// Set a flag, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: bool) -> &mut Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Builder-style `set`.
    pub fn with(mut self, name: impl Into<String>, value: bool) -> Self {
        self.set(name, value);
        self
    }

    /// Value of a flag; flags that were never set are `false`.
    pub fn get(&self, name: &str) -> bool {
        self.values.get(name).copied().unwrap_or(false)
    }

    /// Whether the flag was given a value by any layer.
    pub fn is_set(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for FeatureFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .values
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toggle() {
        assert_eq!(Toggle::parse("NO_FBX").unwrap(), Toggle::new("NO_FBX", true));
        assert_eq!(
            Toggle::parse("NO_FBX=off").unwrap(),
            Toggle::new("NO_FBX", false)
        );
        assert!(matches!(
            Toggle::parse("NO_FBX=maybe"),
            Err(FlagError::InvalidToggle { .. })
        ));
        assert!(matches!(
            Toggle::parse("bad name"),
            Err(FlagError::InvalidToggle { .. })
        ));
    }

    #[test]
    fn test_reserved_names_rejected() {
        assert_eq!(
            Toggle::parse("windows").unwrap_err(),
            FlagError::Reserved {
                name: "windows".to_string()
            }
        );
        assert!(matches!(
            Toggle::parse("test=false"),
            Err(FlagError::Reserved { .. })
        ));
    }

    #[test]
    fn test_toggles_override_defaults() {
        let flags = FeatureFlags::resolve(
            vec![("NO_FBX".to_string(), false), ("FAST".to_string(), true)],
            &[Toggle::new("NO_FBX", true)],
        )
        .unwrap();

        assert!(flags.get("NO_FBX"));
        assert!(flags.get("FAST"));
        assert!(!flags.get("MISSING"));
        assert!(!flags.is_set("MISSING"));
    }

    #[test]
    fn test_contradictory_toggles() {
        let err = FeatureFlags::resolve(
            Vec::new(),
            &[Toggle::new("NO_SDK", true), Toggle::new("NO_SDK", false)],
        )
        .unwrap_err();
        assert_eq!(
            err,
            FlagError::Contradictory {
                name: "NO_SDK".to_string()
            }
        );

        // Repeating the same value is fine.
        FeatureFlags::resolve(
            Vec::new(),
            &[Toggle::new("NO_SDK", true), Toggle::new("NO_SDK", true)],
        )
        .unwrap();
    }

    #[test]
    fn test_display_is_sorted() {
        let flags = FeatureFlags::new().with("b", true).with("a", false);
        assert_eq!(flags.to_string(), "[a=false, b=true]");
    }
}
