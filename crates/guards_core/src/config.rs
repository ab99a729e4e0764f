//! Engine configuration.
//!
//! The configuration is an immutable snapshot: the engine reads it once when
//! it is built and never consults global flags afterwards. Rebuilding the
//! engine is the only way to change it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How failed checks are reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnforcementMode {
    /// A failed check raises a contract violation
    #[default]
    Exception,
    /// A failed check raises only while assertions are enabled
    Assertion,
    /// Nothing is checked
    Disabled,
}

impl fmt::Display for EnforcementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnforcementMode::Exception => f.write_str("exception"),
            EnforcementMode::Assertion => f.write_str("assertion"),
            EnforcementMode::Disabled => f.write_str("disabled"),
        }
    }
}

/// Process-wide engine options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Failure reporting mode
    pub mode: EnforcementMode,

    /// Allow primitive widening at all
    pub widen: bool,

    /// Allow widening steps that end in `int64`
    pub widen_to_long: bool,

    /// Allow widening `float32` to `float64`
    pub widen_to_double: bool,

    /// Allow unboxing boxed values to reach primitive checkers
    pub unbox: bool,

    /// Hand absent values to checkers that opted into null handling
    pub test_nulls: bool,

    /// Whether assertions are enabled (consulted in assertion mode only)
    pub assertions_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: EnforcementMode::Exception,
            widen: true,
            widen_to_long: true,
            widen_to_double: true,
            unbox: true,
            test_nulls: true,
            assertions_enabled: false,
        }
    }
}

impl EngineConfig {
    /// Creates a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new builder for `EngineConfig`.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Returns true if checks run at all under this configuration.
    ///
    /// Assertion mode with assertions disabled skips the check entirely,
    /// exactly like disabled mode.
    pub fn checks_enabled(&self) -> bool {
        match self.mode {
            EnforcementMode::Exception => true,
            EnforcementMode::Assertion => self.assertions_enabled,
            EnforcementMode::Disabled => false,
        }
    }
}

/// Builder for `EngineConfig`.
///
/// # Example
///
/// ```rust
/// use guards_core::{EngineConfig, EnforcementMode};
///
/// let config = EngineConfig::builder()
///     .mode(EnforcementMode::Assertion)
///     .assertions_enabled(true)
///     .unbox(false)
///     .build();
///
/// assert!(config.checks_enabled());
/// assert!(!config.unbox);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Sets the enforcement mode.
    pub fn mode(mut self, mode: EnforcementMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Enables or disables primitive widening.
    pub fn widen(mut self, widen: bool) -> Self {
        self.config.widen = widen;
        self
    }

    /// Enables or disables widening into `int64`.
    pub fn widen_to_long(mut self, widen_to_long: bool) -> Self {
        self.config.widen_to_long = widen_to_long;
        self
    }

    /// Enables or disables widening into `float64`.
    pub fn widen_to_double(mut self, widen_to_double: bool) -> Self {
        self.config.widen_to_double = widen_to_double;
        self
    }

    /// Enables or disables unboxing.
    pub fn unbox(mut self, unbox: bool) -> Self {
        self.config.unbox = unbox;
        self
    }

    /// Enables or disables checking absent values.
    pub fn test_nulls(mut self, test_nulls: bool) -> Self {
        self.config.test_nulls = test_nulls;
        self
    }

    /// Sets whether assertions are enabled.
    pub fn assertions_enabled(mut self, enabled: bool) -> Self {
        self.config.assertions_enabled = enabled;
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> EngineConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.mode, EnforcementMode::Exception);
        assert!(config.widen && config.unbox && config.test_nulls);
        assert!(!config.assertions_enabled);
        assert!(config.checks_enabled());
    }

    #[test]
    fn test_checks_enabled_per_mode() {
        let assertion = EngineConfig::builder()
            .mode(EnforcementMode::Assertion)
            .build();
        assert!(!assertion.checks_enabled());

        let disabled = EngineConfig::builder()
            .mode(EnforcementMode::Disabled)
            .assertions_enabled(true)
            .build();
        assert!(!disabled.checks_enabled());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: EngineConfig = serde_yaml_ng::from_str("mode: disabled\nunbox: false\n").unwrap();
        assert_eq!(config.mode, EnforcementMode::Disabled);
        assert!(!config.unbox);
        assert!(config.widen);
    }
}
