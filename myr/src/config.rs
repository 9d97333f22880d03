// Copyright 2026 The MYR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Config
//!
//! Defaults come from the build profile.  `MYR_VALIDATION` overrides whether the validation layer
//! and debug reporting are requested, and command line switches override both.

use log::warn;

use pompeii::prelude::*;

pub const VALIDATION_VAR: &str = "MYR_VALIDATION";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MyrConfig {
    pub context: ContextConfig,
    pub resizable: bool,
}

impl MyrConfig {
    pub fn new(app_name: &str, width: u32, height: u32) -> Self {
        let mut context = ContextConfig::new(app_name, width, height);
        context.engine_name = crate::ENGINE_NAME.to_string();
        MyrConfig {
            context,
            resizable: false,
        }
    }

    /// Overlay settings from the environment.
    pub fn with_env(self) -> Self {
        let value = std::env::var(VALIDATION_VAR).ok();
        self.with_validation_var(value.as_deref())
    }

    /// Apply a `MYR_VALIDATION` value.  Unset or empty leaves the current setting.
    pub fn with_validation_var(mut self, value: Option<&str>) -> Self {
        if let Some(enabled) = value.and_then(toggle) {
            self.context.validation = enabled;
        }
        self
    }

    pub fn with_validation(mut self, validation: bool) -> Self {
        self.context.validation = validation;
        self
    }

    pub fn with_present_policy(mut self, policy: PresentPolicy) -> Self {
        self.context.present_policy = policy;
        self
    }
}

/// `0`, `false`, `off` and `no` turn a switch off.  Any other non-empty value turns it on.
fn toggle(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match value.to_ascii_lowercase().as_str() {
        "0" | "false" | "off" | "no" => Some(false),
        "1" | "true" | "on" | "yes" => Some(true),
        other => {
            warn!("treating {VALIDATION_VAR}={other} as on");
            Some(true)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MyrConfig::new("Abyssal Drifter", 640, 480);
        assert_eq!(config.context.app_name, "Abyssal Drifter");
        assert_eq!(config.context.engine_name, "MYR");
        assert_eq!((config.context.width, config.context.height), (640, 480));
        assert_eq!(config.context.validation, cfg!(debug_assertions));
        assert_eq!(config.context.present_policy, PresentPolicy::Lenient);
        assert!(!config.resizable);
    }

    #[test]
    fn test_toggle() {
        for off in ["0", "false", "OFF", " no "] {
            assert_eq!(toggle(off), Some(false), "{off}");
        }
        for on in ["1", "true", "On", "anything"] {
            assert_eq!(toggle(on), Some(true), "{on}");
        }
        assert_eq!(toggle(""), None);
        assert_eq!(toggle("  "), None);
    }

    #[test]
    fn test_validation_var() {
        let base = MyrConfig::new("env", 1, 1);
        let default = base.context.validation;

        let off = base.clone().with_validation(true).with_validation_var(Some("off"));
        assert!(!off.context.validation);
        let on = base.clone().with_validation(false).with_validation_var(Some("1"));
        assert!(on.context.validation);

        let empty = base.clone().with_validation_var(Some(""));
        assert_eq!(empty.context.validation, default);
        assert_eq!(base.with_validation_var(None).context.validation, default);
    }

    #[test]
    fn test_present_policy() {
        let config = MyrConfig::new("policy", 1, 1).with_present_policy(PresentPolicy::Strict);
        assert_eq!(config.context.present_policy, PresentPolicy::Strict);
    }
}
