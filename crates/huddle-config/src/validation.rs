// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation of the configuration.

use huddle_core::HuddleError;

use crate::model::HuddleConfig;

/// Validate cross-field constraints Figment cannot express.
pub fn validate_config(config: &HuddleConfig) -> Result<(), HuddleError> {
    if config.history.default_limit == 0 {
        return Err(HuddleError::Config(
            "history.default_limit must be at least 1".to_string(),
        ));
    }
    if config.history.default_limit > config.history.max_limit {
        return Err(HuddleError::Config(format!(
            "history.default_limit ({}) exceeds history.max_limit ({})",
            config.history.default_limit, config.history.max_limit
        )));
    }
    if config.actor.mailbox_capacity == 0 {
        return Err(HuddleError::Config(
            "actor.mailbox_capacity must be at least 1".to_string(),
        ));
    }
    if config.push.batch_size == 0 {
        return Err(HuddleError::Config(
            "push.batch_size must be at least 1".to_string(),
        ));
    }
    if config.agent.venue_count == 0 {
        return Err(HuddleError::Config(
            "agent.venue_count must be at least 1".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_passes() {
        validate_config(&HuddleConfig::default()).unwrap();
    }

    #[test]
    fn zero_limit_fails() {
        let mut config = HuddleConfig::default();
        config.history.default_limit = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn limit_above_max_fails() {
        let mut config = HuddleConfig::default();
        config.history.default_limit = 500;
        config.history.max_limit = 100;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("max_limit"));
    }
}
