// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Huddle chat server.
//!
//! TOML configuration with strict validation (`deny_unknown_fields`), XDG
//! file hierarchy lookup, and environment variable overrides via the
//! `HUDDLE_` prefix.

pub mod loader;
pub mod model;
pub mod validation;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::HuddleConfig;

use huddle_core::HuddleError;

/// Load configuration from the XDG hierarchy and validate it.
///
/// High-level entry point: loads config from TOML files plus env vars via
/// Figment, then runs post-deserialization validation.
pub fn load_and_validate() -> Result<HuddleConfig, HuddleError> {
    let config = loader::load_config().map_err(|e| HuddleError::Config(e.to_string()))?;
    validation::validate_config(&config)?;
    Ok(config)
}

/// Load configuration from a TOML string and validate it.
///
/// Useful for testing and explicit configuration.
pub fn load_and_validate_str(toml_content: &str) -> Result<HuddleConfig, HuddleError> {
    let config =
        loader::load_config_from_str(toml_content).map_err(|e| HuddleError::Config(e.to_string()))?;
    validation::validate_config(&config)?;
    Ok(config)
}
