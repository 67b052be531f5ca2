// SPDX-FileCopyrightText: 2026 Sealdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-empty paths and well-formed topic entries.

use crate::diagnostic::ConfigError;
use crate::model::SealdeskConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &SealdeskConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.storage.storage_root.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.storage_root must not be empty".to_string(),
        });
    }

    // Archive URLs are built as `<exposed_base_url>/<file>`; a trailing
    // slash would produce a double slash in every ticket URL.
    if config.storage.exposed_base_url.ends_with('/') {
        errors.push(ConfigError::Validation {
            message: format!(
                "storage.exposed_base_url must not end with `/`, got `{}`",
                config.storage.exposed_base_url
            ),
        });
    }

    if config.server.host.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    }

    for (topic_id, topic) in &config.topics {
        if topic.name.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("topics.{topic_id}.name must not be empty"),
            });
        }

        for (i, question) in topic.questions.iter().enumerate() {
            if question.question.trim().is_empty() {
                errors.push(ConfigError::Validation {
                    message: format!(
                        "topics.{topic_id}.questions[{i}].question must not be empty"
                    ),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
