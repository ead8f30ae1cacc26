//! Local validation of database and collection names.
//!
//! Mirrors the engine's own rules so that an obviously bad name is refused
//! with a readable message instead of a round trip and a generic 500.

use std::sync::OnceLock;

use regex::Regex;

use crate::query::ValidationError;

const MAX_COLLECTION_NAME: usize = 120;
const MAX_DATABASE_NAME_BYTES: usize = 64;

fn database_forbidden() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| match Regex::new(r#"[/\\. "$*<>:|?\x00]"#) {
        Ok(re) => re,
        Err(err) => unreachable!("static pattern failed to compile: {err}"),
    })
}

/// Validates a collection name and returns it trimmed.
///
/// # Errors
///
/// Returns `ValidationError::InvalidName` with the reason.
pub fn validate_collection_name(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(invalid("Collection name cannot be empty"));
    }
    if name.starts_with("system.") {
        return Err(invalid("Collection name cannot start with 'system.'"));
    }
    if name.contains('$') {
        return Err(invalid("Collection name cannot contain '$' character"));
    }
    if name.chars().count() > MAX_COLLECTION_NAME {
        return Err(invalid("Collection name cannot exceed 120 characters"));
    }
    Ok(name.to_string())
}

/// Validates a database name and returns it trimmed.
///
/// # Errors
///
/// Returns `ValidationError::InvalidName` with the reason.
pub fn validate_database_name(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(invalid("Database name cannot be empty"));
    }
    if database_forbidden().is_match(name) {
        return Err(invalid(
            "Database name cannot contain any of / \\ . \" $ * < > : | ? or spaces",
        ));
    }
    if name.len() > MAX_DATABASE_NAME_BYTES {
        return Err(invalid("Database name cannot exceed 64 bytes"));
    }
    Ok(name.to_string())
}

fn invalid(message: &str) -> ValidationError {
    ValidationError::InvalidName(message.to_string())
}
