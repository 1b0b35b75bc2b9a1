//! Topic naming.
//!
//! Maps an (environment, tenant, event type) triple onto the broker
//! topic that publishes for the triple target and that consumers resolve
//! independently across process restarts. Names are joined with a fixed
//! delimiter, so the mapping is injective as long as no component
//! contains the delimiter itself - `name_for` rejects such components up
//! front.

/// Separator between topic name components.
pub const DELIMITER: char = '.';

/// Result type for topic naming.
pub type Result<T> = std::result::Result<T, TopicError>;

/// Errors raised while building a topic name.
///
/// Both variants indicate misconfiguration: component values come from
/// deployment config and registration data, not from event payloads.
#[derive(Debug, thiserror::Error)]
pub enum TopicError {
    #[error("Topic component '{name}' is empty")]
    EmptyComponent { name: &'static str },

    #[error("Topic component '{name}' value '{value}' contains reserved delimiter '{DELIMITER}'")]
    ReservedDelimiter { name: &'static str, value: String },
}

/// Build the topic name for an (environment, tenant, event type) triple.
///
/// Deterministic and total over valid inputs: identical triples always
/// yield identical names, and triples differing in any component yield
/// different names.
pub fn name_for(env_id: &str, tenant_id: &str, event_type: &str) -> Result<String> {
    validate("env_id", env_id)?;
    validate("tenant_id", tenant_id)?;
    validate("event_type", event_type)?;

    Ok(format!("{env_id}{DELIMITER}{tenant_id}{DELIMITER}{event_type}"))
}

fn validate(name: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(TopicError::EmptyComponent { name });
    }
    if value.contains(DELIMITER) {
        return Err(TopicError::ReservedDelimiter {
            name,
            value: value.to_string(),
        });
    }
    Ok(())
}
