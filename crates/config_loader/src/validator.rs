//! Config validation
//!
//! Field-level rules come from the `validator` derives on the blueprint
//! sections. Cross-field rules live here:
//! - low water mark below high water mark
//! - storage base path present
//! - hardware identifiers unique and non-empty, at most `MAX_HARDWARE_ITEMS`

use std::collections::HashSet;

use contracts::{ContractError, LoggerBlueprint, MAX_HARDWARE_ITEMS};
use ::validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Validate a LoggerBlueprint
///
/// Returns the first error encountered.
pub fn validate(blueprint: &LoggerBlueprint) -> Result<(), ContractError> {
    validate_fields(blueprint)?;
    validate_storage(blueprint)?;
    validate_retention(blueprint)?;
    validate_hardware(blueprint)?;
    Ok(())
}

fn validate_fields(blueprint: &LoggerBlueprint) -> Result<(), ContractError> {
    blueprint.validate().map_err(|errors| {
        let (field, message) = first_error(&errors, "")
            .unwrap_or_else(|| ("blueprint".to_string(), errors.to_string()));
        ContractError::config_validation(field, message)
    })
}

/// Dotted path and message of the first failing rule
fn first_error(errors: &ValidationErrors, prefix: &str) -> Option<(String, String)> {
    let join = |field: &str| {
        if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        }
    };

    for (field, kind) in errors.errors() {
        let path = join(field.as_ref());
        match kind {
            ValidationErrorsKind::Field(list) => {
                if let Some(err) = list.first() {
                    let message = match &err.message {
                        Some(m) => m.to_string(),
                        None => format!("failed '{}' rule", err.code),
                    };
                    return Some((path, message));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                if let Some(found) = first_error(inner, &path) {
                    return Some(found);
                }
            }
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    if let Some(found) = first_error(inner, &format!("{path}[{index}]")) {
                        return Some(found);
                    }
                }
            }
        }
    }
    None
}

fn validate_storage(blueprint: &LoggerBlueprint) -> Result<(), ContractError> {
    if blueprint.storage.base_path.as_os_str().is_empty() {
        return Err(ContractError::config_validation(
            "storage.base_path",
            "base_path must not be empty",
        ));
    }
    Ok(())
}

fn validate_retention(blueprint: &LoggerBlueprint) -> Result<(), ContractError> {
    let retention = &blueprint.retention;
    if retention.low_water >= retention.high_water {
        return Err(ContractError::config_validation(
            "retention",
            format!(
                "low_water ({}) must be below high_water ({})",
                retention.low_water, retention.high_water
            ),
        ));
    }
    Ok(())
}

fn validate_hardware(blueprint: &LoggerBlueprint) -> Result<(), ContractError> {
    if blueprint.hardware.len() > MAX_HARDWARE_ITEMS {
        return Err(ContractError::config_validation(
            "hardware",
            format!(
                "at most {MAX_HARDWARE_ITEMS} hardware items, got {}",
                blueprint.hardware.len()
            ),
        ));
    }

    let mut seen = HashSet::new();
    for (index, item) in blueprint.hardware.iter().enumerate() {
        if item.identifier.is_empty() {
            return Err(ContractError::config_validation(
                format!("hardware[{index}].identifier"),
                "identifier must not be empty",
            ));
        }
        if !seen.insert(item.identifier.as_str()) {
            return Err(ContractError::config_validation(
                format!("hardware[id={}]", item.identifier),
                "duplicate hardware identifier",
            ));
        }
    }
    Ok(())
}
