use crate::config::{LoadSettings, StressSettings, TestConfiguration, TestMode};
use crate::error::LoadprobeError;

/// Validate a [`TestConfiguration`] and return a list of validation errors.
///
/// An empty `Vec` means the configuration is valid.
pub fn validate_configuration(config: &TestConfiguration) -> Vec<LoadprobeError> {
    let mut errors = validate_url(&config.target_url);

    match &config.mode {
        TestMode::Load(settings) => errors.extend(validate_load(settings)),
        TestMode::Stress(settings) => errors.extend(validate_stress(settings)),
    }

    errors
}

/// Reject the configuration with a single error if anything is invalid.
///
/// Controllers call this before dispatching their first round.
pub fn ensure_valid(config: &TestConfiguration) -> Result<(), LoadprobeError> {
    let errors = validate_configuration(config);
    if errors.is_empty() {
        return Ok(());
    }
    let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    Err(LoadprobeError::Validation(format!(
        "Configuration rejected: {}",
        messages.join("; ")
    )))
}

fn validate_url(url: &str) -> Vec<LoadprobeError> {
    let mut errors = Vec::new();
    let url = url.trim();

    if url.is_empty() {
        errors.push(LoadprobeError::Validation(
            "target_url must not be empty".to_string(),
        ));
        return errors;
    }

    if !url.starts_with("http://") && !url.starts_with("https://") {
        errors.push(LoadprobeError::Validation(format!(
            "target_url must start with http:// or https:// (got: {url})"
        )));
    }

    errors
}

fn validate_load(settings: &LoadSettings) -> Vec<LoadprobeError> {
    let mut errors = Vec::new();

    if settings.group_size == 0 {
        errors.push(LoadprobeError::Validation(
            "group_size must be at least 1".to_string(),
        ));
    }
    if settings.group_count == 0 {
        errors.push(LoadprobeError::Validation(
            "group_count must be at least 1".to_string(),
        ));
    }

    errors
}

fn validate_stress(settings: &StressSettings) -> Vec<LoadprobeError> {
    let mut errors = Vec::new();

    if settings.initial_group_size == 0 {
        errors.push(LoadprobeError::Validation(
            "initial_group_size must be at least 1".to_string(),
        ));
    }
    if settings.increment == 0 {
        errors.push(LoadprobeError::Validation(
            "increment must be at least 1".to_string(),
        ));
    }
    let threshold = settings.failure_threshold;
    if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
        errors.push(LoadprobeError::Validation(format!(
            "failure_threshold must be between 0 and 1 (got: {threshold})"
        )));
    }
    if settings.max_rounds == Some(0) {
        errors.push(LoadprobeError::Validation(
            "max_rounds must be at least 1 when set".to_string(),
        ));
    }

    errors
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
