// utils.rs
use serde_json::Value;

use crate::{config::PlugSettings, error::AppError};

/// Builds the settings to store from a client body. A body without a
/// `password` key keeps the stored password; a body that carries one saves it
/// verbatim, whatever it looks like.
pub fn merge_settings(mut body: Value, current: &PlugSettings) -> Result<PlugSettings, AppError> {
    let Value::Object(fields) = &mut body else {
        return Err(AppError::Validation("settings must be a JSON object".into()));
    };
    fields
        .entry("password")
        .or_insert_with(|| Value::String(current.password.clone()));
    serde_json::from_value(body).map_err(|err| AppError::Validation(err.to_string()))
}
