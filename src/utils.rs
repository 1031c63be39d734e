use chrono::{DateTime, Utc};

use crate::errors::AppError;

pub fn utc_now() -> DateTime<Utc> {
    Utc::now()
}

/// Read an optional environment variable, falling back to `default` when unset.
pub fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::configuration(format!("{} has an invalid value: {}", key, value))),
        Err(_) => Ok(default),
    }
}
