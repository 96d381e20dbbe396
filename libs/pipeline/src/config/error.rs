use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config field '{field}' could not be coerced to {expected_type}")]
    Coercion {
        field: String,
        expected_type: &'static str,
    },
    #[error("config field '{field}' value {value} is out of bounds [{min}, {max}]")]
    OutOfBounds {
        field: String,
        value: String,
        min: String,
        max: String,
    },
}
