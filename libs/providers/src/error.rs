use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no provider registered for tool '{tool}' matching url '{url}'")]
    NoUrlMatch { tool: String, url: String },
    #[error("no provider '{name}' registered for tool '{tool}' (available: {})", available.join(", "))]
    NotFound {
        tool: String,
        name: String,
        available: Vec<String>,
    },
    #[error("provider '{provider}' is missing required environment variables: {}", missing.join(", "))]
    Requirements { provider: String, missing: Vec<String> },
    #[error("provider '{provider}' config does not satisfy its schema: {message}")]
    ConfigSchema { provider: String, message: String },
}
