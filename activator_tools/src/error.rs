use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActivatorApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Provider request failed: {0}")]
    RequestError(String),
    #[error("Invalid provider response: {0}")]
    ResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
}
