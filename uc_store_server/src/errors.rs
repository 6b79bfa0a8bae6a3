use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use thiserror::Error;
use uc_store_engine::{OrderFlowError, StorefrontError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient permissions. {0}")]
    InsufficientPermissions(String),
    #[error(transparent)]
    OrderFlow(#[from] OrderFlowError),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::OrderFlow(e) => order_flow_status(e),
            Self::InitializeError(_) |
            Self::BackendError(_) |
            Self::IOError(_) |
            Self::ConfigurationError(_) |
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

/// User-correctable rejections map to 4xx so the bot can relay them verbatim; everything else is
/// an internal failure.
fn order_flow_status(e: &OrderFlowError) -> StatusCode {
    match e {
        OrderFlowError::ItemNotActive | OrderFlowError::MissingPlayerId | OrderFlowError::InvalidAmount => {
            StatusCode::BAD_REQUEST
        },
        OrderFlowError::InsufficientBalance { .. } => StatusCode::PAYMENT_REQUIRED,
        OrderFlowError::OutOfStock { .. } => StatusCode::CONFLICT,
        OrderFlowError::CustomerNotFound(_) | OrderFlowError::OrderNotFound(_) | OrderFlowError::CodeNotFound(_) => {
            StatusCode::NOT_FOUND
        },
        OrderFlowError::NotAuthorized => StatusCode::FORBIDDEN,
        OrderFlowError::StorefrontError(
            StorefrontError::OrderNotFound(_) | StorefrontError::CodeNotFound(_) | StorefrontError::TopUpNotFound(_),
        ) => StatusCode::NOT_FOUND,
        OrderFlowError::MisconfiguredItem { .. } |
        OrderFlowError::AccountError(_) |
        OrderFlowError::StorefrontError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
