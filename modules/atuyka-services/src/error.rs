use atuyka_paginator::PaginatorError;
use thiserror::Error;

/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, AtuykaError>;

#[derive(Debug, Error)]
pub enum AtuykaError {
    #[error("Service {service:?} not found, must be one of: {}", .available.join(", "))]
    UnknownService {
        service: String,
        available: Vec<String>,
    },

    #[error("Service {service:?} requires a token")]
    MissingCredential { service: String },

    #[error("No services loaded")]
    NoServicesLoaded,

    #[error("Endpoint {operation:?} is not supported by service {service:?}")]
    UnsupportedOperation { service: String, operation: String },

    #[error("Service {service:?} is already registered by a different client")]
    DuplicateService { service: String },

    #[error("Invalid service declaration: {0}")]
    InvalidDeclaration(String),

    #[error("User ID is missing for service {service:?}")]
    MissingUserId { service: String },

    #[error("Resource {resource:?} not found for service {service:?}")]
    InvalidResource { service: String, resource: String },

    #[error("{id_type} ID {id:?} is invalid for service {service:?}")]
    InvalidId {
        service: String,
        id: String,
        id_type: String,
    },

    #[error("Resource {resource:?} is suspended for service {service:?}")]
    SuspendedResource { service: String, resource: String },

    #[error("Resource {resource:?} is private for service {service:?}")]
    PrivateResource { service: String, resource: String },

    #[error("Invalid token for service {service:?}")]
    InvalidToken { service: String },

    #[error("Rate limit exceeded for service {service:?}")]
    RateLimited {
        service: String,
        reset: Option<i64>,
    },

    #[error("API error from {service} (status {status}): {message}")]
    Api {
        service: String,
        status: u16,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Paginator(#[from] PaginatorError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AtuykaError {
    pub fn unsupported(service: impl Into<String>, operation: impl Into<String>) -> Self {
        AtuykaError::UnsupportedOperation {
            service: service.into(),
            operation: operation.into(),
        }
    }

    /// Stable machine-readable error code exposed to API consumers.
    pub fn code(&self) -> &'static str {
        match self {
            AtuykaError::UnknownService { .. } => "InvalidService",
            AtuykaError::MissingCredential { .. } => "MissingToken",
            AtuykaError::NoServicesLoaded => "NoServices",
            AtuykaError::UnsupportedOperation { .. } => "MissingEndpoint",
            AtuykaError::MissingUserId { .. } => "MissingUserID",
            AtuykaError::InvalidResource { .. } => "InvalidResource",
            AtuykaError::SuspendedResource { .. } => "SuspendedResource",
            AtuykaError::InvalidId { .. } => "InvalidID",
            AtuykaError::PrivateResource { .. } => "PrivateResource",
            AtuykaError::InvalidToken { .. } => "InvalidToken",
            AtuykaError::RateLimited { .. } => "RateLimited",
            AtuykaError::Paginator(PaginatorError::Empty) => "NotFound",
            AtuykaError::DuplicateService { .. }
            | AtuykaError::InvalidDeclaration(_)
            | AtuykaError::Api { .. }
            | AtuykaError::Network(_)
            | AtuykaError::Parse(_)
            | AtuykaError::Other(_) => "Internal",
        }
    }

    /// HTTP status the route layer answers with.
    pub fn status(&self) -> u16 {
        match self {
            AtuykaError::UnknownService { .. }
            | AtuykaError::MissingUserId { .. }
            | AtuykaError::InvalidResource { .. }
            | AtuykaError::SuspendedResource { .. }
            | AtuykaError::InvalidId { .. }
            | AtuykaError::Paginator(PaginatorError::Empty) => 404,
            AtuykaError::MissingCredential { .. } | AtuykaError::InvalidToken { .. } => 401,
            AtuykaError::PrivateResource { .. } => 403,
            AtuykaError::RateLimited { .. } => 429,
            AtuykaError::UnsupportedOperation { .. } => 501,
            _ => 500,
        }
    }

    /// The service this error is attributed to, if any.
    pub fn service(&self) -> Option<&str> {
        match self {
            AtuykaError::UnknownService { service, .. }
            | AtuykaError::MissingCredential { service }
            | AtuykaError::UnsupportedOperation { service, .. }
            | AtuykaError::DuplicateService { service }
            | AtuykaError::MissingUserId { service }
            | AtuykaError::InvalidResource { service, .. }
            | AtuykaError::SuspendedResource { service, .. }
            | AtuykaError::InvalidId { service, .. }
            | AtuykaError::PrivateResource { service, .. }
            | AtuykaError::InvalidToken { service }
            | AtuykaError::RateLimited { service, .. }
            | AtuykaError::Api { service, .. } => Some(service.as_str()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AtuykaError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AtuykaError::Parse(err.to_string())
        } else {
            AtuykaError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AtuykaError {
    fn from(err: serde_json::Error) -> Self {
        AtuykaError::Parse(err.to_string())
    }
}
