//! Centralized Error Handling Module
//!
//! Every failure carries a unique error code so it can be told apart in logs,
//! in module results and in API responses.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - INPUT_xxx: malformed phone numbers and request bodies
//! - MODULE_xxx: module registry and module-level rate limiting
//! - PROVIDER_xxx: external data sources
//! - API_xxx: caller-facing API errors
//! - CFG_xxx: configuration errors

use std::fmt;

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    /// True for both module-level and caller-level rate limiting
    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::ModuleRateLimited | ErrorCode::ApiRateLimited | ErrorCode::ProviderRateLimited
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // Input Errors (1xx)
    // ============================================
    /// Phone number is empty or contains no digits
    InvalidPhoneNumber,
    /// Request body is malformed
    InvalidRequest,

    // ============================================
    // Module Errors (2xx)
    // ============================================
    /// Caller asked for a module that is not registered
    ModuleNotFound,
    /// Module's own rate limiter denied the call
    ModuleRateLimited,
    /// Module task panicked or was aborted
    ModuleCrashed,

    // ============================================
    // Provider Errors (3xx)
    // ============================================
    /// External provider returned an error
    ProviderError,
    /// External provider did not answer within the module timeout
    ProviderTimeout,
    /// External provider refused the request (HTTP 429)
    ProviderRateLimited,
    /// Provider is not configured for this deployment
    ProviderUnavailable,
    /// Provider response could not be decoded
    ProviderInvalidResponse,

    // ============================================
    // API Errors (4xx)
    // ============================================
    /// Invalid request format
    ApiBadRequest,
    /// Unauthorized (invalid API key)
    ApiUnauthorized,
    /// Caller rate limit exceeded
    ApiRateLimited,
    /// Internal server error
    ApiInternalError,
    /// Resource not found
    ApiNotFound,

    // ============================================
    // Configuration Errors (5xx)
    // ============================================
    /// Invalid configuration value
    ConfigInvalidValue,
    /// Rule table file could not be read or parsed
    ConfigInvalidRules,

    // ============================================
    // Generic Errors (9xx)
    // ============================================
    /// Unexpected internal failure of an investigation run
    Internal,
    /// Unknown error
    Unknown,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidPhoneNumber => "INPUT_INVALID_PHONE",
            Self::InvalidRequest => "INPUT_INVALID_REQUEST",

            Self::ModuleNotFound => "MODULE_NOT_FOUND",
            Self::ModuleRateLimited => "MODULE_RATE_LIMITED",
            Self::ModuleCrashed => "MODULE_CRASHED",

            Self::ProviderError => "PROVIDER_ERROR",
            Self::ProviderTimeout => "PROVIDER_TIMEOUT",
            Self::ProviderRateLimited => "PROVIDER_RATE_LIMITED",
            Self::ProviderUnavailable => "PROVIDER_UNAVAILABLE",
            Self::ProviderInvalidResponse => "PROVIDER_INVALID_RESPONSE",

            Self::ApiBadRequest => "API_BAD_REQUEST",
            Self::ApiUnauthorized => "API_UNAUTHORIZED",
            Self::ApiRateLimited => "API_RATE_LIMITED",
            Self::ApiInternalError => "API_INTERNAL_ERROR",
            Self::ApiNotFound => "API_NOT_FOUND",

            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",
            Self::ConfigInvalidRules => "CFG_INVALID_RULES",

            Self::Internal => "INTERNAL_ERROR",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Get HTTP status code for API responses
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidPhoneNumber
            | Self::InvalidRequest
            | Self::ApiBadRequest
            | Self::ConfigInvalidValue => 400,
            Self::ApiUnauthorized => 401,
            Self::ModuleNotFound | Self::ApiNotFound => 404,
            Self::ModuleRateLimited | Self::ApiRateLimited | Self::ProviderRateLimited => 429,
            Self::ProviderTimeout => 504,
            Self::ProviderError | Self::ProviderInvalidResponse | Self::ProviderUnavailable => 502,
            _ => 500,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ModuleRateLimited
                | Self::ApiRateLimited
                | Self::ProviderRateLimited
                | Self::ProviderTimeout
                | Self::ProviderError
        )
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    /// Malformed phone number
    pub fn invalid_phone(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidPhoneNumber, msg)
    }

    /// Unregistered module name
    pub fn module_not_found(name: &str) -> Self {
        Self::new(ErrorCode::ModuleNotFound, format!("Module {} not found", name))
    }

    /// Module limiter denied the call
    pub fn module_rate_limited(name: &str) -> Self {
        Self::new(
            ErrorCode::ModuleRateLimited,
            format!("Rate limit exceeded for {}", name),
        )
    }

    /// Module task panicked
    pub fn module_crashed(name: &str, msg: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ModuleCrashed,
            format!("Module {} crashed: {}", name, msg.into()),
        )
    }

    /// Provider failure
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ProviderError, msg)
    }

    /// Provider timeout
    pub fn provider_timeout(name: &str, secs: f64) -> Self {
        Self::new(
            ErrorCode::ProviderTimeout,
            format!("{} did not respond within {:.1}s", name, secs),
        )
    }

    /// Provider not configured
    pub fn provider_unavailable(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ProviderUnavailable, msg)
    }

    /// Caller rate limited
    pub fn api_rate_limited(retry_after: u64) -> Self {
        Self::new(
            ErrorCode::ApiRateLimited,
            format!("Rate limit exceeded. Try again in {} seconds", retry_after),
        )
    }

    /// API bad request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiBadRequest, msg)
    }

    /// Unexpected internal failure
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }

    /// Broken rule table
    pub fn invalid_rules(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigInvalidRules, msg)
    }
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        Self::new(ErrorCode::Unknown, err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorCode::Unknown, "IO error", err)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ErrorCode::ProviderTimeout, "Request timeout")
        } else if err.status().map(|s| s.as_u16()) == Some(429) {
            Self::new(ErrorCode::ProviderRateLimited, "Provider rate limited (HTTP 429)")
        } else if err.is_decode() {
            Self::new(ErrorCode::ProviderInvalidResponse, err.to_string())
        } else {
            Self::new(ErrorCode::ProviderError, err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::ProviderInvalidResponse, "JSON parse error", err)
    }
}
