//! Supabase `PostgREST` backend for the cart item table.
//!
//! # Architecture
//!
//! - Plain `reqwest` calls against `/rest/v1/cart_items`
//! - The anon key goes in both `apikey` and `Authorization: Bearer`; row-level
//!   security on the hosted side decides what a device may touch
//! - No retries and no caching: every call is one request, and its failure is
//!   the caller's to handle
//!
//! # Example
//!
//! ```rust,ignore
//! use mauve_storefront::supabase::SupabaseCartTable;
//!
//! let table = SupabaseCartTable::new(&supabase_config)?;
//! let rows = table.fetch_by_cart(identity.cart_id()).await?;
//! ```

mod client;

pub use client::SupabaseCartTable;

use thiserror::Error;

/// Errors that can occur when talking to Supabase.
#[derive(Debug, Error)]
pub enum SupabaseError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// `PostgREST` answered with a non-success status.
    #[error("{}", format_api_error(*.status, .code.as_deref(), .message))]
    Api {
        /// HTTP status code.
        status: u16,
        /// `PostgREST`/Postgres error code, e.g. `23505`.
        code: Option<String>,
        /// Error message from the response body.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Rate limited by the gateway.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The configured project URL cannot be used.
    #[error("Invalid Supabase URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl SupabaseError {
    /// Whether the error is a unique-constraint violation.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Api { status: 409, .. })
            || matches!(self, Self::Api { code: Some(code), .. } if code == "23505")
    }
}

fn format_api_error(status: u16, code: Option<&str>, message: &str) -> String {
    let message = if message.is_empty() {
        "(no error details provided)"
    } else {
        message
    };
    match code {
        Some(code) => format!("API error {status} [{code}]: {message}"),
        None => format!("API error {status}: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = SupabaseError::Api {
            status: 409,
            code: Some("23505".to_string()),
            message: "duplicate key value violates unique constraint".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "API error 409 [23505]: duplicate key value violates unique constraint"
        );
        assert!(err.is_conflict());
    }

    #[test]
    fn test_api_error_empty_message() {
        let err = SupabaseError::Api {
            status: 500,
            code: None,
            message: String::new(),
        };
        assert_eq!(err.to_string(), "API error 500: (no error details provided)");
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_rate_limited_error() {
        let err = SupabaseError::RateLimited(30);
        assert_eq!(err.to_string(), "Rate limited, retry after 30 seconds");
    }
}
