//! Rich gRPC Status Mapping
//!
//! Converts subscription rejections into `tonic::Status` values carrying
//! `google.rpc.ErrorInfo` and `google.rpc.BadRequest` details, and reads
//! them back on the client side.

use std::collections::HashMap;

use tonic::Code;
use tonic_types::{ErrorDetails, StatusExt};

use crate::domain::subscription::SubscriptionError;

/// Error domain reported in `ErrorInfo`.
pub const ERROR_DOMAIN: &str = "chart.v1";

impl SubscriptionError {
    /// gRPC status code for this rejection.
    #[must_use]
    pub const fn grpc_code(&self) -> Code {
        Code::InvalidArgument
    }

    /// Convert to a tonic Status with rich error details.
    #[must_use]
    pub fn to_status(&self) -> tonic::Status {
        let mut details = ErrorDetails::new();

        let mut metadata = HashMap::new();
        if let Self::UnsupportedSymbol(symbol) = self {
            metadata.insert("symbol".to_string(), symbol.clone());
        }
        details.set_error_info(self.reason(), ERROR_DOMAIN, metadata);

        let message = self.to_string();
        details.add_bad_request_violation(self.field(), &message);

        tonic::Status::with_error_details(self.grpc_code(), message, details)
    }
}

/// Rejection decoded from a status returned by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// gRPC status code.
    pub code: Code,
    /// Human-readable message.
    pub message: String,
    /// Machine-readable reason, when the status carried `ErrorInfo`.
    pub reason: Option<String>,
    /// `ErrorInfo` metadata.
    pub metadata: HashMap<String, String>,
    /// Offending request field, when the status carried `BadRequest`.
    pub field: Option<String>,
}

impl Rejection {
    /// Decode the details attached to `status`.
    #[must_use]
    pub fn from_status(status: &tonic::Status) -> Self {
        let details = status.get_error_details();

        let (reason, metadata) = details.error_info().map_or_else(
            || (None, HashMap::new()),
            |info| (Some(info.reason.clone()), info.metadata.clone()),
        );
        let field = details
            .bad_request()
            .and_then(|bad| bad.field_violations.first())
            .map(|violation| violation.field.clone());

        Self {
            code: status.code(),
            message: status.message().to_string(),
            reason,
            metadata,
            field,
        }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "[{reason}] {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}
