// Error types for the Trellis container and dispatcher

use http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors: fatal, raised before any request is served
    #[error("Component not found: {0}")]
    ComponentNotFound(String),

    #[error("Namespace cannot be resolved: {0}")]
    NamespaceNotFound(String),

    #[error("No no-argument constructor for {0}")]
    MissingConstructor(String),

    #[error("Bean name already registered: {0}")]
    DuplicateBean(String),

    #[error("The \"{capability}\" capability is already bound to bean {existing}")]
    CapabilityAlreadyBound { capability: String, existing: String },

    #[error("Unresolved dependency {bean}.{field} -> {target}")]
    UnresolvedDependency {
        bean: String,
        field: String,
        target: String,
    },

    #[error("Invalid route pattern {pattern}: {reason}")]
    InvalidRoutePattern { pattern: String, reason: String },

    // Per-request errors
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Type conversion error: parameter `{param}` cannot take {value:?}: {reason}")]
    TypeConversion {
        param: String,
        value: String,
        reason: String,
    },

    #[error("Missing argument at position {0}")]
    MissingArgument(usize),

    #[error("Dependency not wired: {0}")]
    DependencyMissing(String),

    #[error("Handler error: {0}")]
    Handler(String),

    #[error("Handler panicked: {0}")]
    HandlerPanicked(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a handler error from any displayable failure
    pub fn handler(message: impl std::fmt::Display) -> Self {
        Error::Handler(message.to_string())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        self.http_status().as_u16()
    }

    /// Get the HTTP status for this error
    pub fn http_status(&self) -> StatusCode {
        match self {
            Error::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Error::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            // Conversion failures surface as server errors, the same as any
            // other failure escaping a handler invocation.
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether this error aborts container initialization
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Error::ComponentNotFound(_)
                | Error::NamespaceNotFound(_)
                | Error::MissingConstructor(_)
                | Error::DuplicateBean(_)
                | Error::CapabilityAlreadyBound { .. }
                | Error::UnresolvedDependency { .. }
                | Error::InvalidRoutePattern { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::MethodNotAllowed("PUT".into()).status_code(), 405);
        assert_eq!(Error::PayloadTooLarge("2048 bytes".into()).status_code(), 413);
        assert_eq!(Error::MissingArgument(2).status_code(), 500);
        assert_eq!(
            Error::TypeConversion {
                param: "a".into(),
                value: "foo".into(),
                reason: "invalid digit found in string".into(),
            }
            .status_code(),
            500
        );
    }

    #[test]
    fn test_configuration_errors() {
        assert!(Error::DuplicateBean("a".into()).is_configuration_error());
        assert!(
            Error::CapabilityAlreadyBound {
                capability: "dyn app::Greeter".into(),
                existing: "english".into(),
            }
            .is_configuration_error()
        );
        assert!(!Error::Handler("boom".into()).is_configuration_error());
    }

    #[test]
    fn test_conversion_message_describes_failure() {
        let err = Error::TypeConversion {
            param: "a".into(),
            value: "foo".into(),
            reason: "invalid digit found in string".into(),
        };
        assert_eq!(
            err.to_string(),
            "Type conversion error: parameter `a` cannot take \"foo\": invalid digit found in string"
        );
    }
}
