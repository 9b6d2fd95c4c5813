//! Error types for sprocket
//!
//! Provides granular error classification for the broker's recovery policy:
//! - Recoverable errors (connection, execution, transaction runtime failures)
//! - Non-recoverable errors (configuration, invariant violations, conversion)

use std::fmt;
use thiserror::Error;

/// Result type for sprocket operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Connection-related errors (eligible for logger-gated recovery)
    Connection,
    /// Procedure execution errors (eligible for logger-gated recovery)
    Execution,
    /// Transaction runtime errors (eligible for logger-gated recovery)
    Transaction,
    /// Configuration errors (always propagate)
    Configuration,
    /// Invariant violations such as ambiguous parameter combinations (always propagate)
    Invariant,
    /// Value-to-member conversion errors (always propagate)
    TypeConversion,
    /// Contract mismatches: unknown methods or fields (always propagate)
    Contract,
}

impl ErrorCategory {
    /// Whether errors in this category may be swallowed by the broker's
    /// logger-gated recovery path
    #[inline]
    pub const fn is_recoverable(self) -> bool {
        matches!(self, Self::Connection | Self::Execution | Self::Transaction)
    }
}

/// Main error type for sprocket
#[derive(Error, Debug)]
pub enum Error {
    /// Connection failed or was unusable
    #[error("connection error: {message}")]
    Connection {
        /// Human-readable description
        message: String,
        /// Underlying driver error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Procedure execution failed
    #[error("execution error: {message}")]
    Execution {
        /// Human-readable description
        message: String,
        /// Procedure name, if known at the failure site
        procedure: Option<String>,
        /// Underlying driver error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Transaction begin/commit/rollback failed
    #[error("transaction error: {message}")]
    Transaction {
        /// Human-readable description
        message: String,
    },

    /// An externally supplied transaction does not belong to the resolved connection
    #[error("transaction does not belong to the resolved connection")]
    TransactionMismatch,

    /// Configuration error (missing connection entry, malformed contract)
    #[error("configuration error: {message}")]
    Configuration {
        /// Human-readable description
        message: String,
    },

    /// Unsupported operation (ambiguous cartesian expansion, nested table rows)
    #[error("unsupported operation: {message}")]
    Unsupported {
        /// Human-readable description
        message: String,
    },

    /// Value could not be converted into the target member type
    #[error("type conversion error: {message}")]
    TypeConversion {
        /// Human-readable description
        message: String,
    },

    /// A result-set column or output parameter matched no entity field
    #[error("unknown field {field} on {entity}")]
    UnknownField {
        /// Entity type name
        entity: String,
        /// Offending field name
        field: String,
    },

    /// The invoked method is not part of the repository contract
    #[error("unknown repository method: {method}")]
    UnknownMethod {
        /// Offending method name
        method: String,
    },
}

impl Error {
    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Connection { .. } => ErrorCategory::Connection,
            Self::Execution { .. } => ErrorCategory::Execution,
            Self::Transaction { .. } => ErrorCategory::Transaction,
            Self::TransactionMismatch | Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Unsupported { .. } => ErrorCategory::Invariant,
            Self::TypeConversion { .. } => ErrorCategory::TypeConversion,
            Self::UnknownField { .. } | Self::UnknownMethod { .. } => ErrorCategory::Contract,
        }
    }

    /// Whether the broker's logger-gated recovery may swallow this error
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        self.category().is_recoverable()
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection error with source
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an execution error
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
            procedure: None,
            source: None,
        }
    }

    /// Create an execution error carrying the procedure name
    pub fn execution_in(procedure: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
            procedure: Some(procedure.into()),
            source: None,
        }
    }

    /// Create a transaction error
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an unsupported-operation error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    /// Create a type conversion error
    pub fn type_conversion(message: impl Into<String>) -> Self {
        Self::TypeConversion {
            message: message.into(),
        }
    }

    /// Create an unknown-field error
    pub fn unknown_field(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// Create an unknown-method error
    pub fn unknown_method(method: impl Into<String>) -> Self {
        Self::UnknownMethod {
            method: method.into(),
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection => write!(f, "connection"),
            Self::Execution => write!(f, "execution"),
            Self::Transaction => write!(f, "transaction"),
            Self::Configuration => write!(f, "configuration"),
            Self::Invariant => write!(f, "invariant"),
            Self::TypeConversion => write!(f, "type_conversion"),
            Self::Contract => write!(f, "contract"),
        }
    }
}
