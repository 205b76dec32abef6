//! Error types for the Cluster API operator
//!
//! Errors are structured with fields to aid debugging in production. The
//! retry policy of every controller is derived from a single distinction:
//! an error is either *terminal* (wrapped with [`Error::terminal`], never
//! retried automatically) or it is not (retried with exponential backoff).

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for operator operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// Invalid input that cannot be rendered or applied
    #[error("validation error for {component}: {message}")]
    Validation {
        /// Name of the component or object with invalid content
        component: String,
        /// Description of what's invalid
        message: String,
        /// The invalid field path (e.g., "metadata.installOrder")
        field: Option<String>,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being serialized (if known)
        kind: Option<String>,
    },

    /// Revision history invariant violated
    #[error("revision error: {message}")]
    Revision {
        /// Description of the violated invariant
        message: String,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g., "writer", "controller")
        context: String,
    },

    /// Operation abandoned because the operator is shutting down
    #[error("cancelled during {context}")]
    Cancelled {
        /// The operation that was interrupted
        context: String,
    },

    /// Error that must not be retried automatically
    #[error("non-retryable error: {source}")]
    Terminal {
        /// The wrapped error
        source: Box<Error>,
    },

    /// Several errors surfaced by a single reconcile
    #[error("{}", join_errors(.errors))]
    Aggregate {
        /// The collected errors, in the order they occurred
        errors: Vec<Error>,
    },
}

fn join_errors(errors: &[Error]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            component: UNKNOWN_CONTEXT.to_string(),
            message: msg.into(),
            field: None,
        }
    }

    /// Create a validation error for a named component
    pub fn validation_for(component: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            component: component.into(),
            message: msg.into(),
            field: None,
        }
    }

    /// Create a validation error for a named component and field path
    pub fn validation_for_field(
        component: impl Into<String>,
        field: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Validation {
            component: component.into(),
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: None,
        }
    }

    /// Create a serialization error with resource kind context
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Create a revision history error
    pub fn revision(msg: impl Into<String>) -> Self {
        Self::Revision {
            message: msg.into(),
        }
    }

    /// Create an internal error with the given message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: UNKNOWN_CONTEXT.to_string(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Create a cancellation error for the interrupted operation
    pub fn cancelled(context: impl Into<String>) -> Self {
        Self::Cancelled {
            context: context.into(),
        }
    }

    /// Mark an error as non-retryable.
    ///
    /// Wrapping an already terminal error returns it unchanged, so the
    /// wrapper never nests.
    pub fn terminal(err: Error) -> Self {
        if err.is_terminal() {
            err
        } else {
            Self::Terminal {
                source: Box::new(err),
            }
        }
    }

    /// Combine errors from one reconcile into a single value.
    ///
    /// A single error is returned as-is; nested aggregates are flattened.
    pub fn aggregate(errors: Vec<Error>) -> Self {
        let mut flat = Vec::with_capacity(errors.len());
        for err in errors {
            match err {
                Error::Aggregate { errors } => flat.extend(errors),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            if let Some(only) = flat.pop() {
                return only;
            }
        }
        Self::Aggregate { errors: flat }
    }

    /// Whether the host scheduler must skip automatic retries for this error.
    ///
    /// Only explicitly wrapped errors are terminal. An aggregate is never
    /// terminal: it always carries a persistence failure that must be retried.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Error::Terminal { .. })
    }

    /// Get the component name if this error is associated with one
    pub fn component(&self) -> Option<&str> {
        match self {
            Error::Validation { component, .. } => Some(component),
            Error::Terminal { source } => source.component(),
            _ => None,
        }
    }
}
