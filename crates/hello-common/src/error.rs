//! Error types for store operations
//!
//! Kubernetes API failures are classified into the conditions the
//! reconciler reacts to differently: an object that already exists, an
//! object that is missing, a write that lost an optimistic-concurrency race,
//! and everything else.

use thiserror::Error;

/// HTTP status the API server uses for both AlreadyExists and Conflict
const STATUS_CONFLICT: u16 = 409;

/// HTTP status for a missing object
const STATUS_NOT_FOUND: u16 = 404;

/// Main error type for store and operator operations
#[derive(Debug, Error)]
pub enum Error {
    /// Create failed because an object with the same identity exists
    #[error("{kind} {namespace}/{name} already exists")]
    AlreadyExists {
        /// Resource kind (e.g. "Deployment")
        kind: String,
        /// Namespace of the object
        namespace: String,
        /// Name of the object
        name: String,
    },

    /// The referenced object does not exist
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        /// Resource kind (e.g. "Deployment")
        kind: String,
        /// Namespace of the object
        namespace: String,
        /// Name of the object
        name: String,
    },

    /// Write rejected because the object changed since it was read
    #[error("conflicting write to {kind} {namespace}/{name}: {message}")]
    Conflict {
        /// Resource kind (e.g. "Deployment")
        kind: String,
        /// Namespace of the object
        namespace: String,
        /// Name of the object
        name: String,
        /// Message returned by the API server
        message: String,
    },

    /// Any other Kubernetes API or transport error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// Metric creation or registration failed
    #[error("metrics error: {source}")]
    Metrics {
        /// The underlying prometheus error
        #[from]
        source: prometheus::Error,
    },
}

impl Error {
    /// Classify a kube-rs error raised while operating on `kind` `namespace/name`
    pub fn from_kube(kind: &str, namespace: &str, name: &str, err: kube::Error) -> Self {
        match err {
            kube::Error::Api(ae) if ae.code == STATUS_CONFLICT && ae.reason == "AlreadyExists" => {
                Self::AlreadyExists {
                    kind: kind.to_string(),
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                }
            }
            kube::Error::Api(ae) if ae.code == STATUS_CONFLICT => Self::Conflict {
                kind: kind.to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
                message: ae.message,
            },
            kube::Error::Api(ae) if ae.code == STATUS_NOT_FOUND => Self::NotFound {
                kind: kind.to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
            },
            other => Self::Kube { source: other },
        }
    }

    /// Create an AlreadyExists error
    pub fn already_exists(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::AlreadyExists {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Create a NotFound error
    pub fn not_found(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Create a Conflict error
    pub fn conflict(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
            message: message.into(),
        }
    }

    /// Whether this error reports an object that already exists
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}
