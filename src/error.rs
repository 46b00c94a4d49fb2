use aws_sdk_dynamodb::{error, types};
use std::fmt;

/// Result alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Classification of an error returned by the store.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RemoteErrorKind {
    /// The table or item does not exist.
    NotFound,
    /// A condition expression evaluated to false.
    ConditionalCheckFailed,
    /// Provisioned throughput or request rate exceeded.
    Throttled,
    /// Another transaction is touching the same item.
    Conflict,
    /// A transaction with the same client request token is still running.
    InProgress,
    /// The transaction was canceled; see the cancellation reasons.
    TransactionCanceled,
    /// The request was rejected as malformed.
    Validation,
    /// The store failed internally (HTTP 5xx).
    Internal,
    /// Anything else, including transport failures.
    Other,
}

impl RemoteErrorKind {
    /// Maps an error code reported by the store to its kind.
    pub fn from_code(code: &str) -> Self {
        match code {
            "ResourceNotFoundException" => Self::NotFound,
            "ConditionalCheckFailedException" => Self::ConditionalCheckFailed,
            "ProvisionedThroughputExceededException"
            | "RequestLimitExceeded"
            | "ThrottlingException" => Self::Throttled,
            "TransactionConflictException" => Self::Conflict,
            "TransactionInProgressException" => Self::InProgress,
            "TransactionCanceledException" => Self::TransactionCanceled,
            "ValidationException"
            | "IdempotentParameterMismatchException"
            | "ItemCollectionSizeLimitExceededException" => Self::Validation,
            "InternalServerError" => Self::Internal,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::NotFound => "not found",
            Self::ConditionalCheckFailed => "conditional check failed",
            Self::Throttled => "throttled",
            Self::Conflict => "transaction conflict",
            Self::InProgress => "transaction in progress",
            Self::TransactionCanceled => "transaction canceled",
            Self::Validation => "validation error",
            Self::Internal => "internal server error",
            Self::Other => "remote error",
        };
        f.write_str(kind)
    }
}

/// Error returned by a [`crate::client::StoreClient`] call, classified at the boundary.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct RemoteError {
    /// The classification of the error.
    pub kind: RemoteErrorKind,
    /// The raw error code reported by the store, when there is one.
    pub code: Option<String>,
    /// Human readable description.
    pub message: String,
    /// One reason per submitted item when a transaction was canceled.
    pub cancellation_reasons: Vec<types::CancellationReason>,
}

impl RemoteError {
    /// Creates a remote error of the given kind.
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            message: message.into(),
            cancellation_reasons: Vec::new(),
        }
    }

    /// Attaches the per-item cancellation reasons of a canceled transaction.
    pub fn with_cancellation_reasons(mut self, reasons: Vec<types::CancellationReason>) -> Self {
        self.cancellation_reasons = reasons;
        self
    }

    /// Classifies an SDK error by the error code the store reported.
    pub fn from_sdk<E, R>(err: &error::SdkError<E, R>) -> Self
    where
        E: error::ProvideErrorMetadata + std::error::Error + 'static,
        R: fmt::Debug,
    {
        let code = error::ProvideErrorMetadata::code(err).map(str::to_string);
        let kind = code
            .as_deref()
            .map(RemoteErrorKind::from_code)
            .unwrap_or(RemoteErrorKind::Other);
        Self {
            kind,
            code,
            message: error::DisplayErrorContext(err).to_string(),
            cancellation_reasons: Vec::new(),
        }
    }

    /// Whether the same request may succeed if sent again later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            RemoteErrorKind::Throttled | RemoteErrorKind::Internal
        )
    }
}

/// An item of a canceled transaction together with the reason the store gave for it.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FailedItem {
    /// Position of the item in the submitted sequence.
    pub index: usize,
    /// The caller supplied name of the item.
    pub name: String,
    /// The cancellation reason code (`ConditionalCheckFailed`, `ThrottlingError`, ...).
    pub code: String,
    /// The cancellation message, if any.
    pub message: Option<String>,
}

/// Errors produced by this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The table is not registered with the client.
    #[error("table {0} not found")]
    TableNotFound(String),
    /// More items than a single request accepts.
    #[error("too many items to process: {count} exceeds the limit of {limit}")]
    TooManyItems {
        /// Number of submitted items.
        count: usize,
        /// Maximum accepted by the operation.
        limit: usize,
    },
    /// Batch get targets do not line up with the queries.
    #[error("number of queries ({queries}) does not match number of reference objects ({objects})")]
    MismatchedLength {
        /// Number of queries.
        queries: usize,
        /// Number of reference objects.
        objects: usize,
    },
    /// An expression or request references a parameter that was never set.
    #[error("unset parameter: {0}")]
    UnsetParameter(String),
    /// An operation kind that a write transaction cannot carry.
    #[error("invalid request type {kind} for transaction item {index} ({name})")]
    InvalidRequestType {
        /// Position of the offending item.
        index: usize,
        /// Name of the offending item.
        name: String,
        /// The rejected operation kind.
        kind: &'static str,
    },
    /// A condition expression failed. Not retryable.
    #[error("{operation}: conditional check failed")]
    ConditionCheckFailed {
        /// The failing operation.
        operation: &'static str,
        /// Items of a transaction that were canceled, in submission order.
        failed_items: Vec<FailedItem>,
    },
    /// A concurrent transaction touched the same item. Retryable.
    #[error("{operation}: transaction conflict")]
    Conflict {
        /// The failing operation.
        operation: &'static str,
        /// Items of a transaction that were canceled, in submission order.
        failed_items: Vec<FailedItem>,
    },
    /// A transaction with the same idempotency token is still executing. Not retryable.
    #[error("{operation}: transaction with the same request token in progress")]
    InProgress {
        /// The failing operation.
        operation: &'static str,
    },
    /// The request was throttled. Retryable.
    #[error("{operation}: request throttled")]
    Throttled {
        /// The failing operation.
        operation: &'static str,
        /// Items of a transaction that were canceled, in submission order.
        failed_items: Vec<FailedItem>,
    },
    /// A transaction was canceled for reasons other than conditions, throttling or conflicts.
    #[error("{operation}: transaction canceled")]
    TransactionCanceled {
        /// The failing operation.
        operation: &'static str,
        /// Items of a transaction that were canceled, in submission order.
        failed_items: Vec<FailedItem>,
    },
    /// The retry budget ran out before the batch completed.
    #[error(
        "{operation}: retry budget exhausted after {retries} retries with {unprocessed} items unprocessed"
    )]
    RetriesExhausted {
        /// The failing operation.
        operation: &'static str,
        /// Retries performed.
        retries: u32,
        /// Items still unprocessed.
        unprocessed: usize,
        /// The last remote error, when the final attempt failed outright.
        #[source]
        source: Option<RemoteError>,
    },
    /// Any other remote error. Not retried.
    #[error("{operation}: {source}")]
    Remote {
        /// The failing operation.
        operation: &'static str,
        /// The classified remote error.
        #[source]
        source: RemoteError,
    },
    /// Item (de)serialization failed.
    #[error(transparent)]
    Serialization(#[from] serde_dynamo::Error),
    /// A request could not be built.
    #[error(transparent)]
    Build(#[from] error::BuildError),
}

impl Error {
    /// Wraps a remote error, promoting the classes callers branch on to their own variants.
    pub fn remote(operation: &'static str, source: RemoteError) -> Self {
        match source.kind {
            RemoteErrorKind::ConditionalCheckFailed => Self::ConditionCheckFailed {
                operation,
                failed_items: Vec::new(),
            },
            RemoteErrorKind::Throttled => Self::Throttled {
                operation,
                failed_items: Vec::new(),
            },
            RemoteErrorKind::Conflict => Self::Conflict {
                operation,
                failed_items: Vec::new(),
            },
            RemoteErrorKind::InProgress => Self::InProgress { operation },
            _ => Self::Remote { operation, source },
        }
    }

    /// Whether the caller may retry the whole operation.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Throttled { .. } | Self::Conflict { .. } => true,
            Self::Remote { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// The items a canceled transaction reported, empty for every other error.
    pub fn failed_items(&self) -> &[FailedItem] {
        match self {
            Self::ConditionCheckFailed { failed_items, .. }
            | Self::Conflict { failed_items, .. }
            | Self::Throttled { failed_items, .. }
            | Self::TransactionCanceled { failed_items, .. } => failed_items,
            _ => &[],
        }
    }
}
