//! error taxonomy.
//!
//! the public surface is a single opaque [`Error`] type wrapping a boxed `dyn std::error::Error`.
//! individual marker types below are the distinct observable kinds; callers recover a specific
//! kind with [`Error::downcast_ref`] or one of the `is_*` predicates rather than matching an enum,
//! so the core can add new internal kinds without breaking callers.

use core::fmt;

use std::error;

pub struct Error(Box<dyn error::Error + Send + Sync>);

impl Error {
    pub fn new<E>(err: E) -> Self
    where
        E: Into<Box<dyn error::Error + Send + Sync>>,
    {
        Self(err.into())
    }

    /// attempt to downcast to a concrete error kind.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: error::Error + 'static,
    {
        self.0.downcast_ref()
    }

    pub fn is_connection_closed(&self) -> bool {
        self.0.is::<ConnectionClosed>()
    }

    pub fn is_connection_closing(&self) -> bool {
        self.0.is::<ConnectionClosing>()
    }

    pub fn is_pool_closed(&self) -> bool {
        self.0.is::<PoolClosed>()
    }

    pub fn is_watch_error(&self) -> bool {
        self.0.is::<WatchError>()
    }

    pub fn is_response_error(&self) -> bool {
        self.0.is::<ResponseError>()
    }

    pub fn is_pool_closing(&self) -> bool {
        self.0.is::<PoolClosing>()
    }

    pub fn is_pipeline_error(&self) -> bool {
        self.0.is::<PipelineError>()
    }

    pub fn is_transaction_error(&self) -> bool {
        self.0.is::<TransactionError>()
    }

    pub fn is_abort_transaction(&self) -> bool {
        self.0.is::<AbortTransaction>()
    }

    pub fn is_encoding_unsupported(&self) -> bool {
        self.0.is::<EncodingUnsupported>()
    }

    pub fn is_protocol_error(&self) -> bool {
        self.0.is::<ProtocolError>()
    }

    pub fn is_gather_timeout(&self) -> bool {
        self.0.is::<GatherTimeout>()
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.0.source()
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self(Box::new(err))
    }
}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self(Box::new(GatherTimeout))
    }
}

macro_rules! impl_from_marker {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Error {
                fn from(err: $ty) -> Self {
                    Self(Box::new(err))
                }
            }
        )*
    };
}

impl_from_marker!(
    ConnectionClosed,
    ConnectionClosing,
    PoolClosed,
    PoolClosing,
    PipelineError,
    TransactionError,
    AbortTransaction,
    WatchError,
    ResponseError,
    EncodingUnsupported,
    ProtocolError,
    GatherTimeout,
    ConfigError,
);

/// operation attempted on a connection that has already been closed.
#[derive(Debug, Default)]
pub struct ConnectionClosed;

impl fmt::Display for ConnectionClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("connection is closed")
    }
}

impl error::Error for ConnectionClosed {}

/// operation attempted on a connection that is in the process of closing.
#[derive(Debug, Default)]
pub struct ConnectionClosing;

impl fmt::Display for ConnectionClosing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("connection is closing")
    }
}

impl error::Error for ConnectionClosing {}

/// operation attempted on a pool that has already been closed.
#[derive(Debug, Default)]
pub struct PoolClosed;

impl fmt::Display for PoolClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("pool is already closed")
    }
}

impl error::Error for PoolClosed {}

/// operation attempted on a pool that is in the process of closing.
#[derive(Debug, Default)]
pub struct PoolClosing;

impl fmt::Display for PoolClosing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("pool is already closing")
    }
}

impl error::Error for PoolClosing {}

/// misuse of a pipeline scope: awaiting a wrapped future before flush, nesting a pipeline
/// scope inside another, or closing the connection from within one.
#[derive(Debug)]
pub struct PipelineError(pub &'static str);

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pipeline error: {}", self.0)
    }
}

impl error::Error for PipelineError {}

/// misuse of a transaction scope: nesting, or closing the connection from within one.
#[derive(Debug)]
pub struct TransactionError(pub &'static str);

impl fmt::Display for TransactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transaction error: {}", self.0)
    }
}

impl error::Error for TransactionError {}

/// caller-originated sentinel used to unwind a pipeline-in-transaction scope without
/// committing any buffered command.
#[derive(Debug, Default)]
pub struct AbortTransaction;

impl fmt::Display for AbortTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("transaction aborted by caller")
    }
}

impl error::Error for AbortTransaction {}

/// a WATCHed key was touched before EXEC; the server discarded the transaction.
#[derive(Debug)]
pub struct WatchError(pub Vec<Box<[u8]>>);

impl fmt::Display for WatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watch error on key(s): ")?;
        for (i, key) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", String::from_utf8_lossy(key))?;
        }
        Ok(())
    }
}

impl error::Error for WatchError {}

/// a server `-` reply not remapped by a resolver's `error_func`.
#[derive(Debug)]
pub struct ResponseError(pub String);

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl error::Error for ResponseError {}

/// an argument type the frame codec does not know how to serialize.
#[derive(Debug, Default)]
pub struct EncodingUnsupported;

impl fmt::Display for EncodingUnsupported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("argument type is not supported for encoding")
    }
}

impl error::Error for EncodingUnsupported {}

/// the frame parser detected a malformed reply and the connection can no longer be trusted
/// to stay aligned on message boundaries.
#[derive(Debug)]
pub struct ProtocolError(pub String);

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "protocol error: {}", self.0)
    }
}

impl error::Error for ProtocolError {}

/// a pipeline/transaction scope's gather step exceeded its configured timeout.
#[derive(Debug, Default)]
pub struct GatherTimeout;

impl fmt::Display for GatherTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("timed out waiting for pipeline replies")
    }
}

impl error::Error for GatherTimeout {}

/// a [`Config`](crate::Config) value failed validation when building a connection or pool.
#[derive(Debug)]
pub struct ConfigError(pub &'static str);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid configuration: {}", self.0)
    }
}

impl error::Error for ConfigError {}
