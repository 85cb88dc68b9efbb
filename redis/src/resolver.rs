//! the per-command decoding policy and one-shot result sink that rides along with every
//! buffered or in-flight command.

use tokio::sync::oneshot;

use crate::{
    error::{Error, ResponseError},
    value::{Encoding, Value},
};

/// a transform applied to a successfully decoded value, left-to-right.
pub type Transform = Box<dyn FnOnce(Value) -> Result<Value, Error> + Send>;

/// remaps a server error reply into a domain-specific error. external collaborators hook
/// this to turn e.g. a `-WRONGTYPE` reply into their own error type.
pub type ErrorFunc = Box<dyn FnOnce(ResponseError) -> Error + Send>;

/// one pending request: the decoding policy for a single in-flight command, plus the sink
/// its eventual value or error is delivered through.
pub struct Resolver {
    pub(crate) encoding: Encoding,
    pub(crate) transforms: Vec<Transform>,
    pub(crate) error_func: Option<ErrorFunc>,
    pub(crate) sink: oneshot::Sender<Result<Value, Error>>,
}

impl Resolver {
    pub fn new(encoding: Encoding, sink: oneshot::Sender<Result<Value, Error>>) -> Self {
        Self {
            encoding,
            transforms: Vec::new(),
            error_func: None,
            sink,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transforms.push(transform);
        self
    }

    pub fn with_error_func(mut self, error_func: ErrorFunc) -> Self {
        self.error_func = Some(error_func);
        self
    }

    /// fulfill the sink. a caller who dropped the receiving future simply observes `Err`
    /// here and that's fine: the resolver's job (keeping the queue aligned) is already done.
    pub(crate) fn fulfill(self, result: Result<Value, Error>) {
        let _ = self.sink.send(result);
    }
}
