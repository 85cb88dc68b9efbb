//! decoded reply values handed back to callers, and the text encoding policy used to
//! turn bulk strings into them.

use xitca_io::bytes::Bytes;

/// a [`Reply`](crate::protocol::Reply) after the resolver's encoding and transform chain
/// have been applied to it.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Int(i64),
    Bool(bool),
    Bytes(Bytes),
    Text(String),
    Array(Vec<Value>),
}

impl Value {
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }
}

/// how a resolver wants bulk-string bytes decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    /// use the connection's configured default encoding.
    #[default]
    Default,
    /// decode bulk strings as utf-8 text.
    Utf8,
    /// leave bulk strings as raw bytes.
    RawBytes,
}

impl Encoding {
    pub(crate) fn resolve(self, default: Encoding) -> Encoding {
        match self {
            Encoding::Default => default,
            other => other,
        }
    }
}
