//! the transport seam: production code dials a TCP or Unix socket, tests splice in a
//! [`tokio::io::duplex`] half. the driver is written against the trait object only.

use tokio::io::{AsyncRead, AsyncWrite};

pub(crate) trait DuplexIo: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> DuplexIo for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

pub(crate) type BoxedIo = Box<dyn DuplexIo>;
