//! a pipeline scope: commands are encoded but not written until the scope exits, at which
//! point the whole buffer is flushed atomically and every buffered future is gathered with a
//! timeout.

use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    task::{Context, Poll},
};

use tokio::sync::oneshot;
use xitca_io::bytes::BytesMut;

use crate::{
    connection::Connection,
    driver::Batch,
    error::{AbortTransaction, ConnectionClosed, Error, GatherTimeout, PipelineError},
    protocol::encode::{encode_command, Arg},
    resolver::Resolver,
    value::Value,
    ExecuteOptions,
};

/// a future returned from [`PipelineScope::execute`]. refuses to resolve until the scope it
/// came from has exited, enforcing "do not await inside a pipeline block" at the future itself
/// rather than relying on callers to honor it.
pub struct PipelineFuture {
    rx: oneshot::Receiver<Result<Value, Error>>,
    unlocked: Arc<AtomicBool>,
}

impl Future for PipelineFuture {
    type Output = Result<Value, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if !self.unlocked.load(Ordering::Acquire) {
            return Poll::Ready(Err(PipelineError("do not await inside a pipeline block").into()));
        }
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|r| r.unwrap_or_else(|_| Err(ConnectionClosed.into())))
    }
}

/// how a pipeline scope concluded.
enum Disposition {
    Normal,
    Abort,
    Error(Error),
}

/// the scope guard returned by [`Connection::pipeline_scope`](crate::Connection::pipeline_scope)
/// (or, nested, by a transaction scope). owns the per-scope accumulator: nothing here is
/// shared across scopes, so no connection-internal mutex is needed to guard it.
pub struct PipelineScope {
    conn: Connection,
    buf: BytesMut,
    resolvers: Vec<Resolver>,
    unlocked: Arc<AtomicBool>,
    watch_keys: Option<Vec<Box<[u8]>>>,
    restore_mode: u8,
}

impl PipelineScope {
    pub(crate) fn new(conn: Connection, watch_keys: Option<Vec<Box<[u8]>>>, restore_mode: u8) -> Self {
        Self {
            conn,
            buf: BytesMut::new(),
            resolvers: Vec::new(),
            unlocked: Arc::new(AtomicBool::new(false)),
            watch_keys,
            restore_mode,
        }
    }

    /// drive `body` through this scope's enter/exit, translating an `Err` that downcasts to
    /// [`AbortTransaction`] into the user-abort disposition and otherwise propagating it.
    pub(crate) async fn run<F, Fut>(mut scope: Self, body: F) -> Result<(), Error>
    where
        F: FnOnce(&mut Self) -> Fut,
        Fut: Future<Output = Result<(), Error>>,
    {
        match body(&mut scope).await {
            Ok(()) => scope.exit(Disposition::Normal).await,
            Err(e) if e.is_abort_transaction() => scope.exit(Disposition::Abort).await,
            Err(e) => {
                let broadcast = clone_for_broadcast(&e);
                scope.exit(Disposition::Error(broadcast)).await.ok();
                Err(e)
            }
        }
    }

    pub fn execute<I>(&mut self, verb: &str, args: I, options: ExecuteOptions) -> Result<PipelineFuture, Error>
    where
        I: IntoIterator<Item = Arg>,
        I::IntoIter: ExactSizeIterator,
    {
        self.conn.reject_if_unusable()?;
        let bytes = encode_command(verb, args)?;
        self.buf.extend_from_slice(&bytes);

        let (tx, rx) = oneshot::channel();
        let resolver = Resolver {
            encoding: options.encoding,
            transforms: options.transforms,
            error_func: options.error_func,
            sink: tx,
        };
        self.resolvers.push(resolver);

        Ok(PipelineFuture {
            rx,
            unlocked: self.unlocked.clone(),
        })
    }

    async fn exit(self, disposition: Disposition) -> Result<(), Error> {
        let Self {
            conn,
            buf,
            resolvers,
            unlocked,
            watch_keys,
            restore_mode,
        } = self;

        let result = match disposition {
            Disposition::Normal if resolvers.is_empty() => {
                unwatch_if_needed(&conn, &watch_keys).await;
                Ok(())
            }
            Disposition::Normal => flush(&conn, buf, resolvers, watch_keys.as_deref()).await,
            Disposition::Abort => {
                for r in resolvers {
                    r.fulfill(Err(AbortTransaction.into()));
                }
                unwatch_if_needed(&conn, &watch_keys).await;
                Ok(())
            }
            Disposition::Error(e) => {
                for r in resolvers {
                    r.fulfill(Err(clone_for_broadcast(&e)));
                }
                Err(e)
            }
        };

        unlocked.store(true, Ordering::Release);
        conn.restore_mode(restore_mode);
        result
    }
}

async fn unwatch_if_needed(conn: &Connection, watch_keys: &Option<Vec<Box<[u8]>>>) {
    if matches!(watch_keys, Some(keys) if !keys.is_empty()) {
        if let Ok(fut) = conn.execute("UNWATCH", [], ExecuteOptions::new()) {
            let _ = fut.await;
        }
    }
}

async fn flush(
    conn: &Connection,
    body: BytesMut,
    resolvers: Vec<Resolver>,
    watch_keys: Option<&[Box<[u8]>]>,
) -> Result<(), Error> {
    let (bytes, txn) = match watch_keys {
        Some(keys) => {
            let mut wrapped = encode_command("MULTI", [])?;
            wrapped.extend_from_slice(&body);
            wrapped.extend_from_slice(&encode_command("EXEC", [])?);
            (wrapped, Some(keys.to_vec()))
        }
        None => (body, None),
    };

    let (done_tx, done_rx) = oneshot::channel();
    conn.send_batch(Batch {
        bytes,
        resolvers,
        txn,
        done: Some(done_tx),
    })?;

    match tokio::time::timeout(conn.timeout(), done_rx).await {
        Ok(Ok(inner)) => inner,
        Ok(Err(_)) => Err(ConnectionClosed.into()),
        Err(_) => Err(GatherTimeout.into()),
    }
}

// `Error` isn't `Clone` (it wraps a boxed trait object), so every pending future besides the
// one that returns the original gets a text-only copy of it rather than a downcastable one.
fn clone_for_broadcast(e: &Error) -> Error {
    Error::new(e.to_string())
}
