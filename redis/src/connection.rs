//! the cloneable connection handle: a thin, atomics-backed front for the background driver
//! task. mode/closing/closed are mirrored here as plain atomics so that synchronous,
//! pre-suspension checks never need a channel round trip.

use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicBool, AtomicU8, Ordering},
        Arc,
    },
    task::{Context, Poll},
    time::Duration,
};

use tokio::sync::oneshot;
use tracing::info;

use crate::{
    config::Config,
    dial,
    driver::{self, Batch, ClosedState, DriverHandle},
    error::{ConnectionClosed, ConnectionClosing, Error, PipelineError, TransactionError},
    pipeline::PipelineScope,
    protocol::encode::{encode_command, Arg},
    resolver::{ErrorFunc, Resolver, Transform},
    transaction::TransactionScope,
    value::{Encoding, Value},
};

const NORMAL: u8 = 0;
const PIPELINE: u8 = 1;
const TRANSACTION: u8 = 2;
const PIPELINE_IN_TRANSACTION: u8 = 3;

/// per-call overrides for [`Connection::execute`]/[`PipelineScope::execute`]; defaults mirror
/// the connection's own configuration.
#[derive(Default)]
pub struct ExecuteOptions {
    pub(crate) encoding: Encoding,
    pub(crate) transforms: Vec<Transform>,
    pub(crate) error_func: Option<ErrorFunc>,
}

impl ExecuteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transforms.push(transform);
        self
    }

    pub fn error_func(mut self, error_func: ErrorFunc) -> Self {
        self.error_func = Some(error_func);
        self
    }
}

/// the future returned by a one-shot [`Connection::execute`] call.
pub struct ExecuteFuture(oneshot::Receiver<Result<Value, Error>>);

impl Future for ExecuteFuture {
    type Output = Result<Value, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0)
            .poll(cx)
            .map(|r| r.unwrap_or_else(|_| Err(ConnectionClosed.into())))
    }
}

pub(crate) struct Shared {
    pub(crate) driver: DriverHandle,
    pub(crate) state: Arc<ClosedState>,
    mode: AtomicU8,
    closing: AtomicBool,
    pub(crate) default_encoding: Encoding,
    pub(crate) timeout: Duration,
}

/// a handle to one RESP connection. cheap to clone; every clone reaches the same background
/// reader/writer task.
#[derive(Clone)]
pub struct Connection(pub(crate) Arc<Shared>);

impl Connection {
    /// dial `cfg`'s endpoint and spawn the background driver for it.
    pub async fn connect(cfg: &Config) -> Result<Self, Error> {
        cfg.validate()?;
        let io = dial::dial(cfg).await?;
        let (driver, state) = driver::spawn(io, cfg.get_max_chunk_size(), cfg.get_encoding(), cfg.build_parser());

        let conn = Self(Arc::new(Shared {
            driver,
            state,
            mode: AtomicU8::new(NORMAL),
            closing: AtomicBool::new(false),
            default_encoding: cfg.get_encoding(),
            timeout: cfg.get_timeout(),
        }));

        if cfg.get_db() != 0 {
            conn.execute("SELECT", [Arg::from(cfg.get_db())], ExecuteOptions::new())?
                .await?;
        }

        info!("redis connection established");
        Ok(conn)
    }

    pub(crate) fn from_parts(driver: DriverHandle, state: Arc<ClosedState>, default_encoding: Encoding, timeout: Duration) -> Self {
        Self(Arc::new(Shared {
            driver,
            state,
            mode: AtomicU8::new(NORMAL),
            closing: AtomicBool::new(false),
            default_encoding,
            timeout,
        }))
    }

    pub fn is_closed(&self) -> bool {
        self.0.state.is_closed()
    }

    /// whether `self` and `other` are handles to the same background driver task.
    pub(crate) fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// submit one command. writes immediately in `normal`/`transaction` mode; in a pipeline
    /// mode this fails synchronously since buffering is owned by the scope guard, not the
    /// bare connection handle -- call `PipelineScope::execute` instead.
    pub fn execute<I>(&self, verb: &str, args: I, options: ExecuteOptions) -> Result<ExecuteFuture, Error>
    where
        I: IntoIterator<Item = Arg>,
        I::IntoIter: ExactSizeIterator,
    {
        self.reject_if_unusable()?;
        match self.0.mode.load(Ordering::Acquire) {
            PIPELINE | PIPELINE_IN_TRANSACTION => {
                return Err(PipelineError("call execute on the pipeline scope handle, not the connection, while a pipeline is open").into());
            }
            _ => {}
        }

        let bytes = encode_command(verb, args)?;
        let (tx, rx) = oneshot::channel();
        let resolver = Resolver {
            encoding: options.encoding,
            transforms: options.transforms,
            error_func: options.error_func,
            sink: tx,
        };

        self.0.driver.send(Batch {
            bytes,
            resolvers: vec![resolver],
            txn: None,
            done: None,
        })?;

        Ok(ExecuteFuture(rx))
    }

    /// run `body` with an exclusive pipeline scope, flushing the buffer atomically on exit.
    /// values produced by buffered commands are read back through the [`PipelineFuture`]s
    /// `body` hands out, not through this call's return value.
    ///
    /// [`PipelineFuture`]: crate::pipeline::PipelineFuture
    pub async fn pipeline_scope<F, Fut>(&self, body: F) -> Result<(), Error>
    where
        F: FnOnce(&mut PipelineScope) -> Fut,
        Fut: Future<Output = Result<(), Error>>,
    {
        let scope = self.enter_pipeline(None)?;
        PipelineScope::run(scope, body).await
    }

    /// run `body` with an exclusive transaction scope; `watch_keys` are WATCHed synchronously
    /// before `body` runs.
    pub async fn transaction_scope<F, Fut, K>(&self, watch_keys: K, body: F) -> Result<(), Error>
    where
        F: FnOnce(TransactionScope) -> Fut,
        Fut: Future<Output = Result<(), Error>>,
        K: IntoIterator,
        K::Item: Into<Box<[u8]>>,
    {
        self.reject_if_unusable()?;
        self.0
            .mode
            .compare_exchange(NORMAL, TRANSACTION, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| TransactionError("a transaction scope is already open on this connection"))?;

        let watch_keys: Vec<Box<[u8]>> = watch_keys.into_iter().map(Into::into).collect();
        let has_watches = !watch_keys.is_empty();
        if has_watches {
            let args = watch_keys.iter().map(|k| Arg::Bytes(xitca_io::bytes::Bytes::copy_from_slice(k)));
            if let Err(e) = self.execute("WATCH", args, ExecuteOptions::new())?.await {
                self.0.mode.store(NORMAL, Ordering::Release);
                return Err(e);
            }
        }

        let entered_pipeline = Arc::new(AtomicBool::new(false));
        let scope = TransactionScope::new(self.clone(), watch_keys, entered_pipeline.clone());
        let result = body(scope).await;

        // UNWATCH only if the scope never entered a nested pipeline -- if it did, the
        // pipeline's own exit already issued (or deliberately skipped) UNWATCH.
        if has_watches && !entered_pipeline.load(Ordering::Acquire) {
            let _ = self.execute("UNWATCH", [], ExecuteOptions::new())?.await;
        }

        self.0.mode.store(NORMAL, Ordering::Release);
        result
    }

    /// shut the connection down: `closing` flips synchronously so callers racing this call
    /// observe `ConnectionClosing` rather than proceeding as if nothing happened, then the
    /// background task finishes draining and exits. rejects with `PipelineError`/
    /// `TransactionError` instead if a scope is still open on this connection -- tearing the
    /// wire down out from under a scope body that's still buffering or awaiting its own
    /// commands would desync the resolver queue those commands are relying on.
    pub async fn close(&self) -> Result<(), Error> {
        if let Some(err) = self.active_scope_error() {
            return Err(err);
        }
        self.0.closing.store(true, Ordering::Release);
        self.0.driver.shutdown();
        self.0.state.wait().await;
        Ok(())
    }

    pub(crate) fn reject_if_unusable(&self) -> Result<(), Error> {
        if self.0.state.is_closed() {
            return Err(ConnectionClosed.into());
        }
        if self.0.closing.load(Ordering::Acquire) {
            return Err(ConnectionClosing.into());
        }
        Ok(())
    }

    /// `Some(..)` when a pipeline or transaction scope is currently open on this connection;
    /// this connection's own `close` (and a pool's close of it) must refuse to run until that
    /// scope has exited.
    pub(crate) fn active_scope_error(&self) -> Option<Error> {
        match self.0.mode.load(Ordering::Acquire) {
            PIPELINE | PIPELINE_IN_TRANSACTION => {
                Some(PipelineError("cannot close a connection while a pipeline scope is open on it").into())
            }
            TRANSACTION => Some(TransactionError("cannot close a connection while a transaction scope is open on it").into()),
            _ => None,
        }
    }

    pub(crate) fn enter_pipeline(&self, watch_keys: Option<Vec<Box<[u8]>>>) -> Result<PipelineScope, Error> {
        self.reject_if_unusable()?;
        let (from, to) = match watch_keys {
            Some(_) => (TRANSACTION, PIPELINE_IN_TRANSACTION),
            None => (NORMAL, PIPELINE),
        };
        self.0
            .mode
            .compare_exchange(from, to, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| PipelineError("a pipeline scope is already open on this connection"))?;
        Ok(PipelineScope::new(self.clone(), watch_keys, from))
    }

    pub(crate) fn restore_mode(&self, to: u8) {
        self.0.mode.store(to, Ordering::Release);
    }

    pub(crate) fn send_batch(&self, batch: Batch) -> Result<(), Error> {
        self.0.driver.send(batch)
    }

    pub(crate) fn timeout(&self) -> Duration {
        self.0.timeout
    }
}

pub(crate) const MODE_NORMAL: u8 = NORMAL;
pub(crate) const MODE_TRANSACTION: u8 = TRANSACTION;

#[cfg(test)]
mod test {
    use super::*;
    use tokio::io::duplex;

    /// a connection wired to one half of an in-process duplex pipe; the other half is kept
    /// alive (not read from) so the driver never observes EOF during the test.
    async fn test_connection() -> (Connection, tokio::io::DuplexStream) {
        let (client, server) = duplex(4096);
        let (driver, state) = driver::spawn(Box::new(client), 65535, Encoding::Utf8, Box::new(crate::protocol::RespParser::new()));
        let conn = Connection::from_parts(driver, state, Encoding::Utf8, Duration::from_secs(5));
        (conn, server)
    }

    #[tokio::test]
    async fn nested_pipeline_scope_is_rejected_on_enter() {
        let (conn, _server) = test_connection().await;

        let _first = conn.enter_pipeline(None).unwrap();
        let err = conn.enter_pipeline(None).unwrap_err();
        assert!(err.is_pipeline_error());
    }

    #[tokio::test]
    async fn nested_transaction_scope_is_rejected_on_enter() {
        let (conn, _server) = test_connection().await;

        // simulate an already-open transaction scope without running a full nested async
        // body: `transaction_scope`'s own enter check is the same compare_exchange this
        // drives into its failure branch.
        conn.0.mode.store(TRANSACTION, Ordering::Release);
        let err = conn
            .transaction_scope(Vec::<Box<[u8]>>::new(), |_txn| async { Ok(()) })
            .await
            .unwrap_err();
        assert!(err.is_transaction_error());
    }

    #[tokio::test]
    async fn close_is_rejected_while_a_pipeline_scope_is_open() {
        let (conn, _server) = test_connection().await;

        let _scope = conn.enter_pipeline(None).unwrap();
        let err = conn.close().await.unwrap_err();
        assert!(err.is_pipeline_error());
        assert!(!conn.is_closed());
    }

    #[tokio::test]
    async fn close_is_rejected_while_a_transaction_scope_is_open() {
        let (conn, _server) = test_connection().await;

        conn.0.mode.store(TRANSACTION, Ordering::Release);
        let err = conn.close().await.unwrap_err();
        assert!(err.is_transaction_error());
        assert!(!conn.is_closed());
    }

    #[tokio::test]
    async fn close_succeeds_once_no_scope_is_open() {
        let (conn, _server) = test_connection().await;

        conn.close().await.unwrap();
        assert!(conn.is_closed());
    }
}
