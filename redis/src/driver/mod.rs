//! the background task that owns the duplex byte stream: all reply-correlation state
//! (resolver queue, in-flight transaction bookkeeping) lives here and nowhere else, reached
//! from the [`Connection`](crate::connection::Connection) handle over an unbounded channel.
//! this is a single-threaded cooperative, no connection-internal mutex model rendered as an
//! actor: mutable state lives only inside the task that owns it.

mod slot;

pub(crate) use slot::Slot;

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    sync::{mpsc, oneshot, Notify},
};
use tracing::{debug, trace, warn};
use xitca_io::bytes::BytesMut;

use crate::{
    decode,
    error::{ConnectionClosed, Error, ProtocolError, WatchError},
    io::BoxedIo,
    protocol::{Parser, Reply},
    resolver::Resolver,
    value::Encoding,
};

/// one flush of commands: a single call to `execute` outside any scope is a batch of one.
pub(crate) struct Batch {
    pub(crate) bytes: BytesMut,
    pub(crate) resolvers: Vec<Resolver>,
    /// `Some(watched_keys)` when this batch's bytes are wrapped in `MULTI` .. `EXEC`.
    pub(crate) txn: Option<Vec<Box<[u8]>>>,
    /// fires once every resolver in this batch has received its reply, so a scope exit can
    /// gather on it with a timeout without consuming the resolvers' own receivers.
    pub(crate) done: Option<oneshot::Sender<Result<(), Error>>>,
}

pub(crate) enum DriverMsg {
    Send(Batch),
    Shutdown,
}

/// handle to a spawned driver task.
#[derive(Clone)]
pub(crate) struct DriverHandle {
    tx: mpsc::UnboundedSender<DriverMsg>,
}

impl DriverHandle {
    pub(crate) fn send(&self, batch: Batch) -> Result<(), Error> {
        self.tx.send(DriverMsg::Send(batch)).map_err(|_| ConnectionClosed.into())
    }

    pub(crate) fn shutdown(&self) {
        let _ = self.tx.send(DriverMsg::Shutdown);
    }
}

/// shared closed-state a [`Connection`](crate::connection::Connection) can poll or wait on
/// without talking to the driver task directly.
pub(crate) struct ClosedState {
    pub(crate) closed: AtomicBool,
    pub(crate) notify: Notify,
}

impl ClosedState {
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) async fn wait(&self) {
        let notified = self.notify.notified();
        if self.is_closed() {
            return;
        }
        notified.await;
    }
}

struct TxnMeta {
    remaining: usize,
    watched_keys: Vec<Box<[u8]>>,
}

struct BatchMeta {
    remaining: usize,
    done: Option<oneshot::Sender<Result<(), Error>>>,
}

/// spawn the background reader/writer loop for `io`, returning a handle to reach it and the
/// shared closed-state the connection handle polls. `parser` is the injectable RESP parser --
/// a fresh instance per connection, since each owns its own accumulation state.
pub(crate) fn spawn(
    io: BoxedIo,
    max_chunk_size: usize,
    default_encoding: Encoding,
    parser: Box<dyn Parser>,
) -> (DriverHandle, Arc<ClosedState>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let state = Arc::new(ClosedState {
        closed: AtomicBool::new(false),
        notify: Notify::new(),
    });

    let driver = Driver {
        io,
        rx,
        max_chunk_size,
        default_encoding,
        parser,
        queue: VecDeque::new(),
        batch_queue: VecDeque::new(),
        txn_active: None,
        state: state.clone(),
    };

    tokio::spawn(driver.run());

    (DriverHandle { tx }, state)
}

struct Driver {
    io: BoxedIo,
    rx: mpsc::UnboundedReceiver<DriverMsg>,
    max_chunk_size: usize,
    default_encoding: Encoding,
    parser: Box<dyn Parser>,
    queue: VecDeque<Slot>,
    batch_queue: VecDeque<BatchMeta>,
    txn_active: Option<TxnMeta>,
    state: Arc<ClosedState>,
}

impl Driver {
    async fn run(mut self) {
        let reason = self.run_inner().await;
        if let Err(ref e) = reason {
            debug!("redis connection reader loop terminating: {e}");
        }
        self.fail_all();
        let _ = self.io.shutdown().await;
        self.state.closed.store(true, Ordering::Release);
        self.state.notify.notify_waiters();
    }

    async fn run_inner(&mut self) -> Result<(), Error> {
        let mut chunk = BytesMut::with_capacity(self.max_chunk_size);
        loop {
            chunk.clear();
            let spare = chunk.capacity() - chunk.len();
            if spare < self.max_chunk_size {
                chunk.reserve(self.max_chunk_size - spare);
            }

            tokio::select! {
                biased;
                msg = self.rx.recv() => {
                    match msg {
                        Some(DriverMsg::Send(batch)) => self.handle_batch(batch).await?,
                        Some(DriverMsg::Shutdown) | None => return Ok(()),
                    }
                }
                result = self.io.read_buf(&mut chunk) => {
                    let n = result?;
                    if n == 0 {
                        return Ok(());
                    }
                    self.parser.feed(&chunk);
                    self.drain_replies()?;
                }
            }
        }
    }

    async fn handle_batch(&mut self, batch: Batch) -> Result<(), Error> {
        let Batch { bytes, resolvers, txn, done } = batch;

        trace!(commands = resolvers.len(), is_txn = txn.is_some(), "flushing batch to wire");

        self.io.write_all(&bytes).await?;

        let remaining = resolvers.len();
        if let Some(watched_keys) = txn {
            self.queue.push_back(Slot::Placeholder);
            for resolver in resolvers {
                self.queue.push_back(Slot::Real(resolver));
            }
            self.txn_active = Some(TxnMeta { remaining, watched_keys });
        } else {
            for resolver in resolvers {
                self.queue.push_back(Slot::Real(resolver));
            }
        }
        self.batch_queue.push_back(BatchMeta { remaining, done });

        Ok(())
    }

    fn drain_replies(&mut self) -> Result<(), Error> {
        while let Some(reply) = self.parser.gets()? {
            self.dispatch_reply(reply)?;
        }
        Ok(())
    }

    fn dispatch_reply(&mut self, reply: Reply) -> Result<(), Error> {
        if self.txn_active.is_some() {
            if reply.is_queued() {
                return Ok(());
            }
            if let Reply::Array(items) = reply {
                let TxnMeta { remaining, watched_keys } = self.txn_active.take().unwrap();
                match items {
                    Some(items) => {
                        if items.len() != remaining {
                            return Err(ProtocolError(format!(
                                "EXEC reply carries {} result(s) but {remaining} command(s) were queued",
                                items.len()
                            ))
                            .into());
                        }
                        for item in items {
                            let slot = self.queue.pop_front().expect("EXEC array length already validated");
                            if let Slot::Real(resolver) = slot {
                                decode::decode(item, resolver, self.default_encoding);
                            }
                        }
                    }
                    None => {
                        for _ in 0..remaining {
                            let slot = self.queue.pop_front().expect("txn body slot missing");
                            if let Slot::Real(resolver) = slot {
                                resolver.fulfill(Err(WatchError(watched_keys.clone()).into()));
                            }
                        }
                        self.finish_batch_slots_with(remaining, Err(WatchError(watched_keys).into()));
                        return Ok(());
                    }
                }
                self.finish_batch_slots(remaining);
                return Ok(());
            }
            // falls through: this is the MULTI acknowledgement ("+OK"), handled below.
        }

        let slot = self
            .queue
            .pop_front()
            .ok_or_else(|| Error::from(ProtocolError("reply received with no pending resolver".into())))?;

        match slot {
            Slot::Placeholder => {}
            Slot::Real(resolver) => {
                decode::decode(reply, resolver, self.default_encoding);
                self.finish_batch_slots(1);
            }
        }
        Ok(())
    }

    /// pop the front batch and fulfill its `done` signal with `Ok(())` once every one of its
    /// resolvers has been dispatched.
    fn finish_batch_slots(&mut self, n: usize) {
        self.finish_batch_slots_with(n, Ok(()));
    }

    /// same, but with an explicit outcome for the batch's `done` signal -- used by the EXEC-nil
    /// path so a pipeline/transaction scope's gather step observes the same [`WatchError`] its
    /// individual buffered futures were just failed with, instead of a misleading `Ok(())`.
    fn finish_batch_slots_with(&mut self, n: usize, result: Result<(), Error>) {
        let front = self.batch_queue.front_mut().expect("batch queue desynced from resolver queue");
        front.remaining = front.remaining.saturating_sub(n);
        if front.remaining == 0 {
            let meta = self.batch_queue.pop_front().unwrap();
            if let Some(done) = meta.done {
                let _ = done.send(result);
            }
        }
    }

    fn fail_all(&mut self) {
        if self.queue.is_empty() && self.batch_queue.is_empty() {
            return;
        }
        warn!("redis connection closing, failing {} pending resolver(s)", self.queue.len());
        while let Some(slot) = self.queue.pop_front() {
            if let Slot::Real(resolver) = slot {
                resolver.fulfill(Err(ConnectionClosed.into()));
            }
        }
        while let Some(meta) = self.batch_queue.pop_front() {
            if let Some(done) = meta.done {
                let _ = done.send(Err(ConnectionClosed.into()));
            }
        }
    }
}
