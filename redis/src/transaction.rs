//! a transaction scope: `WATCH` has already been issued (if any keys were given) by the time
//! the caller gets one of these; the nested pipeline scope it hands out is the one that gets
//! wrapped in `MULTI`/`EXEC` on exit.

use std::{
    future::Future,
    sync::{atomic::Ordering, Arc},
};

use crate::{
    connection::{Connection, ExecuteFuture, ExecuteOptions},
    error::Error,
    pipeline::PipelineScope,
    protocol::encode::Arg,
};

/// the scope handle yielded by [`Connection::transaction_scope`](crate::Connection::transaction_scope).
/// plain commands run through it immediately (normal mode); [`TransactionScope::pipeline_scope`]
/// opens the nested pipeline that actually gets committed atomically.
pub struct TransactionScope {
    conn: Connection,
    watch_keys: Vec<Box<[u8]>>,
    entered_pipeline: Arc<std::sync::atomic::AtomicBool>,
}

impl TransactionScope {
    pub(crate) fn new(conn: Connection, watch_keys: Vec<Box<[u8]>>, entered_pipeline: Arc<std::sync::atomic::AtomicBool>) -> Self {
        Self {
            conn,
            watch_keys,
            entered_pipeline,
        }
    }

    /// run a command directly against the transaction's connection, outside of `MULTI`/`EXEC`.
    /// this is how a caller reads a watched key's current value before committing a change to
    /// it in the nested pipeline.
    pub fn execute<I>(&self, verb: &str, args: I, options: ExecuteOptions) -> Result<ExecuteFuture, Error>
    where
        I: IntoIterator<Item = Arg>,
        I::IntoIter: ExactSizeIterator,
    {
        self.conn.execute(verb, args, options)
    }

    /// open the nested pipeline scope whose buffer, on normal exit, is wrapped in `MULTI` ..
    /// `EXEC` and guarded by this transaction's watched keys.
    pub async fn pipeline_scope<F, Fut>(&self, body: F) -> Result<(), Error>
    where
        F: FnOnce(&mut PipelineScope) -> Fut,
        Fut: Future<Output = Result<(), Error>>,
    {
        self.entered_pipeline.store(true, Ordering::Release);
        let scope = self.conn.enter_pipeline(Some(self.watch_keys.clone()))?;
        PipelineScope::run(scope, body).await
    }
}
