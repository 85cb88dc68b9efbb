//! the connection pool: admission control between `min`/`max`, exclusive loans for
//! pipeline/transaction scopes, shared access for one-shots, stale-connection pruning.
//!
//! the pool's own bookkeeping (idle ring, in-use set, acquiring counter) is a single
//! [`std::sync::Mutex`]-guarded [`Inner`] rather than one mutex per field, mirroring how the
//! rest of the workspace's pool types (e.g. the postgres pool) keep one lock around a plain
//! collection instead of building a lock-free structure. a [`Notify`] plays the role of a
//! pool-wide condition variable, parking acquirers while the pool is saturated.

use std::{
    collections::VecDeque,
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
};

use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    connection::{Connection, ExecuteOptions},
    error::{Error, PoolClosed, PoolClosing},
    pipeline::PipelineScope,
    protocol::encode::Arg,
    transaction::TransactionScope,
    value::Value,
};

struct Inner {
    idle: VecDeque<Connection>,
    in_use: Vec<Connection>,
    acquiring: usize,
}

impl Inner {
    fn size(&self) -> usize {
        self.idle.len() + self.in_use.len() + self.acquiring
    }
}

/// a pool of RESP connections to one endpoint, grown between `min_size` and `max_size`.
pub struct Pool {
    cfg: Config,
    inner: Mutex<Inner>,
    notify: Notify,
    closing: AtomicBool,
    closed: AtomicBool,
}

impl Pool {
    /// build `cfg.get_pool_size().0` connections synchronously, then return the pool.
    pub async fn connect(cfg: Config) -> Result<Self, Error> {
        cfg.validate()?;
        let (min, max) = cfg.get_pool_size();

        let pool = Self {
            cfg,
            inner: Mutex::new(Inner {
                idle: VecDeque::with_capacity(max),
                in_use: Vec::new(),
                acquiring: 0,
            }),
            notify: Notify::new(),
            closing: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        };

        for _ in 0..min {
            let conn = Connection::connect(&pool.cfg).await?;
            pool.inner.lock().unwrap().idle.push_back(conn);
        }

        info!(min, max, "redis pool populated");
        Ok(pool)
    }

    /// run a one-shot command against any idle connection; the connection is not removed from
    /// the idle set, since RESP pipelining makes sharing it for one-shots safe.
    pub async fn execute<I>(&self, verb: &str, args: I, options: ExecuteOptions) -> Result<Value, Error>
    where
        I: IntoIterator<Item = Arg>,
        I::IntoIter: ExactSizeIterator,
    {
        let conn = self.acquire_shared().await?;
        conn.execute(verb, args, options)?.await
    }

    /// loan an exclusive connection for the duration of `body`, then release it.
    pub async fn pipeline_scope<F, Fut>(&self, body: F) -> Result<(), Error>
    where
        F: FnOnce(&mut PipelineScope) -> Fut,
        Fut: Future<Output = Result<(), Error>>,
    {
        let conn = self.acquire_exclusive().await?;
        let result = conn.pipeline_scope(body).await;
        self.release(conn);
        result
    }

    /// loan an exclusive connection, open a transaction scope on it (issuing `WATCH` for
    /// `watch_keys` if any), run `body`, then release the connection.
    pub async fn transaction_scope<F, Fut, K>(&self, watch_keys: K, body: F) -> Result<(), Error>
    where
        F: FnOnce(TransactionScope) -> Fut,
        Fut: Future<Output = Result<(), Error>>,
        K: IntoIterator,
        K::Item: Into<Box<[u8]>>,
    {
        let conn = self.acquire_exclusive().await?;
        let result = conn.transaction_scope(watch_keys, body).await;
        self.release(conn);
        result
    }

    /// current `idle + in_use + acquiring` connection count.
    pub fn size(&self) -> usize {
        self.inner.lock().unwrap().size()
    }

    /// transition to closing (the reentrancy guard -- a second concurrent call observes
    /// `closing` already set and returns immediately), concurrently close every connection
    /// the pool owns (idle and on loan alike), then mark the pool closed. new operations
    /// during the transient teardown window observe [`PoolClosing`]; once teardown has
    /// actually finished they observe [`PoolClosed`]. rejects with `PipelineError`/
    /// `TransactionError`, leaving the pool untouched, if any loaned connection still has a
    /// scope open on it -- the same rule [`Connection::close`](crate::Connection::close) applies
    /// to a single connection.
    pub async fn close(&self) -> Result<(), Error> {
        {
            let inner = self.inner.lock().unwrap();
            for conn in inner.in_use.iter() {
                if let Some(err) = conn.active_scope_error() {
                    return Err(err);
                }
            }
        }

        if self.closing.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let conns: Vec<Connection> = {
            let mut inner = self.inner.lock().unwrap();
            inner.idle.drain(..).chain(inner.in_use.drain(..)).collect()
        };

        info!(count = conns.len(), "closing redis pool");
        let handles: Vec<_> = conns
            .into_iter()
            .map(|conn| tokio::spawn(async move { conn.close().await }))
            .collect();
        for handle in handles {
            let _ = handle.await;
        }

        self.closed.store(true, Ordering::Release);
        self.notify.notify_waiters();
        Ok(())
    }

    fn reject_if_unusable(&self) -> Result<(), Error> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PoolClosed.into());
        }
        if self.closing.load(Ordering::Acquire) {
            return Err(PoolClosing.into());
        }
        Ok(())
    }

    /// pick an idle connection without removing it from the idle set, pruning closed/closing
    /// candidates along the way. opens a new connection if none is usable and the pool has
    /// room; parks otherwise.
    async fn acquire_shared(&self) -> Result<Connection, Error> {
        loop {
            self.reject_if_unusable()?;

            enum Step {
                Ready(Connection),
                Open,
                Park,
            }

            let step = {
                let mut inner = self.inner.lock().unwrap();
                if let Some(conn) = take_idle(&mut inner.idle, false) {
                    Step::Ready(conn)
                } else if inner.size() < self.cfg.get_pool_size().1 {
                    inner.acquiring += 1;
                    Step::Open
                } else {
                    Step::Park
                }
            };

            match step {
                Step::Ready(conn) => return Ok(conn),
                Step::Open => match self.open_one().await {
                    Ok(conn) => {
                        self.inner.lock().unwrap().idle.push_back(conn.clone());
                        self.notify.notify_one();
                        return Ok(conn);
                    }
                    Err(e) => return Err(e),
                },
                Step::Park => self.park().await,
            }
        }
    }

    /// remove an idle connection from the idle set and mark it in-use, for the duration of a
    /// pipeline/transaction scope.
    async fn acquire_exclusive(&self) -> Result<Connection, Error> {
        loop {
            self.reject_if_unusable()?;

            enum Step {
                Ready(Connection),
                Open,
                Park,
            }

            let step = {
                let mut inner = self.inner.lock().unwrap();
                if let Some(conn) = take_idle(&mut inner.idle, true) {
                    inner.in_use.push(conn.clone());
                    Step::Ready(conn)
                } else if inner.size() < self.cfg.get_pool_size().1 {
                    inner.acquiring += 1;
                    Step::Open
                } else {
                    Step::Park
                }
            };

            match step {
                Step::Ready(conn) => return Ok(conn),
                Step::Open => match self.open_one().await {
                    Ok(conn) => {
                        self.inner.lock().unwrap().in_use.push(conn.clone());
                        return Ok(conn);
                    }
                    Err(e) => return Err(e),
                },
                Step::Park => self.park().await,
            }
        }
    }

    async fn open_one(&self) -> Result<Connection, Error> {
        let result = Connection::connect(&self.cfg).await;
        self.inner.lock().unwrap().acquiring -= 1;
        match &result {
            Ok(_) => debug!("redis pool opened a new connection"),
            Err(e) => {
                warn!("redis pool failed to open a new connection: {e}");
                self.notify.notify_waiters();
            }
        }
        result
    }

    async fn park(&self) {
        let notified = self.notify.notified();
        notified.await;
    }

    /// return a loaned connection to the idle set, or drop it if it died while on loan.
    fn release(&self, conn: Connection) {
        let mut inner = self.inner.lock().unwrap();
        inner.in_use.retain(|c| !c.ptr_eq(&conn));
        let closed = conn.is_closed();
        if !closed {
            inner.idle.push_back(conn);
        }
        drop(inner);
        self.notify.notify_one();
    }
}

/// walk the idle ring at most once, pruning closed/closing candidates without advancing past
/// them. `take` controls whether the returned candidate is removed outright (exclusive loan)
/// or rotated to the tail and cloned (shared one-shot use).
fn take_idle(idle: &mut VecDeque<Connection>, take: bool) -> Option<Connection> {
    let n = idle.len();
    for _ in 0..n {
        let conn = idle.pop_front()?;
        if conn.is_closed() {
            // stale: drop it, do not rotate it back in.
            continue;
        }
        if take {
            return Some(conn);
        }
        idle.push_back(conn.clone());
        return Some(conn);
    }
    None
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use tokio::{
        io::{duplex, AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    use super::*;
    use crate::{config::Endpoint, driver, value::Encoding, Config};

    #[test]
    fn size_accounts_for_all_three_sets() {
        let inner = Inner {
            idle: VecDeque::new(),
            in_use: Vec::new(),
            acquiring: 2,
        };
        assert_eq!(inner.size(), 2);
    }

    async fn test_connection() -> Connection {
        let (client, _server) = duplex(4096);
        let (driver, state) = driver::spawn(Box::new(client), 65535, Encoding::Utf8, Box::new(crate::protocol::RespParser::new()));
        Connection::from_parts(driver, state, Encoding::Utf8, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn take_idle_prunes_closed_connections_without_rotating_them_back_in() {
        let stale = test_connection().await;
        stale.close().await.unwrap();
        let fresh = test_connection().await;

        let mut idle = VecDeque::new();
        idle.push_back(stale);
        idle.push_back(fresh.clone());

        let picked = take_idle(&mut idle, false).unwrap();
        assert!(picked.ptr_eq(&fresh));
        // the stale one was dropped, not rotated back to the tail.
        assert_eq!(idle.len(), 1);
    }

    #[tokio::test]
    async fn exclusive_acquire_parks_until_release_when_pool_is_saturated() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut sock, _)) = listener.accept().await else { break };
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    loop {
                        match sock.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(_) => {}
                        }
                        if sock.write_all(b"+OK\r\n").await.is_err() {
                            return;
                        }
                    }
                });
            }
        });

        let cfg = Config::new(Endpoint::Tcp {
            host: addr.ip().to_string(),
            port: addr.port(),
        })
        .pool_size(0, 1);

        let pool = std::sync::Arc::new(Pool::connect(cfg).await.unwrap());
        assert_eq!(pool.size(), 0);

        let first = pool.acquire_exclusive().await.unwrap();
        assert_eq!(pool.size(), 1);

        // a second exclusive acquire must park: the pool is already at max=1 and the only
        // connection is on loan.
        let pool_for_task = pool.clone();
        let parked = tokio::spawn(async move { pool_for_task.acquire_exclusive().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!parked.is_finished());

        pool.release(first);
        let second = tokio::time::timeout(Duration::from_secs(1), parked)
            .await
            .expect("parked acquire should unblock after release")
            .unwrap()
            .unwrap();
        assert!(!second.is_closed());

        pool.close().await.unwrap();
    }

    #[tokio::test]
    async fn close_is_rejected_while_a_loaned_connection_has_an_open_scope() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let Ok((mut sock, _)) = listener.accept().await else { return };
            let mut buf = [0u8; 4096];
            let _ = sock.read(&mut buf).await;
        });

        let cfg = Config::new(Endpoint::Tcp {
            host: addr.ip().to_string(),
            port: addr.port(),
        })
        .pool_size(0, 1);

        let pool = Pool::connect(cfg).await.unwrap();
        let conn = pool.acquire_exclusive().await.unwrap();
        let _scope = conn.enter_pipeline(None).unwrap();

        let err = pool.close().await.unwrap_err();
        assert!(err.is_pipeline_error());
        assert!(!pool.closed.load(Ordering::Acquire));
    }
}
