//! an async RESP (redis-compatible wire protocol) client core.
//!
//! this crate owns the non-trivial engineering of talking to a RESP server: byte framing,
//! request/response correlation, pipeline buffering, and `WATCH`/`MULTI`/`EXEC` transaction
//! coordination, over either a single connection or a pool of connections. it deliberately
//! does not implement individual commands (`HSET`, `ZADD`, ...) or response-shaping helpers
//! (decode-to-map, decode-to-set) -- those are thin, mechanical layers meant to be built on
//! top of [`Connection::execute`]/[`Pool::execute`]/[`Redis::execute`].

mod config;
mod connection;
mod decode;
mod dial;
mod driver;
mod error;
mod io;
mod pipeline;
mod pool;
mod protocol;
mod resolver;
mod transaction;
mod value;

pub use config::{Config, Endpoint};
pub use connection::{Connection, ExecuteFuture, ExecuteOptions};
pub use error::{
    AbortTransaction, ConfigError, ConnectionClosed, ConnectionClosing, EncodingUnsupported, Error, GatherTimeout,
    PipelineError, PoolClosed, PoolClosing, ProtocolError, ResponseError, TransactionError, WatchError,
};
pub use pipeline::{PipelineFuture, PipelineScope};
pub use pool::Pool;
pub use protocol::{encode::Arg, Parser, Reply, RespParser};
pub use resolver::{ErrorFunc, Transform};
pub use transaction::TransactionScope;
pub use value::{Encoding, Value};

use std::future::Future;

/// dispatches to either a single [`Connection`] or a [`Pool`], so external collaborators
/// (command-builder functions, response-shaping helpers) can be written once against whichever
/// a caller chose to construct.
pub enum Redis {
    Single(Connection),
    Pool(Pool),
}

impl Redis {
    /// dial a single connection.
    pub async fn connect(cfg: Config) -> Result<Self, Error> {
        Ok(Self::Single(Connection::connect(&cfg).await?))
    }

    /// build a pool, populated up to `cfg`'s `min_size` synchronously.
    pub async fn connect_pool(cfg: Config) -> Result<Self, Error> {
        Ok(Self::Pool(Pool::connect(cfg).await?))
    }

    pub async fn execute<I>(&self, verb: &str, args: I, options: ExecuteOptions) -> Result<Value, Error>
    where
        I: IntoIterator<Item = Arg>,
        I::IntoIter: ExactSizeIterator,
    {
        match self {
            Self::Single(conn) => conn.execute(verb, args, options)?.await,
            Self::Pool(pool) => pool.execute(verb, args, options).await,
        }
    }

    pub async fn pipeline_scope<F, Fut>(&self, body: F) -> Result<(), Error>
    where
        F: FnOnce(&mut PipelineScope) -> Fut,
        Fut: Future<Output = Result<(), Error>>,
    {
        match self {
            Self::Single(conn) => conn.pipeline_scope(body).await,
            Self::Pool(pool) => pool.pipeline_scope(body).await,
        }
    }

    pub async fn transaction_scope<F, Fut, K>(&self, watch_keys: K, body: F) -> Result<(), Error>
    where
        F: FnOnce(TransactionScope) -> Fut,
        Fut: Future<Output = Result<(), Error>>,
        K: IntoIterator,
        K::Item: Into<Box<[u8]>>,
    {
        match self {
            Self::Single(conn) => conn.transaction_scope(watch_keys, body).await,
            Self::Pool(pool) => pool.transaction_scope(watch_keys, body).await,
        }
    }

    pub async fn close(&self) -> Result<(), Error> {
        match self {
            Self::Single(conn) => conn.close().await,
            Self::Pool(pool) => pool.close().await,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tokio::{
        io::{duplex, AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    /// a minimal fake RESP server: reads whatever's written to it and replies with canned
    /// bytes from a fixed script, one reply per accepted write. good enough to drive the
    /// connection/pool state machine end to end without a real server process.
    async fn fake_server(mut io: tokio::io::DuplexStream, script: Vec<&'static [u8]>) {
        let mut buf = [0u8; 4096];
        for reply in script {
            let n = io.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            io.write_all(reply).await.unwrap();
        }
    }

    fn spawn_duplex(script: Vec<&'static [u8]>) -> tokio::io::DuplexStream {
        let (client, server) = duplex(65536);
        tokio::spawn(fake_server(server, script));
        client
    }

    #[tokio::test]
    async fn facade_dispatches_to_single_connection() {
        let io = spawn_duplex(vec![b"+OK\r\n"]);
        let (driver, state) = driver::spawn(Box::new(io), 65535, Encoding::Utf8, Box::new(RespParser::new()));
        let conn = Connection::from_parts(driver, state, Encoding::Utf8, std::time::Duration::from_secs(5));
        let redis = Redis::Single(conn);

        let v = redis.execute("SET", [Arg::from("k"), Arg::from("v")], ExecuteOptions::new()).await.unwrap();
        assert_eq!(v, Value::Bool(true));
    }

    // a real pool test needs a real dialer target; exercised against a loopback TCP listener
    // so `Pool::connect`'s min-size prepopulation runs through the same `dial`/`driver::spawn`
    // path production code uses.
    #[tokio::test]
    async fn pool_prepopulates_to_min_and_reports_size() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut sock, _)) = listener.accept().await else { break };
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    loop {
                        let n = match sock.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => n,
                        };
                        let _ = &buf[..n];
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
        .pool_size(2, 4);

        let pool = Pool::connect(cfg).await.unwrap();
        assert_eq!(pool.size(), 2);

        let v = pool.execute("PING", [], ExecuteOptions::new()).await.unwrap();
        assert_eq!(v, Value::Bool(true));

        pool.close().await.unwrap();
        assert_eq!(pool.size(), 0);
    }
}
