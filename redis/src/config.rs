//! connection/pool configuration: endpoint addressing, database index, decode encoding,
//! read chunk size, gather timeout, and the pluggable frame parser.

use std::{fmt, sync::Arc, time::Duration};

use percent_encoding::percent_decode_str;

use crate::{
    error::{ConfigError, Error},
    protocol::{Parser, RespParser},
    value::Encoding,
};

/// where to dial to reach the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp { host: String, port: u16 },
    Unix { path: String },
}

/// builds a fresh [`Parser`] instance. a factory, not a single boxed instance, because a pool
/// constructs more than one connection and each needs its own parser accumulation state.
type ParserFactory = Arc<dyn Fn() -> Box<dyn Parser> + Send + Sync>;

/// connection/pool configuration, built incrementally and validated at construction time.
///
/// # Examples
/// ```
/// use xitca_redis::Config;
///
/// let cfg = Config::try_from("redis://127.0.0.1:6379").unwrap();
/// assert_eq!(cfg.get_db(), 0);
/// ```
#[derive(Clone)]
pub struct Config {
    endpoint: Endpoint,
    db: i64,
    encoding: Encoding,
    max_chunk_size: usize,
    min_size: usize,
    max_size: usize,
    timeout: Duration,
    parser: Option<ParserFactory>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("endpoint", &self.endpoint)
            .field("db", &self.db)
            .field("encoding", &self.encoding)
            .field("max_chunk_size", &self.max_chunk_size)
            .field("min_size", &self.min_size)
            .field("max_size", &self.max_size)
            .field("timeout", &self.timeout)
            .field("parser", &self.parser.as_ref().map(|_| "<custom>").unwrap_or("<default RespParser>"))
            .finish()
    }
}

impl Config {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            db: 0,
            encoding: Encoding::Utf8,
            max_chunk_size: 65535,
            min_size: 1,
            max_size: 1,
            timeout: Duration::from_secs(10),
            parser: None,
        }
    }

    pub fn db(mut self, db: i64) -> Self {
        self.db = db;
        self
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn max_chunk_size(mut self, size: usize) -> Self {
        self.max_chunk_size = size;
        self
    }

    pub fn pool_size(mut self, min: usize, max: usize) -> Self {
        self.min_size = min;
        self.max_size = max;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// inject a custom RESP [`Parser`] factory; defaults to the crate's own dependency-free
    /// [`RespParser`] when never called.
    pub fn parser<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Parser> + Send + Sync + 'static,
    {
        self.parser = Some(Arc::new(factory));
        self
    }

    /// build the parser instance a new connection's driver should use: the configured factory,
    /// or a fresh [`RespParser`] if none was set.
    pub(crate) fn build_parser(&self) -> Box<dyn Parser> {
        match &self.parser {
            Some(factory) => factory(),
            None => Box::new(RespParser::new()),
        }
    }

    pub fn get_endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn get_db(&self) -> i64 {
        self.db
    }

    pub fn get_encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn get_max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    pub fn get_pool_size(&self) -> (usize, usize) {
        (self.min_size, self.max_size)
    }

    pub fn get_timeout(&self) -> Duration {
        self.timeout
    }

    /// validate the enumerated constraints, surfacing as [`Error`] rather than panicking.
    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.db < 0 {
            return Err(ConfigError("db must be >= 0").into());
        }
        if self.max_chunk_size == 0 {
            return Err(ConfigError("max_chunk_size must be > 0").into());
        }
        if self.min_size > self.max_size {
            return Err(ConfigError("min_size must be <= max_size").into());
        }
        if self.max_size == 0 {
            return Err(ConfigError("max_size must be >= 1").into());
        }
        Ok(())
    }
}

impl TryFrom<&str> for Config {
    type Error = Error;

    fn try_from(uri: &str) -> Result<Self, Self::Error> {
        if let Some(rest) = uri.strip_prefix("unix://") {
            let path = percent_decode_str(rest)
                .decode_utf8()
                .map_err(|_| ConfigError("unix socket path is not valid utf-8 once percent-decoded"))?
                .into_owned();
            if path.is_empty() {
                return Err(ConfigError("unix:// uri is missing a path").into());
            }
            return Ok(Config::new(Endpoint::Unix { path }));
        }

        if let Some(rest) = uri.strip_prefix("rediss://") {
            let _ = rest;
            return Err(ConfigError("rediss:// (TLS) is not supported by this core").into());
        }

        let rest = uri
            .strip_prefix("redis://")
            .ok_or(ConfigError("uri must start with redis://, rediss://, or unix://"))?;

        let (host, port) = rest
            .rsplit_once(':')
            .ok_or(ConfigError("redis:// uri must be host:port"))?;
        if host.is_empty() {
            return Err(ConfigError("redis:// uri is missing a host").into());
        }
        let port: u16 = port
            .parse()
            .map_err(|_| ConfigError("redis:// uri has a non-numeric port"))?;

        Ok(Config::new(Endpoint::Tcp {
            host: host.to_owned(),
            port,
        }))
    }
}

impl TryFrom<String> for Config {
    type Error = Error;

    fn try_from(uri: String) -> Result<Self, Self::Error> {
        Self::try_from(uri.as_str())
    }
}

impl TryFrom<(&str, u16)> for Config {
    type Error = Error;

    fn try_from((host, port): (&str, u16)) -> Result<Self, Self::Error> {
        Ok(Config::new(Endpoint::Tcp {
            host: host.to_owned(),
            port,
        }))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_tcp_uri() {
        let cfg = Config::try_from("redis://127.0.0.1:6379").unwrap();
        assert_eq!(
            cfg.get_endpoint(),
            &Endpoint::Tcp {
                host: "127.0.0.1".into(),
                port: 6379
            }
        );
    }

    #[test]
    fn parses_unix_uri() {
        let cfg = Config::try_from("unix://%2Ftmp%2Fredis.sock").unwrap();
        assert_eq!(
            cfg.get_endpoint(),
            &Endpoint::Unix {
                path: "/tmp/redis.sock".into()
            }
        );
    }

    #[test]
    fn rejects_tls_uri() {
        assert!(Config::try_from("rediss://127.0.0.1:6379").is_err());
    }

    #[test]
    fn rejects_malformed_uri() {
        assert!(Config::try_from("http://127.0.0.1:6379").is_err());
    }

    #[test]
    fn validates_pool_bounds() {
        let cfg = Config::new(Endpoint::Tcp {
            host: "localhost".into(),
            port: 6379,
        })
        .pool_size(4, 2);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validates_max_chunk_size() {
        let cfg = Config::new(Endpoint::Tcp {
            host: "localhost".into(),
            port: 6379,
        })
        .max_chunk_size(0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn build_parser_defaults_to_resp_parser() {
        let cfg = Config::new(Endpoint::Tcp {
            host: "localhost".into(),
            port: 6379,
        });
        let mut parser = cfg.build_parser();
        parser.feed(b"+OK\r\n");
        assert_eq!(parser.gets().unwrap(), Some(crate::protocol::Reply::SimpleString("OK".into())));
    }

    /// a trivial wrapper proving an injected factory is actually invoked and that each call
    /// produces an independent instance (as a pool's per-connection drivers require).
    struct CountingParser {
        inner: RespParser,
        feeds: Arc<std::sync::atomic::AtomicUsize>,
    }

    impl Parser for CountingParser {
        fn feed(&mut self, bytes: &[u8]) {
            self.feeds.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            self.inner.feed(bytes);
        }

        fn gets(&mut self) -> Result<Option<crate::protocol::Reply>, Error> {
            self.inner.gets()
        }
    }

    #[test]
    fn custom_parser_factory_is_invoked_per_build() {
        let feeds = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let feeds_for_factory = feeds.clone();
        let cfg = Config::new(Endpoint::Tcp {
            host: "localhost".into(),
            port: 6379,
        })
        .parser(move || {
            Box::new(CountingParser {
                inner: RespParser::new(),
                feeds: feeds_for_factory.clone(),
            }) as Box<dyn Parser>
        });

        let mut first = cfg.build_parser();
        let mut second = cfg.build_parser();
        first.feed(b"+OK\r\n");
        second.feed(b":1\r\n");

        assert_eq!(feeds.load(std::sync::atomic::Ordering::Relaxed), 2);
        assert_eq!(first.gets().unwrap(), Some(crate::protocol::Reply::SimpleString("OK".into())));
        assert_eq!(second.gets().unwrap(), Some(crate::protocol::Reply::Integer(1)));
    }
}
