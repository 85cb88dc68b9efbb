//! resolving a [`Config`]'s [`Endpoint`] to a live duplex stream.

use tokio::net::{TcpStream, UnixStream};
use tracing::info;

use crate::{config::Endpoint, error::Error, io::BoxedIo, Config};

pub(crate) async fn dial(cfg: &Config) -> Result<BoxedIo, Error> {
    match cfg.get_endpoint() {
        Endpoint::Tcp { host, port } => {
            info!(host, port, "dialing redis over tcp");
            let stream = TcpStream::connect((host.as_str(), *port)).await?;
            stream.set_nodelay(true)?;
            Ok(Box::new(stream))
        }
        Endpoint::Unix { path } => {
            info!(path, "dialing redis over unix socket");
            let stream = UnixStream::connect(path).await?;
            Ok(Box::new(stream))
        }
    }
}
