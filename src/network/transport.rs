use std::{io, net::SocketAddr};

#[cfg(unix)]
use std::path::PathBuf;

#[cfg(unix)]
use tokio::net::{UnixListener, UnixStream};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{TcpListener, TcpStream},
};
use tracing::debug;

use super::Endpoint;

pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Установленное соединение, разделённое на половины чтения и записи.
pub struct TransportStream {
    pub reader: BoxedReader,
    pub writer: BoxedWriter,
    /// Описание удалённой стороны для логов.
    pub peer: String,
}

/// Слушающий сокет ретранслятора.
#[derive(Debug)]
pub enum TransportListener {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix { listener: UnixListener, path: PathBuf },
}

impl TransportListener {
    pub async fn bind(endpoint: &Endpoint) -> io::Result<Self> {
        match endpoint {
            Endpoint::Tcp { port, .. } => {
                let host = endpoint.bind_host().unwrap_or("0.0.0.0");
                let listener = TcpListener::bind((host, *port)).await?;
                debug!(endpoint = %endpoint, "Bound tcp listener");
                Ok(TransportListener::Tcp(listener))
            }
            #[cfg(unix)]
            Endpoint::Ipc(path) => {
                let listener = UnixListener::bind(path)?;
                debug!(endpoint = %endpoint, "Bound ipc listener");
                Ok(TransportListener::Unix {
                    listener,
                    path: path.clone(),
                })
            }
            #[cfg(not(unix))]
            Endpoint::Ipc(_) => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "ipc endpoints require a unix platform",
            )),
        }
    }

    /// Адрес, по которому к сокету могут подключиться клиенты.
    pub fn local_endpoint(&self) -> io::Result<Endpoint> {
        match self {
            TransportListener::Tcp(listener) => {
                let addr = listener.local_addr()?;
                let host = if addr.ip().is_unspecified() {
                    "127.0.0.1".to_string()
                } else {
                    addr.ip().to_string()
                };
                Ok(Endpoint::tcp(host, addr.port()))
            }
            #[cfg(unix)]
            TransportListener::Unix { path, .. } => Ok(Endpoint::ipc(path.clone())),
        }
    }

    pub async fn accept(&self) -> io::Result<TransportStream> {
        match self {
            TransportListener::Tcp(listener) => {
                let (stream, addr) = listener.accept().await?;
                Ok(split_tcp(stream, addr))
            }
            #[cfg(unix)]
            TransportListener::Unix { listener, path } => {
                let (stream, _) = listener.accept().await?;
                let (reader, writer) = stream.into_split();
                Ok(TransportStream {
                    reader: Box::new(reader),
                    writer: Box::new(writer),
                    peer: format!("ipc://{}", path.display()),
                })
            }
        }
    }
}

/// Подключается к сокету по адресу.
pub async fn connect(endpoint: &Endpoint) -> io::Result<TransportStream> {
    match endpoint {
        Endpoint::Tcp { port, .. } => {
            let host = endpoint.connect_host().unwrap_or("127.0.0.1");
            let stream = TcpStream::connect((host, *port)).await?;
            let addr = stream.peer_addr()?;
            Ok(split_tcp(stream, addr))
        }
        #[cfg(unix)]
        Endpoint::Ipc(path) => {
            let stream = UnixStream::connect(path).await?;
            let (reader, writer) = stream.into_split();
            Ok(TransportStream {
                reader: Box::new(reader),
                writer: Box::new(writer),
                peer: endpoint.to_string(),
            })
        }
        #[cfg(not(unix))]
        Endpoint::Ipc(_) => Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "ipc endpoints require a unix platform",
        )),
    }
}

fn split_tcp(
    stream: TcpStream,
    addr: SocketAddr,
) -> TransportStream {
    let _ = stream.set_nodelay(true);
    let (reader, writer) = stream.into_split();
    TransportStream {
        reader: Box::new(reader),
        writer: Box::new(writer),
        peer: addr.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::network::{read_message, write_message};

    #[tokio::test]
    async fn test_tcp_bind_accept_connect() {
        let listener = TransportListener::bind(&Endpoint::tcp("127.0.0.1", 0))
            .await
            .unwrap();
        let endpoint = listener.local_endpoint().unwrap();
        assert!(endpoint.port().unwrap() > 0);

        let client = tokio::spawn(async move {
            let mut stream = connect(&endpoint).await.unwrap();
            write_message(&mut stream.writer, &[Bytes::from_static(b"hi")])
                .await
                .unwrap();
        });

        let mut server = listener.accept().await.unwrap();
        let msg = read_message(&mut server.reader).await.unwrap().unwrap();
        assert_eq!(msg, vec![Bytes::from_static(b"hi")]);
        client.await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_ipc_bind_accept_connect() {
        let dir = tempfile::tempdir().unwrap();
        let endpoint = Endpoint::ipc(dir.path().join("data"));
        let listener = TransportListener::bind(&endpoint).await.unwrap();
        assert_eq!(listener.local_endpoint().unwrap(), endpoint);

        let target = endpoint.clone();
        let client = tokio::spawn(async move {
            let mut stream = connect(&target).await.unwrap();
            write_message(&mut stream.writer, &[Bytes::from_static(b"x")])
                .await
                .unwrap();
        });

        let mut server = listener.accept().await.unwrap();
        let msg = read_message(&mut server.reader).await.unwrap().unwrap();
        assert_eq!(msg, vec![Bytes::from_static(b"x")]);
        client.await.unwrap();
    }

    #[tokio::test]
    async fn test_bind_busy_port_fails() {
        let first = TransportListener::bind(&Endpoint::tcp("127.0.0.1", 0))
            .await
            .unwrap();
        let taken = first.local_endpoint().unwrap();
        assert!(TransportListener::bind(&taken).await.is_err());
    }
}
