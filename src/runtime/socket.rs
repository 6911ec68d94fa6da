/// Raw admin-socket transport
///
/// Short-lived connection per command: connect, write the newline-
/// terminated command, drain the response until the peer closes or a read
/// timeout elapses, close. A completed write/drain cycle counts as success
/// regardless of the response text — the runtime protocol reports most
/// errors as prose and callers wanting the text use [`SocketTransport::command_lines`].
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;
use tokio::time::timeout;

use crate::runtime::Transport;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Normalized endpoint forms accepted for the admin socket.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Endpoint {
    Tcp(String),
    Unix(PathBuf),
}

pub struct SocketTransport {
    endpoint: String,
}

impl SocketTransport {
    pub fn new<S: Into<String>>(endpoint: S) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    /// `tcp://` and `unix://` prefixes pass through; a bare path is taken
    /// as a unix socket only when it exists on disk.
    fn normalize(&self) -> Option<Endpoint> {
        let target = self.endpoint.trim();
        if target.is_empty() {
            return None;
        }
        if let Some(addr) = target.strip_prefix("tcp://") {
            return Some(Endpoint::Tcp(addr.to_string()));
        }
        if let Some(path) = target.strip_prefix("unix://") {
            return Some(Endpoint::Unix(PathBuf::from(path)));
        }
        let path = PathBuf::from(target);
        if path.exists() {
            Some(Endpoint::Unix(path))
        } else {
            None
        }
    }

    async fn exchange(&self, command: &str) -> Option<String> {
        match self.normalize()? {
            Endpoint::Tcp(addr) => {
                let stream = timeout(CONNECT_TIMEOUT, TcpStream::connect(&addr))
                    .await
                    .ok()?
                    .ok()?;
                drive(stream, command).await
            }
            #[cfg(unix)]
            Endpoint::Unix(path) => {
                let stream = timeout(CONNECT_TIMEOUT, UnixStream::connect(&path))
                    .await
                    .ok()?
                    .ok()?;
                drive(stream, command).await
            }
            #[cfg(not(unix))]
            Endpoint::Unix(_) => None,
        }
    }

    /// Run a query command and capture its response lines. Returns `None`
    /// on connection failure or an entirely empty response.
    pub async fn command_lines(&self, command: &str) -> Option<Vec<String>> {
        let response = self.exchange(command).await?;
        let lines: Vec<String> = response
            .lines()
            .map(|line| line.trim_end_matches('\r').to_string())
            .collect();

        if lines.is_empty() {
            None
        } else {
            Some(lines)
        }
    }
}

/// Write the command and drain the response until EOF or read timeout.
async fn drive<S>(mut stream: S, command: &str) -> Option<String>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream
        .write_all(format!("{command}\n").as_bytes())
        .await
        .ok()?;
    stream.flush().await.ok()?;

    let mut response = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match timeout(READ_TIMEOUT, stream.read(&mut buf)).await {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => response.extend_from_slice(&buf[..n]),
            // read error or timeout: keep whatever was drained
            Ok(Err(_)) | Err(_) => break,
        }
    }

    Some(String::from_utf8_lossy(&response).into_owned())
}

#[async_trait]
impl Transport for SocketTransport {
    fn name(&self) -> &'static str {
        "socket"
    }

    async fn dispatch(&self, command: &str) -> bool {
        self.exchange(command).await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    async fn spawn_stub_runtime(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut reader = BufReader::new(stream);
            let mut command = String::new();
            reader.read_line(&mut command).await.unwrap();

            let mut stream = reader.into_inner();
            stream.write_all(response.as_bytes()).await.unwrap();
            // connection closes on drop, signalling EOF to the client
        });

        format!("tcp://{addr}")
    }

    #[test]
    fn test_endpoint_normalization() {
        let transport = SocketTransport::new("tcp://haproxy-web:9999");
        assert_eq!(
            transport.normalize(),
            Some(Endpoint::Tcp("haproxy-web:9999".to_string()))
        );

        let transport = SocketTransport::new("unix:///var/run/haproxy/admin.sock");
        assert_eq!(
            transport.normalize(),
            Some(Endpoint::Unix(PathBuf::from("/var/run/haproxy/admin.sock")))
        );

        // bare path that does not exist
        let transport = SocketTransport::new("/nonexistent/admin.sock");
        assert_eq!(transport.normalize(), None);

        let transport = SocketTransport::new("");
        assert_eq!(transport.normalize(), None);
    }

    #[tokio::test]
    async fn test_dispatch_success_against_stub() {
        let endpoint = spawn_stub_runtime("\n").await;
        let transport = SocketTransport::new(endpoint);
        assert!(transport.dispatch("disable server web_back/web1").await);
    }

    #[tokio::test]
    async fn test_dispatch_connection_refused() {
        // port 1 is essentially never listening
        let transport = SocketTransport::new("tcp://127.0.0.1:1");
        assert!(!transport.dispatch("show stat").await);
    }

    #[tokio::test]
    async fn test_command_lines_captures_response() {
        let endpoint = spawn_stub_runtime("# pxname,svname,\nweb_back,web1,\n").await;
        let transport = SocketTransport::new(endpoint);

        let lines = transport.command_lines("show stat").await.unwrap();
        assert_eq!(lines, vec!["# pxname,svname,", "web_back,web1,"]);
    }
}
