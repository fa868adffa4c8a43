use anyhow::{Context, Result, anyhow};
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::{Duration, timeout};

/// A peer that speaks the line protocol by hand, for poking at framing edge cases.
pub struct RawPeer {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl RawPeer {
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("Failed to connect raw peer to {}", addr))?;
        Ok(Self::from_stream(stream))
    }

    pub fn from_stream(stream: TcpStream) -> Self {
        stream.set_nodelay(true).ok();
        let (read_half, write_half) = stream.into_split();
        RawPeer {
            reader: BufReader::new(read_half),
            writer: write_half,
        }
    }

    pub async fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Writes `bytes` in `chunk`-sized pieces with a pause between them so the
    /// receiver sees several partial reads.
    pub async fn write_chunked(&mut self, bytes: &[u8], chunk: usize) -> Result<()> {
        for piece in bytes.chunks(chunk) {
            self.write_raw(piece).await?;
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        Ok(())
    }

    pub async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = timeout(Duration::from_secs(5), self.reader.read_line(&mut line))
            .await
            .map_err(|_| anyhow!("Timeout waiting for a line"))??;
        if read == 0 {
            return Err(anyhow!("Connection closed"));
        }
        Ok(line)
    }

    /// True if nothing arrives within `wait`.
    pub async fn is_silent_for(&mut self, wait: Duration) -> bool {
        let mut line = String::new();
        match timeout(wait, self.reader.read_line(&mut line)).await {
            Err(_) => true,
            Ok(Ok(0)) => true,
            Ok(_) => false,
        }
    }

    pub async fn shutdown(mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}
