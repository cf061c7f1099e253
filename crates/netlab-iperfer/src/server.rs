use std::io;
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::protocol::{ACK, CHUNK_SIZE, RTT_PROBES};
use crate::report::{Report, Role};

/// Binds on all interfaces and measures a single client.
pub async fn run(port: u16) -> io::Result<Report> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "iPerfer server has started");
    serve(listener).await
}

/// Accepts one client on `listener` and measures it.
///
/// RTT samples are the gaps between sending an ack and receiving the next
/// probe, so `RTT_PROBES` probes yield `RTT_PROBES - 1` samples.
pub async fn serve(listener: TcpListener) -> io::Result<Report> {
    let (mut stream, peer) = listener.accept().await?;
    stream.set_nodelay(true)?;
    tracing::info!(%peer, "client is connected");

    let mut probe = [0u8; 1];
    let mut rtts = Vec::with_capacity(RTT_PROBES - 1);
    let mut last_ack: Option<Instant> = None;
    for _ in 0..RTT_PROBES {
        stream.read_exact(&mut probe).await?;
        if let Some(sent) = last_ack {
            rtts.push(sent.elapsed());
        }
        stream.write_all(&[ACK]).await?;
        last_ack = Some(Instant::now());
    }

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut bytes = 0u64;
    let start = Instant::now();
    loop {
        let n = read_chunk(&mut stream, &mut buf).await?;
        bytes += n as u64;
        if n < CHUNK_SIZE {
            // Peer closed, possibly mid-chunk.
            break;
        }
        stream.write_all(&[ACK]).await?;
    }
    let elapsed = start.elapsed();

    let report = Report {
        role: Role::Server,
        bytes,
        elapsed,
        rtts,
    };
    tracing::info!("{}", report);
    Ok(report)
}

/// Fills `buf` unless the peer closes first; returns the bytes read.
async fn read_chunk<S: AsyncRead + Unpin>(stream: &mut S, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = stream.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
