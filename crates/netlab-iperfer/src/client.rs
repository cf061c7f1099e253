use std::io;
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::protocol::{ACK, CHUNK_SIZE, PROBE, RTT_PROBES};
use crate::report::{Report, Role};

/// Connects to a server, samples RTT, then streams chunks for `duration`.
pub async fn run<A: ToSocketAddrs>(addr: A, duration: Duration) -> io::Result<Report> {
    let mut stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;
    tracing::info!(peer = %stream.peer_addr()?, "connected to server");

    let mut ack = [0u8; 1];
    let mut rtts = Vec::with_capacity(RTT_PROBES);
    for _ in 0..RTT_PROBES {
        let sent = Instant::now();
        stream.write_all(&[PROBE]).await?;
        stream.read_exact(&mut ack).await?;
        expect_ack(ack[0])?;
        rtts.push(sent.elapsed());
    }

    let chunk = vec![0u8; CHUNK_SIZE];
    let mut bytes = 0u64;
    let start = Instant::now();
    while start.elapsed() < duration {
        stream.write_all(&chunk).await?;
        stream.read_exact(&mut ack).await?;
        expect_ack(ack[0])?;
        bytes += CHUNK_SIZE as u64;
    }
    let elapsed = start.elapsed();
    stream.shutdown().await?;

    let report = Report {
        role: Role::Client,
        bytes,
        elapsed,
        rtts,
    };
    tracing::info!("{}", report);
    Ok(report)
}

fn expect_ack(byte: u8) -> io::Result<()> {
    if byte != ACK {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("expected ack byte, got {:#04x}", byte),
        ));
    }
    Ok(())
}
