/// One-byte probes exchanged before the throughput phase.
pub const RTT_PROBES: usize = 8;

/// Payload chunk size during the throughput phase.
pub const CHUNK_SIZE: usize = 80_000;

pub const PROBE: u8 = b'P';
pub const ACK: u8 = b'A';

pub const MIN_PORT: i64 = 1024;
pub const MAX_PORT: i64 = 65535;
