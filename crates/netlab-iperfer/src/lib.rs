//! iPerfer: a minimal TCP measurement tool.
//!
//! A client first exchanges a handful of one-byte probes with the server to
//! sample round-trip time, then streams fixed-size chunks for a fixed
//! duration, waiting for a one-byte acknowledgement after each chunk. Both
//! sides report the volume moved, the achieved rate and the mean RTT.

pub mod client;
pub mod error;
pub mod mode;
pub mod protocol;
pub mod report;
pub mod server;

pub use error::ArgsError;
pub use mode::Mode;
pub use report::{Report, Role};
