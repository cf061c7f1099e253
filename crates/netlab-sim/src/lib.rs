//! Host/switch network emulation over Linux network namespaces.
//!
//! Provides a validating topology builder, the assignment measurement
//! topology, `tc` link shaping, a namespace-backed network session and an
//! interactive shell to drive it.

pub mod assignment;
pub mod cli;
pub mod config;
pub mod error;
pub mod link;
pub mod net;
pub mod netns;
pub mod runner;
pub mod shaping;
pub mod topo;

#[cfg(any(test, feature = "test-util"))]
pub mod test_util;

pub use config::SessionOptions;
pub use error::{ConfigError, EmulationError, TopologyError};
pub use link::{Delay, LinkKind, LinkParams};
pub use net::Network;
pub use topo::{NodeKind, Topo};
