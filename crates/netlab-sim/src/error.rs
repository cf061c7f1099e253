use thiserror::Error;

// ── Topology ────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq)]
pub enum TopologyError {
    #[error("node `{0}` is already declared")]
    DuplicateNode(String),
    #[error("invalid node name `{0}`: expected 1-10 ASCII alphanumerics")]
    InvalidName(String),
    #[error("link endpoint `{0}` is not a declared node")]
    UnknownNode(String),
    #[error("link from `{0}` to itself")]
    SelfLoop(String),
    #[error("bandwidth {0} Mbit/s is outside the supported range (0, 1000]")]
    InvalidBandwidth(f64),
    #[error("invalid delay `{0}`: expected <number><us|ms|s>")]
    InvalidDelay(String),
    #[error("interface name `{0}` exceeds the 15 character interface limit")]
    InterfaceName(String),
}

// ── Emulation ───────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum EmulationError {
    #[error("`{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unknown node `{0}`")]
    UnknownNode(String),
    #[error("`{0}` is not a host")]
    NotAHost(String),
    #[error("network is not running")]
    NotRunning,
}

// ── Config ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid topology TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Topology(#[from] TopologyError),
}
