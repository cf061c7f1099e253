use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::TopologyError;

/// Upper bound accepted for link bandwidth, in Mbit/s.
pub const MAX_BW_MBIT: f64 = 1000.0;

/// Selects how links are realized when the network starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    /// Bare veth pairs; shaping parameters are ignored.
    Plain,
    /// veth pairs with htb rate limiting and netem delay on both ends.
    #[default]
    Shaped,
}

/// One-way propagation delay, as written in topology declarations (`"40ms"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Delay(Duration);

impl Delay {
    pub fn from_duration(d: Duration) -> Self {
        Self(d)
    }

    pub fn as_duration(self) -> Duration {
        self.0
    }
}

impl FromStr for Delay {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TopologyError::InvalidDelay(s.to_string());
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        let (value, unit) = trimmed.split_at(split);
        let value: f64 = value.parse().map_err(|_| invalid())?;
        let micros = match unit {
            "us" => value,
            "ms" => value * 1_000.0,
            "s" => value * 1_000_000.0,
            _ => return Err(invalid()),
        };
        if !micros.is_finite() || micros < 0.0 {
            return Err(invalid());
        }
        Ok(Self(Duration::from_micros(micros.round() as u64)))
    }
}

/// Formats in the unit `tc` expects, preferring whole milliseconds.
impl fmt::Display for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let micros = self.0.as_micros();
        if micros % 1000 == 0 {
            write!(f, "{}ms", micros / 1000)
        } else {
            write!(f, "{}us", micros)
        }
    }
}

/// Optional shaping parameters attached to a link.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LinkParams {
    /// Rate limit in Mbit/s.
    pub bw: Option<f64>,
    pub delay: Option<Delay>,
}

impl LinkParams {
    /// A link without shaping.
    pub fn plain() -> Self {
        Self::default()
    }

    /// A link limited to `bw` Mbit/s with the given one-way `delay`.
    pub fn shaped(bw: f64, delay: &str) -> Result<Self, TopologyError> {
        let params = Self {
            bw: Some(bw),
            delay: Some(delay.parse()?),
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), TopologyError> {
        if let Some(bw) = self.bw {
            if !(bw > 0.0 && bw <= MAX_BW_MBIT) {
                return Err(TopologyError::InvalidBandwidth(bw));
            }
        }
        Ok(())
    }

    pub fn is_shaped(&self) -> bool {
        self.bw.is_some() || self.delay.is_some()
    }
}

impl fmt::Display for LinkParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.bw, self.delay) {
            (None, None) => Ok(()),
            (Some(bw), None) => write!(f, "bw={}Mbit", bw),
            (None, Some(d)) => write!(f, "delay={}", d),
            (Some(bw), Some(d)) => write!(f, "bw={}Mbit delay={}", bw, d),
        }
    }
}
