use std::fmt;
use std::time::Duration;

/// Which side of the measurement produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Server,
    Client,
}

/// Totals from one measurement run.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub role: Role,
    /// Payload bytes moved during the throughput phase.
    pub bytes: u64,
    /// Length of the throughput phase.
    pub elapsed: Duration,
    pub rtts: Vec<Duration>,
}

impl Report {
    /// Decimal kilobytes, truncated.
    pub fn kilobytes(&self) -> u64 {
        self.bytes / 1000
    }

    pub fn rate_mbps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        (self.bytes as f64 * 8.0) / (secs * 1_000_000.0)
    }

    /// Mean RTT in whole milliseconds, truncated.
    pub fn avg_rtt_ms(&self) -> u64 {
        if self.rtts.is_empty() {
            return 0;
        }
        let total: f64 = self.rtts.iter().map(|d| d.as_secs_f64() * 1000.0).sum();
        (total / self.rtts.len() as f64) as u64
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.role {
            Role::Server => "Received",
            Role::Client => "Sent",
        };
        write!(
            f,
            "{}={} KB, Rate={:.3} Mbps, RTT={}ms",
            verb,
            self.kilobytes(),
            self.rate_mbps(),
            self.avg_rtt_ms()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_arithmetic() {
        let report = Report {
            role: Role::Server,
            bytes: 2_500_999,
            elapsed: Duration::from_secs(2),
            rtts: vec![
                Duration::from_millis(10),
                Duration::from_millis(20),
                Duration::from_millis(31),
            ],
        };
        assert_eq!(report.kilobytes(), 2500);
        assert_eq!(report.avg_rtt_ms(), 20);
        assert_eq!(
            report.to_string(),
            "Received=2500 KB, Rate=10.004 Mbps, RTT=20ms"
        );
    }

    #[test]
    fn empty_run_reports_zeroes() {
        let report = Report {
            role: Role::Client,
            bytes: 0,
            elapsed: Duration::ZERO,
            rtts: Vec::new(),
        };
        assert_eq!(report.to_string(), "Sent=0 KB, Rate=0.000 Mbps, RTT=0ms");
    }
}
