use std::time::Duration;

use crate::error::ArgsError;
use crate::protocol::{MAX_PORT, MIN_PORT};

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Server { port: u16 },
    Client { host: String, port: u16, time: Duration },
}

impl Mode {
    /// Validates raw command-line values into a run mode.
    pub fn from_args(
        server: bool,
        client: bool,
        host: Option<String>,
        port: Option<i64>,
        time: Option<f64>,
    ) -> Result<Self, ArgsError> {
        if server == client {
            return Err(ArgsError::Mode);
        }
        let port = port.ok_or(ArgsError::MissingPort)?;
        if !(MIN_PORT..=MAX_PORT).contains(&port) {
            return Err(ArgsError::PortRange);
        }
        let port = port as u16;

        if server {
            return Ok(Mode::Server { port });
        }

        let host = host
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .ok_or(ArgsError::MissingHost)?;
        let time = time.ok_or(ArgsError::MissingTime)?;
        if time <= 0.0 {
            return Err(ArgsError::TimeRange);
        }
        // Rejects NaN, infinity and values past Duration::MAX.
        let time = Duration::try_from_secs_f64(time).map_err(|_| ArgsError::TimeRange)?;
        Ok(Mode::Client { host, port, time })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_needs_only_a_port() {
        assert_eq!(
            Mode::from_args(true, false, None, Some(5001), None),
            Ok(Mode::Server { port: 5001 })
        );
    }

    #[test]
    fn client_needs_host_port_and_time() {
        assert_eq!(
            Mode::from_args(false, true, Some("10.0.0.1".into()), Some(5001), Some(10.0)),
            Ok(Mode::Client {
                host: "10.0.0.1".into(),
                port: 5001,
                time: Duration::from_secs(10),
            })
        );
        assert_eq!(
            Mode::from_args(false, true, None, Some(5001), Some(10.0)),
            Err(ArgsError::MissingHost)
        );
        assert_eq!(
            Mode::from_args(false, true, Some("h".into()), Some(5001), None),
            Err(ArgsError::MissingTime)
        );
        assert_eq!(
            Mode::from_args(false, true, Some("h".into()), Some(5001), Some(0.0)),
            Err(ArgsError::TimeRange)
        );
    }

    #[test]
    fn unrepresentable_times_are_range_errors() {
        for bad in [1e30, f64::INFINITY, f64::NAN, -5.0] {
            assert_eq!(
                Mode::from_args(false, true, Some("h".into()), Some(5001), Some(bad)),
                Err(ArgsError::TimeRange),
                "time {bad}"
            );
        }
        assert!(Mode::from_args(false, true, Some("h".into()), Some(5001), Some(0.5)).is_ok());
    }

    #[test]
    fn port_is_validated_before_role_specifics() {
        assert_eq!(
            Mode::from_args(true, false, None, None, None),
            Err(ArgsError::MissingPort)
        );
        for bad in [0, 80, 1023, 65536] {
            assert_eq!(
                Mode::from_args(true, false, None, Some(bad), None),
                Err(ArgsError::PortRange),
                "port {bad}"
            );
        }
        assert!(Mode::from_args(true, false, None, Some(1024), None).is_ok());
        assert!(Mode::from_args(true, false, None, Some(65535), None).is_ok());
    }

    #[test]
    fn exactly_one_role() {
        assert_eq!(
            Mode::from_args(true, true, None, Some(5001), None),
            Err(ArgsError::Mode)
        );
        assert_eq!(
            Mode::from_args(false, false, None, Some(5001), None),
            Err(ArgsError::Mode)
        );
    }
}
