use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ArgsError {
    #[error("Error: missing or extra arguments")]
    Mode,
    #[error("Error: missing port number")]
    MissingPort,
    #[error("Error: port number must be in the range of [1024, 65535]")]
    PortRange,
    #[error("Error: missing host")]
    MissingHost,
    #[error("Error: missing time")]
    MissingTime,
    #[error("Error: time argument must be greater than 0")]
    TimeRange,
}
