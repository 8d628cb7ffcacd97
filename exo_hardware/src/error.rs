use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    /// A sensor frame arrived but did not parse as a reading. Transient:
    /// the control side skips the sample and keeps the session alive.
    #[error("malformed sensor frame: {0:?}")]
    FrameParse(String),
    /// No frame arrived within the read deadline. Also transient.
    #[error("sensor read timeout")]
    Timeout,
    /// The device link is gone. Fatal for the session.
    #[error("device disconnected: {0}")]
    Disconnected(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl HwError {
    /// Transient faults cost one sample; everything else ends the session.
    pub fn is_transient(&self) -> bool {
        matches!(self, HwError::FrameParse(_) | HwError::Timeout)
    }
}

pub type Result<T> = std::result::Result<T, HwError>;
