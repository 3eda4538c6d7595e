//! Error types for the instrument control core.

/// Errors reported by hardware collaborators.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// An I/O error occurred talking to the device.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The device channel was used before being opened.
    #[error("{0} is not open")]
    NotOpen(&'static str),

    /// The input source has no more events to deliver.
    #[error("Input closed")]
    InputClosed,
}

/// Errors that terminate a menu tick or a test session.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A collaborator failed.
    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    /// Spawning a background thread failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A button code outside {Up, Down, Confirm} was read.
    #[error("Unknown button code: {0}")]
    UnknownButton(u8),

    /// The degree under test has no entry in the distance table.
    #[error("No distance for degree {degree} (table index {index})")]
    DistanceTableIndex {
        /// The degree that was looked up.
        degree: f64,
        /// The computed table index.
        index: i64,
    },

    /// A volume outside 0-100 was requested.
    #[error("Invalid volume {0}% (expected 0-100)")]
    InvalidVolume(u8),

    /// The operator aborted the running test.
    #[error("Test aborted")]
    Aborted,
}
