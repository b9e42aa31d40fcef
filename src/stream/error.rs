use thiserror::Error;

use crate::bus::BusError;
use crate::frame::FrameError;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("{task} task failed: {reason}")]
    TaskFailed { task: &'static str, reason: String },

    #[error("Invalid target rate: {0} Hz")]
    InvalidRate(f64),
}

impl StreamError {
    /// Errors detected before the producer and consumer loops start
    pub fn is_configuration(&self) -> bool {
        match self {
            StreamError::Config(_) | StreamError::InvalidRate(_) => true,
            StreamError::Bus(e) => e.is_configuration(),
            StreamError::Frame(e) => e.is_configuration(),
            StreamError::TaskFailed { .. } => false,
        }
    }
}

pub type StreamResult<T> = Result<T, StreamError>;
