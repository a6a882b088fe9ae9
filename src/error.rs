//! DMA manager errors

use crate::route::{RouteKey, StreamId};
use core::fmt::{self, Debug, Display};

/// A hardware backend failure
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HardwareError {
    /// The stream did not stop within the allotted time
    Timeout,
    /// The configuration can't be expressed on this controller
    Unsupported,
}

impl Debug for HardwareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HardwareError::Timeout => f.write_str("Timeout"),
            HardwareError::Unsupported => f.write_str("Unsupported"),
        }
    }
}

impl Display for HardwareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HardwareError::Timeout => f.write_str("stream did not disable in time"),
            HardwareError::Unsupported => f.write_str("configuration not supported by controller"),
        }
    }
}

/// An error from binding or preparing a stream
///
/// Neither error is fatal. The caller must not start its transfer, and may
/// retry the bind.
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// No route for the requested peripheral and direction
    RouteNotFound(RouteKey),
    /// The stream's registers could not be initialized
    ///
    /// The stream's cached selector is invalid, so the next bind
    /// performs a full initialization.
    HardwareInit {
        stream: StreamId,
        cause: HardwareError,
    },
}

impl Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::RouteNotFound(key) => write!(f, "RouteNotFound({:?})", key),
            Error::HardwareInit { stream, cause } => {
                write!(f, "HardwareInit(stream {}, {:?})", stream.index(), cause)
            }
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::RouteNotFound(key) => write!(f, "no DMA route for {}", key),
            Error::HardwareInit { stream, cause } => {
                write!(f, "DMA stream {} init failed: {}", stream.index(), cause)
            }
        }
    }
}
