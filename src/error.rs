use regiface::errors::Error as RegifaceError;

/// Errors reported by the radio driver.
///
/// A CRC failure or an empty poll is not an error: both are reported as
/// `Ok(None)` by [`Sx1276::poll_received_packet`](crate::Sx1276::poll_received_packet).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// SPI communication failed
    Bus,
    /// A register value read from the device could not be decoded
    Deserialization,
    /// Driving the reset line failed
    Pin,
    /// The version register did not identify an SX1276
    ///
    /// Usually a wiring or power problem. The driver instance must not be used
    /// until [`Sx1276::init`](crate::Sx1276::init) succeeds.
    DeviceNotFound {
        /// Value read from the version register
        version: u8,
    },
    /// The radio never raised TxDone within the configured timeout
    ///
    /// The radio has been returned to standby and the send may be retried.
    TransmitTimeout,
    /// A packet was received but did not fit in the caller's buffer
    ///
    /// The first `copied` bytes are valid. The remaining bytes were drained
    /// from the FIFO and discarded.
    Truncated {
        /// Length of the packet on air
        packet_len: usize,
        /// Number of bytes written into the caller's buffer
        copied: usize,
    },
    /// The payload exceeds the 255 byte FIFO packet limit
    PayloadTooLarge {
        /// Length of the rejected payload
        len: usize,
    },
    /// The configuration cannot be programmed into the radio
    InvalidConfiguration,
}

impl From<RegifaceError> for Error {
    fn from(err: RegifaceError) -> Self {
        match err {
            RegifaceError::BusError => Self::Bus,
            _ => Self::Deserialization,
        }
    }
}
