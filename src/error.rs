//! Error type shared by the transceiver driver and the Hubsan protocol.
//!
//! Only conditions the caller has to act on are errors. Calibration
//! failures and transmit-completion timeouts are logged and counted instead,
//! see [`CalibrationReport`](crate::calibration::CalibrationReport) and
//! [`LinkStats`](crate::protocol::LinkStats).

use thiserror::Error;

/// Errors surfaced by [`A7105`](crate::driver::A7105) and [`Hubsan`](crate::protocol::Hubsan).
///
/// ## Type Parameters
///
/// - `SpiE`: the error type of the [`SpiDevice`](embedded_hal::spi::SpiDevice)
/// - `PinE`: the error type of the RXEN/TXEN [`OutputPin`](embedded_hal::digital::OutputPin)s
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Error<SpiE, PinE> {
    /// The SPI transaction failed.
    #[error("SPI bus error: {0:?}")]
    Spi(SpiE),
    /// Driving the antenna switch failed.
    #[error("TX/RX enable pin error: {0:?}")]
    Pin(PinE),
    /// The vehicle never completed the handshake within the retry budget.
    #[error("bind failed after {restarts} handshake restarts")]
    BindFailed {
        /// Full handshake restarts performed before giving up.
        restarts: u8,
    },
    /// The protocol was driven before [`Hubsan::start`](crate::protocol::Hubsan::start).
    #[error("session not started")]
    NotStarted,
    /// A packet buffer did not have the 16 byte Hubsan length.
    #[error("invalid packet length {len}")]
    InvalidPacket {
        /// Length of the rejected buffer.
        len: usize,
    },
}
