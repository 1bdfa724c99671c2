use crate::driver::RadioError;
use crate::protocol::Hubsan;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;

/// Runs a blocking loop that repeatedly calls `tick()` on a started [`Hubsan`] session.
///
/// This is a simple timing loop for use in environments where interrupts are unavailable
/// or undesired. Every wait returned by `tick()` is slept on `delay`, so the bind handshake
/// and the 10 ms flight-control cycle run at the cadence the protocol asks for.
///
/// # Arguments
/// - `hubsan`: A mutable reference to a session on which [`Hubsan::start`] has been called.
/// - `delay`: A delay provider implementing `DelayNs`, typically from the HAL.
///
/// # Returns
/// - The error that stopped the loop, e.g. [`Error::BindFailed`](crate::error::Error::BindFailed)
///   when the vehicle never answered.
///
/// # Example
/// ```rust,ignore
/// use a7105_hubsan::timer::run_hubsan_loop;
///
/// hubsan.start(&mut rng)?;
/// let err = run_hubsan_loop(&mut hubsan, &mut delay);
/// ```
///
/// # Notes
/// - This loop only returns on error; it is intended for single-purpose polling firmware.
/// - Flight controls are still read from the session's `SharedControls`, so they can be
///   updated from an interrupt while the loop runs.
pub fn run_hubsan_loop<SPI, RXEN, TXEN, D, DL>(
    hubsan: &mut Hubsan<'_, SPI, RXEN, TXEN, D>,
    delay: &mut DL,
) -> RadioError<SPI, RXEN>
where
    SPI: SpiDevice,
    RXEN: OutputPin,
    TXEN: OutputPin<Error = RXEN::Error>,
    D: DelayNs,
    DL: DelayNs,
{
    loop {
        match hubsan.tick() {
            Ok(wait_us) => delay.delay_us(wait_us),
            Err(e) => return e,
        }
    }
}
