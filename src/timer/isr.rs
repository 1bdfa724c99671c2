use crate::config::HubsanConfig;
use crate::controls::SharedControls;
use crate::driver::{A7105, RadioError};
use crate::protocol::{Hubsan, StartReport};
use core::cell::RefCell;
use critical_section::Mutex;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;
use rand_core::RngCore;

/// The global singleton type shared between `main` and the timer interrupt.
pub type GlobalHubsan<SPI, RXEN, TXEN, D> =
    Mutex<RefCell<Option<Hubsan<'static, SPI, RXEN, TXEN, D>>>>;

/// Used to initialize the global static [`Hubsan`] for use with
/// `critical_section`.
///
/// # Returns
/// * An empty mutable ref-cell
///
/// # Example
/// ```rust,ignore
/// use a7105_hubsan::timer::{GlobalHubsan, global_hubsan_init};
///
/// static HUBSAN: GlobalHubsan<Spi, Pin, Pin, Delay> = global_hubsan_init();
/// ```
pub const fn global_hubsan_init<SPI, RXEN, TXEN, D>() -> GlobalHubsan<SPI, RXEN, TXEN, D> {
    Mutex::new(RefCell::new(None))
}

/// Starts a session and stores it in the global singleton.
///
/// Bring-up, calibration and the channel scan run before the critical
/// section is entered, which only guards storing the session. Call this
/// from `main()` before enabling the timer interrupt.
///
/// # Arguments
/// * The global static set up with [`global_hubsan_init`]
/// * The transceiver
/// * The shared flight controls written by the command parser
/// * The protocol configuration
/// * A random source for the session ID
///
/// # Example
/// ```rust,ignore
/// fn main() {
///     let report = global_hubsan_setup(&HUBSAN, radio, &CONTROLS, HubsanConfig::default(), &mut rng)?;
/// }
/// ```
pub fn global_hubsan_setup<SPI, RXEN, TXEN, D, R>(
    global: &'static GlobalHubsan<SPI, RXEN, TXEN, D>,
    radio: A7105<SPI, RXEN, TXEN, D>,
    controls: &'static SharedControls,
    config: HubsanConfig,
    rng: &mut R,
) -> Result<StartReport, RadioError<SPI, RXEN>>
where
    SPI: SpiDevice,
    RXEN: OutputPin,
    TXEN: OutputPin<Error = RXEN::Error>,
    D: DelayNs,
    R: RngCore,
{
    let mut hubsan = Hubsan::new(radio, controls, config);
    let report = hubsan.start(rng)?;
    critical_section::with(|cs| {
        let _ = global.borrow(cs).replace(Some(hubsan));
    });
    Ok(report)
}

/// Runs the protocol at each interrupt
///
/// # Arguments
/// * The global static [`Hubsan`]
/// * The timer period in microseconds
///
/// # Returns
/// * `None` if the singleton has not been set up yet
/// * `Some(Ok(true))` when a protocol step ran on this interrupt
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn TIM2() {
///     if let Some(Err(e)) = global_hubsan_tick(&HUBSAN, 500) {
///         // bind failed or bus error
///     }
/// }
/// ```
pub fn global_hubsan_tick<SPI, RXEN, TXEN, D>(
    global: &'static GlobalHubsan<SPI, RXEN, TXEN, D>,
    period_us: u32,
) -> Option<Result<bool, RadioError<SPI, RXEN>>>
where
    SPI: SpiDevice,
    RXEN: OutputPin,
    TXEN: OutputPin<Error = RXEN::Error>,
    D: DelayNs,
{
    critical_section::with(|cs| {
        global
            .borrow(cs)
            .borrow_mut()
            .as_mut()
            .map(|hubsan| hubsan.advance(period_us))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::State;
    use crate::sim::{FixedRng, SimRadio};
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::Mock as PinMock;

    static HUBSAN: GlobalHubsan<SimRadio, PinMock, PinMock, NoopDelay> = global_hubsan_init();
    static CONTROLS: SharedControls = SharedControls::new();

    #[test]
    fn test_interrupt_driven_session_binds() {
        assert!(global_hubsan_tick(&HUBSAN, 500).is_none());

        let radio = A7105::new(SimRadio::new(), None, None, NoopDelay);
        let report =
            global_hubsan_setup(&HUBSAN, radio, &CONTROLS, HubsanConfig::default(), &mut FixedRng(3))
                .unwrap();
        assert!(report.calibration.is_clean());

        let mut steps = 0;
        for _ in 0..10_000 {
            if global_hubsan_tick(&HUBSAN, 500).unwrap().unwrap() {
                steps += 1;
            }
            let bound = critical_section::with(|cs| {
                HUBSAN
                    .borrow(cs)
                    .borrow()
                    .as_ref()
                    .is_some_and(|h| h.is_bound())
            });
            if bound {
                break;
            }
        }
        let state = critical_section::with(|cs| HUBSAN.borrow(cs).borrow().as_ref().map(|h| h.state()));
        assert_eq!(state, Some(State::Data1));
        assert!(steps > 13);
    }
}
