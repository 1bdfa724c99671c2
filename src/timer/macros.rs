/// Declares a static global `HUBSAN` session protected by a `critical_section` mutex.
///
/// This macro creates a `static` singleton `HUBSAN` suitable for use in
/// interrupt-based environments, where both the main thread and an ISR need
/// to safely access the session.
///
/// # Arguments
/// - `$spi`: The concrete SPI device type (must implement `SpiDevice`)
/// - `$rxen`: The concrete RXEN pin type (must implement `OutputPin`)
/// - `$txen`: The concrete TXEN pin type (must implement `OutputPin`)
/// - `$delay`: The concrete delay type used by the driver (must implement `DelayNs`)
///
/// # Example
/// ```rust,ignore
/// init_hubsan!(MySpiDevice, MyPin, MyPin, MyDelay);
/// ```
#[macro_export]
macro_rules! init_hubsan {
    ( $spi:ty, $rxen:ty, $txen:ty, $delay:ty ) => {
        pub static HUBSAN: $crate::critical_section::Mutex<
            core::cell::RefCell<
                Option<$crate::protocol::Hubsan<'static, $spi, $rxen, $txen, $delay>>,
            >,
        > = $crate::critical_section::Mutex::new(core::cell::RefCell::new(None));
    };
}

/// Starts a session and stores it in the global `HUBSAN` singleton.
///
/// Expands to a call of [`global_hubsan_setup`](crate::timer::global_hubsan_setup)
/// and evaluates to its `Result`.
///
/// # Arguments
/// - `$radio`: The `A7105` driver
/// - `$controls`: A `&'static SharedControls`
/// - `$config`: The `HubsanConfig`
/// - `$rng`: A mutable reference to an `RngCore`
///
/// # Example
/// ```rust,ignore
/// fn main() {
///     let report = setup_hubsan!(radio, &CONTROLS, HubsanConfig::default(), &mut rng)?;
/// }
/// ```
///
/// # Notes
/// - Requires `init_hubsan!` to have been used earlier.
#[macro_export]
macro_rules! setup_hubsan {
    ( $radio:expr, $controls:expr, $config:expr, $rng:expr ) => {
        $crate::timer::global_hubsan_setup(&HUBSAN, $radio, $controls, $config, $rng)
    };
}

/// Advances the global `HUBSAN` session by one timer period if it has been set up.
///
/// This macro is intended to be invoked from a timer ISR firing every
/// `$period_us` microseconds. It evaluates to the value of
/// [`global_hubsan_tick`](crate::timer::global_hubsan_tick).
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn TIM2() {
///     let _ = tick_hubsan!(500);
/// }
/// ```
///
/// # Notes
/// - This macro assumes `HUBSAN` was declared with `init_hubsan!`
///   and initialized via `setup_hubsan!`.
/// - Safe to call repeatedly; does nothing before the session is set up.
#[macro_export]
macro_rules! tick_hubsan {
    ( $period_us:expr ) => {
        $crate::timer::global_hubsan_tick(&HUBSAN, $period_us)
    };
}

#[cfg(test)]
mod tests {
    use crate::config::HubsanConfig;
    use crate::controls::SharedControls;
    use crate::driver::A7105;
    use crate::sim::{FixedRng, SimRadio};
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::Mock as PinMock;

    crate::init_hubsan!(SimRadio, PinMock, PinMock, NoopDelay);
    static CONTROLS: SharedControls = SharedControls::new();

    #[test]
    fn test_macros_drive_the_singleton() {
        assert!(crate::tick_hubsan!(1_000).is_none());

        let radio = A7105::new(SimRadio::new(), None, None, NoopDelay);
        let _ = crate::setup_hubsan!(radio, &CONTROLS, HubsanConfig::default(), &mut FixedRng(1))
            .unwrap();
        for _ in 0..200 {
            let _ = crate::tick_hubsan!(1_000).unwrap().unwrap();
        }
        let bound = critical_section::with(|cs| {
            HUBSAN
                .borrow(cs)
                .borrow()
                .as_ref()
                .is_some_and(|h| h.is_bound())
        });
        assert!(bound);
    }
}
