//! Timer and tick-loop utilities for driving [`Hubsan`](crate::protocol::Hubsan).
//!
//! The protocol asks for a variable wait after every step. It can be driven
//! in two ways: from a periodic timer interrupt through a `critical_section`
//! protected singleton (`timer-isr` feature), where each interrupt accounts
//! one timer period with [`Hubsan::advance`](crate::protocol::Hubsan::advance),
//! or from a blocking loop sleeping each returned wait (`delay-loop` feature).
//!
//! Contains helpers for polling- and ISR-based scheduling, including:
//! - `compute_ocr_value`: runtime OCR calculator
//! - `const_ocr_value`: compile-time OCR calculator
//! - `run_hubsan_loop`: blocking loop over a `DelayNs` (feature `delay-loop`)
//! - `global_hubsan_tick` and `tick_hubsan!()`: interrupt-based tick wrapper
//!   (feature `timer-isr`)
//!
//! Compare values for a 16 MHz clock in CTC mode:
//!
//! | PRESCALER | Period | OCR |
//! |-----------|--------|-----|
//! |         8 | 500 µs | 1000 |
//! |        64 | 500 µs | 125 |
//! |        64 |   1 ms | 250 |
//! |       256 |   2 ms | 125 |
//! |      1024 |   8 ms | 125 |
//!
//! Every wait requested by the protocol is a multiple of 500 µs with the
//! default [`Timing`](crate::config::Timing), so a 500 µs or 1 ms period
//! keeps the bind steps on schedule.

use libm::round;

#[cfg(feature = "delay-loop")]
mod delay;
#[cfg_attr(feature = "delay-loop", allow(unused_imports))]
#[cfg(feature = "delay-loop")]
pub use delay::*;

#[cfg(feature = "timer-isr")]
mod isr;
#[cfg_attr(feature = "timer-isr", allow(unused_imports))]
#[cfg(feature = "timer-isr")]
pub use isr::*;

#[cfg(feature = "timer-isr")]
mod macros;
#[cfg_attr(feature = "timer-isr", allow(unused_imports))]
#[cfg(feature = "timer-isr")]
pub use macros::*;

/// 1,000,000 microseconds = 1 second
pub const MICROSECONDS_PER_SECOND: u32 = 1_000_000;

/// Computes the OCR value for a timer in CTC mode
///
/// # Arguments
/// - `f_cpu`: CPU frequency in Hz
/// - `prescaler`: timer prescaler (e.g., 8, 64, 256)
/// - `period_us`: desired interrupt period in microseconds (e.g., 1000)
///
/// # Returns
/// - OCR value for OCRnA (rounds to nearest integer)
pub fn compute_ocr_value(f_cpu: u32, prescaler: u32, period_us: u32) -> u16 {
    let ticks_per_second = f_cpu as f64 / prescaler as f64;
    let ticks = ticks_per_second * (period_us as f64 / MICROSECONDS_PER_SECOND as f64);
    round(ticks) as u16
}

/// Compile-time OCR value calculator
///
/// # Arguments
/// - `f_cpu`: CPU frequency in Hz
/// - `prescaler`: timer prescaler (e.g., 8, 64, 256)
/// - `period_us`: desired interrupt period in microseconds (e.g., 1000)
///
/// # Returns
/// - OCR value for OCRnA (truncated)
pub const fn const_ocr_value(f_cpu: u32, prescaler: u32, period_us: u32) -> u16 {
    let ticks = (f_cpu / prescaler) as u64 * period_us as u64 / MICROSECONDS_PER_SECOND as u64;
    ticks as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ocr_for_common_prescalers() {
        assert_eq!(compute_ocr_value(16_000_000, 64, 1_000), 250);
        assert_eq!(compute_ocr_value(16_000_000, 8, 500), 1_000);
        assert_eq!(compute_ocr_value(16_000_000, 1024, 8_000), 125);
    }

    #[test]
    fn test_runtime_and_const_agree_on_exact_periods() {
        for (prescaler, period) in [(64, 500), (64, 1_000), (256, 2_000), (1024, 8_000)] {
            assert_eq!(
                compute_ocr_value(16_000_000, prescaler, period),
                const_ocr_value(16_000_000, prescaler, period)
            );
        }
    }

    #[test]
    fn test_runtime_rounds_to_nearest() {
        // 8 MHz / 1024 = 7812.5 ticks per second, 1 ms = 7.8125 ticks
        assert_eq!(compute_ocr_value(8_000_000, 1024, 1_000), 8);
        assert_eq!(const_ocr_value(8_000_000, 1024, 1_000), 7);
    }

    const OCR_1MS: u16 = const_ocr_value(16_000_000, 64, 1_000);

    #[test]
    fn test_const_usable_in_const_context() {
        assert_eq!(OCR_1MS, 250);
    }
}
