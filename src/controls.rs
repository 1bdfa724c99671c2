//! Flight controls shared between the command parser and the scheduler.
//!
//! The parser may run from a UART interrupt while the scheduler runs from a
//! timer interrupt or the main loop. Both sides go through a
//! `critical_section::Mutex`, so the scheduler always encodes a consistent
//! snapshot of all four axes.

use core::cell::Cell;

use critical_section::Mutex;

use crate::packet::FlightControls;

/// A [`FlightControls`] value guarded by a critical section.
///
/// ## Example
///
/// ```rust
/// use a7105_hubsan::controls::SharedControls;
///
/// static CONTROLS: SharedControls = SharedControls::new();
///
/// CONTROLS.update(|c| c.throttle = 0x40);
/// assert_eq!(CONTROLS.get().throttle, 0x40);
/// ```
#[derive(Debug)]
pub struct SharedControls {
    inner: Mutex<Cell<FlightControls>>,
}

impl SharedControls {
    /// Shared controls initialised to [`FlightControls::NEUTRAL`].
    pub const fn new() -> Self {
        Self::with(FlightControls::NEUTRAL)
    }

    /// Shared controls initialised to `controls`.
    pub const fn with(controls: FlightControls) -> Self {
        Self {
            inner: Mutex::new(Cell::new(controls)),
        }
    }

    /// Replaces all axes at once.
    pub fn set(&self, controls: FlightControls) {
        critical_section::with(|cs| self.inner.borrow(cs).set(controls));
    }

    /// A snapshot of the current axes.
    pub fn get(&self) -> FlightControls {
        critical_section::with(|cs| self.inner.borrow(cs).get())
    }

    /// Read-modify-write of the axes inside one critical section.
    pub fn update<F: FnOnce(&mut FlightControls)>(&self, f: F) {
        critical_section::with(|cs| {
            let cell = self.inner.borrow(cs);
            let mut controls = cell.get();
            f(&mut controls);
            cell.set(controls);
        });
    }
}

impl Default for SharedControls {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_neutral() {
        let controls = SharedControls::default();
        assert_eq!(controls.get(), FlightControls::NEUTRAL);
    }

    #[test]
    fn test_update_is_applied_as_a_whole() {
        let controls = SharedControls::new();
        controls.update(|c| {
            c.throttle = 10;
            c.aileron = 20;
            c.flags.set_led(false);
        });
        let snapshot = controls.get();
        assert_eq!(snapshot.throttle, 10);
        assert_eq!(snapshot.aileron, 20);
        assert!(!snapshot.flags.led());
        assert_eq!(snapshot.rudder, 0x80);
    }

    #[test]
    fn test_set_replaces_all_axes() {
        let controls = SharedControls::new();
        let next = FlightControls {
            throttle: 1,
            rudder: 2,
            elevator: 3,
            aileron: 4,
            ..FlightControls::NEUTRAL
        };
        controls.set(next);
        assert_eq!(controls.get(), next);
    }
}
