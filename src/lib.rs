//! # a7105-hubsan
//!
//! A portable, no_std Rust driver for the A7105 2.4 GHz FSK transceiver and the Hubsan
//! quadcopter protocol, for ground stations built around modules like the XL7105.
//!
//! This crate implements a complete Hubsan transmitter using:
//! - `embedded-hal` 1.0 traits for the SPI bus, the antenna switch pins and timing
//! - a non-blocking state machine for the bind handshake and the flight-control cycle
//! - interrupt-safe flight-control sharing with `critical-section`
//! - optional tick sources using either timer interrupts or blocking delay
//!
//! ## Crate features
//! | Feature               | Description |
//! |-----------------------|-------------|
//! | `std`                 | Disables `#![no_std]` support and replaces `heapless::Vec`s with `std::vec::Vec`s |
//! | `delay-loop`          | Provides `run_hubsan_loop`, sleeping each protocol wait with `embedded_hal::delay::DelayNs` |
//! | `timer-isr` (default) | Provides a `critical_section` singleton and macros for driving the protocol from a timer interrupt |
//! | `defmt-0-3`           | Uses `defmt` logging |
//! | `log`                 | Uses `log` logging |
//!
//! ## Software Features
//!
//! - **Register transport** over any `SpiDevice`, one chip-select frame per access
//! - **Chip profile and calibration** (IF filter bank, VCO bank) with non-fatal failure reporting
//! - **Channel scan** over the twelve Hubsan channels by accumulated RSSI
//! - **Bind handshake** with bounded per-step retries, backoff and full restarts
//! - **Flight-control cycle** every 10 ms, with a diversity channel every fifth packet
//! - **Link fault recovery** by rebinding after repeated transmit timeouts
//!
//! ## Usage
//!
//! ```rust,ignore
//! use a7105_hubsan::config::HubsanConfig;
//! use a7105_hubsan::controls::SharedControls;
//! use a7105_hubsan::driver::A7105;
//! use a7105_hubsan::protocol::Hubsan;
//!
//! static CONTROLS: SharedControls = SharedControls::new();
//!
//! let radio = A7105::new(spi, Some(rx_en), Some(tx_en), delay);
//! let mut hubsan = Hubsan::new(radio, &CONTROLS, HubsanConfig::default());
//! hubsan.start(&mut rng)?;
//! loop {
//!     let wait_us = hubsan.tick()?; // returns the wait before the next call
//!     timer.delay_us(wait_us);
//! }
//! ```
//!
//! Or, use `run_hubsan_loop()` with a `DelayNs` implementation:
//!
//! ```rust,ignore
//! let err = a7105_hubsan::timer::run_hubsan_loop(&mut hubsan, &mut timer);
//! ```
//!
//! The command parser updates the flight controls from anywhere:
//!
//! ```rust,ignore
//! CONTROLS.update(|c| c.throttle = 0x40);
//! ```
//!
//! ## Integration Notes
//!
//! - Bind steps ask for waits between 0.5 ms and 36 ms; a data packet takes 10 ms,
//!   split into a settle wait, transmit-complete checks and the rest of the period
//! - All retry bounds and poll spacings are in [`config::HubsanConfig`]
//! - Only one session should be active at a time in interrupt-driven mode
//!
//! --
//! Designed for `#![no_std]` use in resource-constrained embedded environments.

#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces
)]
#![warn(unused, unused_results)]
#![cfg_attr(not(feature = "std"), no_std)]

pub use critical_section;

#[cfg(not(feature = "std"))]
pub use heapless;

#[macro_use]
mod fmt;

pub mod calibration;
pub mod config;
pub mod consts;
pub mod controls;
pub mod driver;
pub mod error;
pub mod packet;
pub mod protocol;
pub mod regs;
pub mod scan;
#[cfg(test)]
mod sim;
pub mod timer;
