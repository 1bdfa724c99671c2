//! Runtime configuration of the driver and of the Hubsan protocol timing.
//!
//! The retry bounds and poll spacings of the bind handshake differ between
//! known Hubsan transmitters. They are kept here as parameters, with
//! defaults that work against the H107 family.

use crate::consts::MAX_HANDSHAKE_ROUNDS;
use crate::regs::TxPower;

/// How the bind handshake waits for and retries vehicle responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct RetryPolicy {
    /// Mode register polls per listen step before the step counts as failed.
    pub response_polls: u16,
    /// Spacing between two response polls (µs).
    pub response_poll_interval_us: u32,
    /// Retransmissions of one step before the whole handshake restarts.
    /// `0` restarts on the first failure.
    pub max_step_retries: u8,
    /// Full handshake restarts before the bind is reported as failed.
    /// `0` fails on the first restart.
    pub max_handshake_restarts: u8,
    /// Wait before the first retransmission (µs). Doubles per attempt.
    pub backoff_base_us: u32,
    /// Ceiling of the retransmission wait (µs).
    pub backoff_max_us: u32,
}

impl RetryPolicy {
    /// Default policy: 15 polls at 1 ms, 5 retries per step, 3 restarts.
    pub const fn new() -> Self {
        Self {
            response_polls: 15,
            response_poll_interval_us: 1_000,
            max_step_retries: 5,
            max_handshake_restarts: 3,
            backoff_base_us: 4_500,
            backoff_max_us: 36_000,
        }
    }

    /// Wait before retransmission number `attempt` (1-based).
    pub fn backoff_us(&self, attempt: u8) -> u32 {
        let shift = u32::from(attempt.saturating_sub(1)).min(16);
        self.backoff_base_us
            .saturating_mul(1 << shift)
            .min(self.backoff_max_us)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Waits returned by [`Hubsan::tick`](crate::protocol::Hubsan::tick), in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct Timing {
    /// After a packet is pushed, before its completion is first checked.
    pub tx_settle_us: u32,
    /// After switching to RX, before the first response poll.
    pub listen_delay_us: u32,
    /// After a response was read, before the next bind step.
    pub step_gap_us: u32,
    /// After the handshake completed, before the first data packet.
    pub bind_complete_us: u32,
    /// Between the starts of two flight-control packets whose transmit
    /// completed on the first check.
    pub data_period_us: u32,
}

impl Timing {
    /// Default timing: 3 ms settle, 4.5 ms listen, 10 ms data period.
    pub const fn new() -> Self {
        Self {
            tx_settle_us: 3_000,
            listen_delay_us: 4_500,
            step_gap_us: 500,
            bind_complete_us: 28_000,
            data_period_us: 10_000,
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::new()
    }
}

/// Complete configuration for [`Hubsan`](crate::protocol::Hubsan).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct HubsanConfig {
    /// Output power, applied after calibration and at every data cycle start.
    pub tx_power: TxPower,
    /// Route SDO to GIO1 at bring-up.
    pub four_wire_spi: bool,
    /// RSSI samples accumulated per channel during the scan.
    pub rssi_samples: u8,
    /// Spacing between two RSSI samples (µs).
    pub rssi_sample_spacing_us: u32,
    /// Polls of the calibration control register for the IF filter pass.
    pub if_cal_polls: u16,
    /// Polls of the calibration control register for each VCO bank pass.
    pub vco_cal_polls: u16,
    /// Spacing between calibration polls (µs).
    pub cal_poll_interval_us: u32,
    /// Mode register polls waiting for a transmit to complete, the first
    /// one `timing.tx_settle_us` after the TX strobe.
    pub tx_complete_polls: u16,
    /// Spacing between transmit-complete polls (µs). Together with the
    /// settle time this bounds the airtime a packet may take.
    pub tx_poll_interval_us: u32,
    /// Response waiting and retry policy of the bind handshake.
    pub retry: RetryPolicy,
    /// Waits between protocol steps.
    pub timing: Timing,
    /// Level 9 rounds in the final bind phase.
    pub handshake_rounds: u8,
    /// Consecutive transmit-complete timeouts in the data phase that force a rebind.
    /// `0` disables the check.
    pub link_fault_limit: u8,
}

impl HubsanConfig {
    /// Default configuration.
    pub const fn new() -> Self {
        Self {
            tx_power: TxPower::Power150mW,
            four_wire_spi: true,
            rssi_samples: 15,
            rssi_sample_spacing_us: 0,
            if_cal_polls: 100,
            vco_cal_polls: 10,
            cal_poll_interval_us: 20,
            tx_complete_polls: 20,
            tx_poll_interval_us: 500,
            retry: RetryPolicy::new(),
            timing: Timing::new(),
            handshake_rounds: 10,
            link_fault_limit: 25,
        }
    }

    /// Level 9 rounds, clamped to `1..=MAX_HANDSHAKE_ROUNDS`.
    pub fn rounds(&self) -> u8 {
        self.handshake_rounds.clamp(1, MAX_HANDSHAKE_ROUNDS as u8)
    }
}

impl Default for HubsanConfig {
    fn default() -> Self {
        Self::new()
    }
}
