//! The Hubsan bind handshake and flight-control scheduler.
//!
//! [`Hubsan`] is a non-blocking state machine. Each call to
//! [`Hubsan::tick`] performs one step of bus work and returns the number of
//! microseconds the caller should wait before the next call. The caller
//! owns the clock: a timer interrupt (see [`crate::timer`]), a delay loop,
//! or [`Hubsan::bind_blocking`] for the bind phase.
//!
//! ## States
//!
//! | State            | Work per tick |
//! |------------------|---------------|
//! | `Bind1`, `Bind5` | transmit a level 1 bind packet, then check completion and switch to RX |
//! | `Bind3`          | the same at level 3 |
//! | `Bind7`          | the same at level 9, carrying the round index |
//! | `Bind2/4/6/8`    | poll for the vehicle's reply and read it |
//! | `Data1..Data5`   | transmit one flight-control packet (`Data5` on `channel + 0x23`), then check completion |
//!
//! The reply to `Bind4` carries the vehicle ID, which is programmed into the
//! chip before `Bind5`. The level 9 phase runs
//! [`HubsanConfig::handshake_rounds`] rounds; the reply to the last one must
//! carry completion code 9.
//!
//! ## Failure handling
//!
//! A listen step that sees no reply within
//! [`RetryPolicy::response_polls`](crate::config::RetryPolicy::response_polls)
//! polls fails, and the preceding transmit step is repeated after an
//! exponential backoff. After more than `max_step_retries` failures of one
//! step the handshake restarts from `Bind1` with the bootstrap ID restored.
//! After more than `max_handshake_restarts` restarts the session enters
//! [`State::Failed`] and every tick returns [`Error::BindFailed`] until
//! [`Hubsan::rebind`] is called.
//!
//! Every transmit is started on one tick and checked on the following ones,
//! [`HubsanConfig::tx_poll_interval_us`] apart, with the antenna switch left
//! on TX until the chip reports completion or
//! [`HubsanConfig::tx_complete_polls`] checks ran out. In the data phase,
//! [`HubsanConfig::link_fault_limit`] consecutive timeouts trigger a rebind.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;
use rand_core::RngCore;

#[cfg(not(feature = "std"))]
use heapless::Vec;
#[cfg(feature = "std")]
use std::vec::Vec;

use crate::calibration::CalibrationReport;
use crate::config::HubsanConfig;
use crate::consts::{
    ALLOWED_CHANNELS, BOOTSTRAP_ID, CODE_I_BOUND, DIVERSITY_CHANNEL_OFFSET, HANDSHAKE_COMPLETE,
    LEVEL_ANNOUNCE, LEVEL_ESCALATE, LEVEL_HANDSHAKE, PACKET_LEN,
};
#[cfg(not(feature = "std"))]
use crate::consts::MAX_HANDSHAKE_ROUNDS;
use crate::controls::SharedControls;
use crate::driver::{A7105, RadioError};
use crate::error::Error;
use crate::packet::{BindPacket, Packet, completion_code, vehicle_id, verify_checksum};
use crate::regs::{Register, Strobe};
use crate::scan::ScanReport;

/// Progress of a Hubsan session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum State {
    /// Created, [`Hubsan::start`] not yet called.
    Idle,
    /// Announce at level 1.
    Bind1,
    /// Wait for the announce reply.
    Bind2,
    /// Escalate to level 3.
    Bind3,
    /// Wait for the reply carrying the vehicle ID.
    Bind4,
    /// Confirm at level 1 under the vehicle ID.
    Bind5,
    /// Wait for the confirmation reply.
    Bind6,
    /// Level 9 round.
    Bind7,
    /// Wait for the level 9 reply.
    Bind8,
    /// Flight-control packet, primary channel.
    Data1,
    /// Flight-control packet, primary channel.
    Data2,
    /// Flight-control packet, primary channel.
    Data3,
    /// Flight-control packet, primary channel.
    Data4,
    /// Flight-control packet on the diversity channel.
    Data5,
    /// The handshake exhausted its retry budget.
    Failed,
}

impl State {
    /// Whether the session is in the bind handshake.
    pub fn is_binding(self) -> bool {
        matches!(
            self,
            State::Bind1
                | State::Bind2
                | State::Bind3
                | State::Bind4
                | State::Bind5
                | State::Bind6
                | State::Bind7
                | State::Bind8
        )
    }

    /// Whether the session is in the data phase.
    pub fn is_data(self) -> bool {
        matches!(
            self,
            State::Data1 | State::Data2 | State::Data3 | State::Data4 | State::Data5
        )
    }

    fn next(self) -> Self {
        match self {
            State::Bind1 => State::Bind2,
            State::Bind2 => State::Bind3,
            State::Bind3 => State::Bind4,
            State::Bind4 => State::Bind5,
            State::Bind5 => State::Bind6,
            State::Bind6 => State::Bind7,
            State::Bind7 => State::Bind8,
            State::Data1 => State::Data2,
            State::Data2 => State::Data3,
            State::Data3 => State::Data4,
            State::Data4 => State::Data5,
            State::Data5 => State::Data1,
            other => other,
        }
    }

    /// The transmit step a listen step answers.
    fn request(self) -> Self {
        match self {
            State::Bind2 => State::Bind1,
            State::Bind4 => State::Bind3,
            State::Bind6 => State::Bind5,
            State::Bind8 => State::Bind7,
            other => other,
        }
    }
}

/// Link counters, kept across rebinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct LinkStats {
    /// Packets handed to the transmitter, bind and data.
    pub transmissions: u32,
    /// Transmits whose completion was not seen within the poll budget.
    pub tx_timeouts: u32,
    /// Listen steps that ended without a reply or with a wrong completion code.
    pub step_failures: u32,
    /// Full handshake restarts.
    pub handshake_restarts: u32,
    /// Flight-control packets sent.
    pub data_packets: u32,
}

/// What [`Hubsan::start`] found while bringing the chip up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct StartReport {
    /// Outcome of the calibration passes.
    pub calibration: CalibrationReport,
    /// Channel scan result.
    pub scan: ScanReport,
}

/// A Hubsan session over an [`A7105`].
///
/// Flight controls are read from a [`SharedControls`] once per data
/// packet, so the command parser can update them from any context.
///
/// ## Example
///
/// ```rust,ignore
/// static CONTROLS: SharedControls = SharedControls::new();
///
/// let radio = A7105::new(spi, Some(rx_en), Some(tx_en), delay);
/// let mut hubsan = Hubsan::new(radio, &CONTROLS, HubsanConfig::default());
/// hubsan.start(&mut rng)?;
/// hubsan.bind_blocking(&mut timer)?;
/// loop {
///     let wait = hubsan.tick()?;
///     timer.delay_us(wait);
/// }
/// ```
#[derive(Debug)]
pub struct Hubsan<'a, SPI, RXEN, TXEN, D> {
    radio: A7105<SPI, RXEN, TXEN, D>,
    controls: &'a SharedControls,
    config: HubsanConfig,
    channel: u8,
    session_id: u32,
    state: State,
    awaiting_tx: bool,
    tx_polls: u16,
    attempts: u8,
    restarts: u8,
    listen_polls: u16,
    round: u8,
    vehicle_id: Option<u32>,
    #[cfg(not(feature = "std"))]
    replies: Vec<Packet, MAX_HANDSHAKE_ROUNDS>,
    #[cfg(feature = "std")]
    replies: Vec<Packet>,
    link_faults: u8,
    pending_us: u32,
    stats: LinkStats,
}

impl<'a, SPI, RXEN, TXEN, D> Hubsan<'a, SPI, RXEN, TXEN, D>
where
    SPI: SpiDevice,
    RXEN: OutputPin,
    TXEN: OutputPin<Error = RXEN::Error>,
    D: DelayNs,
{
    /// Creates an idle session. No bus traffic happens until [`start`](Hubsan::start).
    pub fn new(
        radio: A7105<SPI, RXEN, TXEN, D>,
        controls: &'a SharedControls,
        config: HubsanConfig,
    ) -> Self {
        Self {
            radio,
            controls,
            config,
            channel: ALLOWED_CHANNELS[0],
            session_id: 0,
            state: State::Idle,
            awaiting_tx: false,
            tx_polls: 0,
            attempts: 0,
            restarts: 0,
            listen_polls: 0,
            round: 0,
            vehicle_id: None,
            replies: Vec::new(),
            link_faults: 0,
            pending_us: 0,
            stats: LinkStats::default(),
        }
    }

    /// Brings the chip up, calibrates, picks the channel and draws a
    /// session ID. The session is left in [`State::Bind1`].
    pub fn start<R: RngCore>(&mut self, rng: &mut R) -> Result<StartReport, RadioError<SPI, RXEN>> {
        self.radio.begin(self.config.four_wire_spi)?;
        let calibration = self.radio.configure(&self.config)?;
        let scan = self
            .radio
            .select_channel(self.config.rssi_samples, self.config.rssi_sample_spacing_us)?;
        self.channel = scan.channel;
        self.session_id = rng.next_u32();
        self.vehicle_id = None;
        self.restarts = 0;
        self.link_faults = 0;
        self.reset_handshake();
        debug!(
            "session {:#x} on channel {:#x}",
            self.session_id, self.channel
        );
        Ok(StartReport { calibration, scan })
    }

    /// Runs one step and returns the wait before the next call (µs).
    pub fn tick(&mut self) -> Result<u32, RadioError<SPI, RXEN>> {
        match self.state {
            State::Idle => Err(Error::NotStarted),
            State::Failed => Err(Error::BindFailed {
                restarts: self.restarts,
            }),
            State::Bind1 | State::Bind3 | State::Bind5 | State::Bind7 => {
                if self.awaiting_tx {
                    self.complete_bind_packet()
                } else {
                    self.send_bind_packet()
                }
            }
            State::Bind2 | State::Bind4 | State::Bind6 | State::Bind8 => self.listen(),
            State::Data1 | State::Data2 | State::Data3 | State::Data4 | State::Data5 => {
                self.send_data_packet()
            }
        }
    }

    /// Accounts `elapsed_us` against the last returned wait and ticks once it
    /// has run out. For callers driven by a fixed-period timer.
    ///
    /// # Returns
    /// - `Ok(true)`: a step ran
    /// - `Ok(false)`: the wait has not elapsed yet
    pub fn advance(&mut self, elapsed_us: u32) -> Result<bool, RadioError<SPI, RXEN>> {
        self.pending_us = self.pending_us.saturating_sub(elapsed_us);
        if self.pending_us > 0 {
            return Ok(false);
        }
        self.pending_us = self.tick()?;
        Ok(true)
    }

    /// Drives the handshake to completion, sleeping the returned waits on `delay`.
    pub fn bind_blocking<DL: DelayNs>(
        &mut self,
        delay: &mut DL,
    ) -> Result<(), RadioError<SPI, RXEN>> {
        while !self.state.is_data() {
            let wait_us = self.tick()?;
            delay.delay_us(wait_us);
        }
        Ok(())
    }

    /// Abandons the current link and restarts the handshake from
    /// [`State::Bind1`] with the same channel and session ID.
    pub fn rebind(&mut self) -> Result<(), RadioError<SPI, RXEN>> {
        if self.state == State::Idle {
            return Err(Error::NotStarted);
        }
        self.radio.finish_tx()?;
        self.radio.strobe(Strobe::Standby)?;
        self.restore_bootstrap_id()?;
        self.restarts = 0;
        self.link_faults = 0;
        self.reset_handshake();
        info!("rebinding on channel {:#x}", self.channel);
        Ok(())
    }

    /// Current state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Whether a packet has been started and its completion not yet seen.
    pub fn awaiting_tx(&self) -> bool {
        self.awaiting_tx
    }

    /// Whether the handshake completed and flight-control packets are flowing.
    pub fn is_bound(&self) -> bool {
        self.state.is_data()
    }

    /// Link counters.
    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    /// The session channel.
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// The session ID sent in every bind packet.
    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    /// The vehicle ID programmed during the current handshake.
    pub fn vehicle_id(&self) -> Option<u32> {
        self.vehicle_id
    }

    /// Level 9 replies collected during the current handshake.
    pub fn handshake_replies(&self) -> &[Packet] {
        &self.replies
    }

    /// The configuration in use.
    pub fn config(&self) -> &HubsanConfig {
        &self.config
    }

    /// The transceiver.
    pub fn radio(&self) -> &A7105<SPI, RXEN, TXEN, D> {
        &self.radio
    }

    /// The transceiver, mutably.
    pub fn radio_mut(&mut self) -> &mut A7105<SPI, RXEN, TXEN, D> {
        &mut self.radio
    }

    /// Ends the session and returns the transceiver.
    pub fn release(self) -> A7105<SPI, RXEN, TXEN, D> {
        self.radio
    }

    fn reset_handshake(&mut self) {
        self.state = State::Bind1;
        self.awaiting_tx = false;
        self.tx_polls = 0;
        self.attempts = 0;
        self.listen_polls = 0;
        self.round = 0;
        self.pending_us = 0;
        self.replies.clear();
    }

    fn restore_bootstrap_id(&mut self) -> Result<(), RadioError<SPI, RXEN>> {
        if self.vehicle_id.take().is_some() {
            self.radio.set_id(BOOTSTRAP_ID)?;
        }
        Ok(())
    }

    fn send_bind_packet(&mut self) -> Result<u32, RadioError<SPI, RXEN>> {
        let packet = match self.state {
            State::Bind3 => BindPacket::new(LEVEL_ESCALATE, self.channel, self.session_id),
            State::Bind7 => BindPacket::new(LEVEL_HANDSHAKE, self.channel, self.session_id)
                .with_round(self.round),
            _ => BindPacket::new(LEVEL_ANNOUNCE, self.channel, self.session_id),
        };
        trace!("{:?}: sending {:?}", self.state, packet);
        self.radio.strobe(Strobe::Standby)?;
        self.radio.start_packet(&packet.encode(), self.channel)?;
        self.awaiting_tx = true;
        self.tx_polls = 0;
        self.stats.transmissions = self.stats.transmissions.wrapping_add(1);
        Ok(self.config.timing.tx_settle_us)
    }

    /// Checks the transmit in progress once.
    ///
    /// # Returns
    /// - `None`: still sending, check again after `tx_poll_interval_us`
    /// - `Some(true)`: the chip reported completion
    /// - `Some(false)`: the check budget ran out with the busy bit still set
    fn poll_transmit(&mut self) -> Result<Option<bool>, RadioError<SPI, RXEN>> {
        match self.radio.poll_tx_complete() {
            Ok(()) => Ok(Some(true)),
            Err(nb::Error::WouldBlock) => {
                self.tx_polls = self.tx_polls.saturating_add(1);
                if self.tx_polls < self.config.tx_complete_polls {
                    return Ok(None);
                }
                warn!("{:?}: transmit not complete", self.state);
                self.stats.tx_timeouts = self.stats.tx_timeouts.wrapping_add(1);
                Ok(Some(false))
            }
            Err(nb::Error::Other(e)) => Err(e),
        }
    }

    fn complete_bind_packet(&mut self) -> Result<u32, RadioError<SPI, RXEN>> {
        if self.poll_transmit()?.is_none() {
            return Ok(self.config.tx_poll_interval_us);
        }
        self.radio.finish_tx()?;
        self.radio.strobe(Strobe::Rx)?;
        self.awaiting_tx = false;
        self.listen_polls = 0;
        self.state = self.state.next();
        Ok(self.config.timing.listen_delay_us)
    }

    fn listen(&mut self) -> Result<u32, RadioError<SPI, RXEN>> {
        if self.radio.trx_busy()? {
            self.listen_polls = self.listen_polls.saturating_add(1);
            if self.listen_polls < self.config.retry.response_polls {
                return Ok(self.config.retry.response_poll_interval_us);
            }
            debug!("{:?}: no reply", self.state);
            return self.step_failed();
        }

        let mut reply = [0u8; PACKET_LEN];
        self.radio.read_packet(&mut reply)?;
        if !verify_checksum(&reply) {
            debug!("{:?}: bad reply checksum", self.state);
            return self.step_failed();
        }

        match self.state {
            State::Bind2 => self.state = State::Bind3,
            State::Bind4 => {
                let id = vehicle_id(&reply);
                self.radio.set_id(id)?;
                self.vehicle_id = Some(id);
                debug!("vehicle ID {:#x}", id);
                self.state = State::Bind5;
            }
            State::Bind6 => {
                self.round = 0;
                self.replies.clear();
                self.state = State::Bind7;
            }
            State::Bind8 => {
                let last = self.round.saturating_add(1) >= self.config.rounds();
                if last && completion_code(&reply) != HANDSHAKE_COMPLETE {
                    debug!(
                        "round {}: completion code {}",
                        self.round,
                        completion_code(&reply)
                    );
                    return self.step_failed();
                }
                self.push_reply(reply);
                self.attempts = 0;
                if last {
                    return self.finish_bind();
                }
                self.round += 1;
                self.state = State::Bind7;
            }
            _ => {}
        }
        self.attempts = 0;
        debug!("bind step complete, next {:?}", self.state);
        Ok(self.config.timing.step_gap_us)
    }

    #[cfg(not(feature = "std"))]
    fn push_reply(&mut self, reply: Packet) {
        let pushed = self.replies.push(reply);
        debug_assert!(pushed.is_ok(), "more replies than handshake rounds");
    }

    #[cfg(feature = "std")]
    fn push_reply(&mut self, reply: Packet) {
        self.replies.push(reply);
    }

    fn step_failed(&mut self) -> Result<u32, RadioError<SPI, RXEN>> {
        self.stats.step_failures = self.stats.step_failures.wrapping_add(1);
        if self.attempts >= self.config.retry.max_step_retries {
            return self.restart_handshake();
        }
        self.attempts += 1;
        self.state = self.state.request();
        Ok(self.config.retry.backoff_us(self.attempts))
    }

    fn restart_handshake(&mut self) -> Result<u32, RadioError<SPI, RXEN>> {
        self.stats.handshake_restarts = self.stats.handshake_restarts.wrapping_add(1);
        let exhausted = self.restarts >= self.config.retry.max_handshake_restarts;
        self.restarts = self.restarts.saturating_add(1);
        if exhausted {
            self.state = State::Failed;
            self.radio.strobe(Strobe::Standby)?;
            error!("bind failed after {} restarts", self.restarts);
            return Err(Error::BindFailed {
                restarts: self.restarts,
            });
        }
        warn!(
            "{:?} failed {} times, restarting handshake ({})",
            self.state,
            u16::from(self.attempts) + 1,
            self.restarts
        );
        self.restore_bootstrap_id()?;
        self.reset_handshake();
        Ok(self.config.retry.backoff_max_us)
    }

    fn finish_bind(&mut self) -> Result<u32, RadioError<SPI, RXEN>> {
        self.radio.write_register(Register::R1F_CodeI, CODE_I_BOUND)?;
        self.radio.strobe(Strobe::Standby)?;
        self.state = State::Data1;
        self.link_faults = 0;
        info!(
            "bound to vehicle {:#x} on channel {:#x}",
            self.vehicle_id.unwrap_or(0),
            self.channel
        );
        Ok(self.config.timing.bind_complete_us)
    }

    fn send_data_packet(&mut self) -> Result<u32, RadioError<SPI, RXEN>> {
        if self.awaiting_tx {
            return self.complete_data_packet();
        }
        if self.state == State::Data1 {
            self.radio.set_power(self.config.tx_power)?;
        }
        let channel = if self.state == State::Data5 {
            self.channel.wrapping_add(DIVERSITY_CHANNEL_OFFSET)
        } else {
            self.channel
        };
        let packet = self.controls.get().encode();
        self.radio.start_packet(&packet, channel)?;
        self.awaiting_tx = true;
        self.tx_polls = 0;
        self.stats.transmissions = self.stats.transmissions.wrapping_add(1);
        self.stats.data_packets = self.stats.data_packets.wrapping_add(1);
        Ok(self.config.timing.tx_settle_us)
    }

    fn complete_data_packet(&mut self) -> Result<u32, RadioError<SPI, RXEN>> {
        let Some(done) = self.poll_transmit()? else {
            return Ok(self.config.tx_poll_interval_us);
        };
        self.radio.finish_tx()?;
        self.awaiting_tx = false;

        if done {
            self.link_faults = 0;
        } else {
            self.link_faults = self.link_faults.saturating_add(1);
            let limit = self.config.link_fault_limit;
            if limit != 0 && self.link_faults >= limit {
                warn!("{} consecutive transmit timeouts, rebinding", self.link_faults);
                self.rebind()?;
                return Ok(self.config.retry.backoff_max_us);
            }
        }
        self.state = self.state.next();
        Ok(self
            .config
            .timing
            .data_period_us
            .saturating_sub(self.config.timing.tx_settle_us))
    }
}
