//! Register and packet transport for the A7105 2.4 GHz transceiver.
//!
//! This module provides the [`A7105`] struct, which frames every register
//! access as one chip-select transaction on an
//! [`embedded_hal::spi::SpiDevice`] and optionally drives the RXEN/TXEN
//! antenna switch found on PA/LNA modules such as the XL7105.
//!
//! ## Bus protocol
//!
//! | Transaction | Bytes |
//! |-------------|-------|
//! | read        | `addr \| 0x40`, dummy (response clocked in) |
//! | write       | `addr`, value |
//! | strobe      | command |
//! | set ID      | `0x06`, 4 ID bytes big-endian |
//! | FIFO write  | `0x05`, N data bytes |
//!
//! ## Example
//!
//! ```rust
//! # use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};
//! # use embedded_hal_mock::eh1::digital::Mock as PinMock;
//! # use embedded_hal_mock::eh1::delay::NoopDelay;
//! use a7105_hubsan::driver::A7105;
//! use a7105_hubsan::regs::Register;
//!
//! # let spi = SpiMock::new(&[
//! #     SpiTransaction::transaction_start(),
//! #     SpiTransaction::write(0x40),
//! #     SpiTransaction::read(0x00),
//! #     SpiTransaction::transaction_end(),
//! # ]);
//! let mut radio: A7105<_, PinMock, PinMock, _> = A7105::new(spi, None, None, NoopDelay);
//! let mode = radio.read_register(Register::R00_Mode).unwrap();
//! assert_eq!(mode, 0x00);
//! # radio.spi.done();
//! ```
//!
//! ## Design Notes
//!
//! The bus is assumed reliable: an SPI or pin failure is returned to
//! the caller, but nothing is retried here. Bounded polling is the only
//! timing policy of this layer; for the chip profile and calibration see
//! [`crate::calibration`], for the protocol see [`crate::protocol`].

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, OutputPin};
use embedded_hal::spi::{self, Operation, SpiDevice};

use crate::consts::{
    A7105_RW_READ, A7105_RW_WRITE, BOOTSTRAP_ID, GIO1_FOUR_WIRE_SPI, MODE_TRX_BUSY, PACKET_LEN,
    POWER_ON_DELAY_MS,
};
use crate::error::Error;
use crate::regs::{Register, Strobe, TxPower};

/// The error type of an [`A7105`] built from `SPI` and `RXEN`.
pub type RadioError<SPI, RXEN> =
    Error<<SPI as spi::ErrorType>::Error, <RXEN as digital::ErrorType>::Error>;

/// Electrical state of the antenna switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum TxRxMode {
    /// RXEN high, TXEN low.
    #[default]
    Rx,
    /// RXEN low, TXEN high.
    Tx,
}

/// Driver for an A7105 transceiver.
///
/// ## Type Parameters
///
/// - `SPI`: the [`SpiDevice`] owning the chip-select line
/// - `RXEN`, `TXEN`: optional antenna switch enables ([`OutputPin`]); pass `None`
///   for modules without a PA/LNA
/// - `D`: a [`DelayNs`] used for poll spacing and the power-on wait
#[derive(Debug)]
pub struct A7105<SPI, RXEN, TXEN, D> {
    /// SPI device
    pub spi: SPI,
    /// Receive enable pin
    pub rx_en: Option<RXEN>,
    /// Transmit enable pin
    pub tx_en: Option<TXEN>,
    /// Delay provider
    pub delay: D,
    last_strobe: Option<Strobe>,
    tx_rx: TxRxMode,
}

impl<SPI, RXEN, TXEN, D> A7105<SPI, RXEN, TXEN, D>
where
    SPI: SpiDevice,
    RXEN: OutputPin,
    TXEN: OutputPin<Error = RXEN::Error>,
    D: DelayNs,
{
    /// Creates a driver. No bus traffic happens until [`begin`](A7105::begin).
    pub fn new(spi: SPI, rx_en: Option<RXEN>, tx_en: Option<TXEN>, delay: D) -> Self {
        Self {
            spi,
            rx_en,
            tx_en,
            delay,
            last_strobe: None,
            tx_rx: TxRxMode::Rx,
        }
    }

    /// Releases the bus, the pins and the delay.
    pub fn release(self) -> (SPI, Option<RXEN>, Option<TXEN>, D) {
        (self.spi, self.rx_en, self.tx_en, self.delay)
    }

    /// Brings the chip up after power-on.
    ///
    /// Selects the receive path, waits for the oscillator, resets the chip,
    /// optionally routes SDO to GIO1 and programs the bootstrap ID.
    pub fn begin(&mut self, four_wire_spi: bool) -> Result<(), RadioError<SPI, RXEN>> {
        self.set_tx_rx_mode(TxRxMode::Rx)?;
        self.delay.delay_ms(POWER_ON_DELAY_MS);
        self.write_register(Register::R00_Mode, 0x00)?;
        if four_wire_spi {
            self.write_register(Register::R0B_Gio1Pin, GIO1_FOUR_WIRE_SPI)?;
        }
        self.set_id(BOOTSTRAP_ID)?;
        self.last_strobe = None;
        Ok(())
    }

    /// Reads a single register.
    pub fn read_register(&mut self, reg: Register) -> Result<u8, RadioError<SPI, RXEN>> {
        let mut data = [0u8; 1];
        self.spi
            .transaction(&mut [
                Operation::Write(&[reg.addr() | A7105_RW_READ]),
                Operation::Read(&mut data),
            ])
            .map_err(Error::Spi)?;
        Ok(data[0])
    }

    /// Writes a single register.
    pub fn write_register(&mut self, reg: Register, value: u8) -> Result<(), RadioError<SPI, RXEN>> {
        self.spi
            .transaction(&mut [Operation::Write(&[reg.addr() | A7105_RW_WRITE, value])])
            .map_err(Error::Spi)
    }

    /// Programs the 32-bit ID. Only packets carrying this ID are received.
    pub fn set_id(&mut self, id: u32) -> Result<(), RadioError<SPI, RXEN>> {
        let [b0, b1, b2, b3] = id.to_be_bytes();
        self.spi
            .transaction(&mut [Operation::Write(&[
                Register::R06_IdData.addr(),
                b0,
                b1,
                b2,
                b3,
            ])])
            .map_err(Error::Spi)
    }

    /// Sends a mode transition command.
    pub fn strobe(&mut self, strobe: Strobe) -> Result<(), RadioError<SPI, RXEN>> {
        self.spi
            .transaction(&mut [Operation::Write(&[strobe.code()])])
            .map_err(Error::Spi)?;
        self.last_strobe = Some(strobe);
        Ok(())
    }

    /// The last strobe sent since [`begin`](A7105::begin).
    pub fn last_strobe(&self) -> Option<Strobe> {
        self.last_strobe
    }

    /// Current state of the antenna switch.
    pub fn tx_rx_mode(&self) -> TxRxMode {
        self.tx_rx
    }

    /// Sets the output power.
    pub fn set_power(&mut self, power: TxPower) -> Result<(), RadioError<SPI, RXEN>> {
        self.write_register(Register::R28_TxTest, power.tx_test_value())
    }

    /// Selects the RF channel.
    pub fn set_channel(&mut self, channel: u8) -> Result<(), RadioError<SPI, RXEN>> {
        self.write_register(Register::R0F_Channel, channel)
    }

    /// Samples the received signal strength.
    pub fn read_rssi(&mut self) -> Result<u8, RadioError<SPI, RXEN>> {
        self.read_register(Register::R1D_RssiThreshold)
    }

    /// Whether the chip still reports a transmit or receive in progress.
    pub fn trx_busy(&mut self) -> Result<bool, RadioError<SPI, RXEN>> {
        Ok(self.read_register(Register::R00_Mode)? & MODE_TRX_BUSY != 0)
    }

    /// Drives the antenna switch.
    pub fn set_tx_rx_mode(&mut self, mode: TxRxMode) -> Result<(), RadioError<SPI, RXEN>> {
        let tx = mode == TxRxMode::Tx;
        if let Some(ref mut rx_en) = self.rx_en {
            if tx {
                rx_en.set_low().map_err(Error::Pin)?;
            } else {
                rx_en.set_high().map_err(Error::Pin)?;
            }
        }
        if let Some(ref mut tx_en) = self.tx_en {
            if tx {
                tx_en.set_high().map_err(Error::Pin)?;
            } else {
                tx_en.set_low().map_err(Error::Pin)?;
            }
        }
        self.tx_rx = mode;
        Ok(())
    }

    /// Loads `packet` into the FIFO and starts transmitting it on `channel`.
    ///
    /// Returns as soon as the TX strobe is sent. Use
    /// [`poll_tx_complete`](A7105::poll_tx_complete) and
    /// [`finish_tx`](A7105::finish_tx) to complete the transfer, or
    /// [`write_packet`](A7105::write_packet) to do all three.
    pub fn start_packet(&mut self, packet: &[u8], channel: u8) -> Result<(), RadioError<SPI, RXEN>> {
        if packet.is_empty() || packet.len() > PACKET_LEN {
            return Err(Error::InvalidPacket { len: packet.len() });
        }
        self.set_tx_rx_mode(TxRxMode::Tx)?;
        self.strobe(Strobe::ResetWritePointer)?;
        self.spi
            .transaction(&mut [
                Operation::Write(&[Register::R05_FifoData.addr()]),
                Operation::Write(packet),
            ])
            .map_err(Error::Spi)?;
        self.set_channel(channel)?;
        self.strobe(Strobe::Tx)
    }

    /// Checks once whether the transmit in progress has completed.
    pub fn poll_tx_complete(&mut self) -> nb::Result<(), RadioError<SPI, RXEN>> {
        if self.trx_busy().map_err(nb::Error::Other)? {
            Err(nb::Error::WouldBlock)
        } else {
            Ok(())
        }
    }

    /// Polls for transmit completion at most `polls` times, `interval_us` apart.
    ///
    /// # Returns
    /// - `Ok(true)`: the chip reported completion
    /// - `Ok(false)`: the poll budget ran out with the busy bit still set
    pub fn wait_tx_complete(
        &mut self,
        polls: u16,
        interval_us: u32,
    ) -> Result<bool, RadioError<SPI, RXEN>> {
        for _ in 0..polls {
            match self.poll_tx_complete() {
                Ok(()) => return Ok(true),
                Err(nb::Error::WouldBlock) => self.delay.delay_us(interval_us),
                Err(nb::Error::Other(e)) => return Err(e),
            }
        }
        Ok(false)
    }

    /// Returns the antenna switch to the receive path.
    pub fn finish_tx(&mut self) -> Result<(), RadioError<SPI, RXEN>> {
        self.set_tx_rx_mode(TxRxMode::Rx)
    }

    /// Transmits `packet` on `channel` and waits (bounded) for completion.
    ///
    /// A completion timeout is not an error: the chip recovers on the next
    /// strobe. It is logged and reported as `Ok(false)`.
    pub fn write_packet(
        &mut self,
        packet: &[u8],
        channel: u8,
        polls: u16,
        interval_us: u32,
    ) -> Result<bool, RadioError<SPI, RXEN>> {
        self.start_packet(packet, channel)?;
        let done = self.wait_tx_complete(polls, interval_us)?;
        if !done {
            warn!("transmit not complete after {} polls", polls);
        }
        self.finish_tx()?;
        Ok(done)
    }

    /// Reads `buf.len()` bytes from the receive FIFO.
    pub fn read_packet(&mut self, buf: &mut [u8]) -> Result<(), RadioError<SPI, RXEN>> {
        if buf.is_empty() || buf.len() > PACKET_LEN {
            return Err(Error::InvalidPacket { len: buf.len() });
        }
        self.strobe(Strobe::ResetReadPointer)?;
        for byte in buf.iter_mut() {
            *byte = self.read_register(Register::R05_FifoData)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };
    use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};

    fn framed(inner: Vec<SpiTransaction<u8>>) -> Vec<SpiTransaction<u8>> {
        let mut out = vec![SpiTransaction::transaction_start()];
        out.extend(inner);
        out.push(SpiTransaction::transaction_end());
        out
    }

    fn write_reg(addr: u8, value: u8) -> Vec<SpiTransaction<u8>> {
        framed(vec![SpiTransaction::write_vec(vec![addr, value])])
    }

    fn read_reg(addr: u8, value: u8) -> Vec<SpiTransaction<u8>> {
        framed(vec![
            SpiTransaction::write(addr | 0x40),
            SpiTransaction::read(value),
        ])
    }

    fn strobe(code: u8) -> Vec<SpiTransaction<u8>> {
        framed(vec![SpiTransaction::write(code)])
    }

    fn radio(
        expectations: &[SpiTransaction<u8>],
    ) -> A7105<SpiMock<u8>, PinMock, PinMock, NoopDelay> {
        A7105::new(SpiMock::new(expectations), None, None, NoopDelay)
    }

    #[test]
    fn test_read_register_sets_read_flag() {
        let mut radio = radio(&read_reg(0x22, 0x5a));
        assert_eq!(radio.read_register(Register::R22_IfCalibI).unwrap(), 0x5a);
        radio.spi.done();
    }

    #[test]
    fn test_write_register_frames_address_and_value() {
        let mut radio = radio(&write_reg(0x0f, 0x46));
        radio.set_channel(0x46).unwrap();
        radio.spi.done();
    }

    #[test]
    fn test_set_id_is_big_endian() {
        let mut radio = radio(&framed(vec![SpiTransaction::write_vec(vec![
            0x06, 0x55, 0x20, 0x10, 0x41,
        ])]));
        radio.set_id(0x5520_1041).unwrap();
        radio.spi.done();
    }

    #[test]
    fn test_strobe_is_remembered() {
        let mut radio = radio(&strobe(0xa0));
        assert_eq!(radio.last_strobe(), None);
        radio.strobe(Strobe::Standby).unwrap();
        assert_eq!(radio.last_strobe(), Some(Strobe::Standby));
        radio.spi.done();
    }

    #[test]
    fn test_set_power_writes_tx_test() {
        let mut radio = radio(&write_reg(0x28, 0x1f));
        radio.set_power(TxPower::Power150mW).unwrap();
        radio.spi.done();
    }

    #[test]
    fn test_begin_resets_and_programs_bootstrap_id() {
        let mut expectations = write_reg(0x00, 0x00);
        expectations.extend(write_reg(0x0b, 0x19));
        expectations.extend(framed(vec![SpiTransaction::write_vec(vec![
            0x06, 0x55, 0x20, 0x10, 0x41,
        ])]));
        let rx_en = PinMock::new(&[PinTransaction::set(PinState::High)]);
        let tx_en = PinMock::new(&[PinTransaction::set(PinState::Low)]);
        let mut radio = A7105::new(
            SpiMock::new(&expectations),
            Some(rx_en),
            Some(tx_en),
            NoopDelay,
        );

        radio.begin(true).unwrap();
        assert_eq!(radio.tx_rx_mode(), TxRxMode::Rx);
        radio.spi.done();
        let _ = radio.rx_en.as_mut().map(|p| p.done());
        let _ = radio.tx_en.as_mut().map(|p| p.done());
    }

    #[test]
    fn test_begin_three_wire_skips_gio1() {
        let mut expectations = write_reg(0x00, 0x00);
        expectations.extend(framed(vec![SpiTransaction::write_vec(vec![
            0x06, 0x55, 0x20, 0x10, 0x41,
        ])]));
        let mut radio = radio(&expectations);
        radio.begin(false).unwrap();
        radio.spi.done();
    }

    #[test]
    fn test_write_packet_switches_antenna_and_waits() {
        let packet = [0x11u8; 16];
        let mut expectations = strobe(0xe0);
        expectations.extend(framed(vec![
            SpiTransaction::write(0x05),
            SpiTransaction::write_vec(packet.to_vec()),
        ]));
        expectations.extend(write_reg(0x0f, 0x32));
        expectations.extend(strobe(0xd0));
        expectations.extend(read_reg(0x00, 0x01));
        expectations.extend(read_reg(0x00, 0x00));

        let rx_en = PinMock::new(&[
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ]);
        let tx_en = PinMock::new(&[
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
        ]);
        let mut radio = A7105::new(
            SpiMock::new(&expectations),
            Some(rx_en),
            Some(tx_en),
            NoopDelay,
        );

        assert!(radio.write_packet(&packet, 0x32, 20, 0).unwrap());
        assert_eq!(radio.last_strobe(), Some(Strobe::Tx));
        assert_eq!(radio.tx_rx_mode(), TxRxMode::Rx);
        radio.spi.done();
        let _ = radio.rx_en.as_mut().map(|p| p.done());
        let _ = radio.tx_en.as_mut().map(|p| p.done());
    }

    #[test]
    fn test_write_packet_reports_completion_timeout() {
        let packet = [0u8; 16];
        let mut expectations = strobe(0xe0);
        expectations.extend(framed(vec![
            SpiTransaction::write(0x05),
            SpiTransaction::write_vec(packet.to_vec()),
        ]));
        expectations.extend(write_reg(0x0f, 0x14));
        expectations.extend(strobe(0xd0));
        for _ in 0..3 {
            expectations.extend(read_reg(0x00, 0x01));
        }
        let mut radio = radio(&expectations);

        assert!(!radio.write_packet(&packet, 0x14, 3, 0).unwrap());
        radio.spi.done();
    }

    #[test]
    fn test_poll_tx_complete_would_block_while_busy() {
        let mut expectations = read_reg(0x00, 0x01);
        expectations.extend(read_reg(0x00, 0x00));
        let mut radio = radio(&expectations);
        assert_eq!(radio.poll_tx_complete(), Err(nb::Error::WouldBlock));
        assert_eq!(radio.poll_tx_complete(), Ok(()));
        radio.spi.done();
    }

    #[test]
    fn test_read_packet_resets_pointer_then_reads_fifo() {
        let mut expectations = strobe(0xf0);
        for i in 0..16u8 {
            expectations.extend(read_reg(0x05, i * 3));
        }
        let mut radio = radio(&expectations);
        let mut buf = [0u8; 16];
        radio.read_packet(&mut buf).unwrap();
        for (i, b) in buf.iter().enumerate() {
            assert_eq!(*b as usize, i * 3);
        }
        radio.spi.done();
    }

    #[test]
    fn test_oversized_packet_is_rejected_without_bus_traffic() {
        let mut radio = radio(&[]);
        let packet = [0u8; 17];
        assert_eq!(
            radio.start_packet(&packet, 0x14),
            Err(Error::InvalidPacket { len: 17 })
        );
        let mut empty: [u8; 0] = [];
        assert_eq!(
            radio.read_packet(&mut empty),
            Err(Error::InvalidPacket { len: 0 })
        );
        radio.spi.done();
    }
}
