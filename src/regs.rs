//! A7105 register file, strobe commands and output power levels.
//!
//! Register offsets follow the A7105 datasheet naming (`<hex>_<name>`)
//! so the profile tables read the same as the chip documentation.

/// Control register offsets (0x00 - 0x32) reachable over the SPI bus.
///
/// Each address has a fixed bit-level meaning; see the A7105 datasheet.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
#[repr(u8)]
pub enum Register {
    /// Mode register. Bit 0 is the TRX busy flag on read, write resets the chip.
    R00_Mode = 0x00,
    /// Mode control (auto RSSI, FIFO mode, ADC).
    R01_ModeControl = 0x01,
    /// Calibration control. Set bits start a calibration and self-clear.
    R02_CalibControl = 0x02,
    /// FIFO end pointer.
    R03_FifoI = 0x03,
    /// FIFO pointer margin.
    R04_FifoII = 0x04,
    /// FIFO data port.
    R05_FifoData = 0x05,
    /// ID data port (4 bytes, big-endian).
    R06_IdData = 0x06,
    /// RC oscillator I.
    R07_RcOscI = 0x07,
    /// RC oscillator II.
    R08_RcOscII = 0x08,
    /// RC oscillator III.
    R09_RcOscIII = 0x09,
    /// CKO pin control.
    R0A_CkoPin = 0x0A,
    /// GIO1 pin control.
    R0B_Gio1Pin = 0x0B,
    /// GIO2 pin control.
    R0C_Gio2Pin = 0x0C,
    /// Clock generator.
    R0D_Clock = 0x0D,
    /// Data rate divider.
    R0E_DataRate = 0x0E,
    /// PLL I, the channel number.
    R0F_Channel = 0x0F,
    /// PLL II.
    R10_PllII = 0x10,
    /// PLL III.
    R11_PllIII = 0x11,
    /// PLL IV.
    R12_PllIV = 0x12,
    /// PLL V.
    R13_PllV = 0x13,
    /// TX I, frequency deviation shaping.
    R14_TxI = 0x14,
    /// TX II, frequency deviation.
    R15_TxII = 0x15,
    /// Delay I.
    R16_DelayI = 0x16,
    /// Delay II.
    R17_DelayII = 0x17,
    /// RX, demodulator and bandwidth.
    R18_Rx = 0x18,
    /// RX gain I.
    R19_RxGainI = 0x19,
    /// RX gain II.
    R1A_RxGainII = 0x1A,
    /// RX gain III.
    R1B_RxGainIII = 0x1B,
    /// RX gain IV.
    R1C_RxGainIV = 0x1C,
    /// RSSI threshold on write, RSSI value on read.
    R1D_RssiThreshold = 0x1D,
    /// ADC control.
    R1E_Adc = 0x1E,
    /// Code I (preamble, ID length, FEC/CRC enables).
    R1F_CodeI = 0x1F,
    /// Code II.
    R20_CodeII = 0x20,
    /// Code III.
    R21_CodeIII = 0x21,
    /// IF calibration I. Bit 4 is the filter bank calibration fail flag.
    R22_IfCalibI = 0x22,
    /// IF calibration II.
    R23_IfCalibII = 0x23,
    /// VCO current calibration.
    R24_VcoCurrentCalib = 0x24,
    /// VCO single band calibration I. Bit 3 is the VCO bank fail flag.
    R25_VcoBandCalibI = 0x25,
    /// VCO single band calibration II.
    R26_VcoBandCalibII = 0x26,
    /// Battery detect.
    R27_BatteryDetect = 0x27,
    /// TX test, carries the PA current and buffer gain.
    R28_TxTest = 0x28,
    /// RX demodulator test I.
    R29_RxDemTestI = 0x29,
    /// RX demodulator test II.
    R2A_RxDemTestII = 0x2A,
    /// Charge pump current.
    R2B_ChargePumpCurrent = 0x2B,
    /// Crystal test.
    R2C_XtalTest = 0x2C,
    /// PLL test.
    R2D_PllTest = 0x2D,
    /// VCO test I.
    R2E_VcoTestI = 0x2E,
    /// VCO test II.
    R2F_VcoTestII = 0x2F,
    /// IFAT.
    R30_Ifat = 0x30,
    /// RSCALE.
    R31_Rscale = 0x31,
    /// Filter test.
    R32_FilterTest = 0x32,
}

impl Register {
    /// The raw register offset.
    pub const fn addr(self) -> u8 {
        self as u8
    }
}

/// Single-byte mode transition commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
#[repr(u8)]
pub enum Strobe {
    /// Sleep mode.
    Sleep = 0x80,
    /// Idle mode.
    Idle = 0x90,
    /// Standby mode.
    Standby = 0xA0,
    /// PLL mode.
    Pll = 0xB0,
    /// Receive mode.
    Rx = 0xC0,
    /// Transmit the FIFO contents.
    Tx = 0xD0,
    /// Reset the FIFO write pointer.
    ResetWritePointer = 0xE0,
    /// Reset the FIFO read pointer.
    ResetReadPointer = 0xF0,
}

impl Strobe {
    /// The command byte sent on the bus.
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Output power settings, assuming the ~+16 dBm external amplifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum TxPower {
    /// -23 dBm
    Power100uW,
    /// -20 dBm
    Power300uW,
    /// -16 dBm
    Power1mW,
    /// -11 dBm
    Power3mW,
    /// -6 dBm
    Power10mW,
    /// 0 dBm
    Power30mW,
    /// 1 dBm
    Power100mW,
    /// 1 dBm, same register value as [`TxPower::Power100mW`]
    #[default]
    Power150mW,
}

impl TxPower {
    /// PA current (PAC) and TX buffer gain (TBG) for this level.
    pub const fn pac_tbg(self) -> (u8, u8) {
        match self {
            TxPower::Power100uW => (0, 0),
            TxPower::Power300uW => (0, 1),
            TxPower::Power1mW => (0, 2),
            TxPower::Power3mW => (0, 4),
            TxPower::Power10mW => (1, 5),
            TxPower::Power30mW => (2, 7),
            TxPower::Power100mW => (3, 7),
            TxPower::Power150mW => (3, 7),
        }
    }

    /// Value written to [`Register::R28_TxTest`].
    pub const fn tx_test_value(self) -> u8 {
        let (pac, tbg) = self.pac_tbg();
        (pac << 3) | tbg
    }
}
