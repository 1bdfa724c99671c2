//! Hubsan operating profile and self-calibration of the A7105.
//!
//! [`A7105::configure`] writes the fixed register profile (25 kbps,
//! ~186 kHz deviation, 16 byte FIFO, continuous RSSI) and runs the IF
//! filter bank and VCO bank calibrations.
//!
//! Calibration problems never abort bring-up. A chip with stale
//! calibration values still flies, and there is no operator feedback
//! channel once airborne, so every pass is logged and recorded in a
//! [`CalibrationReport`] and the profile is applied regardless.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;

use crate::config::HubsanConfig;
use crate::consts::{
    CALIB_IF_FILTER, CALIB_VCO_BANK, IF_CALIB_FAIL, VCO_BANK_MASK, VCO_CALIB_CHANNELS,
    VCO_CALIB_FAIL, VCO_MANUAL_BANK,
};
use crate::driver::{A7105, RadioError};
use crate::regs::{Register, Strobe};

/// Register values of the Hubsan operating profile, in write order.
///
/// This is a hardware calibration table. Mode (0x00), the FIFO and ID
/// ports, the GIO pins and the calibration result registers are not part
/// of it.
pub const HUBSAN_PROFILE: [(Register, u8); 40] = [
    (Register::R01_ModeControl, 0x63),
    (Register::R03_FifoI, 0x0f),
    (Register::R04_FifoII, 0x00),
    (Register::R07_RcOscI, 0x00),
    (Register::R08_RcOscII, 0x00),
    (Register::R09_RcOscIII, 0x00),
    (Register::R0A_CkoPin, 0x00),
    (Register::R0D_Clock, 0x05),
    (Register::R0E_DataRate, 0x04),
    (Register::R0F_Channel, 0x00),
    (Register::R10_PllII, 0x9e),
    (Register::R11_PllIII, 0x4b),
    (Register::R12_PllIV, 0x00),
    (Register::R13_PllV, 0x02),
    (Register::R14_TxI, 0x16),
    (Register::R15_TxII, 0x2b),
    (Register::R16_DelayI, 0x12),
    (Register::R17_DelayII, 0x00),
    (Register::R18_Rx, 0x62),
    (Register::R19_RxGainI, 0x80),
    (Register::R1A_RxGainII, 0x80),
    (Register::R1B_RxGainIII, 0x00),
    (Register::R1C_RxGainIV, 0x0a),
    (Register::R1D_RssiThreshold, 0x32),
    (Register::R1E_Adc, 0xc3),
    (Register::R1F_CodeI, 0x07),
    (Register::R20_CodeII, 0x17),
    (Register::R21_CodeIII, 0x00),
    (Register::R26_VcoBandCalibII, 0x3b),
    (Register::R27_BatteryDetect, 0x00),
    (Register::R28_TxTest, 0x17),
    (Register::R29_RxDemTestI, 0x47),
    (Register::R2A_RxDemTestII, 0x80),
    (Register::R2B_ChargePumpCurrent, 0x03),
    (Register::R2C_XtalTest, 0x01),
    (Register::R2D_PllTest, 0x45),
    (Register::R2E_VcoTestI, 0x18),
    (Register::R2F_VcoTestII, 0x00),
    (Register::R30_Ifat, 0x01),
    (Register::R31_Rscale, 0x0f),
];

/// Result of a single calibration pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum CalOutcome {
    /// The pass completed and the fail flag was clear.
    Passed,
    /// The pass completed with the fail flag set.
    Failed,
    /// The calibration control register never self-cleared.
    TimedOut,
}

impl CalOutcome {
    /// Whether the pass completed cleanly.
    pub fn is_ok(self) -> bool {
        self == CalOutcome::Passed
    }
}

/// Outcome of all calibration passes run by [`A7105::configure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct CalibrationReport {
    /// IF filter bank pass.
    pub if_filter: CalOutcome,
    /// VCO current calibration value read after the IF pass.
    pub vco_current: u8,
    /// VCO bank passes at channel offsets 0x00 and 0xa0.
    pub vco_bank: [CalOutcome; 2],
    /// Bank value written back as manual override, if the second pass completed.
    pub vco_bank_override: Option<u8>,
}

impl CalibrationReport {
    /// Whether every pass completed cleanly.
    pub fn is_clean(&self) -> bool {
        self.if_filter.is_ok() && self.vco_bank.iter().all(|o| o.is_ok())
    }
}

impl<SPI, RXEN, TXEN, D> A7105<SPI, RXEN, TXEN, D>
where
    SPI: SpiDevice,
    RXEN: OutputPin,
    TXEN: OutputPin<Error = RXEN::Error>,
    D: DelayNs,
{
    /// Applies [`HUBSAN_PROFILE`], calibrates, sets the output power and
    /// leaves the chip in standby.
    ///
    /// Only bus errors are returned; calibration problems are reported in
    /// the [`CalibrationReport`].
    pub fn configure(
        &mut self,
        config: &HubsanConfig,
    ) -> Result<CalibrationReport, RadioError<SPI, RXEN>> {
        for (reg, value) in HUBSAN_PROFILE.iter() {
            self.write_register(*reg, *value)?;
        }
        self.strobe(Strobe::Standby)?;

        // IF filter bank
        self.strobe(Strobe::Pll)?;
        self.write_register(Register::R02_CalibControl, CALIB_IF_FILTER)?;
        let if_filter =
            if self.wait_calibration(config.if_cal_polls, config.cal_poll_interval_us)? {
                let status = self.read_register(Register::R22_IfCalibI)?;
                if status & IF_CALIB_FAIL != 0 {
                    CalOutcome::Failed
                } else {
                    CalOutcome::Passed
                }
            } else {
                CalOutcome::TimedOut
            };
        let vco_current = self.read_register(Register::R24_VcoCurrentCalib)?;
        if !if_filter.is_ok() {
            warn!("IF filter bank calibration: {:?}", if_filter);
        }

        // VCO bank, low and high end of the band
        let mut vco_bank = [CalOutcome::TimedOut; 2];
        let mut last_bank = None;
        for (outcome, channel) in vco_bank.iter_mut().zip(VCO_CALIB_CHANNELS) {
            self.set_channel(channel)?;
            self.write_register(Register::R02_CalibControl, CALIB_VCO_BANK)?;
            if self.wait_calibration(config.vco_cal_polls, config.cal_poll_interval_us)? {
                let status = self.read_register(Register::R25_VcoBandCalibI)?;
                *outcome = if status & VCO_CALIB_FAIL != 0 {
                    CalOutcome::Failed
                } else {
                    CalOutcome::Passed
                };
                last_bank = Some(status);
            } else {
                last_bank = None;
            }
            if !outcome.is_ok() {
                warn!("VCO bank calibration at {:#x}: {:?}", channel, *outcome);
            }
        }

        let vco_bank_override = match last_bank {
            Some(status) => {
                let value = (status & VCO_BANK_MASK) | VCO_MANUAL_BANK;
                self.write_register(Register::R25_VcoBandCalibI, value)?;
                Some(value)
            }
            None => None,
        };

        self.set_power(config.tx_power)?;
        self.strobe(Strobe::Standby)?;

        let report = CalibrationReport {
            if_filter,
            vco_current,
            vco_bank,
            vco_bank_override,
        };
        debug!("calibration done, clean: {}", report.is_clean());
        Ok(report)
    }

    /// Polls the calibration control register until it self-clears.
    fn wait_calibration(
        &mut self,
        polls: u16,
        interval_us: u32,
    ) -> Result<bool, RadioError<SPI, RXEN>> {
        for _ in 0..polls {
            if self.read_register(Register::R02_CalibControl)? == 0 {
                return Ok(true);
            }
            self.delay.delay_us(interval_us);
        }
        Ok(false)
    }
}
