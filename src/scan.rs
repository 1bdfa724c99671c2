//! Channel selection by received signal strength.
//!
//! Each of the twelve allowed Hubsan channels is tuned in RX and its RSSI
//! register sampled a fixed number of times. The channel with the highest
//! accumulated reading wins; ties go to the lowest channel.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;

use crate::consts::{ALLOWED_CHANNELS, CHANNEL_COUNT};
use crate::driver::{A7105, RadioError};
use crate::regs::Strobe;

/// Accumulated RSSI per allowed channel and the selected channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct ScanReport {
    /// Selected channel.
    pub channel: u8,
    /// Index of the selected channel in [`ALLOWED_CHANNELS`].
    pub index: usize,
    /// Sum of all samples, in [`ALLOWED_CHANNELS`] order.
    pub sums: [u32; CHANNEL_COUNT],
}

/// Index of the largest sum. The first of several equal maxima wins.
pub fn strongest(sums: &[u32]) -> usize {
    let mut best = 0;
    for (i, sum) in sums.iter().enumerate().skip(1) {
        if *sum > sums[best] {
            best = i;
        }
    }
    best
}

impl<SPI, RXEN, TXEN, D> A7105<SPI, RXEN, TXEN, D>
where
    SPI: SpiDevice,
    RXEN: OutputPin,
    TXEN: OutputPin<Error = RXEN::Error>,
    D: DelayNs,
{
    /// Samples every allowed channel `samples` times, `spacing_us` apart,
    /// and returns the one with the highest accumulated RSSI.
    ///
    /// The chip is left in standby.
    pub fn select_channel(
        &mut self,
        samples: u8,
        spacing_us: u32,
    ) -> Result<ScanReport, RadioError<SPI, RXEN>> {
        let mut sums = [0u32; CHANNEL_COUNT];
        for (sum, channel) in sums.iter_mut().zip(ALLOWED_CHANNELS) {
            self.set_channel(channel)?;
            self.strobe(Strobe::Pll)?;
            self.strobe(Strobe::Rx)?;
            for _ in 0..samples {
                *sum += u32::from(self.read_rssi()?);
                if spacing_us > 0 {
                    self.delay.delay_us(spacing_us);
                }
            }
        }
        self.strobe(Strobe::Standby)?;

        let index = strongest(&sums);
        let channel = ALLOWED_CHANNELS[index];
        debug!("channel scan {:?}, selected {:#x}", sums, channel);
        Ok(ScanReport {
            channel,
            index,
            sums,
        })
    }
}
