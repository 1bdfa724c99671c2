//! Simulated A7105 and Hubsan vehicle for tests.
//!
//! Decodes the register, strobe, ID and FIFO transactions issued by the
//! driver, keeps a register file, and answers bind packets the way a
//! vehicle in bind mode does.

#![allow(dead_code)]

use core::convert::Infallible;
use std::collections::HashMap;

use embedded_hal::spi::{ErrorType, Operation, SpiDevice};

use crate::consts::{LEVEL_HANDSHAKE, MODE_TRX_BUSY, PACKET_LEN};
use crate::packet::{Packet, update_checksum};
use crate::regs::{Register, Strobe};

#[derive(Debug)]
pub(crate) struct SimRadio {
    regs: [u8; 0x33],
    pub id: u32,
    pub id_history: Vec<u32>,
    strobes: Vec<Strobe>,
    reads: Vec<u8>,
    writes: Vec<u8>,
    answered: usize,
    busy: bool,
    airtime_left: usize,
    fifo: Vec<u8>,
    reply: Option<Packet>,
    unanswered: Option<Packet>,
    read_idx: usize,
    vco_pass: usize,
    rssi_idx: HashMap<u8, usize>,
    /// Every transmitted FIFO image with the channel it went out on.
    pub transmissions: Vec<(Packet, u8)>,
    pub if_calib_status: u8,
    pub vco_band_status: [u8; 2],
    pub calibration_stuck: bool,
    pub tx_stuck: bool,
    /// Mode register reads that still see the busy bit after each TX strobe.
    pub airtime_reads: usize,
    /// RSSI samples per channel, cycled.
    pub rssi: HashMap<u8, Vec<u8>>,
    /// Whether the vehicle answers bind packets at all.
    pub vehicle_present: bool,
    /// Number of bind listens the vehicle ignores before answering.
    pub drop_replies: usize,
    /// Bind packets the vehicle answers before falling silent.
    pub answer_limit: Option<usize>,
    /// Index of the reply whose payload is corrupted after checksumming.
    pub corrupt_reply: Option<usize>,
    pub vehicle_id: u32,
    /// Byte 1 of replies to level 9 packets.
    pub handshake_code: u8,
}

impl SimRadio {
    pub fn new() -> Self {
        Self {
            regs: [0u8; 0x33],
            id: 0,
            id_history: Vec::new(),
            strobes: Vec::new(),
            reads: Vec::new(),
            writes: Vec::new(),
            answered: 0,
            busy: false,
            airtime_left: 0,
            fifo: Vec::new(),
            reply: None,
            unanswered: None,
            read_idx: 0,
            vco_pass: 0,
            rssi_idx: HashMap::new(),
            transmissions: Vec::new(),
            if_calib_status: 0,
            vco_band_status: [0x03, 0x04],
            calibration_stuck: false,
            tx_stuck: false,
            airtime_reads: 0,
            rssi: HashMap::new(),
            vehicle_present: true,
            drop_replies: 0,
            answer_limit: None,
            corrupt_reply: None,
            vehicle_id: 0xc0ff_ee01,
            handshake_code: 9,
        }
    }

    pub fn reg(&self, reg: Register) -> u8 {
        self.regs[reg.addr() as usize]
    }

    pub fn last_strobe(&self) -> Option<Strobe> {
        self.strobes.last().copied()
    }

    pub fn reads_of(&self, reg: Register) -> usize {
        self.reads.iter().filter(|a| **a == reg.addr()).count()
    }

    pub fn writes_of(&self, reg: Register) -> usize {
        self.writes.iter().filter(|a| **a == reg.addr()).count()
    }

    /// Bind packets transmitted so far.
    pub fn bind_packets(&self) -> Vec<Packet> {
        self.transmissions
            .iter()
            .filter(|(p, _)| p[0] != 0x20)
            .map(|(p, _)| *p)
            .collect()
    }

    /// Flight-control packets transmitted so far, with their channel.
    pub fn data_packets(&self) -> Vec<(Packet, u8)> {
        self.transmissions
            .iter()
            .filter(|(p, _)| p[0] == 0x20)
            .copied()
            .collect()
    }

    fn read(&mut self, addr: u8) -> u8 {
        self.reads.push(addr);
        match addr {
            0x00 => {
                if self.airtime_left > 0 {
                    self.airtime_left -= 1;
                    MODE_TRX_BUSY
                } else if self.busy {
                    MODE_TRX_BUSY
                } else {
                    0
                }
            }
            0x02 => {
                if self.calibration_stuck {
                    self.regs[0x02]
                } else {
                    0
                }
            }
            0x05 => {
                let byte = self.reply.map(|r| r[self.read_idx % PACKET_LEN]).unwrap_or(0);
                self.read_idx += 1;
                byte
            }
            0x1d => {
                let channel = self.regs[0x0f];
                let idx = self.rssi_idx.entry(channel).or_insert(0);
                let value = match self.rssi.get(&channel) {
                    Some(samples) if !samples.is_empty() => samples[*idx % samples.len()],
                    _ => 0,
                };
                *idx += 1;
                value
            }
            0x22 => self.if_calib_status,
            0x25 => self.vco_band_status[self.vco_pass.saturating_sub(1).min(1)],
            _ => self.regs[addr as usize],
        }
    }

    fn write(&mut self, bytes: &[u8]) {
        let Some((&first, rest)) = bytes.split_first() else {
            return;
        };
        if first & 0x80 != 0 {
            self.strobe(first);
        } else if first == Register::R06_IdData.addr() {
            self.id = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]);
            self.id_history.push(self.id);
        } else if first == Register::R05_FifoData.addr() {
            self.fifo = rest.to_vec();
        } else {
            let value = rest[0];
            self.regs[first as usize] = value;
            self.writes.push(first);
            if first == Register::R02_CalibControl.addr() && value == 0x02 {
                self.vco_pass += 1;
            }
        }
    }

    fn strobe(&mut self, code: u8) {
        let strobe = match code {
            0x80 => Strobe::Sleep,
            0x90 => Strobe::Idle,
            0xa0 => Strobe::Standby,
            0xb0 => Strobe::Pll,
            0xc0 => Strobe::Rx,
            0xd0 => Strobe::Tx,
            0xe0 => Strobe::ResetWritePointer,
            0xf0 => Strobe::ResetReadPointer,
            other => panic!("unknown strobe {other:#x}"),
        };
        self.strobes.push(strobe);
        self.airtime_left = 0;
        match strobe {
            Strobe::Tx => {
                let mut packet = [0u8; PACKET_LEN];
                let len = self.fifo.len().min(PACKET_LEN);
                packet[..len].copy_from_slice(&self.fifo[..len]);
                self.transmissions.push((packet, self.regs[0x0f]));
                if packet[0] != 0x20 {
                    self.unanswered = Some(packet);
                }
                self.busy = self.tx_stuck;
                self.airtime_left = self.airtime_reads;
            }
            Strobe::Rx => {
                self.busy = true;
                if let Some(request) = self.unanswered.take() {
                    let exhausted = self.answer_limit.is_some_and(|n| self.answered >= n);
                    if self.vehicle_present && !exhausted && self.drop_replies == 0 {
                        self.reply = Some(self.answer(&request));
                        self.answered += 1;
                        self.busy = false;
                    } else {
                        self.drop_replies = self.drop_replies.saturating_sub(1);
                    }
                }
            }
            Strobe::ResetReadPointer => self.read_idx = 0,
            _ => self.busy = false,
        }
    }

    fn answer(&self, request: &Packet) -> Packet {
        let mut reply = *request;
        reply[1] = if request[0] == LEVEL_HANDSHAKE {
            self.handshake_code
        } else {
            request[0]
        };
        reply[2..6].copy_from_slice(&self.vehicle_id.to_be_bytes());
        update_checksum(&mut reply);
        if self.corrupt_reply == Some(self.answered) {
            reply[3] ^= 0xff;
        }
        reply
    }
}

impl ErrorType for SimRadio {
    type Error = Infallible;
}

impl SpiDevice<u8> for SimRadio {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Infallible> {
        let mut written: Vec<u8> = Vec::new();
        let mut was_read = false;
        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => written.extend_from_slice(bytes),
                Operation::Read(buf) => {
                    let addr = written[0] & 0x3f;
                    for byte in buf.iter_mut() {
                        *byte = self.read(addr);
                    }
                    was_read = true;
                }
                _ => panic!("unsupported SPI operation"),
            }
        }
        if !was_read {
            self.write(&written);
        }
        Ok(())
    }
}

/// Deterministic [`rand_core::RngCore`] returning a fixed word.
#[derive(Debug)]
pub(crate) struct FixedRng(pub u32);

impl rand_core::RngCore for FixedRng {
    fn next_u32(&mut self) -> u32 {
        self.0
    }

    fn next_u64(&mut self) -> u64 {
        rand_core::impls::next_u64_via_u32(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        rand_core::impls::fill_bytes_via_next(self, dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
