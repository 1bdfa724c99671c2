//! Constants shared by the A7105 driver and the Hubsan protocol.
//!
//! This module defines the bus framing flags, the masks used to interpret
//! status registers, and the fixed values of the Hubsan wire protocol.
//!
//! ## Key Concepts
//!
//! - **Address flags**: OR-ed into the first byte of every register transaction.
//! - **Status masks**: bits of the mode and calibration registers checked by polling loops.
//! - **Channels**: the 12 RF channels the Hubsan receiver listens on.
//! - **Packet layout**: every packet, bind or data, is 16 bytes with a sum-to-zero checksum.
//!
//! These values are dictated by the transceiver and by the vehicle firmware
//! and are not tunable at runtime.

/// Read flag OR-ed into a register address.
pub const A7105_RW_READ: u8 = 0x40;

/// Write flag OR-ed into a register address.
pub const A7105_RW_WRITE: u8 = 0x00;

/// Bit 0 of the mode register: transmit/receive in progress.
pub const MODE_TRX_BUSY: u8 = 0x01;

/// Calibration control value starting the IF filter bank calibration.
pub const CALIB_IF_FILTER: u8 = 0x01;

/// Calibration control value starting the VCO bank calibration.
pub const CALIB_VCO_BANK: u8 = 0x02;

/// Fail flag (FBCF) in the IF calibration I register.
pub const IF_CALIB_FAIL: u8 = 1 << 4;

/// Fail flag (VBCF) in the VCO band calibration I register.
pub const VCO_CALIB_FAIL: u8 = 1 << 3;

/// Manual bank select (MVBS) bit when writing the VCO band calibration I register.
pub const VCO_MANUAL_BANK: u8 = 1 << 3;

/// VCO bank bits of the VCO band calibration I register.
pub const VCO_BANK_MASK: u8 = 0x07;

/// Channel offsets used by the two VCO bank calibration passes.
pub const VCO_CALIB_CHANNELS: [u8; 2] = [0x00, 0xa0];

/// GIO1 pin configuration routing SDO to GIO1 (four-wire SPI).
pub const GIO1_FOUR_WIRE_SPI: u8 = 0x19;

/// ID programmed at power-on, before the vehicle ID is known.
pub const BOOTSTRAP_ID: u32 = 0x5520_1041;

/// Code I value once bound: enables the FEC related code bit.
pub const CODE_I_BOUND: u8 = 0x0f;

/// Time the chip needs after power-on before the reset command (ms).
pub const POWER_ON_DELAY_MS: u32 = 10;

/// Length of every Hubsan packet.
pub const PACKET_LEN: usize = 16;

/// Index of the checksum byte.
pub const CHECKSUM_INDEX: usize = PACKET_LEN - 1;

/// Number of selectable RF channels.
pub const CHANNEL_COUNT: usize = 12;

/// Channels the Hubsan receiver accepts.
pub const ALLOWED_CHANNELS: [u8; CHANNEL_COUNT] = [
    0x14, 0x1e, 0x28, 0x32, 0x3c, 0x46, 0x50, 0x5a, 0x64, 0x6e, 0x78, 0x82,
];

/// Offset of the diversity channel used on the last step of every data cycle.
pub const DIVERSITY_CHANNEL_OFFSET: u8 = 0x23;

/// Fixed bytes 6..11 of every bind packet.
pub const BIND_MAGIC: [u8; 5] = [0x08, 0xe4, 0xea, 0x9e, 0x50];

/// Transmitter ID carried in bytes 11..15 of every bind packet.
pub const TX_ID: u32 = 0xdb04_2679;

/// Bind level announcing the session.
pub const LEVEL_ANNOUNCE: u8 = 1;

/// Bind level requesting the vehicle ID.
pub const LEVEL_ESCALATE: u8 = 3;

/// Bind level of the final synchronisation rounds.
pub const LEVEL_HANDSHAKE: u8 = 9;

/// Completion code the vehicle returns in byte 1 once the handshake is done.
pub const HANDSHAKE_COMPLETE: u8 = 9;

/// Index of the per-round sequence byte in level 9 bind packets.
pub const HANDSHAKE_ROUND_INDEX: usize = 2;

/// Upper bound on configurable level 9 rounds.
pub const MAX_HANDSHAKE_ROUNDS: usize = 16;

/// First byte of every flight-control packet.
pub const DATA_HEADER: u8 = 0x20;

/// Constant byte 10 of every flight-control packet.
pub const DATA_TRAILER: u8 = 0x19;

/// Neutral value of the rotational axes.
pub const AXIS_CENTER: u8 = 0x80;
