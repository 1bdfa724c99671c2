//! Hubsan packet encoding.
//!
//! Every packet exchanged with the vehicle is 16 bytes long and ends in a
//! one byte checksum chosen so that all 16 bytes sum to zero (mod 256).
//!
//! ## Layouts
//!
//! Bind packet:
//!
//! | byte   | content |
//! |--------|---------|
//! | 0      | bind level (1, 3 or 9) |
//! | 1      | channel |
//! | 2..6   | session ID, big-endian (byte 2 is the round index at level 9) |
//! | 6..11  | `08 E4 EA 9E 50` |
//! | 11..15 | transmitter ID, big-endian |
//! | 15     | checksum |
//!
//! Flight-control packet:
//!
//! | byte | content |
//! |------|---------|
//! | 0    | `0x20` |
//! | 2    | throttle |
//! | 4    | `255 - rudder` |
//! | 6    | `255 - elevator` |
//! | 8    | aileron |
//! | 9    | flags |
//! | 10   | `0x19` |
//! | 15   | checksum |
//!
//! All other bytes are zero.

use crate::consts::{
    AXIS_CENTER, BIND_MAGIC, CHECKSUM_INDEX, DATA_HEADER, DATA_TRAILER, HANDSHAKE_ROUND_INDEX,
    PACKET_LEN, TX_ID,
};

/// A raw 16 byte Hubsan packet.
pub type Packet = [u8; PACKET_LEN];

/// Checksum over the first 15 bytes: `(256 - sum % 256) & 0xff`.
pub fn checksum(packet: &Packet) -> u8 {
    let sum = packet[..CHECKSUM_INDEX]
        .iter()
        .fold(0u8, |acc, b| acc.wrapping_add(*b));
    0u8.wrapping_sub(sum)
}

/// Writes the checksum into byte 15.
pub fn update_checksum(packet: &mut Packet) {
    packet[CHECKSUM_INDEX] = checksum(packet);
}

/// Whether all 16 bytes sum to zero.
pub fn verify_checksum(packet: &Packet) -> bool {
    packet.iter().fold(0u8, |acc, b| acc.wrapping_add(*b)) == 0
}

/// The vehicle ID carried in bytes 2..6 of a bind reply.
pub fn vehicle_id(reply: &Packet) -> u32 {
    u32::from_be_bytes([reply[2], reply[3], reply[4], reply[5]])
}

/// The completion code carried in byte 1 of a bind reply.
pub fn completion_code(reply: &Packet) -> u8 {
    reply[1]
}

/// Fields of a bind packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct BindPacket {
    /// Handshake level.
    pub level: u8,
    /// Session channel.
    pub channel: u8,
    /// Session identifier.
    pub session_id: u32,
    /// Level 9 round index, stored over byte 2.
    pub round: Option<u8>,
}

impl BindPacket {
    /// A bind packet without a round index.
    pub const fn new(level: u8, channel: u8, session_id: u32) -> Self {
        Self {
            level,
            channel,
            session_id,
            round: None,
        }
    }

    /// The same packet carrying round index `round`.
    pub const fn with_round(mut self, round: u8) -> Self {
        self.round = Some(round);
        self
    }

    /// Encodes the packet, checksum included.
    pub fn encode(&self) -> Packet {
        let mut packet = [0u8; PACKET_LEN];
        packet[0] = self.level;
        packet[1] = self.channel;
        packet[2..6].copy_from_slice(&self.session_id.to_be_bytes());
        packet[6..11].copy_from_slice(&BIND_MAGIC);
        packet[11..15].copy_from_slice(&TX_ID.to_be_bytes());
        if let Some(round) = self.round {
            packet[HANDSHAKE_ROUND_INDEX] = round;
        }
        update_checksum(&mut packet);
        packet
    }
}

/// The flags byte of a flight-control packet. Only bit 2 (LED) is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct Flags(pub u8);

impl Flags {
    /// LED control bit.
    pub const LED: u8 = 1 << 2;
    /// Default flags, LED on.
    pub const DEFAULT: Flags = Flags(0x0e);

    /// Whether the LED bit is set.
    pub const fn led(self) -> bool {
        self.0 & Self::LED != 0
    }

    /// Sets or clears the LED bit.
    pub fn set_led(&mut self, on: bool) {
        if on {
            self.0 |= Self::LED;
        } else {
            self.0 &= !Self::LED;
        }
    }
}

impl Default for Flags {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Axis values supplied by the command parser.
///
/// All axes range over `0..=255`; rudder, elevator and aileron are centered
/// at 128. Values are stored as the operator sees them: the rudder and
/// elevator inversion happens in [`FlightControls::encode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct FlightControls {
    /// Throttle.
    pub throttle: u8,
    /// Yaw.
    pub rudder: u8,
    /// Pitch.
    pub elevator: u8,
    /// Roll.
    pub aileron: u8,
    /// Flags byte.
    pub flags: Flags,
}

impl FlightControls {
    /// Zero throttle, centered sticks, LED on.
    pub const NEUTRAL: FlightControls = FlightControls {
        throttle: 0,
        rudder: AXIS_CENTER,
        elevator: AXIS_CENTER,
        aileron: AXIS_CENTER,
        flags: Flags::DEFAULT,
    };

    /// Encodes a flight-control packet, checksum included.
    pub fn encode(&self) -> Packet {
        let mut packet = [0u8; PACKET_LEN];
        packet[0] = DATA_HEADER;
        packet[2] = self.throttle;
        // rudder and elevator are reversed on the vehicle
        packet[4] = u8::MAX - self.rudder;
        packet[6] = u8::MAX - self.elevator;
        packet[8] = self.aileron;
        packet[9] = self.flags.0;
        packet[10] = DATA_TRAILER;
        update_checksum(&mut packet);
        packet
    }
}

impl Default for FlightControls {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_announce_packet_fields() {
        let packet = BindPacket::new(1, 0x14, 0x1122_3344).encode();
        assert_eq!(
            packet[..15],
            [
                0x01, 0x14, 0x11, 0x22, 0x33, 0x44, 0x08, 0xe4, 0xea, 0x9e, 0x50, 0xdb, 0x04, 0x26,
                0x79
            ]
        );
        assert!(verify_checksum(&packet));
    }

    #[test]
    fn test_round_index_overrides_byte_two() {
        let packet = BindPacket::new(9, 0x46, 0x1122_3344).with_round(7).encode();
        assert_eq!(packet[0], 9);
        assert_eq!(packet[2], 7);
        assert_eq!(packet[3..6], [0x22, 0x33, 0x44]);
        assert!(verify_checksum(&packet));
    }

    #[test]
    fn test_axis_inversion() {
        let controls = FlightControls {
            throttle: 100,
            rudder: 50,
            elevator: 200,
            aileron: 10,
            flags: Flags::DEFAULT,
        };
        let packet = controls.encode();
        assert_eq!(
            [packet[2], packet[4], packet[6], packet[8]],
            [100, 205, 55, 10]
        );
        assert_eq!(packet[0], 0x20);
        assert_eq!(packet[9], 0x0e);
        assert_eq!(packet[10], 0x19);
        assert!(verify_checksum(&packet));
    }

    #[test]
    fn test_encode_is_deterministic() {
        let controls = FlightControls {
            throttle: 0xfe,
            ..FlightControls::NEUTRAL
        };
        assert_eq!(controls.encode(), controls.encode());
    }

    #[test]
    fn test_checksum_sums_to_zero_for_any_axes() {
        for throttle in (0..=255u8).step_by(17) {
            for rudder in (0..=255u8).step_by(51) {
                let controls = FlightControls {
                    throttle,
                    rudder,
                    elevator: throttle ^ rudder,
                    aileron: rudder.wrapping_mul(3),
                    flags: Flags(throttle),
                };
                let packet = controls.encode();
                let sum: u32 = packet.iter().map(|b| u32::from(*b)).sum();
                assert_eq!(sum % 256, 0);
            }
        }
    }

    #[test]
    fn test_checksum_of_all_zero_prefix() {
        let packet = [0u8; PACKET_LEN];
        assert_eq!(checksum(&packet), 0);
        assert!(verify_checksum(&packet));
    }

    #[test]
    fn test_reply_fields() {
        let mut reply = [0u8; PACKET_LEN];
        reply[1] = 9;
        reply[2..6].copy_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(vehicle_id(&reply), 0xdead_beef);
        assert_eq!(completion_code(&reply), 9);
    }

    #[test]
    fn test_led_flag() {
        let mut flags = Flags::default();
        assert!(flags.led());
        flags.set_led(false);
        assert_eq!(flags, Flags(0x0a));
        flags.set_led(true);
        assert_eq!(flags, Flags::DEFAULT);
    }
}
