//! LoRa page registers
//!
//! This module contains the registers that are only valid while the LoRa modem is
//! selected, including:
//! - FIFO pointer management
//! - Interrupt flags and masks
//! - Received packet information (length, RSSI, SNR)
//! - Modem configuration (bandwidth, coding rate, spreading factor, CRC)
//! - Preamble, payload length and sync word
//!
//! The 256 byte FIFO is shared by transmit and receive. Its split between the two
//! directions is purely a convention expressed by the TX and RX base addresses.

use bitflags::bitflags;
use core::convert::Infallible;

use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

/// FIFO SPI pointer register (address: 0x0D)
///
/// Position of the next FIFO access over SPI. Must be repositioned before every
/// FIFO burst; it is advanced by each access and never reset by the chip.
#[register(0x0Du8)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct FifoAddrPtr {
    /// FIFO offset
    pub value: u8,
}

/// FIFO transmit base address register (address: 0x0E)
#[register(0x0Eu8)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct FifoTxBaseAddr {
    /// FIFO offset at which the transmit payload starts
    pub value: u8,
}

/// FIFO receive base address register (address: 0x0F)
#[register(0x0Fu8)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct FifoRxBaseAddr {
    /// FIFO offset at which the demodulator starts writing received data
    pub value: u8,
}

/// Start of the last received packet (address: 0x10)
///
/// Read only. In continuous receive mode consecutive packets are written one after
/// another, so this is not necessarily the receive base address.
#[register(0x10u8)]
#[derive(Debug, Clone, Copy, ReadableRegister)]
pub struct FifoRxCurrentAddr {
    /// FIFO offset
    pub value: u8,
}

bitflags! {
    /// LoRa interrupt sources
    ///
    /// Used by both the flag register and the mask register. Flags are latched
    /// by the chip and cleared by writing a one to the corresponding bit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Irq: u8 {
        /// Receive timeout (single receive mode only)
        const RX_TIMEOUT = 1 << 7;
        /// Packet reception complete
        const RX_DONE = 1 << 6;
        /// Payload CRC error
        const PAYLOAD_CRC_ERROR = 1 << 5;
        /// Valid header received
        const VALID_HEADER = 1 << 4;
        /// Packet transmission complete
        const TX_DONE = 1 << 3;
        /// Channel activity detection complete
        const CAD_DONE = 1 << 2;
        /// Frequency hopping channel change
        const FHSS_CHANGE_CHANNEL = 1 << 1;
        /// Channel activity detected
        const CAD_DETECTED = 1;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Irq {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "Irq {{ 0b{=u8:08b} }}", self.bits())
    }
}

/// Interrupt mask register (address: 0x11)
///
/// A set bit masks the corresponding source; masked events do not latch
/// in [`IrqFlags`] and do not drive the DIO pins.
#[register(0x11u8)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct IrqFlagsMask {
    /// Masked interrupt sources
    pub masked: Irq,
}

/// Interrupt flag register (address: 0x12)
///
/// Writing a set bit clears that flag; cleared bits in the written value
/// leave the corresponding flags untouched.
#[register(0x12u8)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct IrqFlags {
    /// Latched interrupt sources
    pub flags: Irq,
}

/// Number of payload bytes of the last received packet (address: 0x13)
#[register(0x13u8)]
#[derive(Debug, Clone, Copy, ReadableRegister)]
pub struct RxNbBytes {
    /// Payload length in bytes
    pub value: u8,
}

/// SNR estimate of the last received packet (address: 0x19)
///
/// Two's complement value in steps of 0.25 dB.
#[register(0x19u8)]
#[derive(Debug, Clone, Copy, ReadableRegister)]
pub struct PktSnrValue {
    /// Raw SNR in quarter dB
    pub value: i8,
}

/// RSSI of the last received packet (address: 0x1A)
///
/// Must be offset by the band dependent constant to obtain dBm, see
/// [`Sx1276::packet_rssi`](crate::Sx1276::packet_rssi).
#[register(0x1Au8)]
#[derive(Debug, Clone, Copy, ReadableRegister)]
pub struct PktRssiValue {
    /// Raw RSSI
    pub value: u8,
}

/// Current RSSI (address: 0x1B)
#[register(0x1Bu8)]
#[derive(Debug, Clone, Copy, ReadableRegister)]
pub struct RssiValue {
    /// Raw RSSI
    pub value: u8,
}

/// Error type for bandwidth conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidBandwidth(pub u8);

/// Signal bandwidth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Bandwidth {
    /// 7.8 kHz
    Khz7_8 = 0x0,
    /// 10.4 kHz
    Khz10_4 = 0x1,
    /// 15.6 kHz
    Khz15_6 = 0x2,
    /// 20.8 kHz
    Khz20_8 = 0x3,
    /// 31.25 kHz
    Khz31_25 = 0x4,
    /// 41.7 kHz
    Khz41_7 = 0x5,
    /// 62.5 kHz
    Khz62_5 = 0x6,
    /// 125 kHz
    Khz125 = 0x7,
    /// 250 kHz
    Khz250 = 0x8,
    /// 500 kHz
    Khz500 = 0x9,
}

impl Bandwidth {
    /// Bandwidth in Hz
    pub const fn hz(self) -> u32 {
        match self {
            Self::Khz7_8 => 7_800,
            Self::Khz10_4 => 10_400,
            Self::Khz15_6 => 15_600,
            Self::Khz20_8 => 20_800,
            Self::Khz31_25 => 31_250,
            Self::Khz41_7 => 41_700,
            Self::Khz62_5 => 62_500,
            Self::Khz125 => 125_000,
            Self::Khz250 => 250_000,
            Self::Khz500 => 500_000,
        }
    }

    fn from_bits(bits: u8) -> Result<Self, InvalidBandwidth> {
        match bits {
            0x0 => Ok(Self::Khz7_8),
            0x1 => Ok(Self::Khz10_4),
            0x2 => Ok(Self::Khz15_6),
            0x3 => Ok(Self::Khz20_8),
            0x4 => Ok(Self::Khz31_25),
            0x5 => Ok(Self::Khz41_7),
            0x6 => Ok(Self::Khz62_5),
            0x7 => Ok(Self::Khz125),
            0x8 => Ok(Self::Khz250),
            0x9 => Ok(Self::Khz500),
            invalid => Err(InvalidBandwidth(invalid)),
        }
    }
}

/// Forward error correction coding rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodingRate {
    /// 4/5
    Cr4_5 = 0x1,
    /// 4/6
    Cr4_6 = 0x2,
    /// 4/7
    Cr4_7 = 0x3,
    /// 4/8
    Cr4_8 = 0x4,
}

/// Error type for modem configuration 1 decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModemConfig1Error {
    /// Bandwidth bits hold a reserved value
    Bandwidth(InvalidBandwidth),
    /// Coding rate bits hold a reserved value
    CodingRate(u8),
}

/// Modem configuration register 1 (address: 0x1D)
///
/// # Important Notes
/// - Both ends of the link must use the same bandwidth and coding rate
/// - Implicit header mode requires the payload length to be known in advance
///   on the receiver
#[register(0x1Du8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct ModemConfig1 {
    /// Signal bandwidth (bits 7:4)
    pub bandwidth: Bandwidth,
    /// Coding rate (bits 3:1)
    pub coding_rate: CodingRate,
    /// Implicit header mode (bit 0)
    pub implicit_header: bool,
}

/// Error type for spreading factor conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidSpreadingFactor(pub u8);

/// Spreading factor, in chips per symbol as a power of two
///
/// SF6 is not offered since it only works in implicit header mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpreadingFactor {
    /// 128 chips/symbol
    Sf7 = 7,
    /// 256 chips/symbol
    Sf8 = 8,
    /// 512 chips/symbol
    Sf9 = 9,
    /// 1024 chips/symbol
    Sf10 = 10,
    /// 2048 chips/symbol
    Sf11 = 11,
    /// 4096 chips/symbol
    Sf12 = 12,
}

/// Modem configuration register 2 (address: 0x1E)
#[register(0x1Eu8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct ModemConfig2 {
    /// Spreading factor (bits 7:4)
    pub spreading_factor: SpreadingFactor,
    /// Continuous transmit test mode (bit 3)
    pub tx_continuous: bool,
    /// Generate and check a payload CRC (bit 2)
    pub rx_payload_crc_on: bool,
    /// Receive timeout bits 9:8 (bits 1:0)
    pub symb_timeout_msb: u8,
}

/// Preamble length registers (address: 0x20-0x21)
///
/// Programmed length in symbols; the chip adds 4.25 symbols.
#[register(0x20u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct PreambleLength {
    /// Preamble length in symbols
    pub symbols: u16,
}

impl Default for PreambleLength {
    fn default() -> Self {
        Self { symbols: 8 }
    }
}

/// Payload length register (address: 0x22)
///
/// Number of bytes to transmit from the FIFO. Must not be zero.
#[register(0x22u8)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct PayloadLength {
    /// Payload length in bytes
    pub value: u8,
}

/// Maximum payload length register (address: 0x23)
///
/// Received packets longer than this are discarded by the modem.
#[register(0x23u8)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct MaxPayloadLength {
    /// Maximum payload length in bytes
    pub value: u8,
}

/// Modem configuration register 3 (address: 0x26)
#[register(0x26u8)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct ModemConfig3 {
    /// Mandated when the symbol length exceeds 16 ms (bit 3)
    pub low_data_rate_optimize: bool,
    /// LNA gain set by the internal AGC loop (bit 2)
    pub agc_auto_on: bool,
}

/// LoRa sync word register (address: 0x39)
///
/// 0x34 is reserved for LoRaWAN networks; 0x12 is the private network default.
#[register(0x39u8)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct SyncWord {
    /// Sync word
    pub value: u8,
}

impl Default for SyncWord {
    fn default() -> Self {
        Self { value: 0x12 }
    }
}

byte_register!(
    FifoAddrPtr,
    FifoTxBaseAddr,
    FifoRxBaseAddr,
    FifoRxCurrentAddr,
    RxNbBytes,
    PktRssiValue,
    RssiValue,
    PayloadLength,
    MaxPayloadLength,
    SyncWord,
);

impl FromByteArray for IrqFlagsMask {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            masked: Irq::from_bits_retain(bytes[0]),
        })
    }
}

impl ToByteArray for IrqFlagsMask {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.masked.bits()])
    }
}

impl FromByteArray for IrqFlags {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            flags: Irq::from_bits_retain(bytes[0]),
        })
    }
}

impl ToByteArray for IrqFlags {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.flags.bits()])
    }
}

impl FromByteArray for PktSnrValue {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            value: bytes[0] as i8,
        })
    }
}

impl FromByteArray for ModemConfig1 {
    type Error = ModemConfig1Error;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        let bandwidth =
            Bandwidth::from_bits(bytes[0] >> 4).map_err(ModemConfig1Error::Bandwidth)?;
        let coding_rate = match (bytes[0] >> 1) & 0x07 {
            0x1 => CodingRate::Cr4_5,
            0x2 => CodingRate::Cr4_6,
            0x3 => CodingRate::Cr4_7,
            0x4 => CodingRate::Cr4_8,
            invalid => return Err(ModemConfig1Error::CodingRate(invalid)),
        };

        Ok(Self {
            bandwidth,
            coding_rate,
            implicit_header: bytes[0] & 0x01 != 0,
        })
    }
}

impl ToByteArray for ModemConfig1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let header = if self.implicit_header { 0x01 } else { 0x00 };
        Ok([((self.bandwidth as u8) << 4) | ((self.coding_rate as u8) << 1) | header])
    }
}

impl FromByteArray for ModemConfig2 {
    type Error = InvalidSpreadingFactor;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        let spreading_factor = match bytes[0] >> 4 {
            7 => SpreadingFactor::Sf7,
            8 => SpreadingFactor::Sf8,
            9 => SpreadingFactor::Sf9,
            10 => SpreadingFactor::Sf10,
            11 => SpreadingFactor::Sf11,
            12 => SpreadingFactor::Sf12,
            invalid => return Err(InvalidSpreadingFactor(invalid)),
        };

        Ok(Self {
            spreading_factor,
            tx_continuous: bytes[0] & 0x08 != 0,
            rx_payload_crc_on: bytes[0] & 0x04 != 0,
            symb_timeout_msb: bytes[0] & 0x03,
        })
    }
}

impl ToByteArray for ModemConfig2 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let mut value = (self.spreading_factor as u8) << 4;
        if self.tx_continuous {
            value |= 0x08;
        }
        if self.rx_payload_crc_on {
            value |= 0x04;
        }
        Ok([value | (self.symb_timeout_msb & 0x03)])
    }
}

impl FromByteArray for PreambleLength {
    type Error = Infallible;
    type Array = [u8; 2];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            symbols: u16::from_be_bytes(bytes),
        })
    }
}

impl ToByteArray for PreambleLength {
    type Error = Infallible;
    type Array = [u8; 2];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok(self.symbols.to_be_bytes())
    }
}

impl FromByteArray for ModemConfig3 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            low_data_rate_optimize: bytes[0] & 0x08 != 0,
            agc_auto_on: bytes[0] & 0x04 != 0,
        })
    }
}

impl ToByteArray for ModemConfig3 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let mut value = 0x00;
        if self.low_data_rate_optimize {
            value |= 0x08;
        }
        if self.agc_auto_on {
            value |= 0x04;
        }
        Ok([value])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modem_config_matches_reference_values() {
        let config1 = ModemConfig1 {
            bandwidth: Bandwidth::Khz125,
            coding_rate: CodingRate::Cr4_5,
            implicit_header: false,
        };
        assert_eq!(config1.to_bytes().unwrap(), [0x72]);

        let config2 = ModemConfig2 {
            spreading_factor: SpreadingFactor::Sf7,
            tx_continuous: false,
            rx_payload_crc_on: true,
            symb_timeout_msb: 0,
        };
        assert_eq!(config2.to_bytes().unwrap(), [0x74]);

        let config3 = ModemConfig3 {
            low_data_rate_optimize: false,
            agc_auto_on: true,
        };
        assert_eq!(config3.to_bytes().unwrap(), [0x04]);
    }

    #[test]
    fn reserved_modem_values_are_rejected() {
        assert_eq!(
            ModemConfig1::from_bytes([0xA2]),
            Err(ModemConfig1Error::Bandwidth(InvalidBandwidth(0xA)))
        );
        assert_eq!(
            ModemConfig1::from_bytes([0x70]),
            Err(ModemConfig1Error::CodingRate(0))
        );
        assert_eq!(
            ModemConfig2::from_bytes([0x64]),
            Err(InvalidSpreadingFactor(6))
        );
    }

    #[test]
    fn irq_flags_keep_unknown_bits() {
        let flags = IrqFlags::from_bytes([0x68]).unwrap();
        assert!(flags.flags.contains(Irq::RX_DONE | Irq::PAYLOAD_CRC_ERROR | Irq::TX_DONE));
        assert_eq!(flags.to_bytes().unwrap(), [0x68]);
    }
}
