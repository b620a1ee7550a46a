//! Common registers
//!
//! This module contains registers shared by the LoRa and FSK/OOK register pages:
//! - FIFO data access
//! - Operating mode control
//! - Carrier frequency
//! - Power amplifier and LNA configuration
//! - DIO pin mapping
//! - Silicon version
//!
//! The operating mode register selects which page the other addresses refer to.
//! Everything in this driver assumes the LoRa page is selected.

use core::convert::Infallible;

use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

/// FIFO data register (address: 0x00)
///
/// Every read or write of this address accesses the FIFO byte at the position held in
/// [`FifoAddrPtr`](super::FifoAddrPtr) and then increments that pointer. Multi-byte
/// transfers must therefore be issued as one transaction per byte.
#[register(0x00u8)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct Fifo {
    /// Data byte
    pub value: u8,
}

/// Transceiver operating mode
///
/// Bits 2:0 of the operating mode register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Lowest power mode; the only mode in which the LoRa bit may be changed
    Sleep = 0,
    /// Crystal oscillator running, FIFO accessible
    Standby = 1,
    /// Frequency synthesis for transmit
    FsTx = 2,
    /// Transmit the packet held in the FIFO, then fall back to standby
    Transmit = 3,
    /// Frequency synthesis for receive
    FsRx = 4,
    /// Receive packets until another mode is requested
    ReceiveContinuous = 5,
    /// Receive a single packet, then fall back to standby
    ReceiveSingle = 6,
    /// Channel activity detection
    Cad = 7,
}

impl Mode {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0 => Self::Sleep,
            1 => Self::Standby,
            2 => Self::FsTx,
            3 => Self::Transmit,
            4 => Self::FsRx,
            5 => Self::ReceiveContinuous,
            6 => Self::ReceiveSingle,
            _ => Self::Cad,
        }
    }
}

/// Operating mode register (address: 0x01)
///
/// # Important Notes
/// - `long_range_mode` selects the LoRa modem and can only be modified in Sleep mode
/// - Writing the mode bits with `long_range_mode` cleared while in Sleep silently
///   switches the chip back to the FSK/OOK modem
/// - Mode changes are not instantaneous; allow the chip to settle after entering Sleep
#[register(0x01u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct OpMode {
    /// LoRa modem selected (bit 7)
    pub long_range_mode: bool,
    /// Low frequency (below 525 MHz) register bank selected (bit 3)
    pub low_frequency_mode: bool,
    /// Transceiver mode (bits 2:0)
    pub mode: Mode,
}

impl OpMode {
    pub(crate) const LONG_RANGE_MODE: u8 = 0x80;
    const LOW_FREQUENCY_MODE: u8 = 0x08;
}

/// Carrier frequency register, bits 23:16 (address: 0x06)
#[register(0x06u8)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct FrfMsb {
    /// Frequency word bits 23:16
    pub value: u8,
}

/// Carrier frequency register, bits 15:8 (address: 0x07)
#[register(0x07u8)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct FrfMid {
    /// Frequency word bits 15:8
    pub value: u8,
}

/// Carrier frequency register, bits 7:0 (address: 0x08)
///
/// The frequency change takes effect once this register is written.
#[register(0x08u8)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct FrfLsb {
    /// Frequency word bits 7:0
    pub value: u8,
}

/// Power amplifier configuration register (address: 0x09)
///
/// # Output Power
/// - PA_BOOST pin: Pout = 17 - (15 - output_power) dBm
/// - RFO pin: Pout = Pmax - (15 - output_power) dBm, Pmax = 10.8 + 0.6 * max_power
///
/// RFM95W modules only route the PA_BOOST pin to the antenna.
#[register(0x09u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct PaConfig {
    /// Output on PA_BOOST instead of RFO (bit 7)
    pub pa_boost: bool,
    /// Maximum power selection for RFO (bits 6:4)
    pub max_power: u8,
    /// Output power step (bits 3:0)
    pub output_power: u8,
}

impl Default for PaConfig {
    fn default() -> Self {
        Self {
            pa_boost: false,
            max_power: 0x4,
            output_power: 0xF,
        }
    }
}

/// Low noise amplifier register (address: 0x0C)
#[register(0x0Cu8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct Lna {
    /// LNA gain setting (bits 7:5), 1 = maximum gain
    pub gain: u8,
    /// Low frequency band current adjustment (bits 4:3)
    pub boost_lf: u8,
    /// High frequency band 150% LNA current (bits 1:0 = 0b11)
    pub boost_hf: bool,
}

/// DIO pin mapping register 1 (address: 0x40)
///
/// Each field selects which event drives the corresponding DIO pin.
/// In LoRa mode DIO0 mapping 0b00 is RxDone and 0b01 is TxDone.
#[register(0x40u8)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct DioMapping1 {
    /// DIO0 mapping (bits 7:6)
    pub dio0: u8,
    /// DIO1 mapping (bits 5:4)
    pub dio1: u8,
    /// DIO2 mapping (bits 3:2)
    pub dio2: u8,
    /// DIO3 mapping (bits 1:0)
    pub dio3: u8,
}

impl DioMapping1 {
    /// DIO0 signals RxDone
    pub const DIO0_RX_DONE: u8 = 0b00;
    /// DIO0 signals TxDone
    pub const DIO0_TX_DONE: u8 = 0b01;
}

/// Silicon version register (address: 0x42)
///
/// Read only. Bits 7:4 hold the full revision and bits 3:0 the metal mask revision.
#[register(0x42u8)]
#[derive(Debug, Clone, Copy, ReadableRegister)]
pub struct Version {
    /// Raw version value
    pub value: u8,
}

impl Version {
    /// Version reported by every production SX1276
    pub const SX1276: u8 = 0x12;
}

/// High power PA DAC register (address: 0x4D)
///
/// Enables the +20 dBm option on the PA_BOOST pin. Must be returned to the
/// default value before entering receive on some board designs.
#[register(0x4Du8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct PaDac {
    /// Raw DAC value
    pub value: u8,
}

impl PaDac {
    /// Default power output
    pub const DEFAULT: u8 = 0x84;
    /// +20 dBm on PA_BOOST when `output_power` is 15
    pub const HIGH_POWER: u8 = 0x87;
}

impl Default for PaDac {
    fn default() -> Self {
        Self {
            value: Self::DEFAULT,
        }
    }
}

byte_register!(Fifo, FrfMsb, FrfMid, FrfLsb, Version, PaDac);

impl FromByteArray for OpMode {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            long_range_mode: bytes[0] & Self::LONG_RANGE_MODE != 0,
            low_frequency_mode: bytes[0] & Self::LOW_FREQUENCY_MODE != 0,
            mode: Mode::from_bits(bytes[0]),
        })
    }
}

impl ToByteArray for OpMode {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let mut value = self.mode as u8;
        if self.long_range_mode {
            value |= Self::LONG_RANGE_MODE;
        }
        if self.low_frequency_mode {
            value |= Self::LOW_FREQUENCY_MODE;
        }
        Ok([value])
    }
}

impl FromByteArray for PaConfig {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            pa_boost: bytes[0] & 0x80 != 0,
            max_power: (bytes[0] >> 4) & 0x07,
            output_power: bytes[0] & 0x0F,
        })
    }
}

impl ToByteArray for PaConfig {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let boost = if self.pa_boost { 0x80 } else { 0x00 };
        Ok([boost | ((self.max_power & 0x07) << 4) | (self.output_power & 0x0F)])
    }
}

impl FromByteArray for Lna {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            gain: (bytes[0] >> 5) & 0x07,
            boost_lf: (bytes[0] >> 3) & 0x03,
            boost_hf: bytes[0] & 0x03 == 0x03,
        })
    }
}

impl ToByteArray for Lna {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let boost = if self.boost_hf { 0x03 } else { 0x00 };
        Ok([((self.gain & 0x07) << 5) | ((self.boost_lf & 0x03) << 3) | boost])
    }
}

impl FromByteArray for DioMapping1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            dio0: (bytes[0] >> 6) & 0x03,
            dio1: (bytes[0] >> 4) & 0x03,
            dio2: (bytes[0] >> 2) & 0x03,
            dio3: bytes[0] & 0x03,
        })
    }
}

impl ToByteArray for DioMapping1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([((self.dio0 & 0x03) << 6)
            | ((self.dio1 & 0x03) << 4)
            | ((self.dio2 & 0x03) << 2)
            | (self.dio3 & 0x03)])
    }
}
