//! Compiled-in radio configuration
//!
//! A [`Config`] describes everything [`Sx1276::init`](crate::Sx1276::init) programs
//! into the radio. It is plain data, so applications typically declare it as a
//! `const` next to their pin assignments.
//!
//! ```
//! use sx1276::{Bandwidth, Config, SpreadingFactor};
//!
//! const RADIO: Config = Config {
//!     frequency_hz: 868_100_000,
//!     spreading_factor: SpreadingFactor::Sf9,
//!     bandwidth: Bandwidth::Khz125,
//!     ..Config::DEFAULT
//! };
//! assert!(RADIO.validate().is_ok());
//! ```

use crate::{
    frequency::{FrequencyWord, MAX_FREQUENCY_HZ, MIN_FREQUENCY_HZ},
    registers::{
        Bandwidth, CodingRate, ModemConfig1, ModemConfig2, ModemConfig3, PaConfig, PaDac,
        SpreadingFactor,
    },
    Error,
};

/// Longest symbol time, in microseconds, allowed without low data rate optimisation
const LOW_DATA_RATE_SYMBOL_US: u32 = 16_000;

/// Payload CRC policy
///
/// When enabled the transmitter appends a CRC and the receive path drops packets
/// flagged with a CRC error. Both ends of the link must agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CrcPolicy {
    /// Generate and check payload CRCs
    Enabled,
    /// No payload CRC; packets are delivered unchecked
    Disabled,
}

/// Transmit output power
///
/// RFM95W modules only connect the PA_BOOST pin, so RFO output is not offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxPower {
    /// PA_BOOST output from +2 to +17 dBm
    Boost(u8),
    /// +20 dBm using the high power PA DAC
    ///
    /// Limited to a 1% duty cycle by the datasheet.
    HighPower,
}

impl TxPower {
    /// Power amplifier register value for this setting
    pub fn pa_config(self) -> Result<PaConfig, Error> {
        let output_power = match self {
            Self::Boost(dbm @ 2..=17) => dbm - 2,
            Self::Boost(_) => return Err(Error::InvalidConfiguration),
            Self::HighPower => 15,
        };
        Ok(PaConfig {
            pa_boost: true,
            max_power: 0,
            output_power,
        })
    }

    /// PA DAC register value for this setting
    pub fn pa_dac(self) -> PaDac {
        match self {
            Self::Boost(_) => PaDac::default(),
            Self::HighPower => PaDac {
                value: PaDac::HIGH_POWER,
            },
        }
    }
}

/// Radio configuration applied during initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Carrier frequency in Hz
    pub frequency_hz: u32,
    /// Signal bandwidth
    pub bandwidth: Bandwidth,
    /// Forward error correction coding rate
    pub coding_rate: CodingRate,
    /// Spreading factor
    pub spreading_factor: SpreadingFactor,
    /// Payload CRC generation and checking
    pub crc: CrcPolicy,
    /// Transmit output power
    pub tx_power: TxPower,
    /// Preamble length in symbols
    pub preamble_symbols: u16,
    /// LoRa sync word
    pub sync_word: u8,
    /// Raise the LNA current in the high frequency band
    pub lna_boost: bool,
    /// Longest wait for TxDone, in milliseconds
    ///
    /// Never shorter than the time on air of the packet being sent, see
    /// [`Config::time_on_air_us`]. `None` waits for as long as it takes the radio to
    /// report completion.
    pub tx_timeout_ms: Option<u32>,
    /// Pause between two reads of the interrupt flags while waiting for TxDone
    pub tx_poll_interval_us: u32,
}

impl Config {
    /// 915 MHz, 125 kHz, 4/5, SF7, CRC on, +17 dBm
    pub const DEFAULT: Self = Self {
        frequency_hz: 915_000_000,
        bandwidth: Bandwidth::Khz125,
        coding_rate: CodingRate::Cr4_5,
        spreading_factor: SpreadingFactor::Sf7,
        crc: CrcPolicy::Enabled,
        tx_power: TxPower::Boost(17),
        preamble_symbols: 8,
        sync_word: 0x12,
        lna_boost: true,
        tx_timeout_ms: Some(2_000),
        tx_poll_interval_us: 100,
    };

    /// Checks that every setting can be programmed into the radio.
    pub fn validate(&self) -> Result<(), Error> {
        if !(MIN_FREQUENCY_HZ..=MAX_FREQUENCY_HZ).contains(&self.frequency_hz)
            || FrequencyWord::from_hz(self.frequency_hz).is_none()
        {
            return Err(Error::InvalidConfiguration);
        }
        if self.tx_poll_interval_us == 0 {
            return Err(Error::InvalidConfiguration);
        }
        self.tx_power.pa_config()?;
        Ok(())
    }

    /// Duration of one symbol in microseconds
    pub fn symbol_time_us(&self) -> u32 {
        (1_000_000u64 << self.spreading_factor as u32).div_ceil(self.bandwidth.hz() as u64) as u32
    }

    /// Time on air of a packet carrying `payload_len` bytes, in microseconds
    ///
    /// Counts the preamble, the explicit header and the payload CRC when enabled.
    pub fn time_on_air_us(&self, payload_len: u8) -> u64 {
        let sf = self.spreading_factor as i64;
        let low_data_rate = i64::from(self.modem_config3().low_data_rate_optimize);
        let crc = i64::from(self.crc == CrcPolicy::Enabled);

        let bits = 8 * i64::from(payload_len) - 4 * sf + 28 + 16 * crc;
        let bits_per_block = 4 * (sf - 2 * low_data_rate);
        let blocks = if bits > 0 {
            (bits + bits_per_block - 1) / bits_per_block
        } else {
            0
        };
        let payload_symbols = 8 + blocks * (self.coding_rate as i64 + 4);

        // preamble plus 4.25 symbols of sync, in quarter symbols
        let quarter_symbols =
            (4 * i64::from(self.preamble_symbols) + 17 + 4 * payload_symbols) as u64;
        ((quarter_symbols * 1_000_000) << sf).div_ceil(4 * u64::from(self.bandwidth.hz()))
    }

    pub(crate) fn modem_config1(&self) -> ModemConfig1 {
        ModemConfig1 {
            bandwidth: self.bandwidth,
            coding_rate: self.coding_rate,
            implicit_header: false,
        }
    }

    pub(crate) fn modem_config2(&self) -> ModemConfig2 {
        ModemConfig2 {
            spreading_factor: self.spreading_factor,
            tx_continuous: false,
            rx_payload_crc_on: self.crc == CrcPolicy::Enabled,
            symb_timeout_msb: 0,
        }
    }

    pub(crate) fn modem_config3(&self) -> ModemConfig3 {
        ModemConfig3 {
            low_data_rate_optimize: self.symbol_time_us() > LOW_DATA_RATE_SYMBOL_US,
            agc_auto_on: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::DEFAULT
    }
}
