//! Carrier frequency synthesis
//!
//! The SX1276 PLL is programmed with a 24-bit word
//! `Frf = frequency * 2^19 / F_XOSC`, split across three consecutive registers.
//! All arithmetic is done in integers so the word is exact for any frequency,
//! avoiding the kHz level drift of a decimal scale factor.

/// Crystal oscillator frequency in Hz
pub const F_XOSC: u32 = 32_000_000;

/// Resolution of the frequency word: `F_XOSC / 2^19` Hz, about 61 Hz
pub const FREQUENCY_STEP_HZ: u32 = F_XOSC >> FRF_SHIFT;

const FRF_SHIFT: u32 = 19;
const FRF_MAX: u32 = 0x00FF_FFFF;

/// Lowest carrier frequency supported by the SX1276
pub const MIN_FREQUENCY_HZ: u32 = 137_000_000;
/// Highest carrier frequency supported by the SX1276
pub const MAX_FREQUENCY_HZ: u32 = 1_020_000_000;

/// 24-bit PLL frequency word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrequencyWord(u32);

impl FrequencyWord {
    /// Computes the word nearest to `frequency_hz`.
    ///
    /// Returns `None` if the result does not fit in 24 bits.
    pub const fn from_hz(frequency_hz: u32) -> Option<Self> {
        let scaled = ((frequency_hz as u64) << FRF_SHIFT) + (F_XOSC as u64 / 2);
        let word = scaled / F_XOSC as u64;
        if word > FRF_MAX as u64 {
            None
        } else {
            Some(Self(word as u32))
        }
    }

    /// Builds a word from its register value, discarding bits above 23.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw & FRF_MAX)
    }

    /// Carrier frequency in Hz represented by this word, rounded to the nearest Hz.
    pub const fn to_hz(self) -> u32 {
        let scaled = (self.0 as u64 * F_XOSC as u64) + (1 << (FRF_SHIFT - 1));
        (scaled >> FRF_SHIFT) as u32
    }

    /// Raw 24-bit register value
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Register bytes in write order: bits 23:16, 15:8, 7:0.
    pub const fn to_bytes(self) -> [u8; 3] {
        [(self.0 >> 16) as u8, (self.0 >> 8) as u8, self.0 as u8]
    }

    /// Rebuilds a word from the three register bytes, most significant first.
    pub const fn from_bytes(bytes: [u8; 3]) -> Self {
        Self(((bytes[0] as u32) << 16) | ((bytes[1] as u32) << 8) | bytes[2] as u32)
    }
}
