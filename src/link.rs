//! Link quality of the last received packet

use crate::{
    registers::{PktRssiValue, PktSnrValue, RssiValue},
    Error, Sx1276,
};

/// Carrier frequencies at or above this use the high frequency RSSI calibration
const HIGH_BAND_START_HZ: u32 = 868_000_000;
const RSSI_OFFSET_LOW_BAND: i16 = -164;
const RSSI_OFFSET_HIGH_BAND: i16 = -157;

fn rssi_dbm(raw: u8, frequency_hz: u32) -> i16 {
    let offset = if frequency_hz < HIGH_BAND_START_HZ {
        RSSI_OFFSET_LOW_BAND
    } else {
        RSSI_OFFSET_HIGH_BAND
    };
    i16::from(raw) + offset
}

impl<SPI, RESET, DELAY> Sx1276<SPI, RESET, DELAY>
where
    SPI: embedded_hal::spi::SpiDevice,
{
    /// RSSI of the last received packet, in dBm.
    ///
    /// Only meaningful right after a successful
    /// [`poll_received_packet`](Sx1276::poll_received_packet): the next packet
    /// overwrites the register.
    pub fn packet_rssi(&mut self) -> Result<i16, Error> {
        let raw: PktRssiValue = self.device.read_register()?;
        Ok(rssi_dbm(raw.value, self.config.frequency_hz))
    }

    /// SNR of the last received packet, in dB, rounded towards zero.
    pub fn packet_snr(&mut self) -> Result<i8, Error> {
        let raw: PktSnrValue = self.device.read_register()?;
        Ok(raw.value / 4)
    }

    /// Current RSSI on the channel, in dBm.
    ///
    /// Only valid while receiving.
    pub fn rssi(&mut self) -> Result<i16, Error> {
        let raw: RssiValue = self.device.read_register()?;
        Ok(rssi_dbm(raw.value, self.config.frequency_hz))
    }
}

impl<SPI, RESET, DELAY> Sx1276<SPI, RESET, DELAY>
where
    SPI: embedded_hal_async::spi::SpiDevice,
{
    /// Asynchronously reads the RSSI of the last received packet.
    ///
    /// This is the async version of [`packet_rssi`](Sx1276::packet_rssi).
    pub async fn packet_rssi_async(&mut self) -> Result<i16, Error> {
        let raw: PktRssiValue = self.device.read_register_async().await?;
        Ok(rssi_dbm(raw.value, self.config.frequency_hz))
    }

    /// Asynchronously reads the SNR of the last received packet.
    ///
    /// This is the async version of [`packet_snr`](Sx1276::packet_snr).
    pub async fn packet_snr_async(&mut self) -> Result<i8, Error> {
        let raw: PktSnrValue = self.device.read_register_async().await?;
        Ok(raw.value / 4)
    }
}
