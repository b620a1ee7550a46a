use embedded_hal::digital::OutputPin;

use crate::{
    config::Config,
    device::Device,
    frequency::FrequencyWord,
    registers::{
        FifoRxBaseAddr, FifoTxBaseAddr, FrfLsb, FrfMid, FrfMsb, Lna, MaxPayloadLength, Mode,
        PreambleLength, SyncWord, Version,
    },
    Error, TxPower,
};

/// Time the reset line is held low, and the time allowed for the oscillator to start
/// after it is released
pub(crate) const RESET_DELAY_MS: u32 = 10;
/// Time allowed for a mode change to take effect before configuration writes
pub(crate) const MODE_SETTLE_MS: u32 = 10;
/// Base address used for both directions so each packet may use the whole FIFO
pub(crate) const FIFO_BASE_ADDR: u8 = 0x00;

/// Handle to one SX1276 radio.
///
/// Owns the SPI device the radio sits on, its reset line and a delay provider, and
/// remembers the configuration and the last commanded operating mode. Every driver
/// operation goes through this handle; several radios can be driven by creating
/// several handles.
///
/// The DIO0 interrupt line is not owned by the driver. Reception is polled with
/// [`poll_received_packet`](Sx1276::poll_received_packet), which may equally be
/// called from a DIO0 edge handler.
pub struct Sx1276<SPI, RESET, DELAY> {
    pub(crate) device: Device<SPI>,
    pub(crate) reset: RESET,
    pub(crate) delay: DELAY,
    pub(crate) config: Config,
    pub(crate) long_range: bool,
    pub(crate) mode: Mode,
}

impl<SPI, RESET, DELAY> Sx1276<SPI, RESET, DELAY> {
    /// Creates a handle without touching the hardware.
    ///
    /// Call [`init`](Sx1276::init) before any other operation.
    pub fn new(spi: SPI, reset: RESET, delay: DELAY, config: Config) -> Self {
        Self {
            device: Device::new(spi),
            reset,
            delay,
            config,
            long_range: false,
            mode: Mode::Sleep,
        }
    }

    /// Configuration currently programmed, including the latest carrier frequency
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Carrier frequency in Hz
    pub fn frequency_hz(&self) -> u32 {
        self.config.frequency_hz
    }

    /// Direct register access, for registers this driver does not manage
    pub fn device(&mut self) -> &mut Device<SPI> {
        &mut self.device
    }

    /// Releases the SPI device, reset line and delay provider.
    pub fn release(self) -> (SPI, RESET, DELAY) {
        (self.device.release(), self.reset, self.delay)
    }
}

impl<SPI, RESET, DELAY> Sx1276<SPI, RESET, DELAY>
where
    SPI: embedded_hal::spi::SpiDevice,
    RESET: OutputPin,
    DELAY: embedded_hal::delay::DelayNs,
{
    /// Resets, identifies and configures the radio, leaving it in standby.
    ///
    /// # Sequence
    /// 1. Pulse the reset line low for 10 ms and wait 10 ms for the oscillator
    /// 2. Check the version register
    /// 3. Enter Sleep with the LoRa bit set and let the mode settle
    /// 4. Program frequency, modem, PA, LNA and FIFO base addresses
    /// 5. Enter Standby
    ///
    /// # Errors
    /// * `Error::DeviceNotFound` - The version register did not read as an SX1276.
    ///   Nothing has been configured and the handle must not be used; the whole
    ///   sequence may be retried.
    /// * `Error::InvalidConfiguration` - The configuration failed validation
    pub fn init(&mut self) -> Result<(), Error> {
        self.config.validate()?;

        #[cfg(feature = "defmt")]
        defmt::trace!("reset()");

        self.reset.set_low().map_err(|_| Error::Pin)?;
        self.delay.delay_ms(RESET_DELAY_MS);
        self.reset.set_high().map_err(|_| Error::Pin)?;
        self.delay.delay_ms(RESET_DELAY_MS);

        let version: Version = self.device.read_register()?;
        check_version(version)?;

        self.long_range = true;
        self.sleep()?;
        self.delay.delay_ms(MODE_SETTLE_MS);

        self.set_frequency(self.config.frequency_hz)?;
        self.device.write_register(self.config.modem_config1())?;
        self.device.write_register(self.config.modem_config2())?;
        self.device.write_register(self.config.modem_config3())?;
        self.device.write_register(PreambleLength {
            symbols: self.config.preamble_symbols,
        })?;
        self.device.write_register(SyncWord {
            value: self.config.sync_word,
        })?;
        self.device
            .write_register(MaxPayloadLength { value: u8::MAX })?;
        self.set_tx_power(self.config.tx_power)?;
        self.device.write_register(FifoTxBaseAddr {
            value: FIFO_BASE_ADDR,
        })?;
        self.device.write_register(FifoRxBaseAddr {
            value: FIFO_BASE_ADDR,
        })?;
        if self.config.lna_boost {
            let mut lna: Lna = self.device.read_register()?;
            lna.boost_hf = true;
            self.device.write_register(lna)?;
        }

        self.standby()?;

        #[cfg(feature = "defmt")]
        defmt::debug!("sx1276 initialized at {} Hz", self.config.frequency_hz);

        Ok(())
    }

    /// Programs the carrier frequency.
    ///
    /// The radio must be in Sleep or Standby. Changing the frequency while
    /// transmitting or receiving has undefined results.
    ///
    /// # Errors
    /// * `Error::InvalidConfiguration` - The frequency does not fit the 24-bit word
    pub fn set_frequency(&mut self, frequency_hz: u32) -> Result<(), Error> {
        let [msb, mid, lsb] = frequency_word(frequency_hz)?.to_bytes();

        self.device.write_register(FrfMsb { value: msb })?;
        self.device.write_register(FrfMid { value: mid })?;
        self.device.write_register(FrfLsb { value: lsb })?;
        self.config.frequency_hz = frequency_hz;

        #[cfg(feature = "defmt")]
        defmt::trace!("frequency set to {} Hz", frequency_hz);

        Ok(())
    }

    /// Programs the transmit output power.
    ///
    /// The radio must be in Sleep or Standby.
    pub fn set_tx_power(&mut self, tx_power: TxPower) -> Result<(), Error> {
        let pa_config = tx_power.pa_config()?;

        self.device.write_register(pa_config)?;
        self.device.write_register(tx_power.pa_dac())?;
        self.config.tx_power = tx_power;
        Ok(())
    }
}

impl<SPI, RESET, DELAY> Sx1276<SPI, RESET, DELAY>
where
    SPI: embedded_hal_async::spi::SpiDevice,
    RESET: OutputPin,
    DELAY: embedded_hal_async::delay::DelayNs,
{
    /// Asynchronously resets, identifies and configures the radio.
    ///
    /// This is the async version of [`init`](Sx1276::init).
    pub async fn init_async(&mut self) -> Result<(), Error> {
        self.config.validate()?;

        #[cfg(feature = "defmt")]
        defmt::trace!("reset()");

        self.reset.set_low().map_err(|_| Error::Pin)?;
        self.delay.delay_ms(RESET_DELAY_MS).await;
        self.reset.set_high().map_err(|_| Error::Pin)?;
        self.delay.delay_ms(RESET_DELAY_MS).await;

        let version: Version = self.device.read_register_async().await?;
        check_version(version)?;

        self.long_range = true;
        self.sleep_async().await?;
        self.delay.delay_ms(MODE_SETTLE_MS).await;

        self.set_frequency_async(self.config.frequency_hz).await?;
        self.device
            .write_register_async(self.config.modem_config1())
            .await?;
        self.device
            .write_register_async(self.config.modem_config2())
            .await?;
        self.device
            .write_register_async(self.config.modem_config3())
            .await?;
        self.device
            .write_register_async(PreambleLength {
                symbols: self.config.preamble_symbols,
            })
            .await?;
        self.device
            .write_register_async(SyncWord {
                value: self.config.sync_word,
            })
            .await?;
        self.device
            .write_register_async(MaxPayloadLength { value: u8::MAX })
            .await?;
        self.set_tx_power_async(self.config.tx_power).await?;
        self.device
            .write_register_async(FifoTxBaseAddr {
                value: FIFO_BASE_ADDR,
            })
            .await?;
        self.device
            .write_register_async(FifoRxBaseAddr {
                value: FIFO_BASE_ADDR,
            })
            .await?;
        if self.config.lna_boost {
            let mut lna: Lna = self.device.read_register_async().await?;
            lna.boost_hf = true;
            self.device.write_register_async(lna).await?;
        }

        self.standby_async().await?;

        #[cfg(feature = "defmt")]
        defmt::debug!("sx1276 initialized at {} Hz", self.config.frequency_hz);

        Ok(())
    }

    /// Asynchronously programs the carrier frequency.
    ///
    /// This is the async version of [`set_frequency`](Sx1276::set_frequency).
    pub async fn set_frequency_async(&mut self, frequency_hz: u32) -> Result<(), Error> {
        let [msb, mid, lsb] = frequency_word(frequency_hz)?.to_bytes();

        self.device
            .write_register_async(FrfMsb { value: msb })
            .await?;
        self.device
            .write_register_async(FrfMid { value: mid })
            .await?;
        self.device
            .write_register_async(FrfLsb { value: lsb })
            .await?;
        self.config.frequency_hz = frequency_hz;

        #[cfg(feature = "defmt")]
        defmt::trace!("frequency set to {} Hz", frequency_hz);

        Ok(())
    }

    /// Asynchronously programs the transmit output power.
    ///
    /// This is the async version of [`set_tx_power`](Sx1276::set_tx_power).
    pub async fn set_tx_power_async(&mut self, tx_power: TxPower) -> Result<(), Error> {
        let pa_config = tx_power.pa_config()?;

        self.device.write_register_async(pa_config).await?;
        self.device.write_register_async(tx_power.pa_dac()).await?;
        self.config.tx_power = tx_power;
        Ok(())
    }
}

fn check_version(version: Version) -> Result<(), Error> {
    if version.value != Version::SX1276 {
        #[cfg(feature = "defmt")]
        defmt::warn!("unexpected version register value {=u8:#x}", version.value);

        return Err(Error::DeviceNotFound {
            version: version.value,
        });
    }
    Ok(())
}

fn frequency_word(frequency_hz: u32) -> Result<FrequencyWord, Error> {
    FrequencyWord::from_hz(frequency_hz).ok_or(Error::InvalidConfiguration)
}
