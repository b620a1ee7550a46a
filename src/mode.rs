//! Operating mode state machine
//!
//! The chip has no transition table of its own; any mode can be written at any time.
//! The driver follows Sleep -> Standby -> {Transmit | ReceiveContinuous} -> Standby,
//! and every write carries the LoRa bit once initialization has set it.

use crate::{
    registers::{Mode, OpMode},
    Error, Sx1276,
};

impl<SPI, RESET, DELAY> Sx1276<SPI, RESET, DELAY> {
    /// Last mode commanded by the driver.
    ///
    /// The chip leaves Transmit on its own when the packet has been sent, so this can
    /// lag behind the hardware until the next transition.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    fn op_mode(&self, mode: Mode) -> OpMode {
        OpMode {
            long_range_mode: self.long_range,
            low_frequency_mode: false,
            mode,
        }
    }
}

impl<SPI, RESET, DELAY> Sx1276<SPI, RESET, DELAY>
where
    SPI: embedded_hal::spi::SpiDevice,
{
    /// Writes the operating mode register.
    ///
    /// The full register byte is written, so the LoRa bit is kept.
    pub fn set_mode(&mut self, mode: Mode) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        defmt::trace!("set_mode({})", mode);

        self.device.write_register(self.op_mode(mode))?;
        self.mode = mode;
        Ok(())
    }

    /// Enters Sleep, the lowest power mode. FIFO contents are lost.
    pub fn sleep(&mut self) -> Result<(), Error> {
        self.set_mode(Mode::Sleep)
    }

    /// Enters Standby, aborting any transmission or reception in progress.
    pub fn standby(&mut self) -> Result<(), Error> {
        self.set_mode(Mode::Standby)
    }
}

impl<SPI, RESET, DELAY> Sx1276<SPI, RESET, DELAY>
where
    SPI: embedded_hal_async::spi::SpiDevice,
{
    /// Asynchronously writes the operating mode register.
    ///
    /// This is the async version of [`set_mode`](Sx1276::set_mode).
    pub async fn set_mode_async(&mut self, mode: Mode) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        defmt::trace!("set_mode({})", mode);

        self.device.write_register_async(self.op_mode(mode)).await?;
        self.mode = mode;
        Ok(())
    }

    /// Asynchronously enters Sleep.
    pub async fn sleep_async(&mut self) -> Result<(), Error> {
        self.set_mode_async(Mode::Sleep).await
    }

    /// Asynchronously enters Standby.
    pub async fn standby_async(&mut self) -> Result<(), Error> {
        self.set_mode_async(Mode::Standby).await
    }
}
