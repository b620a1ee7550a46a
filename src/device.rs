//! SX1276 Register Access Layer
//!
//! This module provides the low-level interface used to talk to an SX1276 over SPI.
//! It supports both synchronous and asynchronous operations.
//!
//! Every access is one SPI transaction: the first byte carries the register address
//! with bit 7 set for a write and cleared for a read, followed by the data bytes.
//! Chip select is asserted for the duration of the transaction by the
//! [`SpiDevice`](embedded_hal::spi::SpiDevice) implementation, which makes each
//! register access atomic with respect to other users of the bus.
//!
//! The `Device<SPI>` struct provides methods for:
//! - Reading and writing typed registers
//! - Reading and writing raw register addresses
//! - Streaming bytes into and out of the packet FIFO
//!
//! # Example
//! ```no_run
//! # use embedded_hal::spi::SpiDevice;
//! # fn example<SPI: SpiDevice>(spi: SPI) -> Result<(), regiface::errors::Error> {
//! use sx1276::{Device, Version};
//!
//! let mut device = Device::new(spi);
//!
//! // Read a register
//! let version: Version = device.read_register()?;
//!
//! // Write the FIFO one byte at a time
//! device.write_fifo(&[0x01, 0x02, 0x03])?;
//! # Ok(())
//! # }
//! ```

use core::convert::Infallible;

use regiface::{
    errors::Error as RegifaceError, ByteArray, ReadableRegister, Register, WritableRegister,
};

use crate::registers::Fifo;

const WRITE_FLAG: u8 = 0x80;
const ADDRESS_MASK: u8 = 0x7F;

const fn read_header(address: u8) -> u8 {
    address & ADDRESS_MASK
}

const fn write_header(address: u8) -> u8 {
    (address & ADDRESS_MASK) | WRITE_FLAG
}

fn infallible<T>(result: Result<T, Infallible>) -> T {
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}

/// Main register interface for the SX1276 radio.
///
/// This struct wraps an SPI interface and provides methods to access the radio's
/// registers and FIFO. It supports both synchronous operations through the
/// embedded-hal traits and asynchronous operations through embedded-hal-async.
pub struct Device<SPI> {
    spi: SPI,
}

impl<SPI> Device<SPI> {
    /// Creates a new Device instance wrapping the provided SPI interface.
    ///
    /// # Arguments
    /// * `spi` - An SPI interface implementing the required embedded-hal traits
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Releases the underlying SPI device.
    ///
    /// This method consumes the Device instance and returns the wrapped SPI interface.
    pub fn release(self) -> SPI {
        self.spi
    }
}

impl<SPI> Device<SPI>
where
    SPI: embedded_hal::spi::SpiDevice,
{
    /// Reads a register value from the device.
    ///
    /// Registers wider than one byte are read in a single burst; the chip
    /// increments the address after each byte.
    ///
    /// # Errors
    /// * `RegifaceError::BusError` - SPI communication failed
    /// * `RegifaceError::DeserializationError` - Failed to parse register value
    pub fn read_register<R>(&mut self) -> Result<R, RegifaceError>
    where
        R: ReadableRegister<IdType = u8>,
    {
        let mut raw_value = R::Array::new();

        self.spi
            .transaction(&mut [
                embedded_hal::spi::Operation::Write(&[read_header(R::id())]),
                embedded_hal::spi::Operation::Read(raw_value.as_mut()),
            ])
            .map_err(|_| RegifaceError::BusError)?;

        R::from_bytes(raw_value).map_err(|_| RegifaceError::DeserializationError)
    }

    /// Writes a value to a device register.
    ///
    /// # Errors
    /// * `RegifaceError::BusError` - SPI communication failed
    pub fn write_register<R>(&mut self, register: R) -> Result<(), RegifaceError>
    where
        R: WritableRegister<IdType = u8, Error = Infallible>,
    {
        let raw_value = infallible(register.to_bytes());

        self.spi
            .transaction(&mut [
                embedded_hal::spi::Operation::Write(&[write_header(R::id())]),
                embedded_hal::spi::Operation::Write(raw_value.as_ref()),
            ])
            .map_err(|_| RegifaceError::BusError)
    }

    /// Reads one byte from a raw register address.
    ///
    /// Bit 7 of `address` is ignored.
    pub fn read(&mut self, address: u8) -> Result<u8, RegifaceError> {
        let mut value = [0u8];

        self.spi
            .transaction(&mut [
                embedded_hal::spi::Operation::Write(&[read_header(address)]),
                embedded_hal::spi::Operation::Read(&mut value),
            ])
            .map_err(|_| RegifaceError::BusError)?;

        Ok(value[0])
    }

    /// Writes one byte to a raw register address.
    ///
    /// Bit 7 of `address` is ignored.
    pub fn write(&mut self, address: u8, value: u8) -> Result<(), RegifaceError> {
        self.spi
            .transaction(&mut [
                embedded_hal::spi::Operation::Write(&[write_header(address)]),
                embedded_hal::spi::Operation::Write(&[value]),
            ])
            .map_err(|_| RegifaceError::BusError)
    }

    /// Writes bytes into the FIFO at the current FIFO pointer.
    ///
    /// Each byte is its own register write; the chip advances the FIFO pointer
    /// after every access.
    pub fn write_fifo(&mut self, bytes: &[u8]) -> Result<(), RegifaceError> {
        for &byte in bytes {
            self.write(Fifo::id(), byte)?;
        }
        Ok(())
    }

    /// Reads `len` bytes from the FIFO at the current FIFO pointer.
    ///
    /// All `len` bytes are always read so the FIFO pointer ends up past the packet;
    /// bytes that do not fit in `bytes` are discarded. Returns the number of bytes
    /// copied into `bytes`.
    pub fn read_fifo(&mut self, bytes: &mut [u8], len: usize) -> Result<usize, RegifaceError> {
        for index in 0..len {
            let value = self.read(Fifo::id())?;
            if let Some(slot) = bytes.get_mut(index) {
                *slot = value;
            }
        }
        Ok(len.min(bytes.len()))
    }
}

impl<SPI> Device<SPI>
where
    SPI: embedded_hal_async::spi::SpiDevice,
{
    /// Asynchronously reads a register value from the device.
    ///
    /// This is the async version of [`read_register`](Device::read_register).
    pub async fn read_register_async<R>(&mut self) -> Result<R, RegifaceError>
    where
        R: ReadableRegister<IdType = u8>,
    {
        let mut raw_value = R::Array::new();

        self.spi
            .transaction(&mut [
                embedded_hal_async::spi::Operation::Write(&[read_header(R::id())]),
                embedded_hal_async::spi::Operation::Read(raw_value.as_mut()),
            ])
            .await
            .map_err(|_| RegifaceError::BusError)?;

        R::from_bytes(raw_value).map_err(|_| RegifaceError::DeserializationError)
    }

    /// Asynchronously writes a value to a device register.
    ///
    /// This is the async version of [`write_register`](Device::write_register).
    pub async fn write_register_async<R>(&mut self, register: R) -> Result<(), RegifaceError>
    where
        R: WritableRegister<IdType = u8, Error = Infallible>,
    {
        let raw_value = infallible(register.to_bytes());

        self.spi
            .transaction(&mut [
                embedded_hal_async::spi::Operation::Write(&[write_header(R::id())]),
                embedded_hal_async::spi::Operation::Write(raw_value.as_ref()),
            ])
            .await
            .map_err(|_| RegifaceError::BusError)
    }

    /// Asynchronously reads one byte from a raw register address.
    ///
    /// This is the async version of [`read`](Device::read).
    pub async fn read_async(&mut self, address: u8) -> Result<u8, RegifaceError> {
        let mut value = [0u8];

        self.spi
            .transaction(&mut [
                embedded_hal_async::spi::Operation::Write(&[read_header(address)]),
                embedded_hal_async::spi::Operation::Read(&mut value),
            ])
            .await
            .map_err(|_| RegifaceError::BusError)?;

        Ok(value[0])
    }

    /// Asynchronously writes one byte to a raw register address.
    ///
    /// This is the async version of [`write`](Device::write).
    pub async fn write_async(&mut self, address: u8, value: u8) -> Result<(), RegifaceError> {
        self.spi
            .transaction(&mut [
                embedded_hal_async::spi::Operation::Write(&[write_header(address)]),
                embedded_hal_async::spi::Operation::Write(&[value]),
            ])
            .await
            .map_err(|_| RegifaceError::BusError)
    }

    /// Asynchronously writes bytes into the FIFO.
    ///
    /// This is the async version of [`write_fifo`](Device::write_fifo).
    pub async fn write_fifo_async(&mut self, bytes: &[u8]) -> Result<(), RegifaceError> {
        for &byte in bytes {
            self.write_async(Fifo::id(), byte).await?;
        }
        Ok(())
    }

    /// Asynchronously reads `len` bytes from the FIFO.
    ///
    /// This is the async version of [`read_fifo`](Device::read_fifo).
    pub async fn read_fifo_async(
        &mut self,
        bytes: &mut [u8],
        len: usize,
    ) -> Result<usize, RegifaceError> {
        for index in 0..len {
            let value = self.read_async(Fifo::id()).await?;
            if let Some(slot) = bytes.get_mut(index) {
                *slot = value;
            }
        }
        Ok(len.min(bytes.len()))
    }
}
