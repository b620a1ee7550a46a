#![cfg_attr(not(test), no_std)]
//! SX1276 Radio Driver
//!
//! This crate provides a type-safe interface for the Semtech SX1276 long range transceiver,
//! most commonly found on HopeRF RFM95W modules. The SX1276 is a half-duplex sub-GHz radio
//! with a LoRa® chirp spread spectrum modem and a shared 256 byte packet FIFO.
//!
//! # Features
//! - Frequency range: 137-1020 MHz
//! - Modulation support:
//!   - LoRa: SF7-12, BW 7.8-500kHz, CR 4/5-4/8
//! - Output power: +2 to +17 dBm on PA_BOOST, +20 dBm with the high power DAC
//! - Packet RSSI and SNR reporting
//!
//! # Architecture
//! The driver is organized into several modules:
//!
//! - [`device`]: Register access layer
//!   - Single register read and write transactions over SPI
//!   - Per-byte FIFO bursts
//!
//! - [`registers`]: Register definitions for direct hardware access
//!   - [`registers::common`]: Registers shared by every modem (mode, frequency, PA, ...)
//!   - [`registers::lora`]: LoRa page registers (FIFO pointers, IRQs, modem config, ...)
//!
//! - [`frequency`]: Carrier frequency to register word conversion
//! - [`config`]: Compiled-in radio configuration
//! - [`Sx1276`]: The radio handle, covering initialization, the operating mode
//!   state machine, packet framing and link quality reporting
//!
//! # Usage
//! Chip select is owned by the [`SpiDevice`](embedded_hal::spi::SpiDevice) implementation:
//! every register access is a single SPI transaction, so the bus implementation is
//! responsible for mutual exclusion when the bus is shared.
//!
//! 1. Create a new [`Sx1276`] with an SPI device, the reset pin and a delay provider
//! 2. Call [`Sx1276::init`] to reset, identify and configure the radio
//! 3. Call [`Sx1276::transmit`] to send a packet, or
//! 4. Call [`Sx1276::enter_receive_continuous`] followed by repeated
//!    [`Sx1276::poll_received_packet`] calls to receive
//!
//! # Example
//! ```no_run
//! use embedded_hal::{delay::DelayNs, digital::OutputPin, spi::SpiDevice};
//! use sx1276::{Config, Error, Sx1276};
//!
//! fn send_reading<SPI, RESET, DELAY>(spi: SPI, reset: RESET, delay: DELAY) -> Result<(), Error>
//! where
//!     SPI: SpiDevice,
//!     RESET: OutputPin,
//!     DELAY: DelayNs,
//! {
//!     let mut radio = Sx1276::new(spi, reset, delay, Config::default());
//!     radio.init()?;
//!     radio.transmit(b"T1:23.50,T2:23.10,H:55.00")?;
//!     Ok(())
//! }
//! ```
//!
//! # Important Notes
//! - Frequency, modem and PA configuration must be done in Sleep or Standby mode
//! - The LoRa mode bit can only be changed in Sleep mode and is kept set by every
//!   mode transition once [`Sx1276::init`] has set it
//! - Reception is polled; the DIO0 line is mapped to RxDone so callers may poll from
//!   an edge interrupt instead of a loop

pub mod config;
pub mod device;
mod error;
pub mod frequency;
mod link;
mod mode;
mod packet;
mod radio;
pub mod registers;

#[cfg(test)]
mod sim;

pub use config::*;
pub use device::Device;
pub use error::Error;
pub use packet::MAX_PAYLOAD_LEN;
pub use radio::Sx1276;
pub use registers::*;
