//! Packet framing over the shared FIFO
//!
//! Transmit and receive both use FIFO base address 0, so every operation
//! repositions the FIFO pointer before touching the FIFO. Interrupt flags are
//! latched by the chip and are always cleared by the driver once acted upon.

use crate::{
    config::{Config, CrcPolicy},
    radio::FIFO_BASE_ADDR,
    registers::{
        DioMapping1, FifoAddrPtr, FifoRxCurrentAddr, Irq, IrqFlags, IrqFlagsMask, Mode,
        PayloadLength, RxNbBytes,
    },
    Error, Sx1276,
};

/// Largest payload the FIFO and the payload length register can hold
pub const MAX_PAYLOAD_LEN: usize = 255;

fn payload_len(payload: &[u8]) -> Result<u8, Error> {
    u8::try_from(payload.len()).map_err(|_| Error::PayloadTooLarge { len: payload.len() })
}

/// Bounded wait for TxDone, measured in poll intervals.
struct TxWait {
    interval_us: u32,
    remaining_us: Option<u64>,
}

impl TxWait {
    fn new(config: &Config, payload_len: u8) -> Self {
        let time_on_air_us = config.time_on_air_us(payload_len);
        Self {
            interval_us: config.tx_poll_interval_us,
            remaining_us: config
                .tx_timeout_ms
                .map(|ms| (u64::from(ms) * 1_000).max(time_on_air_us)),
        }
    }

    /// Accounts for one more poll interval; false once the timeout has elapsed.
    fn tick(&mut self) -> bool {
        match self.remaining_us.as_mut() {
            Some(remaining) if *remaining == 0 => false,
            Some(remaining) => {
                *remaining = remaining.saturating_sub(u64::from(self.interval_us));
                true
            }
            None => true,
        }
    }
}

fn is_rx_crc_failure(policy: CrcPolicy, flags: Irq) -> bool {
    policy == CrcPolicy::Enabled && flags.contains(Irq::PAYLOAD_CRC_ERROR)
}

fn received(packet_len: usize, copied: usize) -> Result<Option<usize>, Error> {
    if copied < packet_len {
        #[cfg(feature = "defmt")]
        defmt::warn!("received {} bytes, buffer holds {}", packet_len, copied);

        return Err(Error::Truncated { packet_len, copied });
    }

    #[cfg(feature = "defmt")]
    defmt::debug!("received {} bytes", packet_len);

    Ok(Some(copied))
}

impl<SPI, RESET, DELAY> Sx1276<SPI, RESET, DELAY>
where
    SPI: embedded_hal::spi::SpiDevice,
    DELAY: embedded_hal::delay::DelayNs,
{
    /// Transmits `payload` and blocks until the radio reports TxDone.
    ///
    /// The payload is copied into the FIFO from offset 0, the radio is put in
    /// Transmit, and the interrupt flags are polled every
    /// [`tx_poll_interval_us`](crate::Config::tx_poll_interval_us). The radio is
    /// back in Standby when this returns, whether it succeeded or timed out.
    ///
    /// # Errors
    /// * `Error::PayloadTooLarge` - `payload` is longer than 255 bytes
    /// * `Error::TransmitTimeout` - TxDone was not raised within
    ///   [`tx_timeout_ms`](crate::Config::tx_timeout_ms)
    pub fn transmit(&mut self, payload: &[u8]) -> Result<(), Error> {
        let len = payload_len(payload)?;

        self.standby()?;
        self.device.write_register(FifoAddrPtr {
            value: FIFO_BASE_ADDR,
        })?;
        self.device.write_fifo(payload)?;
        self.device.write_register(PayloadLength { value: len })?;
        self.set_mode(Mode::Transmit)?;

        #[cfg(feature = "defmt")]
        defmt::debug!("transmitting {} bytes", len);

        let mut wait = TxWait::new(&self.config, len);
        loop {
            let irq: IrqFlags = self.device.read_register()?;
            if irq.flags.contains(Irq::TX_DONE) {
                break;
            }
            if !wait.tick() {
                #[cfg(feature = "defmt")]
                defmt::warn!("transmit timed out");

                self.standby()?;
                return Err(Error::TransmitTimeout);
            }
            self.delay.delay_us(wait.interval_us);
        }

        self.device.write_register(IrqFlags { flags: Irq::all() })?;
        self.standby()
    }

    /// Arms continuous reception.
    ///
    /// Repositions the FIFO pointer to the receive base address, routes RxDone to
    /// DIO0, enters ReceiveContinuous and unmasks all interrupt sources. Packets are
    /// then collected with [`poll_received_packet`](Sx1276::poll_received_packet).
    pub fn enter_receive_continuous(&mut self) -> Result<(), Error> {
        self.standby()?;
        self.device.write_register(FifoAddrPtr {
            value: FIFO_BASE_ADDR,
        })?;
        self.device.write_register(DioMapping1 {
            dio0: DioMapping1::DIO0_RX_DONE,
            ..Default::default()
        })?;
        self.set_mode(Mode::ReceiveContinuous)?;
        self.device.write_register(IrqFlagsMask {
            masked: Irq::empty(),
        })?;
        Ok(())
    }

    /// Collects a received packet, if one is waiting.
    ///
    /// Takes a single snapshot of the interrupt flags and clears exactly the flags it
    /// observed, so events raised after the snapshot stay pending for the next poll.
    /// Returns `Ok(None)` when no packet has arrived, or when the packet failed its
    /// CRC and the CRC policy is enabled. Otherwise returns the number of bytes
    /// copied into `buffer`.
    ///
    /// # Errors
    /// * `Error::Truncated` - The packet is longer than `buffer`. The packet has still
    ///   been drained from the FIFO and `buffer` holds its first bytes.
    pub fn poll_received_packet(&mut self, buffer: &mut [u8]) -> Result<Option<usize>, Error> {
        let snapshot: IrqFlags = self.device.read_register()?;
        if !snapshot.flags.contains(Irq::RX_DONE) {
            return Ok(None);
        }
        self.device.write_register(snapshot)?;

        if is_rx_crc_failure(self.config.crc, snapshot.flags) {
            #[cfg(feature = "defmt")]
            defmt::debug!("dropping packet with CRC error");

            return Ok(None);
        }

        let packet_len = self.device.read_register::<RxNbBytes>()?.value as usize;
        let current: FifoRxCurrentAddr = self.device.read_register()?;
        self.device.write_register(FifoAddrPtr {
            value: current.value,
        })?;
        let copied = self.device.read_fifo(buffer, packet_len)?;

        received(packet_len, copied)
    }
}

impl<SPI, RESET, DELAY> Sx1276<SPI, RESET, DELAY>
where
    SPI: embedded_hal_async::spi::SpiDevice,
    DELAY: embedded_hal_async::delay::DelayNs,
{
    /// Asynchronously transmits `payload`.
    ///
    /// This is the async version of [`transmit`](Sx1276::transmit). The wait for
    /// TxDone yields to the executor between polls; dropping the future abandons the
    /// wait, after which [`standby_async`](Sx1276::standby_async) should be called
    /// before the next operation.
    pub async fn transmit_async(&mut self, payload: &[u8]) -> Result<(), Error> {
        let len = payload_len(payload)?;

        self.standby_async().await?;
        self.device
            .write_register_async(FifoAddrPtr {
                value: FIFO_BASE_ADDR,
            })
            .await?;
        self.device.write_fifo_async(payload).await?;
        self.device
            .write_register_async(PayloadLength { value: len })
            .await?;
        self.set_mode_async(Mode::Transmit).await?;

        #[cfg(feature = "defmt")]
        defmt::debug!("transmitting {} bytes", len);

        let mut wait = TxWait::new(&self.config, len);
        loop {
            let irq: IrqFlags = self.device.read_register_async().await?;
            if irq.flags.contains(Irq::TX_DONE) {
                break;
            }
            if !wait.tick() {
                #[cfg(feature = "defmt")]
                defmt::warn!("transmit timed out");

                self.standby_async().await?;
                return Err(Error::TransmitTimeout);
            }
            self.delay.delay_us(wait.interval_us).await;
        }

        self.device
            .write_register_async(IrqFlags { flags: Irq::all() })
            .await?;
        self.standby_async().await
    }

    /// Asynchronously arms continuous reception.
    ///
    /// This is the async version of
    /// [`enter_receive_continuous`](Sx1276::enter_receive_continuous).
    pub async fn enter_receive_continuous_async(&mut self) -> Result<(), Error> {
        self.standby_async().await?;
        self.device
            .write_register_async(FifoAddrPtr {
                value: FIFO_BASE_ADDR,
            })
            .await?;
        self.device
            .write_register_async(DioMapping1 {
                dio0: DioMapping1::DIO0_RX_DONE,
                ..Default::default()
            })
            .await?;
        self.set_mode_async(Mode::ReceiveContinuous).await?;
        self.device
            .write_register_async(IrqFlagsMask {
                masked: Irq::empty(),
            })
            .await?;
        Ok(())
    }

    /// Asynchronously collects a received packet, if one is waiting.
    ///
    /// This is the async version of
    /// [`poll_received_packet`](Sx1276::poll_received_packet).
    pub async fn poll_received_packet_async(
        &mut self,
        buffer: &mut [u8],
    ) -> Result<Option<usize>, Error> {
        let snapshot: IrqFlags = self.device.read_register_async().await?;
        if !snapshot.flags.contains(Irq::RX_DONE) {
            return Ok(None);
        }
        self.device.write_register_async(snapshot).await?;

        if is_rx_crc_failure(self.config.crc, snapshot.flags) {
            #[cfg(feature = "defmt")]
            defmt::debug!("dropping packet with CRC error");

            return Ok(None);
        }

        let packet_len = self
            .device
            .read_register_async::<RxNbBytes>()
            .await?
            .value as usize;
        let current: FifoRxCurrentAddr = self.device.read_register_async().await?;
        self.device
            .write_register_async(FifoAddrPtr {
                value: current.value,
            })
            .await?;
        let copied = self.device.read_fifo_async(buffer, packet_len).await?;

        received(packet_len, copied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Access, SimulatedChip};
    use embedded_hal_mock::eh1::{
        delay::NoopDelay,
        digital::{Mock as DigitalMock, State, Transaction as GpioTransaction},
    };

    const READING: &[u8] = b"T1:23.50,T2:23.10,H:55.00";

    fn radio(
        chip: &SimulatedChip,
        config: Config,
    ) -> (Sx1276<SimulatedChip, DigitalMock, NoopDelay>, DigitalMock) {
        let reset = DigitalMock::new(&[
            GpioTransaction::set(State::Low),
            GpioTransaction::set(State::High),
        ]);
        let mut radio = Sx1276::new(chip.clone(), reset.clone(), NoopDelay::new(), config);
        radio.init().unwrap();
        chip.clear_log();
        (radio, reset)
    }

    #[test]
    fn transmit_frames_payload_at_fifo_start() {
        let chip = SimulatedChip::new();
        chip.complete_tx_after(3);
        let (mut radio, mut reset) = radio(&chip, Config::DEFAULT);

        radio.transmit(READING).unwrap();

        let log = chip.log();
        let mut expected = vec![Access::Write(0x01, 0x81), Access::Write(0x0D, 0x00)];
        expected.extend(READING.iter().map(|&byte| Access::Write(0x00, byte)));
        expected.extend([
            Access::Write(0x22, READING.len() as u8),
            Access::Write(0x01, 0x83),
            Access::Read(0x12, 0x00),
            Access::Read(0x12, 0x00),
            Access::Read(0x12, 0x00),
            Access::Read(0x12, 0x08),
            Access::Write(0x12, 0xFF),
            Access::Write(0x01, 0x81),
        ]);
        assert_eq!(log, expected);
        assert_eq!(&chip.fifo()[..READING.len()], READING);
        assert_eq!(radio.mode(), Mode::Standby);

        reset.done();
    }

    fn irq_reads(chip: &SimulatedChip) -> usize {
        chip.log()
            .iter()
            .filter(|access| matches!(access, Access::Read(0x12, _)))
            .count()
    }

    #[test]
    fn transmit_times_out_and_returns_to_standby() {
        let chip = SimulatedChip::new();
        let config = Config {
            tx_timeout_ms: Some(100),
            tx_poll_interval_us: 25_000,
            ..Config::DEFAULT
        };
        let (mut radio, mut reset) = radio(&chip, config);

        assert_eq!(radio.transmit(READING), Err(Error::TransmitTimeout));

        assert_eq!(irq_reads(&chip), 5);
        assert_eq!(chip.writes().last(), Some(&(0x01, 0x81)));
        assert_eq!(radio.mode(), Mode::Standby);

        reset.done();
    }

    #[test]
    fn transmit_waits_at_least_time_on_air() {
        let chip = SimulatedChip::new();
        let config = Config {
            tx_timeout_ms: Some(1),
            tx_poll_interval_us: 25_000,
            ..Config::DEFAULT
        };
        let (mut radio, mut reset) = radio(&chip, config);

        // 61.696 ms on air at SF7/125 kHz
        assert_eq!(radio.transmit(READING), Err(Error::TransmitTimeout));
        assert_eq!(irq_reads(&chip), 4);

        reset.done();
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let chip = SimulatedChip::new();
        let (mut radio, mut reset) = radio(&chip, Config::DEFAULT);

        let payload = [0u8; MAX_PAYLOAD_LEN + 1];
        assert_eq!(
            radio.transmit(&payload),
            Err(Error::PayloadTooLarge { len: 256 })
        );
        assert!(chip.log().is_empty());

        reset.done();
    }

    #[test]
    fn arm_receive_continuous() {
        let chip = SimulatedChip::new();
        let (mut radio, mut reset) = radio(&chip, Config::DEFAULT);

        radio.enter_receive_continuous().unwrap();

        assert_eq!(
            chip.writes(),
            vec![(0x01, 0x81), (0x0D, 0x00), (0x40, 0x00), (0x01, 0x85), (0x11, 0x00)]
        );
        assert_eq!(radio.mode(), Mode::ReceiveContinuous);

        reset.done();
    }

    #[test]
    fn poll_without_packet_only_reads_flags() {
        let chip = SimulatedChip::new();
        let (mut radio, mut reset) = radio(&chip, Config::DEFAULT);
        radio.enter_receive_continuous().unwrap();
        chip.clear_log();

        let mut buffer = [0u8; 64];
        assert_eq!(radio.poll_received_packet(&mut buffer), Ok(None));
        assert_eq!(chip.log(), vec![Access::Read(0x12, 0x00)]);

        reset.done();
    }

    #[test]
    fn fifo_pointer_follows_current_address() {
        let chip = SimulatedChip::new();
        let (mut radio, mut reset) = radio(&chip, Config::DEFAULT);
        radio.enter_receive_continuous().unwrap();

        for (index, address) in [0x00u8, 0x1A, 0x80, 0xF0, 0x33].into_iter().enumerate() {
            let payload: Vec<u8> = (0..10).map(|byte| byte + index as u8).collect();
            chip.deliver(address, &payload, Irq::RX_DONE);
            chip.clear_log();

            let mut buffer = [0u8; 64];
            assert_eq!(radio.poll_received_packet(&mut buffer), Ok(Some(10)));
            assert_eq!(&buffer[..10], payload.as_slice());

            let log = chip.log();
            let pointer_write = log
                .iter()
                .position(|access| *access == Access::Write(0x0D, address))
                .unwrap();
            assert_eq!(log[pointer_write - 1], Access::Read(0x10, address));
            assert_eq!(log[pointer_write + 1], Access::Read(0x00, payload[0]));
        }

        reset.done();
    }

    #[test]
    fn clearing_flags_spares_events_after_snapshot() {
        let chip = SimulatedChip::new();
        let (mut radio, mut reset) = radio(&chip, Config::DEFAULT);
        radio.enter_receive_continuous().unwrap();

        chip.deliver(0x00, b"first", Irq::RX_DONE);
        chip.raise_after_next_flag_read(Irq::VALID_HEADER);

        let mut buffer = [0u8; 64];
        assert_eq!(radio.poll_received_packet(&mut buffer), Ok(Some(5)));
        assert!(chip.log().contains(&Access::Write(0x12, 0x40)));
        assert_eq!(chip.irq_flags(), Irq::VALID_HEADER);

        reset.done();
    }

    #[test]
    fn crc_error_drops_packet_when_enabled() {
        let chip = SimulatedChip::new();
        let (mut radio, mut reset) = radio(&chip, Config::DEFAULT);
        radio.enter_receive_continuous().unwrap();
        chip.deliver(0x00, b"garbled", Irq::RX_DONE | Irq::PAYLOAD_CRC_ERROR);
        chip.clear_log();

        let mut buffer = [0u8; 64];
        assert_eq!(radio.poll_received_packet(&mut buffer), Ok(None));
        assert_eq!(
            chip.log(),
            vec![Access::Read(0x12, 0x60), Access::Write(0x12, 0x60)]
        );
        assert_eq!(chip.irq_flags(), Irq::empty());

        reset.done();
    }

    #[test]
    fn crc_error_ignored_when_disabled() {
        let chip = SimulatedChip::new();
        let config = Config {
            crc: CrcPolicy::Disabled,
            ..Config::DEFAULT
        };
        let (mut radio, mut reset) = radio(&chip, config);
        radio.enter_receive_continuous().unwrap();
        chip.deliver(0x00, b"garbled", Irq::RX_DONE | Irq::PAYLOAD_CRC_ERROR);

        let mut buffer = [0u8; 64];
        assert_eq!(radio.poll_received_packet(&mut buffer), Ok(Some(7)));
        assert_eq!(&buffer[..7], b"garbled");

        reset.done();
    }

    #[test]
    fn truncated_packet_is_drained() {
        let chip = SimulatedChip::new();
        let (mut radio, mut reset) = radio(&chip, Config::DEFAULT);
        radio.enter_receive_continuous().unwrap();

        let payload: Vec<u8> = (0..80).collect();
        chip.deliver(0x10, &payload, Irq::RX_DONE);
        chip.clear_log();

        let mut buffer = [0u8; 64];
        assert_eq!(
            radio.poll_received_packet(&mut buffer),
            Err(Error::Truncated {
                packet_len: 80,
                copied: 64
            })
        );
        assert_eq!(&buffer[..], &payload[..64]);
        assert_eq!(chip.fifo_reads(), 80);
        assert_eq!(chip.fifo_pointer(), 0x10 + 80);

        reset.done();
    }

    #[test]
    fn end_to_end_send() {
        let chip = SimulatedChip::new();
        chip.complete_tx_after(10);
        let mut reset = DigitalMock::new(&[
            GpioTransaction::set(State::Low),
            GpioTransaction::set(State::High),
        ]);
        let mut radio = Sx1276::new(chip.clone(), reset.clone(), NoopDelay::new(), Config::DEFAULT);

        radio.init().unwrap();
        radio.set_frequency(915_000_000).unwrap();
        radio.transmit(READING).unwrap();

        assert_eq!(READING.len(), 25);
        let writes = chip.writes();
        assert!(writes.contains(&(0x22, READING.len() as u8)));
        assert_eq!(&chip.fifo()[..READING.len()], READING);
        assert_eq!(chip.irq_flags(), Irq::empty());

        let log = chip.log();
        let tx_mode = log
            .iter()
            .position(|access| *access == Access::Write(0x01, 0x83))
            .unwrap();
        let tx_done_read = log
            .iter()
            .position(|access| *access == Access::Read(0x12, 0x08))
            .unwrap();
        assert!(tx_mode < tx_done_read);
        assert!(log[tx_mode..tx_done_read]
            .iter()
            .all(|access| matches!(access, Access::Write(0x01, 0x83) | Access::Read(0x12, 0x00))));
        assert_eq!(log[tx_done_read + 1], Access::Write(0x12, 0xFF));

        reset.done();
    }

    #[tokio::test]
    async fn async_round_trip() {
        let chip = SimulatedChip::new();
        chip.complete_tx_after(2);
        let (mut radio, mut reset) = radio(&chip, Config::DEFAULT);

        radio.transmit_async(READING).await.unwrap();
        assert_eq!(&chip.fifo()[..READING.len()], READING);

        radio.enter_receive_continuous_async().await.unwrap();
        let mut buffer = [0u8; 64];
        assert_eq!(radio.poll_received_packet_async(&mut buffer).await, Ok(None));

        chip.deliver(0x40, b"ack", Irq::RX_DONE);
        assert_eq!(
            radio.poll_received_packet_async(&mut buffer).await,
            Ok(Some(3))
        );
        assert_eq!(&buffer[..3], b"ack");

        reset.done();
    }

    #[tokio::test]
    async fn async_transmit_times_out() {
        let chip = SimulatedChip::new();
        let config = Config {
            tx_timeout_ms: Some(100),
            tx_poll_interval_us: 25_000,
            ..Config::DEFAULT
        };
        let (mut radio, mut reset) = radio(&chip, config);

        assert_eq!(
            radio.transmit_async(READING).await,
            Err(Error::TransmitTimeout)
        );
        assert_eq!(irq_reads(&chip), 5);
        assert_eq!(chip.writes().last(), Some(&(0x01, 0x81)));
        assert_eq!(radio.mode(), Mode::Standby);

        reset.done();
    }

    #[tokio::test]
    async fn async_truncated_packet_is_drained() {
        let chip = SimulatedChip::new();
        let (mut radio, mut reset) = radio(&chip, Config::DEFAULT);
        radio.enter_receive_continuous_async().await.unwrap();

        let payload: Vec<u8> = (100..140).collect();
        chip.deliver(0xC0, &payload, Irq::RX_DONE);
        chip.clear_log();

        let mut buffer = [0u8; 16];
        assert_eq!(
            radio.poll_received_packet_async(&mut buffer).await,
            Err(Error::Truncated {
                packet_len: 40,
                copied: 16
            })
        );
        assert_eq!(&buffer[..], &payload[..16]);
        assert_eq!(chip.fifo_reads(), 40);
        assert_eq!(chip.fifo_pointer(), 0xC0 + 40);
        assert_eq!(chip.irq_flags(), Irq::empty());

        reset.done();
    }
}
