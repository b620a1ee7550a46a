//! Simulated SX1276 register file used by the unit tests.
//!
//! Models the parts of the chip the driver relies on: the FIFO with its
//! auto-incrementing pointer, write-one-to-clear interrupt flags, and address
//! auto-increment for multi-byte register bursts. Every register access is logged.

use std::{cell::RefCell, convert::Infallible, rc::Rc};

use embedded_hal::spi::{ErrorType, Operation};
use regiface::FromByteArray;

use crate::registers::{Irq, Mode, OpMode};

const REG_FIFO: u8 = 0x00;
const REG_OP_MODE: u8 = 0x01;
const REG_FIFO_ADDR_PTR: u8 = 0x0D;
const REG_FIFO_RX_CURRENT_ADDR: u8 = 0x10;
const REG_IRQ_FLAGS: u8 = 0x12;
const REG_RX_NB_BYTES: u8 = 0x13;
const REG_LNA: u8 = 0x0C;
const REG_VERSION: u8 = 0x42;

/// One register access as seen on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read(u8, u8),
    Write(u8, u8),
}

struct ChipState {
    registers: [u8; 0x80],
    fifo: [u8; 256],
    fifo_reads: usize,
    tx_done_after: Option<usize>,
    tx_polls: Option<usize>,
    raise_after_flag_read: Irq,
    log: Vec<Access>,
}

impl ChipState {
    fn new() -> Self {
        let mut registers = [0u8; 0x80];
        registers[REG_OP_MODE as usize] = 0x09;
        registers[REG_LNA as usize] = 0x20;
        registers[REG_VERSION as usize] = 0x12;
        Self {
            registers,
            fifo: [0u8; 256],
            fifo_reads: 0,
            tx_done_after: None,
            tx_polls: None,
            raise_after_flag_read: Irq::empty(),
            log: Vec::new(),
        }
    }

    fn fifo_pointer(&mut self) -> &mut u8 {
        &mut self.registers[REG_FIFO_ADDR_PTR as usize]
    }

    fn read(&mut self, address: u8) -> u8 {
        let value = match address {
            REG_FIFO => {
                let pointer = *self.fifo_pointer();
                *self.fifo_pointer() = pointer.wrapping_add(1);
                self.fifo_reads += 1;
                self.fifo[pointer as usize]
            }
            REG_IRQ_FLAGS => {
                if let Some(polls) = self.tx_polls.as_mut() {
                    if *polls == 0 {
                        self.registers[REG_IRQ_FLAGS as usize] |= Irq::TX_DONE.bits();
                        self.tx_polls = None;
                    } else {
                        *polls -= 1;
                    }
                }
                let value = self.registers[REG_IRQ_FLAGS as usize];
                self.registers[REG_IRQ_FLAGS as usize] |= self.raise_after_flag_read.bits();
                self.raise_after_flag_read = Irq::empty();
                value
            }
            _ => self.registers[address as usize],
        };
        self.log.push(Access::Read(address, value));
        value
    }

    fn write(&mut self, address: u8, value: u8) {
        self.log.push(Access::Write(address, value));
        match address {
            REG_FIFO => {
                let pointer = *self.fifo_pointer();
                *self.fifo_pointer() = pointer.wrapping_add(1);
                self.fifo[pointer as usize] = value;
            }
            REG_IRQ_FLAGS => self.registers[REG_IRQ_FLAGS as usize] &= !value,
            REG_OP_MODE => {
                self.registers[REG_OP_MODE as usize] = value;
                if value & 0x07 == Mode::Transmit as u8 {
                    self.tx_polls = self.tx_done_after;
                }
            }
            REG_VERSION | REG_FIFO_RX_CURRENT_ADDR | REG_RX_NB_BYTES => {}
            _ => self.registers[address as usize] = value,
        }
    }

    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) {
        let mut header = None;
        for operation in operations.iter_mut() {
            match operation {
                Operation::Write(bytes) => {
                    for &byte in bytes.iter() {
                        match header {
                            None => header = Some((byte & 0x7F, byte & 0x80 != 0)),
                            Some((address, true)) => {
                                self.write(address, byte);
                                header = Some((next_address(address), true));
                            }
                            Some((_, false)) => panic!("data written during a read access"),
                        }
                    }
                }
                Operation::Read(bytes) => {
                    for slot in bytes.iter_mut() {
                        match header {
                            Some((address, false)) => {
                                *slot = self.read(address);
                                header = Some((next_address(address), false));
                            }
                            _ => panic!("read without a read header"),
                        }
                    }
                }
                _ => panic!("unsupported SPI operation"),
            }
        }
    }
}

fn next_address(address: u8) -> u8 {
    if address == REG_FIFO {
        REG_FIFO
    } else {
        (address + 1) & 0x7F
    }
}

/// Shared handle to the simulated chip; clones observe the same state.
#[derive(Clone)]
pub struct SimulatedChip {
    state: Rc<RefCell<ChipState>>,
}

impl SimulatedChip {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(ChipState::new())),
        }
    }

    pub fn set_version(&self, version: u8) {
        self.state.borrow_mut().registers[REG_VERSION as usize] = version;
    }

    /// TxDone latches on the first flag read after `polls` reads in Transmit.
    pub fn complete_tx_after(&self, polls: usize) {
        self.state.borrow_mut().tx_done_after = Some(polls);
    }

    /// Raises `flags` right after the next interrupt flag read has returned.
    pub fn raise_after_next_flag_read(&self, flags: Irq) {
        self.state.borrow_mut().raise_after_flag_read = flags;
    }

    /// Places a received packet in the FIFO as the demodulator would.
    pub fn deliver(&self, address: u8, payload: &[u8], flags: Irq) {
        let mut state = self.state.borrow_mut();
        for (offset, &byte) in payload.iter().enumerate() {
            state.fifo[address.wrapping_add(offset as u8) as usize] = byte;
        }
        state.registers[REG_FIFO_RX_CURRENT_ADDR as usize] = address;
        state.registers[REG_RX_NB_BYTES as usize] = payload.len() as u8;
        state.registers[REG_IRQ_FLAGS as usize] |= flags.bits();
    }

    pub fn log(&self) -> Vec<Access> {
        self.state.borrow().log.clone()
    }

    pub fn writes(&self) -> Vec<(u8, u8)> {
        self.log()
            .into_iter()
            .filter_map(|access| match access {
                Access::Write(address, value) => Some((address, value)),
                Access::Read(..) => None,
            })
            .collect()
    }

    pub fn clear_log(&self) {
        let mut state = self.state.borrow_mut();
        state.log.clear();
        state.fifo_reads = 0;
    }

    pub fn fifo(&self) -> [u8; 256] {
        self.state.borrow().fifo
    }

    pub fn fifo_reads(&self) -> usize {
        self.state.borrow().fifo_reads
    }

    pub fn fifo_pointer(&self) -> u8 {
        self.state.borrow().registers[REG_FIFO_ADDR_PTR as usize]
    }

    pub fn irq_flags(&self) -> Irq {
        Irq::from_bits_retain(self.state.borrow().registers[REG_IRQ_FLAGS as usize])
    }

    pub fn op_mode(&self) -> OpMode {
        let value = self.state.borrow().registers[REG_OP_MODE as usize];
        match OpMode::from_bytes([value]) {
            Ok(op_mode) => op_mode,
            Err(never) => match never {},
        }
    }
}

impl ErrorType for SimulatedChip {
    type Error = Infallible;
}

impl embedded_hal::spi::SpiDevice for SimulatedChip {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        self.state.borrow_mut().transaction(operations);
        Ok(())
    }
}

impl embedded_hal_async::spi::SpiDevice for SimulatedChip {
    async fn transaction(
        &mut self,
        operations: &mut [Operation<'_, u8>],
    ) -> Result<(), Self::Error> {
        self.state.borrow_mut().transaction(operations);
        Ok(())
    }
}
