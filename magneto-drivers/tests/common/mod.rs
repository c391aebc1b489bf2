//! Simulated HMC5883L on an I2C bus

use std::cell::Cell;

use magneto_drivers::magnetometer::hmc5883l::{reg, DEFAULT_ADDRESS, IDENTIFICATION};
use magneto_hal::I2cBus;

/// Register transaction as seen on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transaction {
    /// Pointer write followed by `len` bytes read
    Read { register: u8, len: usize },
    /// Single register write
    Write { register: u8, value: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimError {
    /// Nobody acknowledged the address
    Nack,
}

/// Register file with the chip's address pointer behaviour
///
/// The pointer auto-increments after every byte and wraps from 12 to 0.
/// Only CONFIG_A, CONFIG_B and MODE accept writes.
pub struct SimulatedHmc5883l {
    pub registers: [u8; 13],
    pub log: Vec<Transaction>,
    pub fail_reads: Cell<bool>,
    pub fail_writes: Cell<bool>,
    pointer: u8,
}

impl SimulatedHmc5883l {
    pub fn new() -> Self {
        let mut registers = [0u8; 13];
        // Power-on defaults from the datasheet
        registers[reg::CONFIG_A as usize] = 0x10;
        registers[reg::CONFIG_B as usize] = 0x20;
        registers[reg::MODE as usize] = 0x01;
        registers[reg::ID_A as usize..].copy_from_slice(&IDENTIFICATION);
        Self {
            registers,
            log: Vec::new(),
            fail_reads: Cell::new(false),
            fail_writes: Cell::new(false),
            pointer: 0,
        }
    }

    /// Load the DATAX_H..DATAY_L block
    pub fn set_data_block(&mut self, block: [u8; 6]) {
        let start = reg::DATAX_H as usize;
        self.registers[start..start + 6].copy_from_slice(&block);
    }

    pub fn register(&self, register: u8) -> u8 {
        self.registers[register as usize]
    }

    /// Writes logged since `from`
    pub fn writes_since(&self, from: usize) -> Vec<Transaction> {
        self.log[from..]
            .iter()
            .copied()
            .filter(|t| matches!(t, Transaction::Write { .. }))
            .collect()
    }

    fn advance(&mut self) {
        self.pointer = if self.pointer >= reg::ID_C {
            0
        } else {
            self.pointer + 1
        };
    }
}

impl I2cBus for SimulatedHmc5883l {
    type Error = SimError;

    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), SimError> {
        if address != DEFAULT_ADDRESS || self.fail_writes.get() {
            return Err(SimError::Nack);
        }
        let Some((&register, values)) = data.split_first() else {
            return Ok(());
        };
        self.pointer = register;
        for &value in values {
            self.log.push(Transaction::Write {
                register: self.pointer,
                value,
            });
            if self.pointer <= reg::MODE {
                self.registers[self.pointer as usize] = value;
            }
            self.advance();
        }
        Ok(())
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), SimError> {
        if address != DEFAULT_ADDRESS || self.fail_reads.get() {
            return Err(SimError::Nack);
        }
        self.log.push(Transaction::Read {
            register: self.pointer,
            len: buf.len(),
        });
        for b in buf.iter_mut() {
            *b = self.registers[self.pointer as usize];
            self.advance();
        }
        Ok(())
    }

    fn write_read(
        &mut self,
        address: u8,
        write_data: &[u8],
        read_buf: &mut [u8],
    ) -> Result<(), SimError> {
        if address != DEFAULT_ADDRESS || self.fail_reads.get() {
            return Err(SimError::Nack);
        }
        if let Some(&register) = write_data.first() {
            self.pointer = register;
        }
        self.read(address, read_buf)
    }
}
