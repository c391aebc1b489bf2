//! Magneto Hardware Abstraction Layer
//!
//! This crate defines the bus traits that sensor drivers are written
//! against. Chip-specific HALs only need to provide an `embedded-hal`
//! I2C master; [`i2c::HalI2c`] turns it into an [`I2cBus`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Drivers (magneto-drivers)              │
//! └─────────────────────────────────────────┘
//!                     │  RegisterBus
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  magneto-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │  embedded_hal::i2c::I2c
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  Chip HAL (embassy-rp, stm32, linux)    │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`i2c::I2cBus`] - Raw I2C master operations
//! - [`i2c::RegisterBus`] - 8-bit register reads and writes

#![no_std]
#![deny(unsafe_code)]

pub mod i2c;

// Re-export key traits at crate root for convenience
pub use i2c::{HalI2c, I2cBus, RegisterBus};
