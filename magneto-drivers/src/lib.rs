//! Hardware driver implementations
//!
//! This crate provides register-level drivers for the sensors used by
//! Magneto, written against the bus traits in `magneto-hal`:
//!
//! - Magnetometers (HMC5883L)

#![no_std]
#![deny(unsafe_code)]

pub mod magnetometer;
