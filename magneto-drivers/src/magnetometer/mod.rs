//! Magnetometer driver implementations

pub mod hmc5883l;

pub use hmc5883l::{HeadingSample, Hmc5883l, Hmc5883lConfig, Hmc5883lError};
