//! I2C bus abstractions
//!
//! Provides traits for I2C master operations that can be implemented
//! by chip-specific HALs, plus the register-oriented view that sensor
//! drivers use.

/// I2C bus master
///
/// Provides basic I2C read/write operations for communicating with
/// peripheral devices.
pub trait I2cBus {
    /// Error type for I2C operations
    type Error;

    /// Write data to a device at the given address
    ///
    /// # Arguments
    /// * `address` - 7-bit I2C address
    /// * `data` - Bytes to write
    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error>;

    /// Read data from a device at the given address
    ///
    /// # Arguments
    /// * `address` - 7-bit I2C address
    /// * `buf` - Buffer to read into
    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Write then read in a single transaction (repeated start)
    ///
    /// This is commonly used to write a register address then read data.
    ///
    /// # Arguments
    /// * `address` - 7-bit I2C address
    /// * `write_data` - Bytes to write (typically register address)
    /// * `read_buf` - Buffer to read into
    fn write_read(
        &mut self,
        address: u8,
        write_data: &[u8],
        read_buf: &mut [u8],
    ) -> Result<(), Self::Error>;
}

/// Register-level access to a device with 8-bit registers
///
/// This is the only capability a register-mapped sensor driver needs.
/// Every [`I2cBus`] gets it for free; tests can implement it directly
/// on top of a simulated register file.
pub trait RegisterBus {
    /// Error type for register transactions
    type Error;

    /// Read `buf.len()` consecutive registers starting at `register`
    ///
    /// On success the whole buffer has been filled.
    fn read_registers(
        &mut self,
        address: u8,
        register: u8,
        buf: &mut [u8],
    ) -> Result<(), Self::Error>;

    /// Write a single register
    fn write_register(&mut self, address: u8, register: u8, value: u8) -> Result<(), Self::Error>;
}

impl<T: I2cBus> RegisterBus for T {
    type Error = T::Error;

    fn read_registers(
        &mut self,
        address: u8,
        register: u8,
        buf: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.write_read(address, &[register], buf)
    }

    fn write_register(&mut self, address: u8, register: u8, value: u8) -> Result<(), Self::Error> {
        self.write(address, &[register, value])
    }
}

/// Adapter from an `embedded-hal` 1.0 blocking I2C master to [`I2cBus`]
///
/// Lets any chip HAL (embassy-rp, embassy-stm32, linux-embedded-hal, ...)
/// drive the sensors in this workspace.
pub struct HalI2c<I> {
    i2c: I,
}

impl<I> HalI2c<I>
where
    I: embedded_hal::i2c::I2c,
{
    /// Wrap an I2C master
    pub fn new(i2c: I) -> Self {
        Self { i2c }
    }

    /// Borrow the wrapped I2C master
    pub fn inner(&mut self) -> &mut I {
        &mut self.i2c
    }

    /// Give the wrapped I2C master back
    pub fn release(self) -> I {
        self.i2c
    }
}

impl<I> I2cBus for HalI2c<I>
where
    I: embedded_hal::i2c::I2c,
{
    type Error = I::Error;

    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error> {
        self.i2c.write(address, data)
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.i2c.read(address, buf)
    }

    fn write_read(
        &mut self,
        address: u8,
        write_data: &[u8],
        read_buf: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.i2c.write_read(address, write_data, read_buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{ErrorKind, ErrorType, NoAcknowledgeSource, Operation};

    /// Records the last transaction and answers reads from a fixed pattern
    struct RecordingI2c {
        address: u8,
        written: [u8; 4],
        written_len: usize,
        read_len: usize,
        nack: bool,
    }

    impl RecordingI2c {
        fn new() -> Self {
            Self {
                address: 0,
                written: [0; 4],
                written_len: 0,
                read_len: 0,
                nack: false,
            }
        }
    }

    impl ErrorType for RecordingI2c {
        type Error = ErrorKind;
    }

    impl embedded_hal::i2c::I2c for RecordingI2c {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            if self.nack {
                return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
            }
            self.address = address;
            self.written_len = 0;
            self.read_len = 0;
            for op in operations.iter_mut() {
                match op {
                    Operation::Write(data) => {
                        self.written[..data.len()].copy_from_slice(*data);
                        self.written_len = data.len();
                    }
                    Operation::Read(buf) => {
                        for (i, b) in buf.iter_mut().enumerate() {
                            *b = 0xA0 + i as u8;
                        }
                        self.read_len = buf.len();
                    }
                }
            }
            Ok(())
        }
    }

    #[test]
    fn test_register_write_frames_register_then_value() {
        let mut bus = HalI2c::new(RecordingI2c::new());
        bus.write_register(0x1E, 0x02, 0x01).unwrap();

        let i2c = bus.release();
        assert_eq!(i2c.address, 0x1E);
        assert_eq!(&i2c.written[..i2c.written_len], &[0x02, 0x01]);
        assert_eq!(i2c.read_len, 0);
    }

    #[test]
    fn test_register_read_uses_repeated_start() {
        let mut bus = HalI2c::new(RecordingI2c::new());
        let mut buf = [0u8; 6];
        bus.read_registers(0x1E, 0x03, &mut buf).unwrap();

        assert_eq!(buf, [0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5]);
        let i2c = bus.inner();
        assert_eq!(&i2c.written[..i2c.written_len], &[0x03]);
        assert_eq!(i2c.read_len, 6);
    }

    #[test]
    fn test_bus_error_is_propagated() {
        let mut i2c = RecordingI2c::new();
        i2c.nack = true;
        let mut bus = HalI2c::new(i2c);

        let mut buf = [0u8; 1];
        assert_eq!(
            bus.read_registers(0x1E, 0x0A, &mut buf),
            Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address))
        );
        assert!(bus.write_register(0x1E, 0x00, 0x70).is_err());
    }
}
