//! HMC5883L 3-axis magnetometer (I2C)
//!
//! The Honeywell HMC5883L is a digital compass with a 12-bit ADC per axis
//! and a small 8-bit register file behind a fixed I2C address.
//!
//! # Register map
//!
//! | Addr | Register | Access |
//! |------|----------|--------|
//! | 0x00 | Configuration A (averaging, rate, bias) | R/W |
//! | 0x01 | Configuration B (gain) | R/W |
//! | 0x02 | Mode | R/W |
//! | 0x03-0x08 | Data X, Z, Y (MSB first) | R |
//! | 0x09 | Status (lock, ready) | R |
//! | 0x0A-0x0C | Identification "H43" | R |
//!
//! # Quirks
//!
//! - The data block is ordered X, Z, Y, not X, Y, Z.
//! - Reading only part of the data block locks the data registers until
//!   all six bytes are read, so every heading accessor reads the full block.
//! - In single-measurement mode the chip converts once and falls back to
//!   idle. The driver re-selects single mode after each heading read so the
//!   next conversion starts right away.

use magneto_hal::RegisterBus;

/// HMC5883L fixed 7-bit I2C address
pub const DEFAULT_ADDRESS: u8 = 0x1E;

/// Expected contents of ID_A..ID_C
pub const IDENTIFICATION: [u8; 3] = *b"H43";

/// Value reported by a data register on ADC overflow/underflow or bias math overflow
pub const OVERFLOW: i16 = -4096;

/// HMC5883L register addresses
pub mod reg {
    /// Configuration register A
    pub const CONFIG_A: u8 = 0x00;
    /// Configuration register B
    pub const CONFIG_B: u8 = 0x01;
    /// Mode register
    pub const MODE: u8 = 0x02;
    /// Data output X MSB
    pub const DATAX_H: u8 = 0x03;
    /// Data output X LSB
    pub const DATAX_L: u8 = 0x04;
    /// Data output Z MSB
    pub const DATAZ_H: u8 = 0x05;
    /// Data output Z LSB
    pub const DATAZ_L: u8 = 0x06;
    /// Data output Y MSB
    pub const DATAY_H: u8 = 0x07;
    /// Data output Y LSB
    pub const DATAY_L: u8 = 0x08;
    /// Status register
    pub const STATUS: u8 = 0x09;
    /// Identification register A
    pub const ID_A: u8 = 0x0A;
    /// Identification register B
    pub const ID_B: u8 = 0x0B;
    /// Identification register C
    pub const ID_C: u8 = 0x0C;
}

/// Status register bit positions
pub mod status {
    /// Data output registers locked after a partial read
    pub const LOCK_BIT: u8 = 1;
    /// Data written to all six data registers
    pub const READY_BIT: u8 = 0;
}

/// A contiguous group of bits inside an 8-bit register
///
/// Described the way the datasheet does: the index of the most
/// significant bit (bit 0 = LSB) and the field width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitField {
    /// Index of the field's most significant bit
    pub most_bit: u8,
    /// Width in bits
    pub length: u8,
}

impl BitField {
    /// Create a field descriptor
    pub const fn new(most_bit: u8, length: u8) -> Self {
        Self { most_bit, length }
    }

    /// Position of the field's least significant bit
    pub const fn shift(self) -> u8 {
        self.most_bit + 1 - self.length
    }

    /// Register bits covered by the field
    pub const fn mask(self) -> u8 {
        (((1u16 << self.length) - 1) << self.shift()) as u8
    }

    /// Extract the field value from a register byte
    pub const fn decode(self, register: u8) -> u8 {
        (register & self.mask()) >> self.shift()
    }

    /// Place a value at the field position, dropping bits that don't fit
    pub const fn encode(self, value: u8) -> u8 {
        (value << self.shift()) & self.mask()
    }

    /// Replace the field inside `register`, leaving every other bit alone
    pub const fn update(self, register: u8, value: u8) -> u8 {
        (register & !self.mask()) | self.encode(value)
    }
}

/// Register sub-fields
pub mod field {
    use super::BitField;

    /// CONFIG_A bits 6..5: samples averaged per measurement
    pub const AVERAGING: BitField = BitField::new(6, 2);
    /// CONFIG_A bits 4..2: data output rate
    pub const RATE: BitField = BitField::new(4, 3);
    /// CONFIG_A bits 1..0: measurement bias
    pub const BIAS: BitField = BitField::new(1, 2);
    /// CONFIG_B bits 7..5: gain
    pub const GAIN: BitField = BitField::new(7, 3);
    /// MODE bits 1..0: operating mode
    pub const MODE: BitField = BitField::new(1, 2);
}

/// Number of samples averaged per measurement output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleAveraging {
    One,
    Two,
    Four,
    Eight,
}

impl SampleAveraging {
    /// Field encoding
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Decode a field value (extra bits are ignored)
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Self::One,
            1 => Self::Two,
            2 => Self::Four,
            _ => Self::Eight,
        }
    }

    /// Samples per output
    pub const fn samples(self) -> u8 {
        1 << self.bits()
    }
}

/// Typical data output rate in continuous-measurement mode
///
/// Faster rates (up to 160 Hz) are possible in single-measurement mode
/// by watching DRDY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataRate {
    Hz0_75,
    Hz1_5,
    Hz3,
    Hz7_5,
    Hz15,
    Hz30,
    Hz75,
    /// Encoding 7, not used by the chip
    Unused,
}

impl DataRate {
    /// Field encoding
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Decode a field value (extra bits are ignored)
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0 => Self::Hz0_75,
            1 => Self::Hz1_5,
            2 => Self::Hz3,
            3 => Self::Hz7_5,
            4 => Self::Hz15,
            5 => Self::Hz30,
            6 => Self::Hz75,
            _ => Self::Unused,
        }
    }

    /// Output rate in millihertz, `None` for the unused encoding
    pub const fn millihertz(self) -> Option<u32> {
        match self {
            Self::Hz0_75 => Some(750),
            Self::Hz1_5 => Some(1_500),
            Self::Hz3 => Some(3_000),
            Self::Hz7_5 => Some(7_500),
            Self::Hz15 => Some(15_000),
            Self::Hz30 => Some(30_000),
            Self::Hz75 => Some(75_000),
            Self::Unused => None,
        }
    }
}

/// Measurement configuration (self-test bias current)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MeasurementBias {
    /// Normal measurement
    Normal,
    /// Positive bias applied across the load
    Positive,
    /// Negative bias applied across the load
    Negative,
    /// Encoding 3, reserved
    Reserved,
}

impl MeasurementBias {
    /// Field encoding
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Decode a field value (extra bits are ignored)
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Self::Normal,
            1 => Self::Positive,
            2 => Self::Negative,
            _ => Self::Reserved,
        }
    }
}

/// Magnetic field gain
///
/// Output range is -2048..=2047 for every setting. Pick a lower gain
/// when readings saturate at [`OVERFLOW`].
///
/// | Gain | Field range | LSB/Gauss |
/// |------|-------------|-----------|
/// | 0 | ±0.88 Ga | 1370 |
/// | 1 | ±1.3 Ga | 1090 (default) |
/// | 2 | ±1.9 Ga | 820 |
/// | 3 | ±2.5 Ga | 660 |
/// | 4 | ±4.0 Ga | 440 |
/// | 5 | ±4.7 Ga | 390 |
/// | 6 | ±5.6 Ga | 330 |
/// | 7 | ±8.1 Ga | 230 |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gain {
    Gain1370,
    Gain1090,
    Gain820,
    Gain660,
    Gain440,
    Gain390,
    Gain330,
    Gain230,
}

impl Gain {
    /// Field encoding
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Decode a field value (extra bits are ignored)
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0 => Self::Gain1370,
            1 => Self::Gain1090,
            2 => Self::Gain820,
            3 => Self::Gain660,
            4 => Self::Gain440,
            5 => Self::Gain390,
            6 => Self::Gain330,
            _ => Self::Gain230,
        }
    }

    /// Counts per Gauss
    pub const fn lsb_per_gauss(self) -> u16 {
        match self {
            Self::Gain1370 => 1370,
            Self::Gain1090 => 1090,
            Self::Gain820 => 820,
            Self::Gain660 => 660,
            Self::Gain440 => 440,
            Self::Gain390 => 390,
            Self::Gain330 => 330,
            Self::Gain230 => 230,
        }
    }

    /// Recommended sensor field range (±) in milligauss
    pub const fn field_range_milligauss(self) -> u16 {
        match self {
            Self::Gain1370 => 880,
            Self::Gain1090 => 1300,
            Self::Gain820 => 1900,
            Self::Gain660 => 2500,
            Self::Gain440 => 4000,
            Self::Gain390 => 4700,
            Self::Gain330 => 5600,
            Self::Gain230 => 8100,
        }
    }
}

/// Operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MeasurementMode {
    /// Convert continuously at the configured data rate
    Continuous,
    /// Convert once, then fall back to idle
    Single,
    /// No conversions
    Idle,
}

impl MeasurementMode {
    /// Field encoding
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Decode a field value
    ///
    /// Both `0b10` and `0b11` select idle on the chip.
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Self::Continuous,
            1 => Self::Single,
            _ => Self::Idle,
        }
    }
}

/// HMC5883L measurement configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Hmc5883lConfig {
    /// Samples averaged per output
    pub averaging: SampleAveraging,
    /// Continuous-mode output rate
    pub data_rate: DataRate,
    /// Measurement bias
    pub bias: MeasurementBias,
    /// Field gain
    pub gain: Gain,
    /// Operating mode
    pub mode: MeasurementMode,
}

impl Default for Hmc5883lConfig {
    fn default() -> Self {
        Self {
            averaging: SampleAveraging::Eight,
            data_rate: DataRate::Hz15,
            bias: MeasurementBias::Normal,
            gain: Gain::Gain1090,
            mode: MeasurementMode::Single,
        }
    }
}

impl Hmc5883lConfig {
    /// Packed CONFIG_A register value
    pub const fn config_a(&self) -> u8 {
        field::AVERAGING.encode(self.averaging.bits())
            | field::RATE.encode(self.data_rate.bits())
            | field::BIAS.encode(self.bias.bits())
    }
}

/// One 3-axis reading in raw counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HeadingSample {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl HeadingSample {
    /// Decode the DATAX_H..DATAY_L block (X, Z, Y order, MSB first)
    pub const fn from_data_block(block: &[u8; 6]) -> Self {
        Self {
            x: i16::from_be_bytes([block[0], block[1]]),
            z: i16::from_be_bytes([block[2], block[3]]),
            y: i16::from_be_bytes([block[4], block[5]]),
        }
    }

    /// True if any axis reports [`OVERFLOW`]
    pub const fn is_overflow(&self) -> bool {
        self.x == OVERFLOW || self.y == OVERFLOW || self.z == OVERFLOW
    }

    /// Convert to milligauss as `[x, y, z]`
    ///
    /// Axes holding [`OVERFLOW`] come back as `None`.
    pub fn to_milligauss(&self, gain: Gain) -> [Option<i32>; 3] {
        let lsb = gain.lsb_per_gauss() as i32;
        [self.x, self.y, self.z].map(|raw| {
            if raw == OVERFLOW {
                None
            } else {
                Some(raw as i32 * 1000 / lsb)
            }
        })
    }
}

/// HMC5883L errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Hmc5883lError<E> {
    /// The underlying bus transaction failed
    Bus(E),
}

/// HMC5883L driver
///
/// Owns the bus handle. The cached mode is the last mode written through
/// [`Hmc5883l::set_mode`]; it decides whether a heading read must re-arm
/// single-measurement mode. Call [`Hmc5883l::initialize`],
/// [`Hmc5883l::configure`] or [`Hmc5883l::set_mode`] before the first
/// heading read.
pub struct Hmc5883l<B> {
    bus: B,
    address: u8,
    mode: Option<MeasurementMode>,
}

impl<B> Hmc5883l<B>
where
    B: RegisterBus,
{
    /// Create a driver at the default address
    pub fn new(bus: B) -> Self {
        Self::with_address(bus, DEFAULT_ADDRESS)
    }

    /// Create a driver at a non-standard address (e.g. behind a translator)
    pub fn with_address(bus: B, address: u8) -> Self {
        Self {
            bus,
            address,
            mode: None,
        }
    }

    /// Bus address in use
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Borrow the bus
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Give the bus back
    pub fn release(self) -> B {
        self.bus
    }

    /// Last mode written with [`Hmc5883l::set_mode`], `None` before the first write
    pub fn cached_mode(&self) -> Option<MeasurementMode> {
        self.mode
    }

    fn read_register(&mut self, register: u8) -> Result<u8, Hmc5883lError<B::Error>> {
        let mut buf = [0u8; 1];
        self.bus
            .read_registers(self.address, register, &mut buf)
            .map_err(Hmc5883lError::Bus)?;
        Ok(buf[0])
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), Hmc5883lError<B::Error>> {
        self.bus
            .write_register(self.address, register, value)
            .map_err(Hmc5883lError::Bus)
    }

    fn read_field(&mut self, register: u8, field: BitField) -> Result<u8, Hmc5883lError<B::Error>> {
        Ok(field.decode(self.read_register(register)?))
    }

    /// Read-modify-write of one sub-field
    fn update_field(
        &mut self,
        register: u8,
        field: BitField,
        value: u8,
    ) -> Result<(), Hmc5883lError<B::Error>> {
        let current = self.read_register(register)?;
        self.write_register(register, field.update(current, value))
    }

    // ID_* registers

    /// Identification register A (`'H'`)
    pub fn id_a(&mut self) -> Result<u8, Hmc5883lError<B::Error>> {
        self.read_register(reg::ID_A)
    }

    /// Identification register B (`'4'`)
    pub fn id_b(&mut self) -> Result<u8, Hmc5883lError<B::Error>> {
        self.read_register(reg::ID_B)
    }

    /// Identification register C (`'3'`)
    pub fn id_c(&mut self) -> Result<u8, Hmc5883lError<B::Error>> {
        self.read_register(reg::ID_C)
    }

    /// All three identification bytes in one read
    pub fn identification(&mut self) -> Result<[u8; 3], Hmc5883lError<B::Error>> {
        let mut id = [0u8; 3];
        self.bus
            .read_registers(self.address, reg::ID_A, &mut id)
            .map_err(Hmc5883lError::Bus)?;
        Ok(id)
    }

    /// Check that an HMC5883L answers at the configured address
    ///
    /// Bus errors count as "not connected".
    pub fn is_connected(&mut self) -> bool {
        match self.identification() {
            Ok(id) if id == IDENTIFICATION => true,
            Ok(_id) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("HMC5883L: unexpected identification {=[u8]:a}", &_id[..]);
                false
            }
            Err(_) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("HMC5883L: no response at {=u8:#x}", self.address);
                false
            }
        }
    }

    /// Power-on setup: 8-sample averaging, 15 Hz, normal bias, 1090 LSB/Gauss,
    /// single-measurement mode
    ///
    /// Adjust the gain afterwards if readings saturate at [`OVERFLOW`].
    pub fn initialize(&mut self) -> Result<(), Hmc5883lError<B::Error>> {
        self.configure(&Hmc5883lConfig::default())
    }

    /// Write a full configuration: CONFIG_A, then gain, then mode
    pub fn configure(&mut self, config: &Hmc5883lConfig) -> Result<(), Hmc5883lError<B::Error>> {
        #[cfg(feature = "defmt")]
        defmt::debug!("HMC5883L: configure {}", config);

        self.write_register(reg::CONFIG_A, config.config_a())?;
        self.set_gain(config.gain)?;
        self.set_mode(config.mode)
    }

    // CONFIG_A register

    /// Samples averaged per measurement
    pub fn sample_averaging(&mut self) -> Result<SampleAveraging, Hmc5883lError<B::Error>> {
        let bits = self.read_field(reg::CONFIG_A, field::AVERAGING)?;
        Ok(SampleAveraging::from_bits(bits))
    }

    /// Set samples averaged per measurement
    pub fn set_sample_averaging(
        &mut self,
        averaging: SampleAveraging,
    ) -> Result<(), Hmc5883lError<B::Error>> {
        self.update_field(reg::CONFIG_A, field::AVERAGING, averaging.bits())
    }

    /// Continuous-mode data output rate
    pub fn data_rate(&mut self) -> Result<DataRate, Hmc5883lError<B::Error>> {
        let bits = self.read_field(reg::CONFIG_A, field::RATE)?;
        Ok(DataRate::from_bits(bits))
    }

    /// Set continuous-mode data output rate
    pub fn set_data_rate(&mut self, rate: DataRate) -> Result<(), Hmc5883lError<B::Error>> {
        self.update_field(reg::CONFIG_A, field::RATE, rate.bits())
    }

    /// Measurement bias
    pub fn measurement_bias(&mut self) -> Result<MeasurementBias, Hmc5883lError<B::Error>> {
        let bits = self.read_field(reg::CONFIG_A, field::BIAS)?;
        Ok(MeasurementBias::from_bits(bits))
    }

    /// Set measurement bias
    pub fn set_measurement_bias(
        &mut self,
        bias: MeasurementBias,
    ) -> Result<(), Hmc5883lError<B::Error>> {
        self.update_field(reg::CONFIG_A, field::BIAS, bias.bits())
    }

    // CONFIG_B register

    /// Magnetic field gain
    pub fn gain(&mut self) -> Result<Gain, Hmc5883lError<B::Error>> {
        let bits = self.read_field(reg::CONFIG_B, field::GAIN)?;
        Ok(Gain::from_bits(bits))
    }

    /// Set magnetic field gain
    ///
    /// Bits 4..0 of CONFIG_B must be zero, so the register is written
    /// outright without reading it first.
    pub fn set_gain(&mut self, gain: Gain) -> Result<(), Hmc5883lError<B::Error>> {
        self.write_register(reg::CONFIG_B, field::GAIN.encode(gain.bits()))
    }

    // MODE register

    /// Operating mode as reported by the chip
    ///
    /// After a single measurement completes the chip reports idle.
    pub fn mode(&mut self) -> Result<MeasurementMode, Hmc5883lError<B::Error>> {
        let bits = self.read_field(reg::MODE, field::MODE)?;
        Ok(MeasurementMode::from_bits(bits))
    }

    /// Set operating mode
    ///
    /// Writes the whole MODE register (bits 7..2 cleared) and records the
    /// mode once the write succeeds.
    pub fn set_mode(&mut self, mode: MeasurementMode) -> Result<(), Hmc5883lError<B::Error>> {
        self.write_register(reg::MODE, field::MODE.encode(mode.bits()))?;

        #[cfg(feature = "defmt")]
        if self.mode != Some(mode) {
            defmt::debug!("HMC5883L: mode {}", mode);
        }

        self.mode = Some(mode);
        Ok(())
    }

    // DATA* registers

    /// Read all six data bytes, then re-arm single-measurement mode if active
    fn read_data_block(&mut self) -> Result<[u8; 6], Hmc5883lError<B::Error>> {
        let mut block = [0u8; 6];
        self.bus
            .read_registers(self.address, reg::DATAX_H, &mut block)
            .map_err(Hmc5883lError::Bus)?;

        if self.mode == Some(MeasurementMode::Single) {
            self.write_register(reg::MODE, field::MODE.encode(MeasurementMode::Single.bits()))?;
        }

        Ok(block)
    }

    /// 3-axis reading in raw counts
    ///
    /// An axis reads [`OVERFLOW`] when its ADC saturated; the value is
    /// passed through untouched.
    pub fn heading(&mut self) -> Result<HeadingSample, Hmc5883lError<B::Error>> {
        let block = self.read_data_block()?;
        Ok(HeadingSample::from_data_block(&block))
    }

    /// X-axis reading
    ///
    /// Reads the whole data block; a partial read would lock the data
    /// registers.
    pub fn heading_x(&mut self) -> Result<i16, Hmc5883lError<B::Error>> {
        Ok(self.heading()?.x)
    }

    /// Y-axis reading (whole block read, see [`Hmc5883l::heading_x`])
    pub fn heading_y(&mut self) -> Result<i16, Hmc5883lError<B::Error>> {
        Ok(self.heading()?.y)
    }

    /// Z-axis reading (whole block read, see [`Hmc5883l::heading_x`])
    pub fn heading_z(&mut self) -> Result<i16, Hmc5883lError<B::Error>> {
        Ok(self.heading()?.z)
    }

    // STATUS register

    /// Data output register lock
    ///
    /// Set when some but not all of the six data registers were read. The
    /// lock clears once all six are read, or the mode or configuration
    /// changes.
    pub fn lock_status(&mut self) -> Result<bool, Hmc5883lError<B::Error>> {
        let value = self.read_register(reg::STATUS)?;
        Ok((value >> status::LOCK_BIT) & 0x01 != 0)
    }

    /// Data ready
    ///
    /// Set once all six data registers hold a new measurement. The DRDY
    /// pin carries the same information.
    pub fn ready_status(&mut self) -> Result<bool, Hmc5883lError<B::Error>> {
        let value = self.read_register(reg::STATUS)?;
        Ok((value >> status::READY_BIT) & 0x01 != 0)
    }
}
