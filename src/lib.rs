/*
LICENSE: BSD3 (see LICENSE file)
*/

//! Driver for the ENS160 digital metal-oxide multi-gas sensor.
//!
//! The ENS160 reports an air quality index (UBA scale), TVOC and ethanol
//! concentrations in ppb, and an equivalent CO2 concentration in ppm. The
//! device can be reached over I2C or SPI; both transports are supported
//! through the [`SensorInterface`] trait and selected with the [`Builder`]
//! constructors.

#![cfg_attr(not(test), no_std)]

use embedded_hal as hal;
use hal::delay::DelayNs;
use hal::digital::OutputPin;

mod interface;
pub use interface::{I2cInterface, SensorInterface, SpiInterface};

/// Errors in this crate
#[derive(Debug)]
pub enum Error<CommE, PinE> {
    /// Sensor communication error
    Comm(CommE),
    /// Pin setting error
    Pin(PinE),

    /// Unrecognized part ID
    UnknownChipId,
    /// Sensor not responding
    Unresponsive,
}

pub struct Builder {}

impl Builder {
    /// Create a new driver using I2C interface
    pub fn new_i2c<I2C, CommE>(i2c: I2C, address: u8) -> Ens160<I2cInterface<I2C>>
    where
        I2C: hal::i2c::I2c<Error = CommE>,
        CommE: core::fmt::Debug,
    {
        let iface = interface::I2cInterface::new(i2c, address);
        Ens160::new_with_interface(iface)
    }

    /// Create a new driver using SPI interface
    pub fn new_spi<SPI, CSN, CommE, PinE>(spi: SPI, csn: CSN) -> Ens160<SpiInterface<SPI, CSN>>
    where
        SPI: hal::spi::SpiBus<u8, Error = CommE>,
        CSN: OutputPin<Error = PinE>,
        CommE: core::fmt::Debug,
        PinE: core::fmt::Debug,
    {
        let iface = interface::SpiInterface::new(spi, csn);
        Ens160::new_with_interface(iface)
    }
}

pub struct Ens160<SI> {
    pub(crate) si: SI,

    /// most recently decoded status byte
    status: SensorStatus,
    /// local mirror of the device's rolling data checksum (0 is the
    /// hardware default)
    misr: u8,
}

impl<SI, CommE, PinE> Ens160<SI>
where
    SI: SensorInterface<InterfaceError = Error<CommE, PinE>>,
{
    pub(crate) fn new_with_interface(sensor_interface: SI) -> Self {
        Self {
            si: sensor_interface,
            status: SensorStatus::new(0),
            misr: 0,
        }
    }

    /// Read the part ID register
    pub fn part_id(&mut self) -> Result<u16, SI::InterfaceError> {
        let mut buffer = [0u8; 2];
        self.si.read_registers(REG_PART_ID, &mut buffer)?;
        Ok(concat_bytes(buffer[1], buffer[0]))
    }

    /// Verify the sensor identity and configure it for gas sensing:
    /// Standard operating mode, interrupt sources at their defaults.
    ///
    /// The driver must not be used until this has returned `Ok`.
    pub fn setup(&mut self, delay_source: &mut impl DelayNs) -> Result<(), SI::InterfaceError> {
        let part_id = self.part_id()?;
        // a silent bus reads back as all-zeros or all-ones without any
        // transport-level error indication
        if part_id == 0x0000 || part_id == 0xFFFF {
            return Err(Error::Unresponsive);
        }
        if part_id != ENS160_PART_ID {
            #[cfg(feature = "use-defmt")]
            defmt::warn!("bogus part id: 0x{=u16:x}", part_id);
            return Err(Error::UnknownChipId);
        }
        #[cfg(feature = "use-defmt")]
        defmt::debug!("found device: 0x{=u16:x}", part_id);

        self.set_power_mode(delay_source, PowerMode::Standard)?;
        self.set_interrupt_config(delay_source, InterruptConfig::default())?;

        Ok(())
    }

    /// Set the operating (power) mode
    pub fn set_power_mode(
        &mut self,
        delay_source: &mut impl DelayNs,
        mode: PowerMode,
    ) -> Result<(), SI::InterfaceError> {
        self.si.register_write(REG_OPMODE, mode as u8)?;
        // give the device time to apply the mode change
        delay_source.delay_ms(MODE_SETTLING_DELAY_MS);
        Ok(())
    }

    /// Configure the INTn pin.
    ///
    /// The new-measurement-data interrupt source is always enabled on top of
    /// whatever the config selects; the GPR source stays opt-in.
    pub fn set_interrupt_config(
        &mut self,
        delay_source: &mut impl DelayNs,
        config: InterruptConfig,
    ) -> Result<(), SI::InterfaceError> {
        let mode = config.bits() | INT_DEFAULT_MASK;
        self.si.register_write(REG_CONFIG, mode)?;
        delay_source.delay_ms(MODE_SETTLING_DELAY_MS);
        Ok(())
    }

    /// Supply ambient temperature (°C) and relative humidity (%rH) for
    /// compensation of the gas measurements.
    ///
    /// The device wants temperature in units of 1/64 K and humidity in units
    /// of 1/512 %. Inputs outside the representable range clamp to the
    /// nearest encodable value.
    pub fn set_compensation(
        &mut self,
        ambient_temp: f32,
        relative_humidity: f32,
    ) -> Result<(), SI::InterfaceError> {
        let temp = encode_temperature(ambient_temp).to_le_bytes();
        let rh = encode_humidity(relative_humidity).to_le_bytes();
        let buffer = [temp[0], temp[1], rh[0], rh[1]];
        self.si.write_registers(REG_TEMP_IN, &buffer)
    }

    /// Read back the temperature and humidity the device is currently using
    /// in its calculations, as (°C, %rH).
    pub fn get_compensation(&mut self) -> Result<(f32, f32), SI::InterfaceError> {
        let mut buffer = [0u8; 4];
        self.read_data(REG_DATA_T, &mut buffer)?;
        let temp = concat_bytes(buffer[1], buffer[0]);
        let rh = concat_bytes(buffer[3], buffer[2]);
        Ok(((temp as f32) / 64.0 - 273.15, (rh as f32) / 512.0))
    }

    /// Read and decode the status register
    pub fn get_status(&mut self) -> Result<SensorStatus, SI::InterfaceError> {
        let mut buffer = [0u8; 1];
        self.read_data(REG_DATA_STATUS, &mut buffer)?;
        self.status = SensorStatus::new(buffer[0]);
        Ok(self.status)
    }

    /// The status decoded by the most recent `get_status` call
    pub fn last_status(&self) -> SensorStatus {
        self.status
    }

    /// Air quality index on the UBA scale, 1 (excellent) to 5 (unhealthy)
    pub fn get_aqi(&mut self) -> Result<u8, SI::InterfaceError> {
        let mut buffer = [0u8; 1];
        self.read_data(REG_DATA_AQI, &mut buffer)?;
        Ok(buffer[0])
    }

    /// Total volatile organic compounds concentration in ppb (0-65000)
    pub fn get_tvoc(&mut self) -> Result<u16, SI::InterfaceError> {
        let mut buffer = [0u8; 2];
        self.read_data(REG_DATA_TVOC, &mut buffer)?;
        Ok(concat_bytes(buffer[1], buffer[0]))
    }

    /// Ethanol concentration in ppb
    pub fn get_etoh(&mut self) -> Result<u16, SI::InterfaceError> {
        let mut buffer = [0u8; 2];
        self.read_data(REG_DATA_ETOH, &mut buffer)?;
        Ok(concat_bytes(buffer[1], buffer[0]))
    }

    /// Equivalent CO2 concentration in ppm (400-65000), derived from the
    /// detected VOCs and hydrogen
    pub fn get_eco2(&mut self) -> Result<u16, SI::InterfaceError> {
        let mut buffer = [0u8; 2];
        self.read_data(REG_DATA_ECO2, &mut buffer)?;
        Ok(concat_bytes(buffer[1], buffer[0]))
    }

    /// Firmware version as [major, minor, release].
    ///
    /// The command sequence is only accepted in Idle mode.
    pub fn get_firmware_version(&mut self) -> Result<[u8; 3], SI::InterfaceError> {
        self.si.register_write(REG_COMMAND, COMMAND_NOP)?;
        self.si.register_write(REG_COMMAND, COMMAND_CLRGPR)?;
        self.si.register_write(REG_COMMAND, COMMAND_GET_APPVER)?;

        let mut buffer = [0u8; 3];
        self.si.read_registers(REG_GPR_READ + 4, &mut buffer)?;
        Ok(buffer)
    }

    /// The checksum the device computed over the previous data read
    /// transaction, without comparing it to the local mirror
    pub fn get_misr(&mut self) -> Result<u8, SI::InterfaceError> {
        self.si.register_read(REG_DATA_MISR)
    }

    /// Compare the device-computed checksum against the local mirror.
    ///
    /// Returns whether they matched. On a mismatch the mirror is
    /// resynchronized to the device value, so the next comparison window
    /// starts clean.
    pub fn verify_checksum(&mut self) -> Result<bool, SI::InterfaceError> {
        let reported = self.si.register_read(REG_DATA_MISR)?;
        let matched = reported == self.misr;
        if !matched {
            #[cfg(feature = "use-defmt")]
            defmt::warn!(
                "checksum mismatch: device 0x{=u8:x}, mirror 0x{=u8:x}",
                reported,
                self.misr
            );
            self.misr = reported;
        }
        Ok(matched)
    }

    /// Current value of the local checksum mirror
    pub fn misr_mirror(&self) -> u8 {
        self.misr
    }

    /// Release owned resources
    pub fn release(self) -> SI {
        self.si
    }

    /// Read from one of the DATA_ registers, folding every byte received
    /// into the checksum mirror the same way the device folds it into MISR.
    fn read_data(&mut self, reg: u8, buffer: &mut [u8]) -> Result<(), SI::InterfaceError> {
        self.si.read_registers(reg, buffer)?;
        for &byte in buffer.iter() {
            self.misr = misr_fold(self.misr, byte);
        }
        Ok(())
    }
}

/// One step of the MISR recurrence: shift the running value left one bit,
/// fold in the new data byte, and apply the polynomial when the bit shifted
/// out was set.
fn misr_fold(misr: u8, data: u8) -> u8 {
    let folded = (misr << 1) ^ data;
    if misr & 0x80 == 0 {
        folded
    } else {
        folded ^ MISR_POLY
    }
}

/// Temperature in 1/64 K, truncated
fn encode_temperature(celsius: f32) -> u16 {
    ((celsius + 273.15) * 64.0) as u16
}

/// Relative humidity in 1/512 %, truncated
fn encode_humidity(percent: f32) -> u16 {
    (percent * 512.0) as u16
}

/// Combine two 8-bit register values into one 16-bit value
fn concat_bytes(msb: u8, lsb: u8) -> u16 {
    ((msb as u16) << 8) | (lsb as u16)
}

/// Common registers
///
const REG_PART_ID: u8 = 0x00;

const REG_OPMODE: u8 = 0x10;
const REG_CONFIG: u8 = 0x11;
const REG_COMMAND: u8 = 0x12;

const REG_TEMP_IN: u8 = 0x13;
// const REG_RH_IN: u8 = 0x15; //written together with TEMP_IN as one block

const REG_DATA_STATUS: u8 = 0x20;
const REG_DATA_AQI: u8 = 0x21;
const REG_DATA_TVOC: u8 = 0x22;
const REG_DATA_ETOH: u8 = 0x22;
const REG_DATA_ECO2: u8 = 0x24;

const REG_DATA_T: u8 = 0x30;
// const REG_DATA_RH: u8 = 0x32; //read together with DATA_T as one block

const REG_DATA_MISR: u8 = 0x38;

// const REG_GPR_WRITE: u8 = 0x40;
const REG_GPR_READ: u8 = 0x48;

/// COMMAND register values
const COMMAND_NOP: u8 = 0x00;
const COMMAND_GET_APPVER: u8 = 0x0E;
const COMMAND_CLRGPR: u8 = 0xCC;

/// Part ID of a supported device
const ENS160_PART_ID: u16 = 0x0160;

/// x^8 + x^4 + x^3 + x^2 + x^0, with the x^8 term implicit
const MISR_POLY: u8 = 0x1D;

/// Time to wait after a mode-change write before the device has applied it
const MODE_SETTLING_DELAY_MS: u32 = 20;

/// CONFIG bits forced on every interrupt config write:
/// new-measurement-data source enabled, GPR source left as selected
const INT_DEFAULT_MASK: u8 = 1 << 1;

/// I2C address with the SDO pin strapped to GND
pub const DEFAULT_I2C_ADDRESS: u8 = 0x52;
/// I2C address with the SDO pin strapped to VCC
pub const ALTERNATE_I2C_ADDRESS: u8 = 0x53;

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub enum PowerMode {
    /// DEEP SLEEP mode (low power standby)
    Sleep = 0x00,
    /// IDLE mode (low power)
    Idle = 0x01,
    /// STANDARD gas sensing mode
    Standard = 0x02,
}

impl Default for PowerMode {
    fn default() -> Self {
        PowerMode::Standard
    }
}

/// Operating-phase classification the device attaches to its output
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub enum Validity {
    /// Normal operation
    NormalOperation = 0,
    /// Warm-Up phase, the first minutes after power-on
    WarmUpPhase = 1,
    /// Initial Start-Up phase, the first full hour of operation after the
    /// very first power-on
    InitialStartUpPhase = 2,
    /// Invalid output
    InvalidOutput = 3,
}

/// Decoded DATA_STATUS (0x20) register.
///
/// Register layout:
///
/// |    b7    |   b6   |  b5..b4  |    b3..b2     |   b1   |   b0   |
/// |----------|--------|----------|---------------|--------|--------|
/// |  STATAS  | STATER | reserved | VALIDITY FLAG | NEWDAT | NEWGPR |
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub struct SensorStatus(u8);

impl SensorStatus {
    pub fn new(status: u8) -> Self {
        SensorStatus(status)
    }

    /// New data is waiting in the General Purpose Read registers
    pub fn new_gpr_data(self) -> bool {
        self.0 & (1 << 0) != 0
    }

    /// New measurement data is waiting in the DATA_ registers
    pub fn new_data(self) -> bool {
        self.0 & (1 << 1) != 0
    }

    /// How trustworthy the current output is
    pub fn validity(self) -> Validity {
        match (self.0 >> 2) & 0b11 {
            0 => Validity::NormalOperation,
            1 => Validity::WarmUpPhase,
            2 => Validity::InitialStartUpPhase,
            _ => Validity::InvalidOutput,
        }
    }

    /// High when the device detected an error, e.g. an invalid operating
    /// mode was selected
    pub fn error_detected(self) -> bool {
        self.0 & (1 << 6) != 0
    }

    /// High while an operating mode is running
    pub fn running(self) -> bool {
        self.0 & (1 << 7) != 0
    }

    /// The raw status byte
    pub fn bits(self) -> u8 {
        self.0
    }
}

/// Output driving mode of the INTn pin
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub enum InterruptPinDrive {
    /// Open drain
    OpenDrain = 0,
    /// Push / Pull
    PushPull = 1,
}

/// Active signal level of the INTn pin
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub enum InterruptPinPolarity {
    /// Active low
    ActiveLow = 0,
    /// Active high
    ActiveHigh = 1,
}

/// INTn pin configuration, encoded into the CONFIG (0x11) register.
///
/// Register layout:
///
/// |  b7  |    b6    |   b5    |  b4  |    b3    |  b2  |    b1    |   b0   |
/// |------|----------|---------|------|----------|------|----------|--------|
/// |  --  | INTPOL   | INT_CFG |  --  | INTGPR   |  --  | INTDAT   | INTEN  |
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub struct InterruptConfig {
    /// Main switch for the INTn pin
    pub enabled: bool,
    /// Assert INTn when new measurement data arrives
    pub on_new_data: bool,
    /// Assert INTn when new General Purpose Register data arrives
    pub on_new_gpr_data: bool,
    pub pin_drive: InterruptPinDrive,
    pub polarity: InterruptPinPolarity,
}

impl InterruptConfig {
    pub(crate) fn bits(self) -> u8 {
        ((self.polarity as u8) << 6)
            | ((self.pin_drive as u8) << 5)
            | ((self.on_new_gpr_data as u8) << 3)
            | ((self.on_new_data as u8) << 1)
            | (self.enabled as u8)
    }
}

impl Default for InterruptConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            on_new_data: false,
            on_new_gpr_data: false,
            pin_drive: InterruptPinDrive::OpenDrain,
            polarity: InterruptPinPolarity::ActiveLow,
        }
    }
}
