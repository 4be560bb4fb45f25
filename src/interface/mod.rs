pub mod i2c;
pub mod spi;

pub use self::i2c::I2cInterface;
pub use self::spi::SpiInterface;

/// A method of communicating with the sensor
pub trait SensorInterface {
    /// Interface error type
    type InterfaceError;

    /// Read `buffer.len()` bytes starting at the given register address.
    /// The sensor auto-increments its register pointer on multi-byte reads.
    fn read_registers(&mut self, reg: u8, buffer: &mut [u8])
        -> Result<(), Self::InterfaceError>;

    /// Write the data bytes starting at the given register address.
    fn write_registers(&mut self, reg: u8, data: &[u8]) -> Result<(), Self::InterfaceError>;

    /// Read a single one-byte register
    fn register_read(&mut self, reg: u8) -> Result<u8, Self::InterfaceError> {
        let mut buffer = [0u8; 1];
        self.read_registers(reg, &mut buffer)?;
        Ok(buffer[0])
    }

    /// Write a single one-byte register
    fn register_write(&mut self, reg: u8, val: u8) -> Result<(), Self::InterfaceError> {
        self.write_registers(reg, &[val])
    }

    fn using_spi(&self) -> bool {
        false
    }
}
