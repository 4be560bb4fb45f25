use embedded_hal as hal;

use super::SensorInterface;
use crate::Error;

/// Largest register block this driver moves in one transaction
/// (register address byte plus the 4-byte compensation write).
const BLOCK_BUF_LEN: usize = 8;

pub struct I2cInterface<I2C> {
    /// i2c port
    i2c_port: I2C,
    /// address for i2c communications
    address: u8,
}

impl<I2C, CommE> I2cInterface<I2C>
where
    I2C: hal::i2c::I2c<Error = CommE>,
{
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c_port: i2c,
            address,
        }
    }

    /// Release owned resources
    pub fn release(self) -> I2C {
        self.i2c_port
    }
}

impl<I2C, CommE> SensorInterface for I2cInterface<I2C>
where
    I2C: hal::i2c::I2c<Error = CommE>,
{
    type InterfaceError = Error<CommE, ()>;

    fn read_registers(&mut self, reg: u8, buffer: &mut [u8])
        -> Result<(), Self::InterfaceError>
    {
        self.i2c_port
            .write_read(self.address, &[reg], buffer)
            .map_err(Error::Comm)
    }

    fn write_registers(&mut self, reg: u8, data: &[u8]) -> Result<(), Self::InterfaceError> {
        debug_assert!(data.len() < BLOCK_BUF_LEN);
        let mut buffer = [0u8; BLOCK_BUF_LEN];
        buffer[0] = reg;
        buffer[1..=data.len()].copy_from_slice(data);
        self.i2c_port
            .write(self.address, &buffer[..=data.len()])
            .map_err(Error::Comm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_I2C_ADDRESS;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    #[test]
    fn read_sets_register_pointer_first() {
        let expectations = [I2cTransaction::write_read(
            DEFAULT_I2C_ADDRESS,
            vec![0x22],
            vec![0x34, 0x12],
        )];
        let mut iface = I2cInterface::new(I2cMock::new(&expectations), DEFAULT_I2C_ADDRESS);

        let mut buffer = [0u8; 2];
        iface.read_registers(0x22, &mut buffer).unwrap();
        assert_eq!(buffer, [0x34, 0x12]);

        iface.release().done();
    }

    #[test]
    fn write_prepends_register_address() {
        let expectations = [I2cTransaction::write(
            DEFAULT_I2C_ADDRESS,
            vec![0x13, 0x89, 0x4A, 0x00, 0x64],
        )];
        let mut iface = I2cInterface::new(I2cMock::new(&expectations), DEFAULT_I2C_ADDRESS);

        iface
            .write_registers(0x13, &[0x89, 0x4A, 0x00, 0x64])
            .unwrap();

        iface.release().done();
    }

    #[test]
    fn single_byte_helpers_use_block_transfers() {
        let expectations = [
            I2cTransaction::write_read(DEFAULT_I2C_ADDRESS, vec![0x21], vec![0x03]),
            I2cTransaction::write(DEFAULT_I2C_ADDRESS, vec![0x10, 0x02]),
        ];
        let mut iface = I2cInterface::new(I2cMock::new(&expectations), DEFAULT_I2C_ADDRESS);

        assert_eq!(iface.register_read(0x21).unwrap(), 0x03);
        iface.register_write(0x10, 0x02).unwrap();

        iface.release().done();
    }
}
