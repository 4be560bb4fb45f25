use embedded_hal as hal;
use hal::digital::OutputPin;

use super::SensorInterface;
use crate::Error;

/// This combines the SPI peripheral and
/// associated control pins such as:
/// - CSN : Chip Select (aka SS or Slave Select)
///
/// The sensor expects SPI mode 0, MSB first, with a clock of at most 2 MHz;
/// configuring the bus accordingly is up to the caller. Chip select is held
/// low by this interface for the duration of each transaction.
pub struct SpiInterface<SPI, CSN> {
    /// the SPI port to use when communicating
    spi: SPI,
    /// the Chip Select pin (GPIO output) to use when communicating
    csn: CSN,
}

impl<SPI, CSN, CommE, PinE> SpiInterface<SPI, CSN>
where
    SPI: hal::spi::SpiBus<u8, Error = CommE>,
    CSN: OutputPin<Error = PinE>,
{
    /// The register address travels in the upper seven bits of the command
    /// byte; bit 0 selects the transfer direction.
    const DIR_READ: u8 = 0x01;

    pub fn new(spi: SPI, csn: CSN) -> Self {
        let mut inst = Self { spi, csn };
        //ensure that the device is initially deselected
        let _ = inst.csn.set_high();
        inst
    }

    /// Release owned resources
    pub fn release(self) -> (SPI, CSN) {
        (self.spi, self.csn)
    }

    fn read_block(&mut self, reg: u8, buffer: &mut [u8]) -> Result<(), Error<CommE, PinE>> {
        self.csn.set_low().map_err(Error::Pin)?;
        let rc = self
            .spi
            .write(&[(reg << 1) | Self::DIR_READ])
            .and_then(|()| self.spi.read(buffer))
            .and_then(|()| self.spi.flush());
        self.csn.set_high().map_err(Error::Pin)?;
        rc.map_err(Error::Comm)?;

        #[cfg(feature = "use-defmt")]
        defmt::trace!("read reg 0x{=u8:x} {=[u8]:x}", reg, &buffer[..]);

        Ok(())
    }

    fn write_block(&mut self, reg: u8, data: &[u8]) -> Result<(), Error<CommE, PinE>> {
        #[cfg(feature = "use-defmt")]
        defmt::trace!("write reg 0x{=u8:x} {=[u8]:x}", reg, data);

        self.csn.set_low().map_err(Error::Pin)?;
        let rc = self
            .spi
            .write(&[(reg << 1) & !Self::DIR_READ])
            .and_then(|()| self.spi.write(data))
            .and_then(|()| self.spi.flush());
        self.csn.set_high().map_err(Error::Pin)?;
        rc.map_err(Error::Comm)?;

        Ok(())
    }
}

impl<SPI, CSN, CommE, PinE> SensorInterface for SpiInterface<SPI, CSN>
where
    SPI: hal::spi::SpiBus<u8, Error = CommE>,
    CSN: OutputPin<Error = PinE>,
{
    type InterfaceError = Error<CommE, PinE>;

    fn read_registers(&mut self, reg: u8, buffer: &mut [u8])
        -> Result<(), Self::InterfaceError>
    {
        self.read_block(reg, buffer)
    }

    fn write_registers(&mut self, reg: u8, data: &[u8]) -> Result<(), Self::InterfaceError> {
        self.write_block(reg, data)
    }

    fn using_spi(&self) -> bool {
        true
    }
}
