//! SPI ports and connections the driver can talk through.

use embedded_hal::spi::SpiDevice;
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use thiserror::Error;

/// SPI clock polarity and phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpiMode {
    /// CPOL 0, CPHA 0
    Mode0,
    /// CPOL 0, CPHA 1
    Mode1,
    /// CPOL 1, CPHA 0
    Mode2,
    /// CPOL 1, CPHA 1
    Mode3,
}

impl From<SpiMode> for Mode {
    fn from(mode: SpiMode) -> Self {
        match mode {
            SpiMode::Mode0 => Mode::Mode0,
            SpiMode::Mode1 => Mode::Mode1,
            SpiMode::Mode2 => Mode::Mode2,
            SpiMode::Mode3 => Mode::Mode3,
        }
    }
}

/// A port that can be opened into a connection to one device.
pub trait SpiPort {
    type Connection: SpiConnection;
    type Error;

    /// Open the port with the given transaction parameters.
    fn connect(
        self,
        clock_speed_hz: u32,
        mode: SpiMode,
        bits_per_word: u8,
    ) -> Result<Self::Connection, Self::Error>;
}

/// An open connection to one device.
pub trait SpiConnection {
    type Error;

    /// Fill `buffer` from the device without transmitting anything.
    fn receive(&mut self, buffer: &mut [u8]) -> Result<(), Self::Error>;
}

/// Errors from the Raspberry Pi SPI peripheral.
#[derive(Debug, Error)]
pub enum RpiSpiError {
    #[error("SPI error: {0}")]
    Spi(#[from] rppal::spi::Error),
    #[error("short SPI read, expected {expected} bytes, received {received}")]
    ShortRead { expected: usize, received: usize },
}

/// One of the Raspberry Pi's SPI buses and a chip select line on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RpiSpiPort {
    pub bus: Bus,
    pub slave_select: SlaveSelect,
}

impl RpiSpiPort {
    pub fn new(bus: Bus, slave_select: SlaveSelect) -> Self {
        Self { bus, slave_select }
    }
}

impl SpiPort for RpiSpiPort {
    type Connection = Spi;
    type Error = RpiSpiError;

    fn connect(
        self,
        clock_speed_hz: u32,
        mode: SpiMode,
        bits_per_word: u8,
    ) -> Result<Spi, RpiSpiError> {
        let spi = Spi::new(self.bus, self.slave_select, clock_speed_hz, mode.into())?;

        spi.set_bits_per_word(bits_per_word)?;

        Ok(spi)
    }
}

impl SpiConnection for Spi {
    type Error = RpiSpiError;

    fn receive(&mut self, buffer: &mut [u8]) -> Result<(), RpiSpiError> {
        let received = self.read(buffer)?;

        if received != buffer.len() {
            return Err(RpiSpiError::ShortRead {
                expected: buffer.len(),
                received,
            });
        }

        Ok(())
    }
}

/// Adapts an `embedded-hal` SPI device, already configured by its HAL, into a
/// connection.
#[derive(Debug)]
pub struct HalDevice<D>(pub D);

impl<D: SpiDevice> SpiConnection for HalDevice<D> {
    type Error = D::Error;

    fn receive(&mut self, buffer: &mut [u8]) -> Result<(), D::Error> {
        self.0.read(buffer)
    }
}
