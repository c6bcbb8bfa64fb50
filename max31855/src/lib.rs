#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]

pub mod bus;
pub mod decode;

use log::{debug, trace, warn};
use thiserror::Error;

pub use bus::{HalDevice, RpiSpiError, RpiSpiPort, SpiConnection, SpiMode, SpiPort};
pub use decode::{decode, decode_raw, decode_slice, Fault, RawReading, Reading, FRAME_LEN};

/// Fastest SCK the MAX31855 supports.
pub const CLOCK_SPEED_HZ: u32 = 5_000_000;
/// Data is valid on the rising edge with SCK idling low.
pub const SPI_MODE: SpiMode = SpiMode::Mode0;
pub const BITS_PER_WORD: u8 = 8;

/// Errors returned when reading the MAX31855.
#[derive(Debug, Error)]
pub enum Error<E> {
    /// The SPI transaction failed
    #[error("SPI transport error: {0}")]
    Transport(#[source] E),
    /// The chip reported a thermocouple fault
    #[error("thermocouple fault: {0}")]
    Fault(#[from] Fault),
}

impl<E> Error<E> {
    /// Returns the thermocouple fault, if this is one.
    pub fn fault(&self) -> Option<Fault> {
        match self {
            Error::Fault(fault) => Some(*fault),
            Error::Transport(_) => None,
        }
    }

    pub fn is_fault(&self) -> bool {
        self.fault().is_some()
    }
}

/// Driver for the MAX31855 thermocouple chip.
///
/// Owns its SPI connection; dropping the driver or calling
/// [`Max31855::release`] closes it.
#[derive(Debug)]
pub struct Max31855<C> {
    /// SPI connection to use.
    spi: C,
}

impl<C: SpiConnection> Max31855<C> {
    /// Open a port at the MAX31855's fixed clock speed, mode and word size.
    pub fn open<P>(port: P) -> Result<Self, P::Error>
    where
        P: SpiPort<Connection = C>,
    {
        let spi = port.connect(CLOCK_SPEED_HZ, SPI_MODE, BITS_PER_WORD)?;

        debug!(
            "opened MAX31855 at {} Hz, {:?}, {} bits per word",
            CLOCK_SPEED_HZ, SPI_MODE, BITS_PER_WORD
        );

        Ok(Self { spi })
    }

    /// Create a driver from a connection that is already configured for the chip.
    pub fn new(spi: C) -> Self {
        Self { spi }
    }

    /// Clock one frame out of the chip without decoding it.
    pub fn read_frame(&mut self) -> Result<[u8; FRAME_LEN], C::Error> {
        let mut frame = [0; FRAME_LEN];

        self.spi.receive(&mut frame)?;

        trace!("MAX31855 frame {:02x?}", frame);

        Ok(frame)
    }

    /// Get the hot and cold junction temperatures as raw counts.
    pub fn read_raw(&mut self) -> Result<RawReading, Error<C::Error>> {
        let frame = self.read_frame().map_err(Error::Transport)?;

        decode_raw(frame).map_err(|fault| {
            warn!("MAX31855 reported a fault: {}", fault);

            Error::Fault(fault)
        })
    }

    /// Get the hot and cold junction temperatures in celcius.
    pub fn read(&mut self) -> Result<Reading, Error<C::Error>> {
        self.read_raw().map(Reading::from)
    }

    /// Give back the SPI connection.
    pub fn release(self) -> C {
        self.spi
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct MockError;

    struct MockSpi {
        params: (u32, SpiMode, u8),
        frames: VecDeque<Result<[u8; 4], MockError>>,
        receives: Vec<usize>,
    }

    impl SpiConnection for MockSpi {
        type Error = MockError;

        fn receive(&mut self, buffer: &mut [u8]) -> Result<(), MockError> {
            self.receives.push(buffer.len());

            let frame = self.frames.pop_front().expect("unexpected transaction")?;
            buffer.copy_from_slice(&frame);

            Ok(())
        }
    }

    struct MockPort {
        frames: Vec<Result<[u8; 4], MockError>>,
        reject: bool,
    }

    impl MockPort {
        fn with_frames(frames: Vec<Result<[u8; 4], MockError>>) -> Self {
            Self {
                frames,
                reject: false,
            }
        }
    }

    impl SpiPort for MockPort {
        type Connection = MockSpi;
        type Error = MockError;

        fn connect(
            self,
            clock_speed_hz: u32,
            mode: SpiMode,
            bits_per_word: u8,
        ) -> Result<MockSpi, MockError> {
            if self.reject {
                return Err(MockError);
            }

            Ok(MockSpi {
                params: (clock_speed_hz, mode, bits_per_word),
                frames: self.frames.into(),
                receives: Vec::new(),
            })
        }
    }

    #[test]
    fn test_open_parameters() {
        let thermocouple = Max31855::open(MockPort::with_frames(vec![])).unwrap();
        let spi = thermocouple.release();

        assert_eq!(spi.params, (5_000_000, SpiMode::Mode0, 8));
        assert!(spi.receives.is_empty());
    }

    #[test]
    fn test_open_failure() {
        let port = MockPort {
            frames: vec![],
            reject: true,
        };

        assert_eq!(Max31855::open(port).err(), Some(MockError));
    }

    #[test]
    fn test_read() {
        let port = MockPort::with_frames(vec![Ok([0x06, 0x4C, 0x19, 0x00])]);
        let mut thermocouple = Max31855::open(port).unwrap();

        let reading = thermocouple.read().unwrap();

        assert_eq!(reading.thermocouple, 100.75);
        assert_eq!(reading.internal, 25.0);
        assert_eq!(thermocouple.release().receives, vec![4]);
    }

    #[test]
    fn test_one_transaction_per_read() {
        let port = MockPort::with_frames(vec![
            Ok([0x01, 0x90, 0x19, 0x00]),
            Ok([0xF0, 0x60, 0xEC, 0x00]),
        ]);
        let mut thermocouple = Max31855::open(port).unwrap();

        assert_eq!(
            thermocouple.read_raw().unwrap(),
            RawReading {
                thermocouple: 100,
                internal: 400
            }
        );
        assert_eq!(
            thermocouple.read().unwrap(),
            Reading {
                thermocouple: -250.0,
                internal: -20.0
            }
        );
        assert_eq!(thermocouple.release().receives, vec![4, 4]);
    }

    #[test]
    fn test_fault() {
        let port = MockPort::with_frames(vec![Ok([0x00, 0x01, 0x19, 0x01])]);
        let mut thermocouple = Max31855::open(port).unwrap();

        let err = thermocouple.read().unwrap_err();

        assert!(err.is_fault());
        assert_eq!(err.fault(), Some(Fault::OpenCircuit));
    }

    #[test]
    fn test_transport_error_is_not_a_fault() {
        let port = MockPort::with_frames(vec![Err(MockError)]);
        let mut thermocouple = Max31855::open(port).unwrap();

        let err = thermocouple.read().unwrap_err();

        assert!(matches!(err, Error::Transport(MockError)));
        assert!(!err.is_fault());
    }

    #[test]
    fn test_read_after_transport_error() {
        let port = MockPort::with_frames(vec![Err(MockError), Ok([0x01, 0x90, 0x19, 0x00])]);
        let mut thermocouple = Max31855::open(port).unwrap();

        assert!(thermocouple.read().is_err());
        assert_eq!(thermocouple.read().unwrap().thermocouple, 25.0);
    }

    #[test]
    fn test_read_frame() {
        let port = MockPort::with_frames(vec![Ok([0xDE, 0xAD, 0xBE, 0xEF])]);
        let mut thermocouple = Max31855::open(port).unwrap();

        assert_eq!(thermocouple.read_frame(), Ok([0xDE, 0xAD, 0xBE, 0xEF]));
    }

    #[test]
    fn test_new_from_connection() {
        let spi = MockSpi {
            params: (0, SpiMode::Mode0, 0),
            frames: VecDeque::from([Ok([0x00, 0x00, 0x00, 0x04])]),
            receives: Vec::new(),
        };
        let mut thermocouple = Max31855::new(spi);

        assert_eq!(thermocouple.read().unwrap_err().fault(), Some(Fault::ShortToVcc));
    }

    #[test]
    fn test_error_display() {
        let err: Error<RpiSpiError> = Fault::ShortToGround.into();

        assert_eq!(
            err.to_string(),
            "thermocouple fault: thermocouple is shorted to ground"
        );
    }
}
