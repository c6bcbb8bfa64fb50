//! Decoding of the 32-bit frame clocked out of the MAX31855.
//!
//! Frame layout, most significant bit first:
//!
//! | bits  | meaning                                      |
//! |-------|----------------------------------------------|
//! | 31-18 | thermocouple temperature, 14-bit signed      |
//! | 17    | reserved                                     |
//! | 16    | any fault                                    |
//! | 15-4  | internal temperature, 12-bit signed          |
//! | 3     | reserved                                     |
//! | 2     | short to VCC                                 |
//! | 1     | short to ground                              |
//! | 0     | open circuit                                 |

use thiserror::Error;

/// Number of bytes in one read transaction.
pub const FRAME_LEN: usize = 4;

/// Conversion rate between the raw thermocouple value and degrees celcius.
const TC_CONV_C: f32 = 0.25;
/// Conversion rate between the raw internal value and degrees celcius.
const INTERNAL_CONV_C: f32 = 0.0625;

/// Width of the signed thermocouple field.
const TC_BITS: u32 = 14;
/// Width of the signed internal temperature field.
const INTERNAL_BITS: u32 = 12;

/// Fault flags, found in the last byte of the frame.
const FAULT_OC: u8 = 0b0000_0001;
const FAULT_SCG: u8 = 0b0000_0010;
const FAULT_SCV: u8 = 0b0000_0100;

/// Faults the MAX31855 reports instead of a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Fault {
    /// Thermocouple is not connected
    #[error("thermocouple is not connected")]
    OpenCircuit,
    /// Thermocouple is shorted to ground
    #[error("thermocouple is shorted to ground")]
    ShortToGround,
    /// Thermocouple is shorted to VCC
    #[error("thermocouple is shorted to VCC")]
    ShortToVcc,
}

impl Fault {
    /// Returns the fault flagged in the status byte, if any.
    ///
    /// The chip should never raise more than one flag at a time. When it does,
    /// open circuit wins over short to ground, which wins over short to VCC.
    pub fn from_status(status: u8) -> Option<Self> {
        if status & FAULT_OC != 0 {
            Some(Fault::OpenCircuit)
        } else if status & FAULT_SCG != 0 {
            Some(Fault::ShortToGround)
        } else if status & FAULT_SCV != 0 {
            Some(Fault::ShortToVcc)
        } else {
            None
        }
    }
}

/// Temperatures as raw counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawReading {
    /// Hot junction, in steps of 0.25 C
    pub thermocouple: i16,
    /// Cold junction, in steps of 0.0625 C
    pub internal: i16,
}

/// Temperatures in degrees celcius.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Reading {
    /// Hot junction temperature
    pub thermocouple: f32,
    /// Cold junction (die) temperature
    pub internal: f32,
}

impl From<RawReading> for Reading {
    fn from(raw: RawReading) -> Self {
        Self {
            thermocouple: raw.thermocouple as f32 * TC_CONV_C,
            internal: raw.internal as f32 * INTERNAL_CONV_C,
        }
    }
}

/// Sign extends the low `bits` bits of `word`.
#[inline]
fn sign_extend(word: u16, bits: u32) -> i16 {
    let shift = 16 - bits;

    ((word << shift) as i16) >> shift
}

/// Decodes a frame into raw counts, or the fault it reports.
pub fn decode_raw(frame: [u8; FRAME_LEN]) -> Result<RawReading, Fault> {
    if let Some(fault) = Fault::from_status(frame[3]) {
        return Err(fault);
    }

    // Drop the reserved and fault bits below each field
    let tc_word = u16::from_be_bytes([frame[0], frame[1]]) >> 2;
    let internal_word = u16::from_be_bytes([frame[2], frame[3]]) >> 4;

    Ok(RawReading {
        thermocouple: sign_extend(tc_word, TC_BITS),
        internal: sign_extend(internal_word, INTERNAL_BITS),
    })
}

/// Decodes a frame into temperatures, or the fault it reports.
pub fn decode(frame: [u8; FRAME_LEN]) -> Result<Reading, Fault> {
    decode_raw(frame).map(Reading::from)
}

/// Same as [`decode`] for a frame held in a slice.
///
/// # Panics
///
/// Panics if `raw` is not exactly [`FRAME_LEN`] bytes long.
pub fn decode_slice(raw: &[u8]) -> Result<Reading, Fault> {
    let frame: [u8; FRAME_LEN] = match raw.try_into() {
        Ok(frame) => frame,
        Err(_) => panic!(
            "MAX31855 frame must be {} bytes, got {}",
            FRAME_LEN,
            raw.len()
        ),
    };

    decode(frame)
}
