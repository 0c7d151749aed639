//! Sample encodings.
//!
//! [`FormatTag`] can describe any PCM encoding a platform might hand us.
//! [`AudioFormat`] is the fixed subset the buffer converter knows how to
//! decode; converting a tag into a format is where unsupported encodings are
//! rejected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::CaptureError;

const BITSIZE_MASK: u16 = 0x00FF;
const FLOAT_BIT: u16 = 1 << 8;
const BIG_ENDIAN_BIT: u16 = 1 << 12;
const SIGNED_BIT: u16 = 1 << 15;

/// Packed description of a sample encoding.
///
/// Layout:
/// ```text
/// bits 0-7   bit width
/// bit 8      1 = floating point
/// bit 12     1 = big-endian
/// bit 15     1 = signed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormatTag(pub u16);

impl FormatTag {
    pub fn new(bits: u8, signed: bool, float: bool, big_endian: bool) -> Self {
        let mut tag = bits as u16;
        if float {
            tag |= FLOAT_BIT;
        }
        if big_endian {
            tag |= BIG_ENDIAN_BIT;
        }
        if signed {
            tag |= SIGNED_BIT;
        }
        Self(tag)
    }

    pub fn bit_size(self) -> u16 {
        self.0 & BITSIZE_MASK
    }

    pub fn is_float(self) -> bool {
        self.0 & FLOAT_BIT != 0
    }

    pub fn is_big_endian(self) -> bool {
        self.0 & BIG_ENDIAN_BIT != 0
    }

    pub fn is_signed(self) -> bool {
        self.0 & SIGNED_BIT != 0
    }

    /// The supported format this tag names, if any.
    pub fn format(self) -> Option<AudioFormat> {
        AudioFormat::ALL.iter().copied().find(|f| f.tag() == self)
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.format().map(AudioFormat::name).unwrap_or("UNKNOWN");
        write!(
            f,
            "<AudioFormat {} signed:{} bigendian:{} float:{} bitwidth:{}>",
            name,
            self.is_signed(),
            self.is_big_endian(),
            self.is_float(),
            self.bit_size()
        )
    }
}

/// Sample encodings the converter can decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AudioFormat {
    S8,
    U8,
    S16Lsb,
    S16Msb,
    U16Lsb,
    U16Msb,
    S32Lsb,
    S32Msb,
    F32Lsb,
    F32Msb,
}

impl AudioFormat {
    pub const ALL: [AudioFormat; 10] = [
        Self::S8,
        Self::U8,
        Self::S16Lsb,
        Self::S16Msb,
        Self::U16Lsb,
        Self::U16Msb,
        Self::S32Lsb,
        Self::S32Msb,
        Self::F32Lsb,
        Self::F32Msb,
    ];

    pub const S16_SYS: Self = if cfg!(target_endian = "big") { Self::S16Msb } else { Self::S16Lsb };
    pub const U16_SYS: Self = if cfg!(target_endian = "big") { Self::U16Msb } else { Self::U16Lsb };
    pub const S32_SYS: Self = if cfg!(target_endian = "big") { Self::S32Msb } else { Self::S32Lsb };
    pub const F32_SYS: Self = if cfg!(target_endian = "big") { Self::F32Msb } else { Self::F32Lsb };

    pub fn tag(self) -> FormatTag {
        match self {
            Self::S8 => FormatTag::new(8, true, false, false),
            Self::U8 => FormatTag::new(8, false, false, false),
            Self::S16Lsb => FormatTag::new(16, true, false, false),
            Self::S16Msb => FormatTag::new(16, true, false, true),
            Self::U16Lsb => FormatTag::new(16, false, false, false),
            Self::U16Msb => FormatTag::new(16, false, false, true),
            Self::S32Lsb => FormatTag::new(32, true, false, false),
            Self::S32Msb => FormatTag::new(32, true, false, true),
            Self::F32Lsb => FormatTag::new(32, true, true, false),
            Self::F32Msb => FormatTag::new(32, true, true, true),
        }
    }

    /// Bytes per sample.
    pub fn width(self) -> usize {
        self.tag().bit_size() as usize / 8
    }

    pub fn is_signed(self) -> bool {
        self.tag().is_signed()
    }

    pub fn is_float(self) -> bool {
        self.tag().is_float()
    }

    pub fn is_big_endian(self) -> bool {
        self.tag().is_big_endian()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::S8 => "S8",
            Self::U8 => "U8",
            Self::S16Lsb => "S16LSB",
            Self::S16Msb => "S16MSB",
            Self::U16Lsb => "U16LSB",
            Self::U16Msb => "U16MSB",
            Self::S32Lsb => "S32LSB",
            Self::S32Msb => "S32MSB",
            Self::F32Lsb => "F32LSB",
            Self::F32Msb => "F32MSB",
        }
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::F32_SYS
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<FormatTag> for AudioFormat {
    type Error = CaptureError;

    fn try_from(tag: FormatTag) -> Result<Self, Self::Error> {
        tag.format().ok_or(CaptureError::UnsupportedFormat(tag))
    }
}

impl FromStr for AudioFormat {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let format = match s.trim().to_ascii_uppercase().as_str() {
            "S8" => Self::S8,
            "U8" => Self::U8,
            "S16LSB" => Self::S16Lsb,
            "S16MSB" => Self::S16Msb,
            "S16SYS" | "S16" => Self::S16_SYS,
            "U16LSB" => Self::U16Lsb,
            "U16MSB" => Self::U16Msb,
            "U16SYS" | "U16" => Self::U16_SYS,
            "S32LSB" => Self::S32Lsb,
            "S32MSB" => Self::S32Msb,
            "S32SYS" | "S32" => Self::S32_SYS,
            "F32LSB" => Self::F32Lsb,
            "F32MSB" => Self::F32Msb,
            "F32SYS" | "F32" => Self::F32_SYS,
            other => {
                return Err(CaptureError::ConfigurationFailed(format!(
                    "unknown sample format: {}",
                    other
                )))
            }
        };
        Ok(format)
    }
}

impl TryFrom<String> for AudioFormat {
    type Error = CaptureError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AudioFormat> for String {
    fn from(format: AudioFormat) -> Self {
        format.name().to_string()
    }
}
