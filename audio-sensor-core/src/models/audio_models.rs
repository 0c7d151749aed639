use std::fmt;

use serde::{Deserialize, Serialize};

use super::config::CaptureConfiguration;
use super::format::FormatTag;

/// A capture device as reported by enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioDevice {
    pub index: usize,
    pub name: String,
    pub is_default: bool,
}

impl fmt::Display for AudioDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Capture device {}: '{}'", self.index, self.name)?;
        if self.is_default {
            f.write_str(" (default)")?;
        }
        Ok(())
    }
}

/// Identity of an opened device handle. Stable across stop/start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceHandleId(pub u32);

impl fmt::Display for DeviceHandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the opened device actually honors.
///
/// All conversions use these values, never the requested configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiatedSpec {
    pub handle: DeviceHandleId,
    pub device_name: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub format: FormatTag,
    /// Fixed callback size, or None when the platform picks it.
    pub frames_per_buffer: Option<u32>,
}

impl NegotiatedSpec {
    /// Whether the device granted the requested rate, channels and format.
    /// A buffer size left to the platform is not a substitution.
    pub fn matches_request(&self, config: &CaptureConfiguration) -> bool {
        self.sample_rate == config.sample_rate
            && self.channels == config.channels
            && self.format == config.format.tag()
            && self.frames_per_buffer.map_or(true, |frames| frames == config.frames_per_buffer)
    }
}

impl fmt::Display for NegotiatedSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "device {} '{}' freq: {} format: {:#06x} {} channels: {} samples: ",
            self.handle, self.device_name, self.sample_rate, self.format.0, self.format, self.channels
        )?;
        match self.frames_per_buffer {
            Some(frames) => write!(f, "{}", frames),
            None => f.write_str("platform default"),
        }
    }
}

/// One capture configuration a device advertises.
///
/// Backends translate their native capability lists into these so negotiation
/// stays platform-independent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedRange {
    pub channels: u16,
    pub min_sample_rate: u32,
    pub max_sample_rate: u32,
    pub format: FormatTag,
    /// Inclusive frames-per-buffer bounds, if the platform reports them.
    pub buffer_frames: Option<(u32, u32)>,
}

impl SupportedRange {
    pub fn contains_rate(&self, rate: u32) -> bool {
        (self.min_sample_rate..=self.max_sample_rate).contains(&rate)
    }
}

/// Counters for debugging a running sensor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorDiagnostics {
    pub callback_count: u64,
    pub bytes_received: u64,
    pub messages_emitted: u64,
    pub conversion_errors: u64,
    pub sink_errors: u64,
    /// Trailing bytes that did not fill a whole frame.
    pub truncated_bytes: u64,
}
