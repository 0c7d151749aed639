use serde::{Deserialize, Serialize};

use super::error::CaptureError;
use super::format::AudioFormat;

/// Requested capture parameters for an audio sensor.
///
/// The device may grant something different; see `NegotiatedSpec`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfiguration {
    /// Capture device index from enumeration, or None for the system default.
    pub device_index: Option<usize>,

    /// Number of channels to request (default: 1).
    pub channels: u16,

    /// Sample rate in Hz to request (default: 44100).
    pub sample_rate: u32,

    /// Frames delivered per callback (default: 512).
    pub frames_per_buffer: u32,

    /// Sample encoding to request (default: native-endian f32).
    pub format: AudioFormat,

    /// Node name, used in logs.
    pub name: String,

    /// Key under which tensors are published (default: "data").
    pub data_key: String,

    /// Log requested vs. negotiated spec at open time.
    pub debug: bool,
}

impl CaptureConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.channels == 0 {
            return Err("channel count must be positive".into());
        }
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if self.frames_per_buffer == 0 {
            return Err("frames per buffer must be positive".into());
        }
        if self.data_key.is_empty() {
            return Err("data key must not be empty".into());
        }
        Ok(())
    }

    /// Load a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, CaptureError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CaptureError::ConfigurationFailed(format!("failed to parse config: {}", e)))?;
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        Ok(config)
    }
}

impl Default for CaptureConfiguration {
    fn default() -> Self {
        Self {
            device_index: None,
            channels: 1,
            sample_rate: 44100,
            frames_per_buffer: 512,
            format: AudioFormat::F32_SYS,
            name: "AudioSensor".into(),
            data_key: "data".into(),
            debug: false,
        }
    }
}
