use chrono::{DateTime, Utc};
use ndarray::Array2;

use super::format::AudioFormat;

/// Message label carried by every audio tensor.
pub const AUDIO_MESSAGE_LABEL: &str = "TensorAudioData";

/// A `(channels, frames)` array of decoded samples in the negotiated type.
///
/// Row `c` holds every sample of channel `c` in time order.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioTensor {
    S8(Array2<i8>),
    U8(Array2<u8>),
    S16(Array2<i16>),
    U16(Array2<u16>),
    S32(Array2<i32>),
    F32(Array2<f32>),
}

impl AudioTensor {
    /// `(channels, frames)`.
    pub fn shape(&self) -> (usize, usize) {
        match self {
            Self::S8(a) => a.dim(),
            Self::U8(a) => a.dim(),
            Self::S16(a) => a.dim(),
            Self::U16(a) => a.dim(),
            Self::S32(a) => a.dim(),
            Self::F32(a) => a.dim(),
        }
    }

    pub fn channels(&self) -> usize {
        self.shape().0
    }

    pub fn frames(&self) -> usize {
        self.shape().1
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    /// Element type name, e.g. `"f32"`.
    pub fn dtype(&self) -> &'static str {
        match self {
            Self::S8(_) => "i8",
            Self::U8(_) => "u8",
            Self::S16(_) => "i16",
            Self::U16(_) => "u16",
            Self::S32(_) => "i32",
            Self::F32(_) => "f32",
        }
    }

    pub fn as_f32(&self) -> Option<&Array2<f32>> {
        match self {
            Self::F32(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_i16(&self) -> Option<&Array2<i16>> {
        match self {
            Self::S16(a) => Some(a),
            _ => None,
        }
    }
}

/// Envelope handed to sinks for every converted capture buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorMessage {
    pub label: &'static str,
    pub data_key: String,
    /// Per-sensor counter, starting at 0, in capture order.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub sample_rate: u32,
    pub format: AudioFormat,
    pub tensor: AudioTensor,
}

impl TensorMessage {
    pub fn new(
        data_key: impl Into<String>,
        sequence: u64,
        sample_rate: u32,
        format: AudioFormat,
        tensor: AudioTensor,
    ) -> Self {
        Self {
            label: AUDIO_MESSAGE_LABEL,
            data_key: data_key.into(),
            sequence,
            timestamp: Utc::now(),
            sample_rate,
            format,
            tensor,
        }
    }

    /// Shape formatted as `(channels, frames)`.
    pub fn shape_string(&self) -> String {
        let (channels, frames) = self.tensor.shape();
        format!("({}, {})", channels, frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_carries_label_and_key() {
        let tensor = AudioTensor::F32(Array2::zeros((2, 4)));
        let msg = TensorMessage::new("data", 7, 48000, AudioFormat::F32Lsb, tensor);
        assert_eq!(msg.label, "TensorAudioData");
        assert_eq!(msg.data_key, "data");
        assert_eq!(msg.sequence, 7);
        assert_eq!(msg.shape_string(), "(2, 4)");
        assert_eq!(msg.tensor.dtype(), "f32");
    }

    #[test]
    fn empty_tensor() {
        let tensor = AudioTensor::S16(Array2::zeros((3, 0)));
        assert!(tensor.is_empty());
        assert_eq!(tensor.channels(), 3);
        assert!(tensor.as_f32().is_none());
        assert!(tensor.as_i16().is_some());
    }
}
