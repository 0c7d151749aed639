//! Raw capture bytes → typed `(channels, frames)` tensors.
//!
//! Capture buffers arrive interleaved (`L0 R0 L1 R1 …`). Conversion decodes
//! each sample with the byte order named by the format and writes it to
//! `tensor[[channel, frame]]`, so every row is one channel's signal. Trailing
//! bytes that do not fill a whole frame are dropped.

use std::sync::atomic::{AtomicU64, Ordering};

use ndarray::Array2;

use crate::models::audio_models::NegotiatedSpec;
use crate::models::error::CaptureError;
use crate::models::format::{AudioFormat, FormatTag};
use crate::models::tensor_message::{AudioTensor, TensorMessage};

/// Result of converting one buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub tensor: AudioTensor,
    pub format: AudioFormat,
    /// Bytes past the last whole frame, ignored.
    pub truncated_bytes: usize,
}

/// Number of whole frames in `len` bytes.
pub fn frame_count(len: usize, width: usize, channels: usize) -> usize {
    if width == 0 || channels == 0 {
        return 0;
    }
    len / width / channels
}

/// Decode an interleaved byte buffer into a `(channels, frames)` tensor.
pub fn convert_buffer(bytes: &[u8], channels: u16, tag: FormatTag) -> Result<Conversion, CaptureError> {
    let format = AudioFormat::try_from(tag)?;
    if channels == 0 {
        return Err(CaptureError::InvalidBuffer("channel count is zero".into()));
    }

    let channels = channels as usize;
    let frames = frame_count(bytes.len(), format.width(), channels);
    let truncated_bytes = bytes.len() - frames * channels * format.width();

    let tensor = match format {
        AudioFormat::S8 => AudioTensor::S8(deinterleave(bytes, channels, frames, |b: [u8; 1]| b[0] as i8)),
        AudioFormat::U8 => AudioTensor::U8(deinterleave(bytes, channels, frames, |b: [u8; 1]| b[0])),
        AudioFormat::S16Lsb => AudioTensor::S16(deinterleave(bytes, channels, frames, i16::from_le_bytes)),
        AudioFormat::S16Msb => AudioTensor::S16(deinterleave(bytes, channels, frames, i16::from_be_bytes)),
        AudioFormat::U16Lsb => AudioTensor::U16(deinterleave(bytes, channels, frames, u16::from_le_bytes)),
        AudioFormat::U16Msb => AudioTensor::U16(deinterleave(bytes, channels, frames, u16::from_be_bytes)),
        AudioFormat::S32Lsb => AudioTensor::S32(deinterleave(bytes, channels, frames, i32::from_le_bytes)),
        AudioFormat::S32Msb => AudioTensor::S32(deinterleave(bytes, channels, frames, i32::from_be_bytes)),
        AudioFormat::F32Lsb => AudioTensor::F32(deinterleave(bytes, channels, frames, f32::from_le_bytes)),
        AudioFormat::F32Msb => AudioTensor::F32(deinterleave(bytes, channels, frames, f32::from_be_bytes)),
    };

    Ok(Conversion {
        tensor,
        format,
        truncated_bytes,
    })
}

/// Copy `frames * channels` samples of width `W` out of `bytes`, planar.
fn deinterleave<T, const W: usize>(
    bytes: &[u8],
    channels: usize,
    frames: usize,
    decode: impl Fn([u8; W]) -> T,
) -> Array2<T> {
    Array2::from_shape_fn((channels, frames), |(channel, frame)| {
        let offset = (frame * channels + channel) * W;
        let mut raw = [0u8; W];
        raw.copy_from_slice(&bytes[offset..offset + W]);
        decode(raw)
    })
}

/// Stateful converter bound to one opened device.
///
/// Shared with the capture callback; stamps each message with the data key,
/// the negotiated rate and a running sequence number.
#[derive(Debug)]
pub struct BufferConverter {
    channels: u16,
    sample_rate: u32,
    format: FormatTag,
    data_key: String,
    next_sequence: AtomicU64,
}

impl BufferConverter {
    pub fn new(spec: &NegotiatedSpec, data_key: impl Into<String>) -> Self {
        Self {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            format: spec.format,
            data_key: data_key.into(),
            next_sequence: AtomicU64::new(0),
        }
    }

    /// Convert one buffer into a message. Returns the message and the
    /// number of ignored trailing bytes.
    pub fn to_message(&self, bytes: &[u8]) -> Result<(TensorMessage, usize), CaptureError> {
        let conversion = convert_buffer(bytes, self.channels, self.format)?;
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        let message = TensorMessage::new(
            self.data_key.clone(),
            sequence,
            self.sample_rate,
            conversion.format,
            conversion.tensor,
        );
        Ok((message, conversion.truncated_bytes))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::models::audio_models::DeviceHandleId;

    fn interleaved<T: Copy>(channels: &[Vec<T>]) -> Vec<T> {
        let frames = channels[0].len();
        let mut out = Vec::with_capacity(frames * channels.len());
        for f in 0..frames {
            for ch in channels {
                out.push(ch[f]);
            }
        }
        out
    }

    #[test]
    fn stereo_f32_scenario_512_frames() {
        let left: Vec<f32> = (0..512).map(|i| i as f32 / 512.0).collect();
        let right: Vec<f32> = (0..512).map(|i| -(i as f32) / 512.0).collect();
        let bytes: Vec<u8> = interleaved(&[left.clone(), right.clone()])
            .iter()
            .flat_map(|s| s.to_ne_bytes())
            .collect();
        assert_eq!(bytes.len(), 4096);

        let out = convert_buffer(&bytes, 2, AudioFormat::F32_SYS.tag()).unwrap();
        let tensor = out.tensor.as_f32().unwrap();
        assert_eq!(tensor.dim(), (2, 512));
        assert_eq!(out.truncated_bytes, 0);
        for f in 0..512 {
            assert_relative_eq!(tensor[[0, f]], left[f]);
            assert_relative_eq!(tensor[[1, f]], right[f]);
        }
    }

    #[test]
    fn rows_are_channels_not_blocks() {
        // L R L R with distinct values per channel
        let samples: [i16; 6] = [1, -1, 2, -2, 3, -3];
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();

        let out = convert_buffer(&bytes, 2, AudioFormat::S16Lsb.tag()).unwrap();
        let tensor = out.tensor.as_i16().unwrap();
        assert_eq!(tensor.row(0).to_vec(), vec![1, 2, 3]);
        assert_eq!(tensor.row(1).to_vec(), vec![-1, -2, -3]);
    }

    #[test]
    fn every_format_decodes_at_its_byte_offsets() {
        for channels in [1u16, 2, 3] {
            let frames = 5usize;
            let n = frames * channels as usize;

            let s8: Vec<i8> = (0..n).map(|i| i as i8 - 7).collect();
            let b: Vec<u8> = s8.iter().map(|s| *s as u8).collect();
            match convert_buffer(&b, channels, AudioFormat::S8.tag()).unwrap().tensor {
                AudioTensor::S8(t) => check(&t, &s8, channels),
                other => panic!("unexpected {:?}", other.dtype()),
            }

            let u8s: Vec<u8> = (0..n).map(|i| 200 + i as u8).collect();
            match convert_buffer(&u8s, channels, AudioFormat::U8.tag()).unwrap().tensor {
                AudioTensor::U8(t) => check(&t, &u8s, channels),
                other => panic!("unexpected {:?}", other.dtype()),
            }

            let s16: Vec<i16> = (0..n).map(|i| (i as i16) * -1000 + 3).collect();
            let le: Vec<u8> = s16.iter().flat_map(|s| s.to_le_bytes()).collect();
            let be: Vec<u8> = s16.iter().flat_map(|s| s.to_be_bytes()).collect();
            match convert_buffer(&le, channels, AudioFormat::S16Lsb.tag()).unwrap().tensor {
                AudioTensor::S16(t) => check(&t, &s16, channels),
                other => panic!("unexpected {:?}", other.dtype()),
            }
            match convert_buffer(&be, channels, AudioFormat::S16Msb.tag()).unwrap().tensor {
                AudioTensor::S16(t) => check(&t, &s16, channels),
                other => panic!("unexpected {:?}", other.dtype()),
            }

            let u16s: Vec<u16> = (0..n).map(|i| 40000 + i as u16).collect();
            let le: Vec<u8> = u16s.iter().flat_map(|s| s.to_le_bytes()).collect();
            let be: Vec<u8> = u16s.iter().flat_map(|s| s.to_be_bytes()).collect();
            match convert_buffer(&le, channels, AudioFormat::U16Lsb.tag()).unwrap().tensor {
                AudioTensor::U16(t) => check(&t, &u16s, channels),
                other => panic!("unexpected {:?}", other.dtype()),
            }
            match convert_buffer(&be, channels, AudioFormat::U16Msb.tag()).unwrap().tensor {
                AudioTensor::U16(t) => check(&t, &u16s, channels),
                other => panic!("unexpected {:?}", other.dtype()),
            }

            let s32: Vec<i32> = (0..n).map(|i| (i as i32) * -70_000 + 11).collect();
            let le: Vec<u8> = s32.iter().flat_map(|s| s.to_le_bytes()).collect();
            let be: Vec<u8> = s32.iter().flat_map(|s| s.to_be_bytes()).collect();
            match convert_buffer(&le, channels, AudioFormat::S32Lsb.tag()).unwrap().tensor {
                AudioTensor::S32(t) => check(&t, &s32, channels),
                other => panic!("unexpected {:?}", other.dtype()),
            }
            match convert_buffer(&be, channels, AudioFormat::S32Msb.tag()).unwrap().tensor {
                AudioTensor::S32(t) => check(&t, &s32, channels),
                other => panic!("unexpected {:?}", other.dtype()),
            }

            let f32s: Vec<f32> = (0..n).map(|i| i as f32 * 0.125 - 0.5).collect();
            let le: Vec<u8> = f32s.iter().flat_map(|s| s.to_le_bytes()).collect();
            let be: Vec<u8> = f32s.iter().flat_map(|s| s.to_be_bytes()).collect();
            match convert_buffer(&le, channels, AudioFormat::F32Lsb.tag()).unwrap().tensor {
                AudioTensor::F32(t) => check(&t, &f32s, channels),
                other => panic!("unexpected {:?}", other.dtype()),
            }
            match convert_buffer(&be, channels, AudioFormat::F32Msb.tag()).unwrap().tensor {
                AudioTensor::F32(t) => check(&t, &f32s, channels),
                other => panic!("unexpected {:?}", other.dtype()),
            }
        }
    }

    fn check<T: Copy + PartialEq + std::fmt::Debug>(tensor: &Array2<T>, flat: &[T], channels: u16) {
        let channels = channels as usize;
        assert_eq!(tensor.dim(), (channels, flat.len() / channels));
        for ((c, f), value) in tensor.indexed_iter() {
            assert_eq!(*value, flat[f * channels + c]);
        }
    }

    #[test]
    fn trailing_bytes_are_truncated_without_error() {
        // 3 whole stereo s16 frames + 3 stray bytes
        let mut bytes = vec![0u8; 3 * 2 * 2];
        bytes.extend_from_slice(&[9, 9, 9]);

        let out = convert_buffer(&bytes, 2, AudioFormat::S16Lsb.tag()).unwrap();
        assert_eq!(out.tensor.shape(), (2, 3));
        assert_eq!(out.truncated_bytes, 3);
    }

    #[test]
    fn short_buffer_yields_empty_tensor() {
        let out = convert_buffer(&[1, 2, 3], 1, AudioFormat::F32Lsb.tag()).unwrap();
        assert_eq!(out.tensor.shape(), (1, 0));
        assert_eq!(out.truncated_bytes, 3);
    }

    #[test]
    fn unsupported_format_is_an_error() {
        let tag = FormatTag::new(64, true, true, false);
        let err = convert_buffer(&[0u8; 16], 1, tag).unwrap_err();
        assert_eq!(err, CaptureError::UnsupportedFormat(tag));
    }

    #[test]
    fn zero_channels_is_an_error() {
        let err = convert_buffer(&[0u8; 16], 0, AudioFormat::U8.tag()).unwrap_err();
        assert!(matches!(err, CaptureError::InvalidBuffer(_)));
    }

    #[test]
    fn tensor_owns_a_copy() {
        let mut bytes: Vec<u8> = [0.25f32, 0.5].iter().flat_map(|s| s.to_le_bytes()).collect();
        let out = convert_buffer(&bytes, 1, AudioFormat::F32Lsb.tag()).unwrap();
        bytes.iter_mut().for_each(|b| *b = 0);
        let tensor = out.tensor.as_f32().unwrap();
        assert_relative_eq!(tensor[[0, 0]], 0.25);
        assert_relative_eq!(tensor[[0, 1]], 0.5);
    }

    #[test]
    fn frame_count_floors() {
        assert_eq!(frame_count(4096, 4, 2), 512);
        assert_eq!(frame_count(4099, 4, 2), 512);
        assert_eq!(frame_count(7, 4, 2), 0);
        assert_eq!(frame_count(8, 4, 0), 0);
    }

    #[test]
    fn converter_numbers_messages_in_order() {
        let spec = NegotiatedSpec {
            handle: DeviceHandleId(1),
            device_name: "test".into(),
            sample_rate: 16000,
            channels: 1,
            format: AudioFormat::S16Lsb.tag(),
            frames_per_buffer: Some(2),
        };
        let converter = BufferConverter::new(&spec, "mic");

        let (first, _) = converter.to_message(&[1, 0, 2, 0]).unwrap();
        let (second, truncated) = converter.to_message(&[3, 0, 4, 0, 5]).unwrap();
        assert_eq!(first.sequence, 0);
        assert_eq!(second.sequence, 1);
        assert_eq!(truncated, 1);
        assert_eq!(second.data_key, "mic");
        assert_eq!(second.sample_rate, 16000);
        assert_eq!(second.format, AudioFormat::S16Lsb);
        assert_eq!(second.tensor.as_i16().unwrap().row(0).to_vec(), vec![3, 4]);
    }

    #[test]
    fn failed_conversion_does_not_consume_a_sequence_number() {
        let spec = NegotiatedSpec {
            handle: DeviceHandleId(1),
            device_name: "test".into(),
            sample_rate: 16000,
            channels: 0,
            format: AudioFormat::U8.tag(),
            frames_per_buffer: None,
        };
        let converter = BufferConverter::new(&spec, "data");
        assert!(converter.to_message(&[1, 2]).is_err());
        assert!(converter.to_message(&[1, 2]).is_err());
        assert_eq!(converter.next_sequence.load(Ordering::Relaxed), 0);
    }
}
