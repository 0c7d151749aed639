//! Pick the stream parameters a device will actually run with.
//!
//! Devices advertise ranges; the request may not fit any of them. Rather
//! than failing, the closest supported configuration wins, the same way
//! platform audio layers substitute silently. Callers must read the result,
//! not the request.

use crate::models::audio_models::SupportedRange;
use crate::models::config::CaptureConfiguration;
use crate::models::format::FormatTag;

/// Parameters to open a stream with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamParams {
    pub sample_rate: u32,
    pub channels: u16,
    pub format: FormatTag,
    pub frames_per_buffer: Option<u32>,
}

/// Choose stream parameters for `request` among `ranges`.
///
/// Preference order:
/// 1. requested channels, format and rate
/// 2. requested channels and rate, any decodable format
/// 3. requested format and rate, any channel count
/// 4. requested rate, any decodable format
/// 5. requested channels and format, rate clamped into the range
/// 6. the device default
pub fn negotiate(
    request: &CaptureConfiguration,
    ranges: &[SupportedRange],
    default: StreamParams,
) -> StreamParams {
    let wanted = request.format.tag();
    let rate = request.sample_rate;
    let decodable = |r: &&SupportedRange| r.format.format().is_some();

    let pick = ranges
        .iter()
        .find(|r| r.channels == request.channels && r.format == wanted && r.contains_rate(rate))
        .or_else(|| {
            ranges
                .iter()
                .filter(decodable)
                .find(|r| r.channels == request.channels && r.contains_rate(rate))
        })
        .or_else(|| ranges.iter().find(|r| r.format == wanted && r.contains_rate(rate)))
        .or_else(|| ranges.iter().filter(decodable).find(|r| r.contains_rate(rate)));

    if let Some(range) = pick {
        return params_for(range, rate, request.frames_per_buffer);
    }

    if let Some(range) = ranges
        .iter()
        .find(|r| r.channels == request.channels && r.format == wanted)
    {
        let clamped = rate.clamp(range.min_sample_rate, range.max_sample_rate);
        return params_for(range, clamped, request.frames_per_buffer);
    }

    default
}

fn params_for(range: &SupportedRange, sample_rate: u32, frames: u32) -> StreamParams {
    let frames_per_buffer = match range.buffer_frames {
        Some((min, max)) if (min..=max).contains(&frames) => Some(frames),
        _ => None,
    };
    StreamParams {
        sample_rate,
        channels: range.channels,
        format: range.format,
        frames_per_buffer,
    }
}
