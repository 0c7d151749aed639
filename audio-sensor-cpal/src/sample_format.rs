//! Mapping between cpal sample formats and format tags.
//!
//! cpal always delivers host byte order, so every tag produced here is
//! native-endian, and only native-endian tags map back.

use audio_sensor_core::models::format::FormatTag;
use cpal::SampleFormat;

const NATIVE_BIG_ENDIAN: bool = cfg!(target_endian = "big");

/// Describe a cpal sample format as a tag. Total: formats the converter
/// can't decode still get a tag, which the converter then rejects.
pub fn tag_for(format: SampleFormat) -> FormatTag {
    let bits = (format.sample_size() * 8) as u8;
    FormatTag::new(bits, !format.is_uint(), format.is_float(), NATIVE_BIG_ENDIAN && bits > 8)
}

/// The cpal format to request for `tag`, if cpal can deliver it.
pub fn cpal_format(tag: FormatTag) -> Option<SampleFormat> {
    if tag.bit_size() > 8 && tag.is_big_endian() != NATIVE_BIG_ENDIAN {
        return None;
    }
    let format = match (tag.bit_size(), tag.is_float(), tag.is_signed()) {
        (8, false, true) => SampleFormat::I8,
        (8, false, false) => SampleFormat::U8,
        (16, false, true) => SampleFormat::I16,
        (16, false, false) => SampleFormat::U16,
        (32, false, true) => SampleFormat::I32,
        (32, false, false) => SampleFormat::U32,
        (64, false, true) => SampleFormat::I64,
        (64, false, false) => SampleFormat::U64,
        (32, true, true) => SampleFormat::F32,
        (64, true, true) => SampleFormat::F64,
        _ => return None,
    };
    Some(format)
}
