//! cpal capture provider.
//!
//! Opens an input stream with `build_input_stream_raw` so the callback sees
//! the platform's raw byte span, exactly as delivered, in the negotiated
//! sample format.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize, SampleRate, StreamConfig, SupportedBufferSize};

use audio_sensor_core::models::audio_models::{AudioDevice, DeviceHandleId, NegotiatedSpec, SupportedRange};
use audio_sensor_core::models::config::CaptureConfiguration;
use audio_sensor_core::models::error::CaptureError;
use audio_sensor_core::processing::negotiation::{negotiate, StreamParams};
use audio_sensor_core::traits::capture_provider::{CaptureProvider, RawBufferCallback, StreamErrorCallback};

use crate::device_enumerator::DeviceEnumerator;
use crate::sample_format::{cpal_format, tag_for};
use crate::subsystem::AudioSubsystem;

static NEXT_HANDLE: AtomicU32 = AtomicU32::new(2);

/// Capture from one cpal input device.
///
/// Owns the `cpal::Stream`; dropping the stream releases the device.
pub struct CpalCapture {
    subsystem: Arc<AudioSubsystem>,
    stream: Option<cpal::Stream>,
    spec: Option<NegotiatedSpec>,
}

impl CpalCapture {
    pub fn new(subsystem: Arc<AudioSubsystem>) -> Self {
        Self {
            subsystem,
            stream: None,
            spec: None,
        }
    }

    /// What the open device granted, if any.
    pub fn negotiated(&self) -> Option<&NegotiatedSpec> {
        self.spec.as_ref()
    }

    fn stream(&self) -> Result<&cpal::Stream, CaptureError> {
        self.stream
            .as_ref()
            .ok_or_else(|| CaptureError::StreamFailure("no capture device open".into()))
    }
}

impl CaptureProvider for CpalCapture {
    fn list_devices(&self) -> Result<Vec<AudioDevice>, CaptureError> {
        DeviceEnumerator::new(Arc::clone(&self.subsystem)).list_capture_devices()
    }

    fn open(
        &mut self,
        config: &CaptureConfiguration,
        mut on_buffer: RawBufferCallback,
        mut on_error: StreamErrorCallback,
    ) -> Result<NegotiatedSpec, CaptureError> {
        if self.stream.is_some() {
            return Err(CaptureError::DeviceOpenFailure("a device is already open".into()));
        }

        let device = DeviceEnumerator::new(Arc::clone(&self.subsystem)).find_device(config.device_index)?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".into());

        let default = device
            .default_input_config()
            .map_err(|e| CaptureError::DeviceOpenFailure(format!("{}: {}", device_name, e)))?;
        let default = StreamParams {
            sample_rate: default.sample_rate().0,
            channels: default.channels(),
            format: tag_for(default.sample_format()),
            frames_per_buffer: None,
        };

        let params = negotiate(config, &supported_ranges(&device), default);
        let sample_format = cpal_format(params.format).ok_or_else(|| {
            CaptureError::DeviceOpenFailure(format!("cannot request sample format {}", params.format))
        })?;

        let stream_config = StreamConfig {
            channels: params.channels,
            sample_rate: SampleRate(params.sample_rate),
            buffer_size: params
                .frames_per_buffer
                .map(BufferSize::Fixed)
                .unwrap_or(BufferSize::Default),
        };

        let stream = device
            .build_input_stream_raw(
                &stream_config,
                sample_format,
                move |data: &cpal::Data, _: &cpal::InputCallbackInfo| on_buffer(data.bytes()),
                move |err| on_error(CaptureError::StreamFailure(err.to_string())),
                None,
            )
            .map_err(|e| CaptureError::DeviceOpenFailure(format!("{}: {}", device_name, e)))?;

        // Some hosts start streams immediately; the contract is to open paused.
        if let Err(e) = stream.pause() {
            log::warn!("Could not pause new stream on '{}': {}", device_name, e);
        }

        let spec = NegotiatedSpec {
            handle: DeviceHandleId(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed)),
            device_name,
            sample_rate: params.sample_rate,
            channels: params.channels,
            format: params.format,
            frames_per_buffer: params.frames_per_buffer,
        };
        log::debug!("Opened capture {}", spec);

        self.stream = Some(stream);
        self.spec = Some(spec.clone());
        Ok(spec)
    }

    fn resume(&mut self) -> Result<(), CaptureError> {
        self.stream()?
            .play()
            .map_err(|e| CaptureError::StreamFailure(format!("failed to start stream: {}", e)))
    }

    fn pause(&mut self) -> Result<(), CaptureError> {
        self.stream()?
            .pause()
            .map_err(|e| CaptureError::StreamFailure(format!("failed to pause stream: {}", e)))
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            if let Some(spec) = self.spec.take() {
                log::debug!("Closed capture device {} '{}'", spec.handle, spec.device_name);
            }
        }
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for CpalCapture {
    fn drop(&mut self) {
        self.close();
    }
}

/// The device's advertised input configurations as platform-neutral ranges.
fn supported_ranges(device: &cpal::Device) -> Vec<SupportedRange> {
    match device.supported_input_configs() {
        Ok(configs) => configs
            .map(|c| SupportedRange {
                channels: c.channels(),
                min_sample_rate: c.min_sample_rate().0,
                max_sample_rate: c.max_sample_rate().0,
                format: tag_for(c.sample_format()),
                buffer_frames: match c.buffer_size() {
                    SupportedBufferSize::Range { min, max } => Some((*min, *max)),
                    SupportedBufferSize::Unknown => None,
                },
            })
            .collect(),
        Err(e) => {
            log::warn!("Could not query supported input configs: {}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_provider_rejects_resume_and_pause() {
        if let Ok(subsystem) = AudioSubsystem::initialize() {
            let mut capture = CpalCapture::new(subsystem);
            assert!(!capture.is_open());
            assert!(matches!(capture.resume(), Err(CaptureError::StreamFailure(_))));
            assert!(matches!(capture.pause(), Err(CaptureError::StreamFailure(_))));
            capture.close();
            capture.close();
            assert!(capture.negotiated().is_none());
        }
    }

    #[test]
    fn missing_device_index_fails_to_open() {
        if let Ok(subsystem) = AudioSubsystem::initialize() {
            let mut capture = CpalCapture::new(subsystem);
            let config = CaptureConfiguration {
                device_index: Some(usize::MAX),
                ..CaptureConfiguration::default()
            };
            let err = capture
                .open(&config, Box::new(|_: &[u8]| {}), Box::new(|_: CaptureError| {}))
                .unwrap_err();
            assert!(matches!(err, CaptureError::DeviceOpenFailure(_)));
            assert!(!capture.is_open());
        }
    }
}
