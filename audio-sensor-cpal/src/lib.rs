//! # audio-sensor-cpal
//!
//! cpal backend for audio-sensor: ALSA/JACK on Linux, CoreAudio on macOS,
//! WASAPI on Windows.
//!
//! Provides:
//! - `AudioSubsystem`: process-wide host initialization
//! - `DeviceEnumerator`: capture device listing by index and name
//! - `CpalCapture`: `CaptureProvider` over a cpal input stream
//!
//! ## Usage
//! ```ignore
//! use audio_sensor_core::{AudioSensor, CaptureConfiguration, SensorNode};
//! use audio_sensor_cpal::{AudioSubsystem, CpalCapture};
//!
//! let subsystem = AudioSubsystem::initialize()?;
//! let mut sensor = AudioSensor::open(CpalCapture::new(subsystem), CaptureConfiguration::default())?;
//! sensor.start()?;
//! ```

pub mod cpal_capture;
pub mod device_enumerator;
pub mod sample_format;
pub mod subsystem;

pub use cpal_capture::CpalCapture;
pub use device_enumerator::DeviceEnumerator;
pub use subsystem::AudioSubsystem;
