//! # audio-sensor-core
//!
//! Platform-agnostic core of the audio sensor node.
//!
//! Turns raw capture buffers into typed `(channels, frames)` tensor messages
//! and manages the capture device lifecycle. Platform backends (cpal)
//! implement the `CaptureProvider` trait and plug into the generic
//! `AudioSensor`.
//!
//! ## Architecture
//!
//! ```text
//! audio-sensor-core (this crate)
//! ├── traits/       ← CaptureProvider, CaptureDelegate, MessageSink, SensorNode
//! ├── models/       ← CaptureError, SensorState, CaptureConfiguration, AudioFormat, TensorMessage, etc.
//! ├── processing/   ← buffer conversion, stream parameter negotiation
//! ├── session/      ← AudioSensor (device manager + callback pipeline)
//! └── sinks/        ← ChannelSink
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod sinks;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{AudioDevice, DeviceHandleId, NegotiatedSpec, SensorDiagnostics, SupportedRange};
pub use models::config::CaptureConfiguration;
pub use models::error::CaptureError;
pub use models::format::{AudioFormat, FormatTag};
pub use models::state::SensorState;
pub use models::tensor_message::{AudioTensor, TensorMessage, AUDIO_MESSAGE_LABEL};
pub use processing::buffer_converter::{convert_buffer, BufferConverter, Conversion};
pub use processing::negotiation::{negotiate, StreamParams};
pub use session::sensor::AudioSensor;
pub use sinks::channel_sink::ChannelSink;
pub use traits::capture_delegate::CaptureDelegate;
pub use traits::capture_provider::{CaptureProvider, RawBufferCallback, StreamErrorCallback};
pub use traits::message_sink::MessageSink;
pub use traits::sensor_node::SensorNode;
