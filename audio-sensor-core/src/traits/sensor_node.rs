use std::sync::Arc;

use crate::models::audio_models::NegotiatedSpec;
use crate::models::config::CaptureConfiguration;
use crate::models::error::CaptureError;
use crate::models::state::SensorState;
use crate::traits::message_sink::MessageSink;

/// Capabilities a graph runtime needs from a sensor node.
pub trait SensorNode {
    /// Current lifecycle state.
    fn state(&self) -> SensorState;

    /// Open the device. Transitions: uninitialized → opened.
    fn configure(&mut self, config: CaptureConfiguration) -> Result<NegotiatedSpec, CaptureError>;

    /// Start delivery. Transitions: opened/stopped → running.
    fn start(&mut self) -> Result<(), CaptureError>;

    /// Suspend delivery. Transitions: running → stopped.
    fn stop(&mut self) -> Result<(), CaptureError>;

    /// Connect a downstream consumer for every produced message.
    fn on_data(&self, sink: Arc<dyn MessageSink>);
}
