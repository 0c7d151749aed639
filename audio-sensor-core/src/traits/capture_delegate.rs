use crate::models::audio_models::NegotiatedSpec;
use crate::models::error::CaptureError;
use crate::models::state::SensorState;

/// Event delegate for sensor notifications.
///
/// `on_error` is called from the capture thread; the other methods from
/// whichever thread drives the sensor. Keep implementations short.
pub trait CaptureDelegate: Send + Sync {
    /// Called when the sensor state changes.
    fn on_state_changed(&self, state: SensorState);

    /// Called once after a device opens with what it granted.
    fn on_negotiated(&self, spec: &NegotiatedSpec);

    /// Called when a buffer could not be converted or delivered, or when the
    /// platform reports a stream fault.
    fn on_error(&self, error: &CaptureError);
}
