use crate::models::audio_models::{AudioDevice, NegotiatedSpec};
use crate::models::config::CaptureConfiguration;
use crate::models::error::CaptureError;

/// Callback invoked with each raw capture buffer.
///
/// Runs on the platform's capture thread. The byte slice is only valid for
/// the duration of the call and is interleaved in the negotiated format.
pub type RawBufferCallback = Box<dyn FnMut(&[u8]) + Send + 'static>;

/// Callback invoked when the platform reports a stream fault after open.
pub type StreamErrorCallback = Box<dyn FnMut(CaptureError) + Send + 'static>;

/// Interface for platform-specific capture backends.
///
/// A provider owns at most one device handle. Implemented by:
/// - `CpalCapture` (cpal: ALSA/JACK, CoreAudio, WASAPI)
pub trait CaptureProvider {
    /// Enumerate capture devices without opening any of them.
    fn list_devices(&self) -> Result<Vec<AudioDevice>, CaptureError>;

    /// Open a device for `config` and register `on_buffer`.
    ///
    /// The device may grant different parameters than requested; the
    /// returned spec is what buffers will actually be encoded as. The
    /// device starts paused.
    fn open(
        &mut self,
        config: &CaptureConfiguration,
        on_buffer: RawBufferCallback,
        on_error: StreamErrorCallback,
    ) -> Result<NegotiatedSpec, CaptureError>;

    /// Begin (or resume) delivering buffers.
    fn resume(&mut self) -> Result<(), CaptureError>;

    /// Suspend delivery. The device stays open.
    fn pause(&mut self) -> Result<(), CaptureError>;

    /// Release the device. Safe to call when nothing is open.
    fn close(&mut self);

    /// Whether a device is currently open.
    fn is_open(&self) -> bool;
}
