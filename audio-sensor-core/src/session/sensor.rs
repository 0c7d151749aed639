use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use crate::models::audio_models::{AudioDevice, DeviceHandleId, NegotiatedSpec, SensorDiagnostics};
use crate::models::config::CaptureConfiguration;
use crate::models::error::CaptureError;
use crate::models::state::SensorState;
use crate::processing::buffer_converter::BufferConverter;
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::capture_provider::CaptureProvider;
use crate::traits::message_sink::MessageSink;
use crate::traits::sensor_node::SensorNode;

/// Mutable sensor state shared with the capture callback.
struct SensorShared {
    state: SensorState,
    diagnostics: SensorDiagnostics,
}

type SinkList = Arc<RwLock<Vec<Arc<dyn MessageSink>>>>;

/// Everything the capture callback needs, owned by the callback closure.
struct Pipeline {
    name: String,
    converter: Arc<OnceLock<BufferConverter>>,
    sinks: SinkList,
    shared: Arc<Mutex<SensorShared>>,
    delegate: Option<Arc<dyn CaptureDelegate>>,
}

impl Pipeline {
    /// Convert one raw buffer and fan the message out to every sink.
    ///
    /// Never panics and never returns an error: failures are counted and
    /// reported, and the next buffer is processed normally.
    fn handle_buffer(&self, bytes: &[u8]) {
        let Some(converter) = self.converter.get() else {
            return;
        };

        {
            let mut s = self.shared.lock();
            s.diagnostics.callback_count += 1;
            s.diagnostics.bytes_received += bytes.len() as u64;
        }

        let converted = panic::catch_unwind(AssertUnwindSafe(|| converter.to_message(bytes)));
        let (message, truncated) = match converted {
            Ok(Ok(converted)) => converted,
            Ok(Err(e)) => {
                self.shared.lock().diagnostics.conversion_errors += 1;
                self.report(&e);
                return;
            }
            Err(_) => {
                self.shared.lock().diagnostics.conversion_errors += 1;
                self.report(&CaptureError::InvalidBuffer("conversion panicked".into()));
                return;
            }
        };

        if truncated > 0 {
            self.shared.lock().diagnostics.truncated_bytes += truncated as u64;
            log::trace!("{}: ignored {} trailing bytes", self.name, truncated);
        }

        let sinks = self.sinks.read();
        let mut sink_errors = 0u64;
        for sink in sinks.iter() {
            let delivered = panic::catch_unwind(AssertUnwindSafe(|| sink.signal(message.clone())));
            let error = match delivered {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(_) => CaptureError::SinkFailure("sink panicked".into()),
            };
            sink_errors += 1;
            self.report(&error);
        }
        drop(sinks);

        let mut s = self.shared.lock();
        s.diagnostics.messages_emitted += 1;
        s.diagnostics.sink_errors += sink_errors;
    }

    fn report(&self, error: &CaptureError) {
        if error.is_per_buffer() {
            log::warn!("{}: dropped buffer: {}", self.name, error);
        } else {
            log::error!("{}: capture error: {}", self.name, error);
        }
        notify_error(&self.name, self.delegate.as_deref(), error);
    }
}

/// Hand `error` to the delegate from the capture thread. A panicking
/// delegate is logged and swallowed.
fn notify_error(name: &str, delegate: Option<&dyn CaptureDelegate>, error: &CaptureError) {
    let Some(delegate) = delegate else {
        return;
    };
    if panic::catch_unwind(AssertUnwindSafe(|| delegate.on_error(error))).is_err() {
        log::error!("{}: delegate panicked while handling: {}", name, error);
    }
}

/// Audio sensor node: one capture device in, tensor messages out.
///
/// ```text
/// [CaptureProvider] → raw bytes → [BufferConverter] → TensorMessage → [MessageSink]*
/// ```
///
/// The provider owns the device handle and calls back on the platform's
/// capture thread. Start/stop map to the platform's own resume/pause, so no
/// extra synchronization is layered on the callback.
pub struct AudioSensor<P: CaptureProvider> {
    id: Uuid,
    provider: P,
    config: Option<CaptureConfiguration>,
    negotiated: Option<NegotiatedSpec>,
    converter: Arc<OnceLock<BufferConverter>>,
    sinks: SinkList,
    shared: Arc<Mutex<SensorShared>>,
    delegate: Option<Arc<dyn CaptureDelegate>>,
}

impl<P: CaptureProvider> AudioSensor<P> {
    /// Create an unopened sensor around `provider`.
    pub fn new(provider: P) -> Self {
        Self {
            id: Uuid::new_v4(),
            provider,
            config: None,
            negotiated: None,
            converter: Arc::new(OnceLock::new()),
            sinks: Arc::new(RwLock::new(Vec::new())),
            shared: Arc::new(Mutex::new(SensorShared {
                state: SensorState::Uninitialized,
                diagnostics: SensorDiagnostics::default(),
            })),
            delegate: None,
        }
    }

    /// Create a sensor and open its device. Fails if the device can't be opened.
    pub fn open(provider: P, config: CaptureConfiguration) -> Result<Self, CaptureError> {
        let mut sensor = Self::new(provider);
        sensor.configure(config)?;
        Ok(sensor)
    }

    /// Set the event delegate. Must be called before `configure` for
    /// per-buffer errors to reach it.
    pub fn set_delegate(&mut self, delegate: Arc<dyn CaptureDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Node name from the configuration, or "AudioSensor" before open.
    pub fn name(&self) -> &str {
        self.config.as_ref().map(|c| c.name.as_str()).unwrap_or("AudioSensor")
    }

    pub fn config(&self) -> Option<&CaptureConfiguration> {
        self.config.as_ref()
    }

    /// What the device granted. None until opened.
    pub fn negotiated(&self) -> Option<&NegotiatedSpec> {
        self.negotiated.as_ref()
    }

    pub fn sample_rate(&self) -> Option<u32> {
        self.negotiated.as_ref().map(|n| n.sample_rate)
    }

    pub fn device_handle(&self) -> Option<DeviceHandleId> {
        self.negotiated.as_ref().map(|n| n.handle)
    }

    pub fn diagnostics(&self) -> SensorDiagnostics {
        self.shared.lock().diagnostics.clone()
    }

    /// Enumerate capture devices. Does not open anything.
    pub fn list_devices(&self) -> Result<Vec<AudioDevice>, CaptureError> {
        self.provider.list_devices()
    }

    /// Connect a downstream consumer. May be called while running.
    pub fn connect(&self, sink: Arc<dyn MessageSink>) {
        self.sinks.write().push(sink);
    }

    /// Release the device. Safe to call repeatedly or on an unopened sensor.
    pub fn close(&mut self) {
        if self.state().is_closed() {
            return;
        }
        if self.provider.is_open() {
            self.provider.close();
            log::debug!("{} ({}) released capture device", self.name(), self.id);
        }
        self.set_state(SensorState::Closed);
    }

    fn set_state(&self, new_state: SensorState) {
        self.shared.lock().state = new_state;
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(new_state);
        }
    }

    fn log_open(&self, config: &CaptureConfiguration, spec: &NegotiatedSpec) {
        let requested_device = config
            .device_index
            .map(|i| i.to_string())
            .unwrap_or_else(|| "<any>".into());
        let requested = format!(
            "device {} freq: {} format: {:#06x} {} channels: {} samples: {}",
            requested_device,
            config.sample_rate,
            config.format.tag().0,
            config.format.tag(),
            config.channels,
            config.frames_per_buffer
        );
        log::info!("{} ({}) opened capture device {} '{}'", config.name, self.id, spec.handle, spec.device_name);
        if config.debug {
            log::info!("{} requested capture {}", config.name, requested);
            log::info!("{} received {}", config.name, spec);
        } else {
            log::debug!("{} requested capture {}", config.name, requested);
            log::debug!("{} received {}", config.name, spec);
        }
        if !spec.matches_request(config) {
            log::info!("{}: device substituted parameters: {}", config.name, spec);
        }
    }
}

impl<P: CaptureProvider> SensorNode for AudioSensor<P> {
    fn state(&self) -> SensorState {
        self.shared.lock().state
    }

    /// Open the device. Transitions: uninitialized → opened.
    fn configure(&mut self, config: CaptureConfiguration) -> Result<NegotiatedSpec, CaptureError> {
        let state = self.state();
        if state != SensorState::Uninitialized {
            return Err(CaptureError::InvalidState {
                action: "configure",
                state: state.name(),
            });
        }

        config.validate().map_err(CaptureError::ConfigurationFailed)?;

        let pipeline = Pipeline {
            name: config.name.clone(),
            converter: Arc::clone(&self.converter),
            sinks: Arc::clone(&self.sinks),
            shared: Arc::clone(&self.shared),
            delegate: self.delegate.clone(),
        };
        let on_buffer = Box::new(move |bytes: &[u8]| pipeline.handle_buffer(bytes));

        let name = config.name.clone();
        let delegate = self.delegate.clone();
        let on_error = Box::new(move |error: CaptureError| {
            log::error!("{}: audio stream error: {}", name, error);
            notify_error(&name, delegate.as_deref(), &error);
        });

        let spec = self.provider.open(&config, on_buffer, on_error)?;

        // The device starts paused, so no buffer can arrive before this is set.
        let installed = self.converter.set(BufferConverter::new(&spec, config.data_key.clone()));
        debug_assert!(installed.is_ok(), "converter installed twice");

        self.log_open(&config, &spec);
        if let Some(ref delegate) = self.delegate {
            delegate.on_negotiated(&spec);
        }

        self.negotiated = Some(spec.clone());
        self.config = Some(config);
        self.set_state(SensorState::Opened);
        Ok(spec)
    }

    /// Start delivery. Transitions: opened/stopped → running.
    fn start(&mut self) -> Result<(), CaptureError> {
        match self.state() {
            SensorState::Running => Ok(()),
            SensorState::Opened | SensorState::Stopped => {
                self.provider.resume()?;
                self.set_state(SensorState::Running);
                Ok(())
            }
            state => Err(CaptureError::InvalidState {
                action: "start",
                state: state.name(),
            }),
        }
    }

    /// Suspend delivery. Transitions: running → stopped.
    fn stop(&mut self) -> Result<(), CaptureError> {
        match self.state() {
            SensorState::Running => {
                self.provider.pause()?;
                self.set_state(SensorState::Stopped);
                Ok(())
            }
            SensorState::Opened | SensorState::Stopped => Ok(()),
            state => Err(CaptureError::InvalidState {
                action: "stop",
                state: state.name(),
            }),
        }
    }

    fn on_data(&self, sink: Arc<dyn MessageSink>) {
        self.connect(sink);
    }
}

impl<P: CaptureProvider> Drop for AudioSensor<P> {
    fn drop(&mut self) {
        self.close();
    }
}
