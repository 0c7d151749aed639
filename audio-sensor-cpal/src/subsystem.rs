//! Process-wide audio subsystem setup.
//!
//! `AudioSubsystem::initialize` selects the cpal host once. Later calls hand
//! back the same live instance; when the last handle drops, the subsystem is
//! torn down and the next `initialize` starts fresh.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use audio_sensor_core::models::error::CaptureError;

static ACTIVE: Mutex<Weak<AudioSubsystem>> = parking_lot::const_mutex(Weak::new());

/// Handle to the initialized platform audio host.
#[derive(Debug)]
pub struct AudioSubsystem {
    host_id: cpal::HostId,
}

impl AudioSubsystem {
    /// Initialize on the platform's default host.
    pub fn initialize() -> Result<Arc<Self>, CaptureError> {
        Self::initialize_with_host(None)
    }

    /// Initialize on a named host (e.g. "ALSA", "JACK", "WASAPI").
    ///
    /// Returns the active subsystem if one already exists and `host_name`
    /// is None or names its host.
    pub fn initialize_with_host(host_name: Option<&str>) -> Result<Arc<Self>, CaptureError> {
        let mut active = ACTIVE.lock();

        if let Some(existing) = active.upgrade() {
            return match host_name {
                Some(name) if !existing.host_name().eq_ignore_ascii_case(name) => {
                    Err(CaptureError::SubsystemInitFailure(format!(
                        "already initialized on host {}",
                        existing.host_name()
                    )))
                }
                _ => Ok(existing),
            };
        }

        let host_id = match host_name {
            Some(name) => cpal::available_hosts()
                .into_iter()
                .find(|id| id.name().eq_ignore_ascii_case(name))
                .ok_or_else(|| {
                    CaptureError::SubsystemInitFailure(format!(
                        "unknown audio host '{}', available: {}",
                        name,
                        Self::available_hosts().join(", ")
                    ))
                })?,
            None => cpal::default_host().id(),
        };

        // Verify the host can actually be brought up before handing it out.
        cpal::host_from_id(host_id)
            .map_err(|e| CaptureError::SubsystemInitFailure(e.to_string()))?;

        let subsystem = Arc::new(Self { host_id });
        *active = Arc::downgrade(&subsystem);
        log::info!("Audio subsystem initialized on host {}", host_id.name());
        Ok(subsystem)
    }

    /// Names of the hosts compiled into this build.
    pub fn available_hosts() -> Vec<&'static str> {
        cpal::available_hosts().into_iter().map(|id| id.name()).collect()
    }

    pub fn host_name(&self) -> &'static str {
        self.host_id.name()
    }

    pub(crate) fn host(&self) -> Result<cpal::Host, CaptureError> {
        cpal::host_from_id(self.host_id).map_err(|e| CaptureError::SubsystemInitFailure(e.to_string()))
    }
}

impl Drop for AudioSubsystem {
    fn drop(&mut self) {
        log::debug!("Audio subsystem on host {} shut down", self.host_id.name());
    }
}
