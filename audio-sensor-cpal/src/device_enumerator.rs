//! Capture device enumeration via cpal.
//!
//! Lists input devices by index and name only. Stream configurations are
//! never queried here, since on several hosts that means opening the device.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait};

use audio_sensor_core::models::audio_models::AudioDevice;
use audio_sensor_core::models::error::CaptureError;

use crate::subsystem::AudioSubsystem;

/// Audio device enumerator on the initialized host.
pub struct DeviceEnumerator {
    subsystem: Arc<AudioSubsystem>,
}

impl DeviceEnumerator {
    pub fn new(subsystem: Arc<AudioSubsystem>) -> Self {
        Self { subsystem }
    }

    /// List capture devices in host order. Indices match `device_index`.
    pub fn list_capture_devices(&self) -> Result<Vec<AudioDevice>, CaptureError> {
        let host = self.subsystem.host()?;
        let default_name = host.default_input_device().and_then(|d| d.name().ok());

        let devices = host
            .input_devices()
            .map_err(|e| CaptureError::SubsystemInitFailure(format!("failed to enumerate devices: {}", e)))?
            .enumerate()
            .map(|(index, device)| {
                let name = device.name().unwrap_or_else(|_| format!("Device {}", index));
                let is_default = default_name.as_deref() == Some(name.as_str());
                AudioDevice {
                    index,
                    name,
                    is_default,
                }
            })
            .collect();

        Ok(devices)
    }

    /// Operator-facing listing, one device per line.
    pub fn describe(&self) -> Result<String, CaptureError> {
        let devices = self.list_capture_devices()?;
        let mut out = format!(
            "AudioSensor ({}) found {} capture devices:\n",
            self.subsystem.host_name(),
            devices.len()
        );
        for device in &devices {
            out.push_str("  ");
            out.push_str(&device.to_string());
            out.push('\n');
        }
        Ok(out)
    }

    /// Resolve a device index (or the default device for None).
    pub(crate) fn find_device(&self, index: Option<usize>) -> Result<cpal::Device, CaptureError> {
        let host = self.subsystem.host()?;
        match index {
            None => host
                .default_input_device()
                .ok_or_else(|| CaptureError::DeviceOpenFailure("no default capture device".into())),
            Some(i) => host
                .input_devices()
                .map_err(|e| CaptureError::DeviceOpenFailure(format!("failed to enumerate devices: {}", e)))?
                .nth(i)
                .ok_or_else(|| CaptureError::DeviceOpenFailure(format!("no capture device at index {}", i))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_devices_no_panic() {
        // Hosts without capture hardware still enumerate (possibly nothing).
        if let Ok(subsystem) = AudioSubsystem::initialize() {
            let enumerator = DeviceEnumerator::new(subsystem);
            if let Ok(devices) = enumerator.list_capture_devices() {
                for (i, device) in devices.iter().enumerate() {
                    assert_eq!(device.index, i);
                }
            }
        }
    }

    #[test]
    fn describe_has_a_header_line() {
        if let Ok(subsystem) = AudioSubsystem::initialize() {
            let enumerator = DeviceEnumerator::new(subsystem);
            if let Ok(text) = enumerator.describe() {
                assert!(text.starts_with("AudioSensor ("));
                assert!(text.contains("capture devices:"));
            }
        }
    }

    #[test]
    fn out_of_range_index_is_an_open_failure() {
        if let Ok(subsystem) = AudioSubsystem::initialize() {
            let enumerator = DeviceEnumerator::new(subsystem);
            let err = enumerator.find_device(Some(usize::MAX)).err().unwrap();
            assert!(matches!(err, CaptureError::DeviceOpenFailure(_)));
        }
    }
}
