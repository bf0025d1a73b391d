//! Input device enumeration and lookup

use cpal::traits::{DeviceTrait, HostTrait};

use crate::error::AudioError;

/// Wrapper around a cpal input device
pub struct AudioDevice {
    inner: cpal::Device,
    pub name: String,
}

impl AudioDevice {
    pub fn from_cpal(device: cpal::Device) -> Self {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        Self { inner: device, name }
    }

    pub fn into_inner(self) -> cpal::Device {
        self.inner
    }

    /// Get default input config
    pub fn default_input_config(&self) -> Result<cpal::SupportedStreamConfig, AudioError> {
        self.inner
            .default_input_config()
            .map_err(|e| AudioError::DeviceNotFound(e.to_string()))
    }

    /// Sample rate the device runs at by default
    pub fn sample_rate(&self) -> Result<u32, AudioError> {
        Ok(self.default_input_config()?.sample_rate().0)
    }
}

/// Summary of an input device for listing
#[derive(Debug, Clone)]
pub struct InputDeviceInfo {
    pub name: String,
    pub is_default: bool,
    pub sample_rate: Option<u32>,
    pub max_channels: u16,
}

/// List all available input devices
pub fn list_input_devices() -> Vec<InputDeviceInfo> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let mut devices = Vec::new();
    if let Ok(inputs) = host.input_devices() {
        for device in inputs {
            let Ok(name) = device.name() else { continue };
            let sample_rate = device.default_input_config().ok().map(|c| c.sample_rate().0);
            let max_channels = device
                .supported_input_configs()
                .map(|configs| configs.map(|c| c.channels()).max().unwrap_or(0))
                .unwrap_or(0);

            devices.push(InputDeviceInfo {
                is_default: default_name.as_ref() == Some(&name),
                name,
                sample_rate,
                max_channels,
            });
        }
    }
    devices
}

/// Find an input device by name, or the default one when `name` is `None`
pub fn find_input_device(name: Option<&str>) -> Result<AudioDevice, AudioError> {
    let host = cpal::default_host();

    let Some(name) = name else {
        return host
            .default_input_device()
            .map(AudioDevice::from_cpal)
            .ok_or_else(|| AudioError::DeviceNotFound("No default input device".to_string()));
    };

    let devices = host
        .input_devices()
        .map_err(|e| AudioError::DeviceNotFound(e.to_string()))?;

    for device in devices {
        if device.name().map(|n| n == name).unwrap_or(false) {
            return Ok(AudioDevice::from_cpal(device));
        }
    }

    Err(AudioError::DeviceNotFound(name.to_string()))
}
