//! # Device Detection
//!
//! Resolves the compute device (CPU/GPU) for model inference from a configuration
//! value. Resolution happens once per run, before the engine loads a model; the
//! decision logic elsewhere never branches on the accelerator.

use candle_core::Device;
use tracing::{debug, info, warn};

/// Device preference for model inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DevicePreference {
    /// Automatically select the best available device
    #[default]
    Auto,
    /// Force CPU usage
    Cpu,
    /// Force CUDA GPU usage (falls back to CPU if not available)
    Cuda,
    /// Force Metal GPU usage (falls back to CPU if not available)
    Metal,
}

impl std::str::FromStr for DevicePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" | "automatic" => Ok(DevicePreference::Auto),
            "cpu" => Ok(DevicePreference::Cpu),
            "cuda" | "gpu" => Ok(DevicePreference::Cuda),
            "metal" => Ok(DevicePreference::Metal),
            _ => Err(format!("Unknown device preference: {}", s)),
        }
    }
}

/// Get a device for the given preference, falling back to CPU when the preferred
/// accelerator is unavailable.
pub fn get_device(preference: DevicePreference) -> Device {
    match preference {
        DevicePreference::Auto => detect_best_device(),
        DevicePreference::Cpu => Device::Cpu,
        DevicePreference::Cuda => cuda_device().unwrap_or(Device::Cpu),
        DevicePreference::Metal => metal_device().unwrap_or(Device::Cpu),
    }
}

/// Resolve a device from the raw configuration string, treating unparseable
/// values as "auto".
pub fn resolve_device(device_str: &str) -> Device {
    match device_str.parse::<DevicePreference>() {
        Ok(preference) => get_device(preference),
        Err(_) => {
            warn!("Invalid device preference '{}', using auto", device_str);
            detect_best_device()
        }
    }
}

fn detect_best_device() -> Device {
    if let Some(device) = cuda_device() {
        info!("Selected CUDA GPU for inference");
        return device;
    }

    if let Some(device) = metal_device() {
        info!("Selected Metal GPU for inference");
        return device;
    }

    info!("Using CPU for inference (no GPU acceleration available)");
    Device::Cpu
}

fn cuda_device() -> Option<Device> {
    match Device::new_cuda(0) {
        Ok(device) => {
            debug!("CUDA device 0 available");
            Some(device)
        }
        Err(e) => {
            debug!("CUDA not available: {}", e);
            None
        }
    }
}

fn metal_device() -> Option<Device> {
    match Device::new_metal(0) {
        Ok(device) => {
            debug!("Metal device 0 available");
            Some(device)
        }
        Err(e) => {
            debug!("Metal not available: {}", e);
            None
        }
    }
}

/// Device description for logging.
pub fn device_name(device: &Device) -> &'static str {
    match device {
        Device::Cpu => "CPU",
        Device::Cuda(_) => "CUDA GPU",
        Device::Metal(_) => "Metal GPU",
    }
}
