use std::sync::Arc;

use anyhow::{Context, Result};
use nvml_wrapper::Nvml;
use tracing::{debug, warn};

use crate::gpu_device::{GpuDevice, nvidia_device::NvidiaDevice};

// Enumerate the Nvidia GPUs visible to NVML
pub struct DevicesManager {
    // NVML is thread-safe so it is safe to make
    // simultaneous NVML calls from multiple threads.
    // We can therefore simply wrap it in a Arc with no Mutex
    nvml: Arc<Nvml>,

    device_count: u32,
}

impl DevicesManager {
    // Query the device count once at creation time.
    // A count failure is fatal, nothing can be enumerated without it
    pub fn new(nvml: Arc<Nvml>) -> Result<Self> {
        let device_count = nvml
            .device_count()
            .with_context(|| "Failed to get the GPU device count")?;

        Ok(Self { nvml, device_count })
    }

    pub fn device_count(&self) -> u32 {
        self.device_count
    }

    // Create a GPU device for every enumerable index.
    // A device whose handle cannot be resolved is logged and skipped,
    // it never blocks the processing of the remaining devices
    pub fn discover(&self) -> Vec<Box<dyn GpuDevice>> {
        let mut devices: Vec<Box<dyn GpuDevice>> = Vec::new();

        for i in 0..self.device_count {
            if let Err(err) = self.nvml.device_by_index(i) {
                warn!("Failed to retrieve GPU device {i}: {err}");
                continue;
            }

            debug!("Found Nvidia device at index {i}");

            devices.push(Box::new(NvidiaDevice::new(self.nvml.clone(), i)));
        }

        devices
    }
}
