use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use nvml_wrapper::{Device, Nvml};

use crate::gpu_device::GpuDevice;

// A NVML backed GPU device, addressed by its index
pub struct NvidiaDevice {
    // NVML context, this can safely be accessed across threads
    nvml: Arc<Nvml>,

    index: u32,
}

impl NvidiaDevice {
    pub fn new(nvml: Arc<Nvml>, index: u32) -> Self {
        Self { nvml, index }
    }

    // Return a NVML device handle.
    // This function can fail and return an error
    fn get(&self) -> Result<Device<'_>> {
        self.nvml.device_by_index(self.index).with_context(|| {
            format!("Failed to retrieve GPU device {}", self.index)
        })
    }
}

impl GpuDevice for NvidiaDevice {
    fn index(&self) -> u32 {
        self.index
    }

    fn uuid(&self) -> Result<String> {
        Ok(self.get()?.uuid()?)
    }

    fn num_fans(&self) -> Result<u32> {
        Ok(self.get()?.num_fans()?)
    }

    fn set_fan_speed(&self, fan_idx: u32, speed: u32) -> Result<()> {
        let mut device = self.get()?;
        Ok(device.set_fan_speed(fan_idx, speed)?)
    }

    fn set_default_fan_speed(&self, fan_idx: u32) -> Result<()> {
        let mut device = self.get()?;
        Ok(device.set_default_fan_speed(fan_idx)?)
    }

    fn set_persistent(&self, enabled: bool) -> Result<()> {
        let mut device = self.get()?;
        Ok(device.set_persistent(enabled)?)
    }

    fn reset_gpu_locked_clocks(&self) -> Result<()> {
        let mut device = self.get()?;
        Ok(device.reset_gpu_locked_clocks()?)
    }

    fn reset_mem_locked_clocks(&self) -> Result<()> {
        let mut device = self.get()?;
        Ok(device.reset_mem_locked_clocks()?)
    }

    fn current_pcie_link_width(&self) -> Result<u32> {
        Ok(self.get()?.current_pcie_link_width()?)
    }

    fn max_pcie_link_width(&self) -> Result<u32> {
        Ok(self.get()?.max_pcie_link_width()?)
    }

    fn pcie_link_speed(&self) -> Result<u32> {
        Ok(self.get()?.pcie_link_speed()?)
    }

    fn current_pcie_link_gen(&self) -> Result<u32> {
        Ok(self.get()?.current_pcie_link_gen()?)
    }

    fn max_pcie_link_gen(&self) -> Result<u32> {
        Ok(self.get()?.max_pcie_link_gen()?)
    }

    // NVML exposes the GPU's own ceiling as a link speed class,
    // one class per PCIe generation
    fn device_max_pcie_link_gen(&self) -> Result<u32> {
        let speed = self.get()?.max_pcie_link_speed()?;

        let mbps = speed
            .as_integer()
            .ok_or_else(|| anyhow!("The max PCIe link speed is unknown"))?;

        link_gen_from_speed(mbps)
    }
}

// Map a PCIe link speed class in MB/s to its link generation
fn link_gen_from_speed(mbps: u32) -> Result<u32> {
    let generation = match mbps {
        2500 => 1,
        5000 => 2,
        8000 => 3,
        16000 => 4,
        32000 => 5,
        64000 => 6,
        _ => {
            return Err(anyhow!(
                "Unrecognized PCIe link speed class: {mbps} MB/s"
            ));
        }
    };

    Ok(generation)
}
