use anyhow::Result;

pub mod nvidia_device;

// Capability surface of a single GPU needed by the control logic.
// Keeping the vendor library behind this trait lets the fan, clock
// and PCIe code run against a fake device in the tests
pub trait GpuDevice {
    // Return the device ordinal, stable for the whole run
    fn index(&self) -> u32;
    // Return the vendor assigned unique identifier
    fn uuid(&self) -> Result<String>;

    // Return the number of fans on the device
    fn num_fans(&self) -> Result<u32>;
    // Set the speed of one fan, in percent
    fn set_fan_speed(&self, fan_idx: u32, speed: u32) -> Result<()>;
    // Restore the default driver controlled speed of one fan
    fn set_default_fan_speed(&self, fan_idx: u32) -> Result<()>;

    // Enable or disable persistence mode
    fn set_persistent(&self, enabled: bool) -> Result<()>;
    // Restore the default GPU clock range
    fn reset_gpu_locked_clocks(&self) -> Result<()>;
    // Restore the default memory clock range
    fn reset_mem_locked_clocks(&self) -> Result<()>;

    // Current negotiated PCIe lane count
    fn current_pcie_link_width(&self) -> Result<u32>;
    // Lane count the slot and GPU are capable of
    fn max_pcie_link_width(&self) -> Result<u32>;
    // Current PCIe transfer rate, in MB/s
    fn pcie_link_speed(&self) -> Result<u32>;
    // Current negotiated PCIe generation
    fn current_pcie_link_gen(&self) -> Result<u32>;
    // Max PCIe generation reachable with this GPU in this system
    fn max_pcie_link_gen(&self) -> Result<u32>;
    // Max PCIe generation the GPU itself supports
    fn device_max_pcie_link_gen(&self) -> Result<u32>;
}
