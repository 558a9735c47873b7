// Scriptable GPU device used to exercise the control logic without
// a live NVML library

use std::{cell::RefCell, rc::Rc};

use anyhow::{Result, anyhow};

use crate::gpu_device::GpuDevice;

// One recorded vendor mutation, in call order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SetFanSpeed { fan_idx: u32, speed: u32 },
    SetDefaultFanSpeed { fan_idx: u32 },
    SetPersistent(bool),
    ResetGpuLockedClocks,
    ResetMemLockedClocks,
}

pub struct FakeDevice {
    pub index: u32,
    pub uuid: String,
    pub fan_count: u32,

    pub link_width: u32,
    pub max_link_width: u32,
    pub link_speed: u32,
    pub link_gen: u32,
    pub max_link_gen: u32,
    pub max_pcie_gen: u32,

    // Fan index whose set or reset call fails
    pub fail_at_fan: Option<u32>,
    pub fail_persistence: bool,
    pub fail_gpu_clocks: bool,
    pub fail_mem_clocks: bool,
    // Names of the getters that fail when read
    pub fail_reads: Vec<&'static str>,

    // Shared so a test can keep inspecting the log after the device
    // is boxed away
    pub calls: Rc<RefCell<Vec<Call>>>,
}

impl FakeDevice {
    // A healthy device: full width link, no scripted failures
    pub fn new(index: u32, fan_count: u32) -> Self {
        Self {
            index,
            uuid: format!("GPU-{index:08}"),
            fan_count,

            link_width: 16,
            max_link_width: 16,
            link_speed: 16000,
            link_gen: 4,
            max_link_gen: 4,
            max_pcie_gen: 4,

            fail_at_fan: None,
            fail_persistence: false,
            fail_gpu_clocks: false,
            fail_mem_clocks: false,
            fail_reads: Vec::new(),

            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn read<T>(&self, getter: &'static str, value: T) -> Result<T> {
        if self.fail_reads.contains(&getter) {
            return Err(anyhow!("Scripted read failure for {getter}"));
        }

        Ok(value)
    }
}

impl GpuDevice for FakeDevice {
    fn index(&self) -> u32 {
        self.index
    }

    fn uuid(&self) -> Result<String> {
        self.read("uuid", self.uuid.clone())
    }

    fn num_fans(&self) -> Result<u32> {
        self.read("num_fans", self.fan_count)
    }

    fn set_fan_speed(&self, fan_idx: u32, speed: u32) -> Result<()> {
        self.record(Call::SetFanSpeed { fan_idx, speed });

        if self.fail_at_fan == Some(fan_idx) {
            return Err(anyhow!("Scripted failure at fan {fan_idx}"));
        }

        Ok(())
    }

    fn set_default_fan_speed(&self, fan_idx: u32) -> Result<()> {
        self.record(Call::SetDefaultFanSpeed { fan_idx });

        if self.fail_at_fan == Some(fan_idx) {
            return Err(anyhow!("Scripted failure at fan {fan_idx}"));
        }

        Ok(())
    }

    fn set_persistent(&self, enabled: bool) -> Result<()> {
        self.record(Call::SetPersistent(enabled));

        if self.fail_persistence {
            return Err(anyhow!("Scripted persistence mode failure"));
        }

        Ok(())
    }

    fn reset_gpu_locked_clocks(&self) -> Result<()> {
        self.record(Call::ResetGpuLockedClocks);

        if self.fail_gpu_clocks {
            return Err(anyhow!("Scripted GPU clock reset failure"));
        }

        Ok(())
    }

    fn reset_mem_locked_clocks(&self) -> Result<()> {
        self.record(Call::ResetMemLockedClocks);

        if self.fail_mem_clocks {
            return Err(anyhow!("Scripted memory clock reset failure"));
        }

        Ok(())
    }

    fn current_pcie_link_width(&self) -> Result<u32> {
        self.read("current_pcie_link_width", self.link_width)
    }

    fn max_pcie_link_width(&self) -> Result<u32> {
        self.read("max_pcie_link_width", self.max_link_width)
    }

    fn pcie_link_speed(&self) -> Result<u32> {
        self.read("pcie_link_speed", self.link_speed)
    }

    fn current_pcie_link_gen(&self) -> Result<u32> {
        self.read("current_pcie_link_gen", self.link_gen)
    }

    fn max_pcie_link_gen(&self) -> Result<u32> {
        self.read("max_pcie_link_gen", self.max_pcie_gen)
    }

    fn device_max_pcie_link_gen(&self) -> Result<u32> {
        self.read("device_max_pcie_link_gen", self.max_link_gen)
    }
}
