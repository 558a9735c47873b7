use core::fmt;

use thiserror::Error;

use crate::gpu_device::GpuDevice;

type Result<T> = std::result::Result<T, PcieScanError>;

#[derive(Debug, Error)]
pub enum PcieScanError {
    #[error("unable to get {field}: {error:#}")]
    FieldUnavailable {
        field: &'static str,
        error: anyhow::Error,
    },
}

// Snapshot of a degraded PCIe link, kept for the end of run report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcieInfo {
    pub index: u32,
    pub uuid: String,

    pub link_width: u32,
    pub max_link_width: u32,
    pub link_speed: u32,

    pub link_gen: u32,
    pub max_link_gen: u32,
    pub max_pcie_gen: u32,
}

// Read the PCIe link state of a GPU and print its status line.
// The reads are independent and the scan stops at the first one that
// fails, naming the field it could not get.
// Returns a record only when the negotiated lane count is strictly
// below what the link is capable of; a healthy link is not an error
pub fn scan_pcie_info(device: &dyn GpuDevice) -> Result<Option<PcieInfo>> {
    let uuid = read_field("UUID", device.uuid())?;
    let link_width =
        read_field("LinkWidth", device.current_pcie_link_width())?;
    let link_speed = read_field("LinkSpeed", device.pcie_link_speed())?;
    let max_link_width =
        read_field("MaxLinkWidth", device.max_pcie_link_width())?;
    let link_gen =
        read_field("CurrentLinkGeneration", device.current_pcie_link_gen())?;
    let max_link_gen = read_field(
        "MaxLinkGeneration",
        device.device_max_pcie_link_gen(),
    )?;
    let max_pcie_gen =
        read_field("MaxPcieGeneration", device.max_pcie_link_gen())?;

    let info = PcieInfo {
        index: device.index(),
        uuid,
        link_width,
        max_link_width,
        link_speed,
        link_gen,
        max_link_gen,
        max_pcie_gen,
    };

    println!("{info}");

    if info.link_width < info.max_link_width {
        Ok(Some(info))
    } else {
        Ok(None)
    }
}

fn read_field<T>(
    field: &'static str,
    result: anyhow::Result<T>,
) -> Result<T> {
    result.map_err(|error| PcieScanError::FieldUnavailable { field, error })
}

impl fmt::Display for PcieInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GPU {}: UUID={}, LinkWidth={}(MAX:{}), \
             LinkGeneration={}(MAX:{},Pcie: {})",
            self.index,
            self.uuid,
            self.link_width,
            self.max_link_width,
            self.link_gen,
            self.max_link_gen,
            self.max_pcie_gen
        )
    }
}
