use thiserror::Error;

use crate::gpu_device::GpuDevice;

type Result<T> = std::result::Result<T, ResetError>;

#[derive(Debug, Error)]
pub enum ResetError {
    #[error("unable to enable persistence mode: {error:#}")]
    PersistenceMode { error: anyhow::Error },
    #[error("unable to reset GPU locked clocks: {error:#}")]
    GpuClocks { error: anyhow::Error },
    #[error("unable to reset memory locked clocks: {error:#}")]
    MemoryClocks { error: anyhow::Error },
}

// Put a GPU back into its default clock state.
// The steps run in order and the sequence stops at the first failure.
// There is no rollback: the hardware offers no atomicity for these
// operations, so steps that already succeeded are left in place
pub fn reset_gpu(device: &dyn GpuDevice) -> Result<()> {
    device
        .set_persistent(true)
        .map_err(|error| ResetError::PersistenceMode { error })?;

    device
        .reset_gpu_locked_clocks()
        .map_err(|error| ResetError::GpuClocks { error })?;

    device
        .reset_mem_locked_clocks()
        .map_err(|error| ResetError::MemoryClocks { error })?;

    Ok(())
}
