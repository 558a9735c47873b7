use std::sync::Arc;

use anyhow::{Context, Result};
use nvfanctl::{
    arg_parser::ArgsOptions, devices_manager::DevicesManager, logger,
    runner::Runner,
};
use nvml_wrapper::Nvml;

fn main() -> Result<()> {
    logger::init_logging();

    // Parse the command line arguments
    let options = ArgsOptions::parse();

    // NVML is shut down by the Drop impl of the handle, so it is
    // released on every exit path below
    let nvml =
        Arc::new(Nvml::init().with_context(|| "Failed to load NVML library")?);

    let devices_manager = DevicesManager::new(nvml.clone())?;
    println!("Number of devices: {}", devices_manager.device_count());

    let runner = Runner::new(devices_manager.discover());
    runner.run(&options);

    Ok(())
}
