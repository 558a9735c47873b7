use tracing::error;

use crate::{
    arg_parser::{ArgsOptions, RunMode},
    fan_control::{FanTarget, reset_fan_speed, set_fan_speed},
    gpu_device::GpuDevice,
    gpu_reset::reset_gpu,
    pcie_scanner::{PcieInfo, scan_pcie_info},
};

// Drive one run over the discovered GPUs.
// Every failure is handled at the device level: the run always
// continues with the next device
pub struct Runner {
    devices: Vec<Box<dyn GpuDevice>>,
}

impl Runner {
    pub fn new(devices: Vec<Box<dyn GpuDevice>>) -> Self {
        Self { devices }
    }

    pub fn run(&self, options: &ArgsOptions) {
        let mode = options.mode();
        let mut degraded: Vec<PcieInfo> = Vec::new();

        for device in self.devices.iter() {
            // Skip every device but the requested one when an
            // index filter is set
            if options.gpu_index >= 0
                && device.index() != options.gpu_index as u32
            {
                continue;
            }

            match mode {
                RunMode::PcieScan => {
                    match scan_pcie_info(device.as_ref()) {
                        Ok(Some(info)) => degraded.push(info),
                        Ok(None) => {}
                        Err(err) => {
                            error!(
                                "PCIe scan failed for GPU {}: {err}",
                                device.index()
                            );
                        }
                    }
                }
                RunMode::Reset => {
                    if let Err(err) = reset_gpu(device.as_ref()) {
                        error!(
                            "Clock reset failed for GPU {}: {err}",
                            device.index()
                        );
                    }

                    // The fan reset runs even when the clock reset
                    // failed, the two operations are independent
                    if let Err(err) =
                        reset_fan_speed(device.as_ref(), FanTarget::AllFans)
                    {
                        error!(
                            "Fan reset failed for GPU {}: {err}",
                            device.index()
                        );
                    }
                }
                RunMode::MiniFan => {
                    if let Err(err) =
                        set_fan_speed(device.as_ref(), 0, FanTarget::AllFans)
                    {
                        error!(
                            "Failed to set fan speed for GPU {}: {err}",
                            device.index()
                        );
                    }
                }
                RunMode::SetFan(speed) => {
                    if let Err(err) = set_fan_speed(
                        device.as_ref(),
                        speed,
                        FanTarget::AllFans,
                    ) {
                        error!(
                            "Failed to set fan speed for GPU {}: {err}",
                            device.index()
                        );
                    }
                }
            }
        }

        if mode == RunMode::PcieScan && !degraded.is_empty() {
            self.report_degraded(&degraded);
        }
    }

    // Print the consolidated report of the degraded links and force
    // the fans of every degraded device to 100%
    fn report_degraded(&self, degraded: &[PcieInfo]) {
        println!();
        println!("-------- Error PcieInfos: -------------");

        for info in degraded {
            println!("{info}");

            let device = self
                .devices
                .iter()
                .find(|device| device.index() == info.index);

            match device {
                Some(device) => {
                    if let Err(err) = set_fan_speed(
                        device.as_ref(),
                        100,
                        FanTarget::AllFans,
                    ) {
                        error!(
                            "Failed to set fan speed for GPU {}: {err}",
                            info.index
                        );
                    }
                }
                None => {
                    error!("GPU {} disappeared during the run", info.index);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{Call, FakeDevice};

    fn options_for(
        configure: impl FnOnce(&mut ArgsOptions),
    ) -> ArgsOptions {
        let mut options = ArgsOptions::default();
        configure(&mut options);
        options
    }

    #[test]
    fn the_index_filter_leaves_every_other_device_untouched() {
        let first = FakeDevice::new(0, 2);
        let second = FakeDevice::new(1, 2);
        let first_calls = first.calls.clone();
        let second_calls = second.calls.clone();

        let runner = Runner::new(vec![Box::new(first), Box::new(second)]);
        runner.run(&options_for(|options| {
            options.gpu_index = 1;
            options.fan_speed = 40;
        }));

        assert!(first_calls.borrow().is_empty());
        assert_eq!(
            *second_calls.borrow(),
            vec![
                Call::SetFanSpeed { fan_idx: 0, speed: 40 },
                Call::SetFanSpeed { fan_idx: 1, speed: 40 },
            ]
        );
    }

    #[test]
    fn the_default_mode_sets_the_requested_speed_on_every_fan() {
        let device = FakeDevice::new(0, 3);
        let calls = device.calls.clone();

        let runner = Runner::new(vec![Box::new(device)]);
        runner.run(&options_for(|options| options.fan_speed = 50));

        assert_eq!(
            *calls.borrow(),
            vec![
                Call::SetFanSpeed { fan_idx: 0, speed: 50 },
                Call::SetFanSpeed { fan_idx: 1, speed: 50 },
                Call::SetFanSpeed { fan_idx: 2, speed: 50 },
            ]
        );
    }

    #[test]
    fn the_mini_fan_mode_spins_every_fan_down() {
        let device = FakeDevice::new(0, 2);
        let calls = device.calls.clone();

        let runner = Runner::new(vec![Box::new(device)]);
        runner.run(&options_for(|options| options.mini_fan = true));

        assert_eq!(
            *calls.borrow(),
            vec![
                Call::SetFanSpeed { fan_idx: 0, speed: 0 },
                Call::SetFanSpeed { fan_idx: 1, speed: 0 },
            ]
        );
    }

    #[test]
    fn the_reset_mode_resets_clocks_then_fans() {
        let device = FakeDevice::new(0, 2);
        let calls = device.calls.clone();

        let runner = Runner::new(vec![Box::new(device)]);
        runner.run(&options_for(|options| options.reset = true));

        assert_eq!(
            *calls.borrow(),
            vec![
                Call::SetPersistent(true),
                Call::ResetGpuLockedClocks,
                Call::ResetMemLockedClocks,
                Call::SetDefaultFanSpeed { fan_idx: 0 },
                Call::SetDefaultFanSpeed { fan_idx: 1 },
            ]
        );
    }

    #[test]
    fn the_fan_reset_still_runs_when_the_clock_reset_fails() {
        let mut device = FakeDevice::new(0, 1);
        device.fail_gpu_clocks = true;
        let calls = device.calls.clone();

        let runner = Runner::new(vec![Box::new(device)]);
        runner.run(&options_for(|options| options.reset = true));

        assert_eq!(
            *calls.borrow(),
            vec![
                Call::SetPersistent(true),
                Call::ResetGpuLockedClocks,
                Call::SetDefaultFanSpeed { fan_idx: 0 },
            ]
        );
    }

    #[test]
    fn pcie_scanning_wins_when_the_reset_flag_is_also_set() {
        let mut device = FakeDevice::new(0, 1);
        device.link_width = 8;
        device.max_link_width = 16;
        let calls = device.calls.clone();

        let runner = Runner::new(vec![Box::new(device)]);
        runner.run(&options_for(|options| {
            options.pcie_width = true;
            options.reset = true;
        }));

        // The degraded device gets the remediation pass, the reset
        // logic never runs
        assert_eq!(
            *calls.borrow(),
            vec![Call::SetFanSpeed { fan_idx: 0, speed: 100 }]
        );
    }

    #[test]
    fn only_degraded_devices_are_remediated() {
        let mut degraded = FakeDevice::new(0, 2);
        degraded.link_width = 8;
        degraded.max_link_width = 16;
        let healthy = FakeDevice::new(1, 2);
        let degraded_calls = degraded.calls.clone();
        let healthy_calls = healthy.calls.clone();

        let runner = Runner::new(vec![Box::new(degraded), Box::new(healthy)]);
        runner.run(&options_for(|options| options.pcie_width = true));

        assert_eq!(
            *degraded_calls.borrow(),
            vec![
                Call::SetFanSpeed { fan_idx: 0, speed: 100 },
                Call::SetFanSpeed { fan_idx: 1, speed: 100 },
            ]
        );
        assert!(healthy_calls.borrow().is_empty());
    }

    #[test]
    fn a_failing_scan_excludes_the_device_from_the_report() {
        let mut unreadable = FakeDevice::new(0, 1);
        unreadable.link_width = 8;
        unreadable.max_link_width = 16;
        unreadable.fail_reads = vec!["max_pcie_link_gen"];
        let calls = unreadable.calls.clone();

        let runner = Runner::new(vec![Box::new(unreadable)]);
        runner.run(&options_for(|options| options.pcie_width = true));

        // The device would have qualified as degraded, but the failed
        // read keeps it out of the remediation pass
        assert!(calls.borrow().is_empty());
    }
}
