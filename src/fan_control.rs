use core::fmt;

use thiserror::Error;

use crate::gpu_device::GpuDevice;

type Result<T> = std::result::Result<T, FanControlError>;

#[derive(Debug, Error)]
pub enum FanControlError {
    #[error("invalid fan speed: {speed}, must be in range 0 to 100")]
    InvalidSpeed { speed: u32 },
    #[error("invalid fan index: {index}, the GPU only has {count} fans")]
    InvalidFanIndex { index: u32, count: u32 },
    #[error("unable to get the number of fans: {error:#}")]
    FanCount { error: anyhow::Error },
    #[error("operation failed at fan {index}: {error:#}")]
    Operation { index: u32, error: anyhow::Error },
}

// The fans an operation applies to: a single fan or all of them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanTarget {
    AllFans,
    Fan(u32),
}

// Set the fan speed of a GPU, in percent.
// Prints one status line for the whole operation on success
pub fn set_fan_speed(
    device: &dyn GpuDevice,
    speed: u32,
    target: FanTarget,
) -> Result<()> {
    if speed > 100 {
        return Err(FanControlError::InvalidSpeed { speed });
    }

    for_each_fan(device, target, |dev, i| dev.set_fan_speed(i, speed))?;

    println!(
        "Set {}% fan speed at {} for GPU {}",
        speed,
        target,
        device.index()
    );

    Ok(())
}

// Reset the fan speed of a GPU to the driver default.
// Prints one status line for the whole operation on success
pub fn reset_fan_speed(device: &dyn GpuDevice, target: FanTarget) -> Result<()> {
    for_each_fan(device, target, |dev, i| dev.set_default_fan_speed(i))?;

    println!("Reset fan speed at {} for GPU {}", target, device.index());

    Ok(())
}

// Run an operation over the targeted fan indices in ascending order.
// The iteration stops at the first fan whose operation fails and
// reports which fan failed; the remaining fans are left untouched
fn for_each_fan(
    device: &dyn GpuDevice,
    target: FanTarget,
    mut operation: impl FnMut(&dyn GpuDevice, u32) -> anyhow::Result<()>,
) -> Result<()> {
    let count = device
        .num_fans()
        .map_err(|error| FanControlError::FanCount { error })?;

    let fan_indices = match target {
        FanTarget::AllFans => 0..count,
        FanTarget::Fan(index) => {
            if index >= count {
                return Err(FanControlError::InvalidFanIndex { index, count });
            }

            index..index + 1
        }
    };

    for i in fan_indices {
        operation(device, i)
            .map_err(|error| FanControlError::Operation { index: i, error })?;
    }

    Ok(())
}

impl fmt::Display for FanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FanTarget::AllFans => write!(f, "all fans"),
            FanTarget::Fan(index) => write!(f, "fan {index}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{Call, FakeDevice};

    #[test]
    fn out_of_range_speed_is_rejected_before_any_vendor_call() {
        let device = FakeDevice::new(0, 3);
        let calls = device.calls.clone();

        let result = set_fan_speed(&device, 101, FanTarget::AllFans);

        assert!(matches!(
            result,
            Err(FanControlError::InvalidSpeed { speed: 101 })
        ));
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn fan_index_beyond_the_fan_count_is_rejected() {
        let device = FakeDevice::new(0, 2);
        let calls = device.calls.clone();

        let result = set_fan_speed(&device, 50, FanTarget::Fan(2));

        assert!(matches!(
            result,
            Err(FanControlError::InvalidFanIndex { index: 2, count: 2 })
        ));
        assert!(calls.borrow().is_empty());

        let result = reset_fan_speed(&device, FanTarget::Fan(5));

        assert!(matches!(
            result,
            Err(FanControlError::InvalidFanIndex { index: 5, count: 2 })
        ));
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn all_fans_are_set_once_each_in_ascending_order() {
        let device = FakeDevice::new(0, 3);
        let calls = device.calls.clone();

        set_fan_speed(&device, 50, FanTarget::AllFans).unwrap();

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
    fn a_single_fan_target_only_touches_that_fan() {
        let device = FakeDevice::new(0, 3);
        let calls = device.calls.clone();

        set_fan_speed(&device, 80, FanTarget::Fan(1)).unwrap();

        assert_eq!(
            *calls.borrow(),
            vec![Call::SetFanSpeed { fan_idx: 1, speed: 80 }]
        );
    }

    #[test]
    fn the_iteration_stops_at_the_first_failing_fan() {
        let mut device = FakeDevice::new(0, 3);
        device.fail_at_fan = Some(1);
        let calls = device.calls.clone();

        let result = set_fan_speed(&device, 50, FanTarget::AllFans);

        assert!(matches!(
            result,
            Err(FanControlError::Operation { index: 1, .. })
        ));

        // Fan 0 succeeded, fan 1 failed, fan 2 was never attempted
        assert_eq!(
            *calls.borrow(),
            vec![
                Call::SetFanSpeed { fan_idx: 0, speed: 50 },
                Call::SetFanSpeed { fan_idx: 1, speed: 50 },
            ]
        );
    }

    #[test]
    fn reset_uses_the_default_speed_primitive_on_every_fan() {
        let device = FakeDevice::new(0, 2);
        let calls = device.calls.clone();

        reset_fan_speed(&device, FanTarget::AllFans).unwrap();

        assert_eq!(
            *calls.borrow(),
            vec![
                Call::SetDefaultFanSpeed { fan_idx: 0 },
                Call::SetDefaultFanSpeed { fan_idx: 1 },
            ]
        );
    }
}
