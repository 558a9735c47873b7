use argparse::{ArgumentParser, Print, Store, StoreTrue};

pub struct ArgsOptions {
    pub reset: bool,
    pub gpu_index: i32,
    pub mini_fan: bool,
    pub fan_speed: u32,
    pub pcie_width: bool,
}

// The operation applied to every selected GPU, chosen once per run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    PcieScan,
    Reset,
    MiniFan,
    SetFan(u32),
}

impl ArgsOptions {
    pub fn parse() -> Self {
        let mut options = ArgsOptions::default();

        {
            let mut parser = ArgumentParser::new();

            // Reset the GPU clocks and fan speed
            parser.refer(&mut options.reset).add_option(
                &["-r", "--reset"],
                StoreTrue,
                "Reset the GPU clocks and fan speed to default",
            );

            // Restrict the run to a single GPU
            parser.refer(&mut options.gpu_index).add_option(
                &["-i", "--index"],
                Store,
                "Only process the GPU with this index, -1 means all GPUs",
            );

            // Spin the fans down to 0%
            parser.refer(&mut options.mini_fan).add_option(
                &["-m", "--mini-fan"],
                StoreTrue,
                "Set the fan speed of the selected GPUs to 0%",
            );

            // Custom fan speed for the default mode
            parser.refer(&mut options.fan_speed).add_option(
                &["-f", "--fan-speed"],
                Store,
                "The fan speed to set, range from 0 to 100",
            );

            // PCIe link inspection
            parser.refer(&mut options.pcie_width).add_option(
                &["-p", "--pcie-width"],
                StoreTrue,
                "Show the PCIe link width and speed of each GPU",
            );

            // Show program version
            parser.add_option(
                &["-V", "--version"],
                Print(env!("CARGO_PKG_VERSION").to_string()),
                "Show the program version",
            );

            parser.parse_args_or_exit();
        }

        options
    }

    // Return the run mode selected by the parsed flags.
    // The flags are not combined: PCIe scanning wins over reset,
    // reset over mini fan, custom fan speed otherwise
    pub fn mode(&self) -> RunMode {
        if self.pcie_width {
            RunMode::PcieScan
        } else if self.reset {
            RunMode::Reset
        } else if self.mini_fan {
            RunMode::MiniFan
        } else {
            RunMode::SetFan(self.fan_speed)
        }
    }
}

impl Default for ArgsOptions {
    fn default() -> Self {
        Self {
            reset: false,
            gpu_index: -1,
            mini_fan: false,
            fan_speed: 100,
            pcie_width: false,
        }
    }
}
