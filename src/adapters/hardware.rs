//! Hardware adapter: wires the settings' pins to real peripherals.
//!
//! Builds the [`Hardware`] bundle the controller consumes from sysfs GPIO
//! lines.  This is the only module that opens actual hardware; everything
//! downstream sees port traits.

use std::path::Path;

use log::info;

use crate::app::ports::Hardware;
use crate::config::{PinId, Settings};
use crate::drivers::pump::GpioPumpOutput;
use crate::drivers::sysfs_gpio::SysfsPin;
use crate::error::Result;
use crate::sensors::tank::{FloaterTank, Polarity};

/// Electrical conventions of the installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wiring {
    pub floaters: Polarity,
    /// Relay boards that energise on a low output.
    pub pumps_active_low: bool,
}

impl Default for Wiring {
    /// Floaters pull the input low when submerged; relays switch on high.
    fn default() -> Self {
        Self {
            floaters: Polarity::ActiveLow,
            pumps_active_low: false,
        }
    }
}

fn tank(
    root: &Path,
    name: &'static str,
    low: &PinId,
    high: &PinId,
    wiring: Wiring,
) -> Result<FloaterTank<SysfsPin, SysfsPin>> {
    let low = SysfsPin::input(root, low)?;
    let high = SysfsPin::input(root, high)?;
    Ok(FloaterTank::new(name, low, high, wiring.floaters))
}

fn pump(root: &Path, label: &str, pin: &PinId, wiring: Wiring) -> Result<GpioPumpOutput<SysfsPin>> {
    let pin_out = SysfsPin::output(root, pin)?;
    Ok(GpioPumpOutput::new(
        format!("{label} ({pin})"),
        pin_out,
        wiring.pumps_active_low,
    ))
}

/// Open every pin named in `settings` under the sysfs `root`.
pub fn open_sysfs(settings: &Settings, root: &Path, wiring: Wiring) -> Result<Hardware> {
    let hardware = Hardware {
        lower_tank: Box::new(tank(
            root,
            "lower",
            &settings.lower_tank_low_floater_pin,
            &settings.lower_tank_high_floater_pin,
            wiring,
        )?),
        upper_tank: Box::new(tank(
            root,
            "upper",
            &settings.upper_tank_low_floater_pin,
            &settings.upper_tank_high_floater_pin,
            wiring,
        )?),
        well_pump: Box::new(pump(
            root,
            "well pump",
            &settings.well_to_lower_tank_pump_pin,
            wiring,
        )?),
        transfer_pump: Box::new(pump(
            root,
            "transfer pump",
            &settings.lower_to_upper_tank_pump_pin,
            wiring,
        )?),
    };
    info!("Hardware: 4 floater inputs and 2 pump outputs opened under {}", root.display());
    Ok(hardware)
}
