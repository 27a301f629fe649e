//! Supply voltage threshold monitor
//!
//! The board measures VSYS through a 1:3 divider on an ADC input. A reading
//! at or above the threshold is healthy; anything below is low battery.

/// ADC reference voltage in millivolts
pub const ADC_VREF_MV: u32 = 3300;

/// Full-scale ADC count (12-bit)
pub const ADC_FULL_SCALE: u32 = 4096;

/// VSYS divider ratio
pub const VSYS_DIVIDER: u32 = 3;

/// Supply condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SupplyStatus {
    /// At or above threshold
    Ok,
    /// Below threshold
    LowBattery,
}

/// Convert a raw 12-bit reading of the VSYS divider to millivolts
pub fn vsys_millivolts(raw: u16) -> u16 {
    let mv = raw as u32 * ADC_VREF_MV * VSYS_DIVIDER / ADC_FULL_SCALE;
    mv.min(u16::MAX as u32) as u16
}

/// Threshold monitor that also reports transitions
#[derive(Debug, Clone)]
pub struct VoltageMonitor {
    threshold_mv: u16,
    last: Option<SupplyStatus>,
}

impl VoltageMonitor {
    /// Create a monitor with the given low-voltage threshold
    pub const fn new(threshold_mv: u16) -> Self {
        Self {
            threshold_mv,
            last: None,
        }
    }

    /// Classify a reading without recording it
    pub fn check(&self, millivolts: u16) -> SupplyStatus {
        if millivolts < self.threshold_mv {
            SupplyStatus::LowBattery
        } else {
            SupplyStatus::Ok
        }
    }

    /// Record a reading
    ///
    /// Returns the new status when it differs from the previous one (the
    /// first reading always counts as a change).
    pub fn update(&mut self, millivolts: u16) -> Option<SupplyStatus> {
        let status = self.check(millivolts);
        if self.last == Some(status) {
            return None;
        }
        self.last = Some(status);
        Some(status)
    }

    /// Last recorded status
    pub fn status(&self) -> Option<SupplyStatus> {
        self.last
    }
}
