//! GPIO pin abstractions
//!
//! Infallible digital output, as exposed by the chip HALs once a pin has
//! been claimed. Used for the status LED.

/// Digital output pin
pub trait OutputPin {
    /// Drive the pin high (logic 1)
    fn set_high(&mut self);

    /// Drive the pin low (logic 0)
    fn set_low(&mut self);

    /// Drive the pin to a specific level
    fn set_state(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
    }

    /// Check if the pin is currently driven high
    fn is_set_high(&self) -> bool;

    /// Invert the driven level
    fn toggle(&mut self) {
        let high = self.is_set_high();
        self.set_state(!high);
    }
}
