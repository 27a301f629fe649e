pub mod console_rx;
pub mod usb_console;

pub use console_rx::console_rx_task;
pub use usb_console::usb_console_task;
