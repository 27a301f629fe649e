//! Build script for sentinel-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates board.toml at compile time, reporting problems in one boxed format
//! - Generates `board_config.rs` holding the validated `SentinelConfig`

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Pins the firmware wires up in main.rs
const WIRED_SDA: i64 = 4;
const WIRED_SCL: i64 = 5;
const WIRED_CONSOLE: (i64, i64) = (0, 1);
const WIRED_LINK: (i64, i64) = (8, 9);

/// The DMA ring is placed in a 256-byte aligned static
const MAX_DMA_RING: i64 = 256;

/// Inner width of the error box
const BOX_WIDTH: usize = 62;

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("cargo sets OUT_DIR"));

    setup_linker(&out_dir);
    let board = load_board();
    validate_board(&board);
    generate_config(&board, &out_dir);
}

/// Put memory.x on the linker search path
fn setup_linker(out_dir: &Path) {
    fs::write(out_dir.join("memory.x"), include_bytes!("memory.x"))
        .unwrap_or_else(|e| fail("Cannot write memory.x", &[e.to_string()]));

    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Read and parse board.toml
fn load_board() -> toml::Value {
    println!("cargo:rerun-if-changed=board.toml");

    let text = fs::read_to_string("board.toml").unwrap_or_else(|e| {
        fail(
            "Cannot read board.toml",
            &[
                e.to_string(),
                "The firmware needs a board.toml next to Cargo.toml".to_string(),
            ],
        )
    });

    toml::from_str(&text).unwrap_or_else(|e: toml::de::Error| {
        let lines: Vec<String> = e.to_string().lines().map(String::from).collect();
        fail("Invalid TOML syntax in board.toml", &lines)
    })
}

/// Run every section check, aborting on the first failing section
fn validate_board(config: &toml::Value) {
    validate_required_sections(config);
    validate_bus(config);
    validate_buffers(config);
    validate_serial(config, "console", WIRED_CONSOLE);
    validate_serial(config, "link", WIRED_LINK);
    validate_monitor(config);

    println!("cargo:warning=board.toml validated successfully");
}

/// Abort the build with a boxed list of problems
fn fail(title: &str, lines: &[String]) -> ! {
    let rule = "═".repeat(BOX_WIDTH + 5);
    let body = lines
        .iter()
        .map(|line| format!("║  • {:<w$} ║", clip(line), w = BOX_WIDTH))
        .collect::<Vec<_>>()
        .join("\n");

    panic!(
        "\n╔{rule}╗\n║  ERROR: {title:<w$} ║\n╠{rule}╣\n{body}\n╚{rule}╝\n",
        w = BOX_WIDTH - 5
    );
}

/// Abort if any problems were collected
fn report(title: &str, errors: &[String]) {
    if !errors.is_empty() {
        fail(title, errors);
    }
}

/// Shorten a line to fit the box
fn clip(line: &str) -> String {
    if line.chars().count() > BOX_WIDTH {
        let kept: String = line.chars().take(BOX_WIDTH - 3).collect();
        format!("{kept}...")
    } else {
        line.to_string()
    }
}

/// Validate that required sections exist
fn validate_required_sections(config: &toml::Value) {
    let errors: Vec<String> = ["bus", "buffers", "console", "link", "monitor"]
        .iter()
        .filter(|section| !matches!(config.get(**section), Some(toml::Value::Table(_))))
        .map(|section| format!("Missing [{}] section", section))
        .collect();

    report("Missing required sections in board.toml", &errors);
}

/// Fetch an integer field, recording an error if absent or out of range
fn int_field(
    config: &toml::Value,
    section: &str,
    key: &str,
    range: std::ops::RangeInclusive<i64>,
    errors: &mut Vec<String>,
) -> i64 {
    match config.get(section).and_then(|s| s.get(key)) {
        Some(toml::Value::Integer(v)) if range.contains(v) => *v,
        Some(toml::Value::Integer(_)) => {
            errors.push(format!(
                "[{}] {} must be {}-{}",
                section,
                key,
                range.start(),
                range.end()
            ));
            0
        }
        Some(_) => {
            errors.push(format!("[{}] {} must be an integer", section, key));
            0
        }
        None => {
            errors.push(format!("[{}] missing '{}'", section, key));
            0
        }
    }
}

/// Validate the display bus section
fn validate_bus(config: &toml::Value) {
    let mut errors = Vec::new();

    int_field(config, "bus", "address", 0x08..=0x77, &mut errors);
    int_field(config, "bus", "frequency_hz", 10_000..=1_000_000, &mut errors);
    int_field(config, "bus", "write_timeout_us", 1..=1_000_000, &mut errors);
    int_field(config, "bus", "pulse_width_us", 1..=1_000, &mut errors);
    int_field(config, "bus", "max_pulses", 1..=9, &mut errors);

    let sda = int_field(config, "bus", "sda_pin", 0..=29, &mut errors);
    let scl = int_field(config, "bus", "scl_pin", 0..=29, &mut errors);
    if errors.is_empty() && (sda, scl) != (WIRED_SDA, WIRED_SCL) {
        errors.push(format!(
            "[bus] firmware wires I2C0 on SDA={} SCL={}",
            WIRED_SDA, WIRED_SCL
        ));
    }

    report("Invalid bus configuration", &errors);
}

/// Validate buffer sizes
fn validate_buffers(config: &toml::Value) {
    let mut errors = Vec::new();

    let rx = int_field(config, "buffers", "rx_ring_size", 2..=4096, &mut errors);
    let dma = int_field(config, "buffers", "dma_ring_size", 2..=MAX_DMA_RING, &mut errors);
    int_field(config, "buffers", "line_capacity", 2..=256, &mut errors);

    for (key, size) in [("rx_ring_size", rx), ("dma_ring_size", dma)] {
        if size > 0 && (size & (size - 1)) != 0 {
            errors.push(format!("[buffers] {} must be a power of two", key));
        }
    }

    report("Invalid buffer configuration", &errors);
}

/// Validate one UART section
fn validate_serial(config: &toml::Value, section: &str, wired: (i64, i64)) {
    let mut errors = Vec::new();

    int_field(config, section, "baudrate", 1_200..=921_600, &mut errors);
    let tx = int_field(config, section, "tx_pin", 0..=29, &mut errors);
    let rx = int_field(config, section, "rx_pin", 0..=29, &mut errors);
    if errors.is_empty() && (tx, rx) != wired {
        errors.push(format!(
            "[{}] firmware wires this UART on TX={} RX={}",
            section, wired.0, wired.1
        ));
    }

    report("Invalid serial configuration", &errors);
}

/// Validate monitor thresholds and periods
fn validate_monitor(config: &toml::Value) {
    let mut errors = Vec::new();

    int_field(config, "monitor", "low_voltage_mv", 1_000..=5_500, &mut errors);
    int_field(config, "monitor", "sample_period_ms", 1..=60_000, &mut errors);
    int_field(config, "monitor", "heartbeat_ms", 1..=60_000, &mut errors);
    int_field(config, "monitor", "refresh_ms", 1..=1_000, &mut errors);

    report("Invalid monitor configuration", &errors);
}

/// Emit `board_config.rs` with the validated values
fn generate_config(config: &toml::Value, out_dir: &Path) {
    let get = |section: &str, key: &str| -> i64 {
        config
            .get(section)
            .and_then(|s| s.get(key))
            .and_then(|v| v.as_integer())
            .unwrap_or_default()
    };

    let serial = |section: &str| {
        format!(
            "SerialConfig {{ baudrate: {}, tx_pin: {}, rx_pin: {} }}",
            get(section, "baudrate"),
            get(section, "tx_pin"),
            get(section, "rx_pin"),
        )
    };

    let source = format!(
        "// Generated from board.toml by build.rs\n\
        pub const BOARD: SentinelConfig = SentinelConfig {{\n\
        \x20   bus: BusConfig {{\n\
        \x20       address: {address:#04x},\n\
        \x20       frequency_hz: {frequency},\n\
        \x20       write_timeout_us: {timeout},\n\
        \x20       pulse_width_us: {pulse},\n\
        \x20       max_pulses: {pulses},\n\
        \x20       sda_pin: {sda},\n\
        \x20       scl_pin: {scl},\n\
        \x20   }},\n\
        \x20   buffers: BufferConfig {{\n\
        \x20       rx_ring_size: {rx_ring},\n\
        \x20       dma_ring_size: {dma_ring},\n\
        \x20       line_capacity: {line},\n\
        \x20   }},\n\
        \x20   console: {console},\n\
        \x20   link: {link},\n\
        \x20   monitor: MonitorConfig {{\n\
        \x20       low_voltage_mv: {low_mv},\n\
        \x20       sample_period_ms: {sample},\n\
        \x20       heartbeat_ms: {heartbeat},\n\
        \x20       refresh_ms: {refresh},\n\
        \x20   }},\n\
        }};\n",
        address = get("bus", "address"),
        frequency = get("bus", "frequency_hz"),
        timeout = get("bus", "write_timeout_us"),
        pulse = get("bus", "pulse_width_us"),
        pulses = get("bus", "max_pulses"),
        sda = get("bus", "sda_pin"),
        scl = get("bus", "scl_pin"),
        rx_ring = get("buffers", "rx_ring_size"),
        dma_ring = get("buffers", "dma_ring_size"),
        line = get("buffers", "line_capacity"),
        console = serial("console"),
        link = serial("link"),
        low_mv = get("monitor", "low_voltage_mv"),
        sample = get("monitor", "sample_period_ms"),
        heartbeat = get("monitor", "heartbeat_ms"),
        refresh = get("monitor", "refresh_ms"),
    );

    fs::write(out_dir.join("board_config.rs"), source)
        .unwrap_or_else(|e| fail("Cannot write board_config.rs", &[e.to_string()]));
}
