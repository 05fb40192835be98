//! Data structures mirroring the `nvidia-smi -q -x` report.
//!
//! Every reading is kept as the raw string the tool printed (`"34 %"`,
//! `"70.12 W"`, `"N/A"`) and is optional, because the tool gives no type
//! guarantee and omits whole sections on some boards. Numeric interpretation
//! happens only at emission time.

use serde::Serialize;

/// One parsed snapshot of the whole report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NvidiaSmiLog {
    /// Driver version, emitted verbatim
    pub driver_version: Option<String>,
    /// Number of attached GPUs as printed by the tool
    pub attached_gpus: Option<String>,
    /// Devices in the order the tool listed them
    pub gpus: Vec<GpuDevice>,
}

/// A single accelerator block (`<gpu>`).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GpuDevice {
    /// Product name (e.g., "Tesla T4")
    pub product_name: Option<String>,
    /// Product brand (e.g., "NVIDIA")
    pub product_brand: Option<String>,
    /// Device UUID (e.g., "GPU-5b3c...")
    pub uuid: Option<String>,
    /// Device minor number, the `/dev/nvidiaN` index
    pub minor_number: Option<String>,
    /// Fan speed (e.g., "34 %")
    pub fan_speed: Option<String>,
    pub pci: PciInfo,
    pub fb_memory_usage: MemoryUsage,
    pub utilization: Utilization,
    pub temperature: Temperature,
    /// Board power; newer drivers name the section `gpu_power_readings`
    pub power_readings: PowerReadings,
    /// Current clocks
    pub clocks: Clocks,
    /// Hardware maximum clocks
    pub max_clocks: Clocks,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PciInfo {
    pub pci_bus: Option<String>,
}

/// Framebuffer memory usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MemoryUsage {
    pub total: Option<String>,
    pub used: Option<String>,
    pub free: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Utilization {
    pub gpu_util: Option<String>,
    pub memory_util: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Temperature {
    /// Current core temperature
    pub gpu_temp: Option<String>,
    /// Shutdown threshold
    pub gpu_temp_max_threshold: Option<String>,
    /// Slowdown threshold
    pub gpu_temp_slow_threshold: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PowerReadings {
    pub power_draw: Option<String>,
    pub power_limit: Option<String>,
}

/// Clock readings; used for both `<clocks>` and `<max_clocks>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Clocks {
    pub graphics_clock: Option<String>,
    pub sm_clock: Option<String>,
    pub mem_clock: Option<String>,
    pub video_clock: Option<String>,
}

impl GpuDevice {
    /// Display name used in the `name` label, e.g. `Tesla T4 [0]`.
    ///
    /// Missing identity fields render as empty strings; a device is never
    /// rejected for lacking them.
    pub fn display_name(&self) -> String {
        format!(
            "{} [{}]",
            self.product_name.as_deref().unwrap_or_default(),
            self.minor_number.as_deref().unwrap_or_default()
        )
    }

    /// Device UUID, or an empty string when the report omitted it.
    pub fn uuid_or_empty(&self) -> &str {
        self.uuid.as_deref().unwrap_or_default()
    }
}
