//! Prometheus text exposition of a parsed report.
//!
//! Each exposed reading becomes one `name{labels} value` line. Readings are
//! passed through [`normalize`] first and a reading that normalizes to an empty
//! string is skipped on its own; the remaining lines of the same device are
//! still written.

use crate::metrics::data::{GpuDevice, NvidiaSmiLog};
use crate::metrics::normalize::normalize;
use std::fmt::{self, Write};

/// Prefix shared by every metric name.
pub const METRIC_NAMESPACE: &str = "nvidiasmi";

/// Number of metric names emitted per device.
pub const DEVICE_METRIC_COUNT: usize = 19;

/// Per-device metric suffixes paired with their raw readings, in output order.
fn device_readings(gpu: &GpuDevice) -> [(&'static str, Option<&str>); DEVICE_METRIC_COUNT] {
    [
        ("fan_speed", gpu.fan_speed.as_deref()),
        ("memory_usage_total", gpu.fb_memory_usage.total.as_deref()),
        ("memory_usage_used", gpu.fb_memory_usage.used.as_deref()),
        ("memory_usage_free", gpu.fb_memory_usage.free.as_deref()),
        ("utilization_gpu", gpu.utilization.gpu_util.as_deref()),
        ("utilization_memory", gpu.utilization.memory_util.as_deref()),
        ("temp_gpu", gpu.temperature.gpu_temp.as_deref()),
        ("temp_gpu_max", gpu.temperature.gpu_temp_max_threshold.as_deref()),
        ("temp_gpu_slow", gpu.temperature.gpu_temp_slow_threshold.as_deref()),
        ("power_draw", gpu.power_readings.power_draw.as_deref()),
        ("power_limit", gpu.power_readings.power_limit.as_deref()),
        ("clock_graphics", gpu.clocks.graphics_clock.as_deref()),
        ("clock_graphics_max", gpu.max_clocks.graphics_clock.as_deref()),
        ("clock_sm", gpu.clocks.sm_clock.as_deref()),
        ("clock_sm_max", gpu.max_clocks.sm_clock.as_deref()),
        ("clock_mem", gpu.clocks.mem_clock.as_deref()),
        ("clock_mem_max", gpu.max_clocks.mem_clock.as_deref()),
        ("clock_video", gpu.clocks.video_clock.as_deref()),
        ("clock_video_max", gpu.max_clocks.video_clock.as_deref()),
    ]
}

/// Write the whole report to `out`.
///
/// The driver version is written verbatim; every other reading is normalized.
/// With a `String` sink this cannot fail.
pub fn emit<W: Write>(report: &NvidiaSmiLog, out: &mut W) -> fmt::Result {
    if let Some(version) = report.driver_version.as_deref().filter(|v| !v.trim().is_empty()) {
        write_line(out, "driver_version", None, version)?;
    }
    write_metric(out, "attached_gpus", None, report.attached_gpus.as_deref())?;

    for gpu in &report.gpus {
        let labels = device_labels(gpu);
        for (suffix, raw) in device_readings(gpu) {
            write_metric(out, suffix, Some(&labels), raw)?;
        }
    }

    Ok(())
}

/// Render the report into a fresh exposition body.
pub fn render(report: &NvidiaSmiLog) -> String {
    let mut body = String::new();
    // Writing into a String is infallible.
    let _ = emit(report, &mut body);
    body
}

/// Build the label block shared by every line of one device.
pub fn device_labels(gpu: &GpuDevice) -> String {
    format!(
        "name=\"{}\", uuid=\"{}\"",
        escape_label_value(&gpu.display_name()),
        escape_label_value(gpu.uuid_or_empty())
    )
}

/// Escape a label value per the text exposition format.
pub fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn write_metric<W: Write>(
    out: &mut W,
    suffix: &str,
    labels: Option<&str>,
    raw: Option<&str>,
) -> fmt::Result {
    let value = normalize(raw.unwrap_or_default());
    if value.is_empty() {
        return Ok(());
    }
    write_line(out, suffix, labels, &value)
}

fn write_line<W: Write>(out: &mut W, suffix: &str, labels: Option<&str>, value: &str) -> fmt::Result {
    write!(out, "{}_{}", METRIC_NAMESPACE, suffix)?;
    if let Some(labels) = labels.filter(|l| !l.is_empty()) {
        write!(out, "{{{}}}", labels)?;
    }
    writeln!(out, " {}", value)
}
