//! Lenient parsing of the `nvidia-smi -q -x` XML report.
//!
//! The report is walked event by event and readings are filled in by their
//! element path below the root, so one odd element never costs the rest of
//! the document.

use crate::metrics::data::{Clocks, GpuDevice, NvidiaSmiLog};
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, warn};

/// Parse raw report bytes into an [`NvidiaSmiLog`].
///
/// Parsing never fails. Elements are matched by tag name at each nesting
/// level; anything the model does not know about is ignored and anything
/// missing stays `None`. A reading holds the element's own text, untrimmed,
/// and a repeated element overwrites the earlier one. If the document breaks
/// off or turns malformed, everything read up to that point is kept.
pub fn parse(bytes: &[u8]) -> NvidiaSmiLog {
    let text = String::from_utf8_lossy(bytes);
    let mut reader = Reader::from_str(&text);
    reader.config_mut().trim_text(false);
    reader.config_mut().expand_empty_elements = true;

    let mut report = NvidiaSmiLog::default();
    let mut depth = 0usize;
    // Elements open below the root, each with the text directly inside it.
    let mut open: Vec<(String, String)> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                if depth == 1 {
                    continue;
                }
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if depth == 2 && name == "gpu" {
                    report.gpus.push(GpuDevice::default());
                }
                open.push((name, String::new()));
            }
            Ok(Event::Text(e)) => {
                if let Some((_, buf)) = open.last_mut() {
                    match e.unescape() {
                        Ok(value) => buf.push_str(&value),
                        Err(_) => buf.push_str(&String::from_utf8_lossy(&e)),
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if let Some((_, buf)) = open.last_mut() {
                    buf.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    // Only the first root element is read.
                    break;
                }
                if let Some((name, value)) = open.pop() {
                    let mut path: Vec<&str> = open.iter().map(|(n, _)| n.as_str()).collect();
                    path.push(&name);
                    assign(&mut report, &path, value);
                }
            }
            Ok(Event::Eof) => {
                if depth > 0 {
                    warn!("nvidia-smi report ended inside an open element, keeping what was read");
                }
                break;
            }
            Err(e) => {
                warn!(
                    "Stopped reading nvidia-smi report at byte {}: {}",
                    reader.buffer_position(),
                    e
                );
                break;
            }
            Ok(_) => {}
        }
    }

    debug!("Parsed nvidia-smi report with {} GPU block(s)", report.gpus.len());
    report
}

/// Store `value` at `path` (element names below the root), if the model has
/// a slot for it.
fn assign(report: &mut NvidiaSmiLog, path: &[&str], value: String) {
    match path {
        ["driver_version"] => report.driver_version = Some(value),
        ["attached_gpus"] => report.attached_gpus = Some(value),
        ["gpu", field @ ..] => {
            if let Some(gpu) = report.gpus.last_mut() {
                assign_device(gpu, field, value);
            }
        }
        _ => {}
    }
}

fn assign_device(gpu: &mut GpuDevice, path: &[&str], value: String) {
    let slot = match path {
        ["product_name"] => &mut gpu.product_name,
        ["product_brand"] => &mut gpu.product_brand,
        ["uuid"] => &mut gpu.uuid,
        ["minor_number"] => &mut gpu.minor_number,
        ["fan_speed"] => &mut gpu.fan_speed,
        ["pci", "pci_bus"] => &mut gpu.pci.pci_bus,
        ["fb_memory_usage", "total"] => &mut gpu.fb_memory_usage.total,
        ["fb_memory_usage", "used"] => &mut gpu.fb_memory_usage.used,
        ["fb_memory_usage", "free"] => &mut gpu.fb_memory_usage.free,
        ["utilization", "gpu_util"] => &mut gpu.utilization.gpu_util,
        ["utilization", "memory_util"] => &mut gpu.utilization.memory_util,
        ["temperature", "gpu_temp"] => &mut gpu.temperature.gpu_temp,
        ["temperature", "gpu_temp_max_threshold"] => &mut gpu.temperature.gpu_temp_max_threshold,
        ["temperature", "gpu_temp_slow_threshold"] => &mut gpu.temperature.gpu_temp_slow_threshold,
        // Newer drivers rename the section and the limit
        ["power_readings" | "gpu_power_readings", "power_draw"] => &mut gpu.power_readings.power_draw,
        ["power_readings" | "gpu_power_readings", "power_limit" | "current_power_limit"] => {
            &mut gpu.power_readings.power_limit
        }
        ["clocks", clock] => match clock_slot(&mut gpu.clocks, clock) {
            Some(slot) => slot,
            None => return,
        },
        ["max_clocks", clock] => match clock_slot(&mut gpu.max_clocks, clock) {
            Some(slot) => slot,
            None => return,
        },
        _ => return,
    };
    *slot = Some(value);
}

fn clock_slot<'a>(clocks: &'a mut Clocks, name: &str) -> Option<&'a mut Option<String>> {
    match name {
        "graphics_clock" => Some(&mut clocks.graphics_clock),
        "sm_clock" => Some(&mut clocks.sm_clock),
        "mem_clock" => Some(&mut clocks.mem_clock),
        "video_clock" => Some(&mut clocks.video_clock),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::emitter::render;

    const TWO_GPUS: &str = r#"<?xml version="1.0" ?>
<!DOCTYPE nvidia_smi_log SYSTEM "nvsmi_device_v11.dtd">
<nvidia_smi_log>
    <timestamp>Mon Oct 19 09:00:00 2026</timestamp>
    <driver_version>535.104.05</driver_version>
    <cuda_version>12.2</cuda_version>
    <attached_gpus>2</attached_gpus>
    <gpu id="00000000:00:1E.0">
        <product_name>Tesla T4</product_name>
        <product_brand>NVIDIA</product_brand>
        <uuid>GPU-abc</uuid>
        <minor_number>0</minor_number>
        <pci>
            <pci_bus>1E</pci_bus>
            <pci_device>00</pci_device>
        </pci>
        <fan_speed>N/A</fan_speed>
        <fb_memory_usage>
            <total>15360 MiB</total>
            <reserved>399 MiB</reserved>
            <used>2 MiB</used>
            <free>14957 MiB</free>
        </fb_memory_usage>
        <utilization>
            <gpu_util>0 %</gpu_util>
            <memory_util>0 %</memory_util>
        </utilization>
        <temperature>
            <gpu_temp>29 C</gpu_temp>
            <gpu_temp_max_threshold>85 C</gpu_temp_max_threshold>
            <gpu_temp_slow_threshold>82 C</gpu_temp_slow_threshold>
        </temperature>
        <power_readings>
            <power_state>P8</power_state>
            <power_draw>9.57 W</power_draw>
            <power_limit>70.00 W</power_limit>
        </power_readings>
        <clocks>
            <graphics_clock>300 MHz</graphics_clock>
            <sm_clock>300 MHz</sm_clock>
            <mem_clock>405 MHz</mem_clock>
            <video_clock>540 MHz</video_clock>
        </clocks>
        <max_clocks>
            <graphics_clock>1590 MHz</graphics_clock>
            <sm_clock>1590 MHz</sm_clock>
            <mem_clock>5001 MHz</mem_clock>
            <video_clock>1470 MHz</video_clock>
        </max_clocks>
    </gpu>
    <gpu id="00000000:00:1F.0">
        <product_name>Tesla T4</product_name>
        <uuid>GPU-def</uuid>
        <minor_number>1</minor_number>
        <fan_speed>34 %</fan_speed>
    </gpu>
</nvidia_smi_log>
"#;

    #[test]
    fn test_parses_globals_and_devices_in_order() {
        let report = parse(TWO_GPUS.as_bytes());
        assert_eq!(report.driver_version.as_deref(), Some("535.104.05"));
        assert_eq!(report.attached_gpus.as_deref(), Some("2"));
        assert_eq!(report.gpus.len(), 2);
        assert_eq!(report.gpus[0].uuid.as_deref(), Some("GPU-abc"));
        assert_eq!(report.gpus[1].uuid.as_deref(), Some("GPU-def"));
    }

    #[test]
    fn test_parses_nested_sections() {
        let report = parse(TWO_GPUS.as_bytes());
        let gpu = &report.gpus[0];
        assert_eq!(gpu.product_brand.as_deref(), Some("NVIDIA"));
        assert_eq!(gpu.pci.pci_bus.as_deref(), Some("1E"));
        assert_eq!(gpu.fb_memory_usage.total.as_deref(), Some("15360 MiB"));
        assert_eq!(gpu.utilization.memory_util.as_deref(), Some("0 %"));
        assert_eq!(gpu.temperature.gpu_temp_slow_threshold.as_deref(), Some("82 C"));
        assert_eq!(gpu.power_readings.power_limit.as_deref(), Some("70.00 W"));
        assert_eq!(gpu.clocks.video_clock.as_deref(), Some("540 MHz"));
        assert_eq!(gpu.max_clocks.mem_clock.as_deref(), Some("5001 MHz"));
    }

    #[test]
    fn test_missing_sections_are_none() {
        let report = parse(TWO_GPUS.as_bytes());
        let gpu = &report.gpus[1];
        assert_eq!(gpu.fan_speed.as_deref(), Some("34 %"));
        assert!(gpu.product_brand.is_none());
        assert!(gpu.power_readings.power_draw.is_none());
        assert!(gpu.clocks.graphics_clock.is_none());
        assert!(gpu.max_clocks.graphics_clock.is_none());
    }

    #[test]
    fn test_newer_power_layout() {
        let xml = r#"<nvidia_smi_log>
            <gpu id="0">
                <gpu_power_readings>
                    <power_draw>25.10 W</power_draw>
                    <current_power_limit>450.00 W</current_power_limit>
                    <default_power_limit>450.00 W</default_power_limit>
                </gpu_power_readings>
            </gpu>
        </nvidia_smi_log>"#;
        let report = parse(xml.as_bytes());
        let power = &report.gpus[0].power_readings;
        assert_eq!(power.power_draw.as_deref(), Some("25.10 W"));
        assert_eq!(power.power_limit.as_deref(), Some("450.00 W"));
    }

    #[test]
    fn test_invalid_document_yields_empty_report() {
        assert_eq!(parse(b"not xml at all <<<"), NvidiaSmiLog::default());
        assert_eq!(parse(b""), NvidiaSmiLog::default());
    }

    #[test]
    fn test_mismatched_tags_keep_what_was_read() {
        let report = parse(b"<nvidia_smi_log><attached_gpus>1</attached_gpus><gpu><uuid>GPU-1</gpu>");
        assert_eq!(report.attached_gpus.as_deref(), Some("1"));
        assert_eq!(report.gpus.len(), 1);
        // `<uuid>` was never closed
        assert!(report.gpus[0].uuid.is_none());
    }

    #[test]
    fn test_nested_element_in_reading_only_drops_that_reading() {
        let xml = "<nvidia_smi_log><driver_version>535</driver_version><attached_gpus>1</attached_gpus>\
                   <gpu><fan_speed><value>34 %</value></fan_speed>\
                   <temperature><gpu_temp>65 C</gpu_temp></temperature></gpu></nvidia_smi_log>";
        let report = parse(xml.as_bytes());
        assert_eq!(report.driver_version.as_deref(), Some("535"));
        assert_eq!(report.attached_gpus.as_deref(), Some("1"));
        assert_eq!(report.gpus[0].temperature.gpu_temp.as_deref(), Some("65 C"));

        let body = render(&report);
        assert!(body.contains("nvidiasmi_driver_version 535\n"));
        assert!(body.contains("nvidiasmi_attached_gpus 1\n"));
        assert!(body.contains("nvidiasmi_temp_gpu{name=\" []\", uuid=\"\"} 65\n"));
        assert!(!body.contains("nvidiasmi_fan_speed"));
    }

    #[test]
    fn test_repeated_reading_keeps_last_value() {
        let xml = "<nvidia_smi_log><gpu><uuid>GPU-1</uuid>\
                   <fan_speed>10 %</fan_speed><fan_speed>34 %</fan_speed></gpu></nvidia_smi_log>";
        let report = parse(xml.as_bytes());
        assert_eq!(report.gpus[0].fan_speed.as_deref(), Some("34 %"));
        assert_eq!(report.gpus[0].uuid.as_deref(), Some("GPU-1"));
    }

    #[test]
    fn test_both_power_layouts_in_one_device() {
        let xml = "<nvidia_smi_log><gpu>\
                   <power_readings><power_draw>10.00 W</power_draw><power_limit>70.00 W</power_limit></power_readings>\
                   <gpu_power_readings><power_draw>25.10 W</power_draw></gpu_power_readings>\
                   </gpu></nvidia_smi_log>";
        let report = parse(xml.as_bytes());
        let power = &report.gpus[0].power_readings;
        assert_eq!(power.power_draw.as_deref(), Some("25.10 W"));
        assert_eq!(power.power_limit.as_deref(), Some("70.00 W"));
    }

    #[test]
    fn test_devices_separated_by_other_elements() {
        let xml = "<nvidia_smi_log><gpu><uuid>GPU-1</uuid></gpu>\
                   <attached_gpus>2</attached_gpus>\
                   <gpu><uuid>GPU-2</uuid></gpu></nvidia_smi_log>";
        let report = parse(xml.as_bytes());
        assert_eq!(report.attached_gpus.as_deref(), Some("2"));
        let uuids: Vec<_> = report.gpus.iter().map(|g| g.uuid_or_empty()).collect();
        assert_eq!(uuids, ["GPU-1", "GPU-2"]);
    }

    #[test]
    fn test_truncated_report_keeps_complete_devices() {
        let cut = TWO_GPUS.find("<gpu id=\"00000000:00:1F.0\">").unwrap() + 12;
        let report = parse(TWO_GPUS[..cut].as_bytes());
        assert_eq!(report.driver_version.as_deref(), Some("535.104.05"));
        assert_eq!(report.gpus[0].uuid.as_deref(), Some("GPU-abc"));
        assert_eq!(report.gpus[0].temperature.gpu_temp.as_deref(), Some("29 C"));
        assert!(report.gpus.iter().all(|g| g.uuid.as_deref() != Some("GPU-def")));
    }

    #[test]
    fn test_driver_version_is_not_trimmed() {
        let report = parse(b"<nvidia_smi_log><driver_version> 535.1 </driver_version></nvidia_smi_log>");
        assert_eq!(report.driver_version.as_deref(), Some(" 535.1 "));
    }

    #[test]
    fn test_entities_and_empty_elements() {
        let xml = "<nvidia_smi_log><gpu><product_name>A &amp; B</product_name><uuid/></gpu></nvidia_smi_log>";
        let report = parse(xml.as_bytes());
        assert_eq!(report.gpus[0].product_name.as_deref(), Some("A & B"));
        assert_eq!(report.gpus[0].uuid.as_deref(), Some(""));
    }

    #[test]
    fn test_no_devices() {
        let report = parse(b"<nvidia_smi_log><attached_gpus>0</attached_gpus></nvidia_smi_log>");
        assert_eq!(report.attached_gpus.as_deref(), Some("0"));
        assert!(report.gpus.is_empty());
        assert!(report.driver_version.is_none());
    }
}
