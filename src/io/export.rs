//! CSV and JSON export of optimization results.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

use crate::devices::Equipment;
use crate::sim::target::TargetRow;

/// Column header of the timeline export.
pub const TIMELINE_HEADER: &str = "timestamp,pv_kw,pv_after_curtailment_kw,\
                                   reference_curtailment_kw,curtailment_kw,\
                                   reference_load_kw,load_kw,status,manipulated";

/// Column header of the per-device export.
pub const DEVICES_HEADER: &str = "device,timestamp,reference_kw,state,p_in_kw,p_out_kw,controllable";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Exports the target timeline to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_timeline(rows: &[TargetRow], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_timeline_csv(rows, io::BufWriter::new(file))
}

/// Writes the target timeline as CSV to any writer.
///
/// One row per timestep; output is deterministic for identical inputs.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_timeline_csv(rows: &[TargetRow], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(TIMELINE_HEADER.split(',').map(str::trim))?;

    for r in rows {
        wtr.write_record(&[
            r.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            format!("{:.4}", r.pv_kw),
            format!("{:.4}", r.pv_after_curtailment_kw),
            format!("{:.4}", r.reference_curtailment_kw),
            format!("{:.4}", r.curtailment_kw),
            format!("{:.4}", r.reference_load_kw),
            format!("{:.4}", r.load_kw),
            r.status.to_string(),
            r.manipulated.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Exports every device's series to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_devices(devices: &[Equipment], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_devices_csv(devices, io::BufWriter::new(file))
}

/// Writes every device's series as long-format CSV.
///
/// Fixed devices leave the state and input columns empty and report their
/// reference trace as output.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_devices_csv(devices: &[Equipment], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(DEVICES_HEADER.split(','))?;

    for device in devices {
        let reference = device.reference().values();
        let output = device.output_kw();
        for (i, timestamp) in device.axis().iter() {
            let state = device
                .state_at(i)
                .map(|s| s.code().to_string())
                .unwrap_or_default();
            let p_in = device
                .p_in()
                .map(|p| format!("{:.4}", p[i]))
                .unwrap_or_default();
            wtr.write_record(&[
                device.name().to_string(),
                timestamp.format(TIMESTAMP_FORMAT).to_string(),
                format!("{:.4}", reference[i]),
                state,
                p_in,
                format!("{:.4}", output[i]),
                device.is_controllable_at(i).to_string(),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}

/// Writes any report as pretty-printed JSON to a file.
///
/// # Errors
///
/// Returns an `io::Error` if file creation, serialization or writing fails.
pub fn export_json<T: Serialize>(report: &T, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let mut writer = io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writeln!(writer)?;
    writer.flush()
}
