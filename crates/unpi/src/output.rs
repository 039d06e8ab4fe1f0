use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use unpi_frame::Frame;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput {
    command_type: String,
    subsystem: String,
    subsystem_id: u8,
    command: u8,
    payload_size: usize,
    payload: String,
    timestamp: String,
}

impl FrameOutput {
    fn new(frame: &Frame) -> Self {
        Self {
            command_type: frame.command_type.to_string(),
            subsystem: frame.subsystem.to_string(),
            subsystem_id: frame.subsystem.to_bits(),
            command: frame.command,
            payload_size: frame.payload.len(),
            payload: hex::encode(&frame.payload),
            timestamp: now_unix_seconds(),
        }
    }
}

#[derive(Serialize)]
struct WireOutput<'a> {
    length_width: usize,
    wire_size: usize,
    wire: &'a str,
}

pub fn print_frame(frame: &Frame, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = FrameOutput::new(frame);
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let out = FrameOutput::new(frame);
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TYPE", "SUBSYSTEM", "COMMAND", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    out.command_type,
                    out.subsystem,
                    format!("{:#04x}", out.command),
                    out.payload_size.to_string(),
                    out.payload,
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "type={} subsystem={} command={:#04x} size={} payload={}",
                frame.command_type,
                frame.subsystem,
                frame.command,
                frame.payload.len(),
                hex::encode(&frame.payload)
            );
        }
        OutputFormat::Raw => {
            print_raw(frame.payload.as_ref());
        }
    }
}

pub fn print_wire(wire: &[u8], length_width: usize, format: OutputFormat) {
    let encoded = hex::encode(wire);
    match format {
        OutputFormat::Json => {
            let out = WireOutput {
                length_width,
                wire_size: wire.len(),
                wire: &encoded,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["WIDTH", "SIZE", "WIRE"])
                .add_row(vec![
                    length_width.to_string(),
                    wire.len().to_string(),
                    encoded,
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{encoded}"),
        OutputFormat::Raw => print_raw(wire),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
