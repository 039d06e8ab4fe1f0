use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use unpi_frame::{CommandType, Frame, LengthWidth, Subsystem};

use crate::exit::{frame_error, CliError, CliResult};
use crate::output::OutputFormat;

pub mod decode;
pub mod listen;
pub mod render;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the wire bytes for a frame.
    Render(RenderArgs),
    /// Decode frames from a hex string.
    Decode(DecodeArgs),
    /// Send a single frame to a device.
    Send(SendArgs),
    /// Print frames received from a device.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Render(args) => render::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Length field width shared by every frame-handling command.
#[derive(Args, Debug, Clone, Copy)]
pub struct WidthArgs {
    /// Length field width in bytes (1 or 2).
    #[arg(long, short = 'w', default_value = "1", env = "UNPI_LENGTH_WIDTH")]
    pub width: u8,
}

impl WidthArgs {
    pub fn length_width(&self) -> CliResult<LengthWidth> {
        LengthWidth::try_from(self.width).map_err(|err| frame_error("invalid --width", err))
    }
}

/// Fields of an outbound frame.
#[derive(Args, Debug, Clone)]
pub struct FrameArgs {
    /// Command type name (POLL, SREQ, AREQ, SRSP) or number 0-7.
    #[arg(long = "type", short = 't', default_value = "SREQ")]
    pub command_type: String,
    /// Subsystem name (SYS, AF, ZDO, SAPI, ...) or number 0-31.
    #[arg(long, short = 's')]
    pub subsystem: String,
    /// Command identifier (decimal or 0x-prefixed hex).
    #[arg(long, short = 'c')]
    pub command: String,
    /// Payload as hex (spaces and colons allowed).
    #[arg(long, short = 'p')]
    pub payload: Option<String>,
}

impl FrameArgs {
    pub fn to_frame(&self) -> CliResult<Frame> {
        let command_type = parse_command_type(&self.command_type)?;
        let subsystem = parse_subsystem(&self.subsystem)?;
        let command = parse_u8(&self.command)?;
        let payload = match &self.payload {
            Some(hex) => parse_hex(hex)?,
            None => Vec::new(),
        };
        Ok(Frame::new(command_type, subsystem, command, payload))
    }
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub width: WidthArgs,
    #[command(flatten)]
    pub frame: FrameArgs,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    #[command(flatten)]
    pub width: WidthArgs,
    /// Captured wire bytes as hex, e.g. "fe 03 26 00 00 01 02 26".
    pub hex: String,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Device or file path to write to (configure the line beforehand).
    pub path: PathBuf,
    #[command(flatten)]
    pub width: WidthArgs,
    #[command(flatten)]
    pub frame: FrameArgs,
    /// Wait for one response frame and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for response when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Device or file path to read from (configure the line beforehand).
    pub path: PathBuf,
    #[command(flatten)]
    pub width: WidthArgs,
    /// Exit after receiving N frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Give up when no complete frame arrives within this time (e.g. 10s).
    #[arg(long)]
    pub read_timeout: Option<String>,
    /// Exit on the first framing error instead of logging it and continuing.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_command_type(input: &str) -> CliResult<CommandType> {
    if let Some(ty) = CommandType::from_name(input) {
        return Ok(ty);
    }
    let raw = parse_u8(input)
        .map_err(|_| CliError::usage(format!("unknown command type: {input}")))?;
    CommandType::try_from(raw).map_err(|err| frame_error("invalid --type", err))
}

pub fn parse_subsystem(input: &str) -> CliResult<Subsystem> {
    if let Some(subsystem) = Subsystem::from_name(input) {
        return Ok(subsystem);
    }
    let raw = parse_u8(input).map_err(|_| CliError::usage(format!("unknown subsystem: {input}")))?;
    Subsystem::try_from(raw).map_err(|err| frame_error("invalid --subsystem", err))
}

pub fn parse_u8(input: &str) -> CliResult<u8> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|_| CliError::usage(format!("invalid byte value: {input}")))
}

pub fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let cleaned: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    let cleaned = cleaned
        .strip_prefix("0x")
        .unwrap_or(cleaned.as_str())
        .to_string();
    hex::decode(&cleaned).map_err(|err| CliError::usage(format!("invalid hex {input:?}: {err}")))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::usage("duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
