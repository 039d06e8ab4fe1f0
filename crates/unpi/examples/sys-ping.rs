//! Send SYS_PING to a co-processor and print the capabilities it reports.
//!
//! Configure the serial line first (baud rate, raw mode), then run:
//!   stty -F /dev/ttyACM0 115200 raw -echo
//!   cargo run --example sys-ping -- /dev/ttyACM0
//!
//! Pass `2` as a second argument for peers that use a 2-byte length field.

use std::time::Duration;

use unpi::frame::{CommandType, Frame, FrameError, LengthWidth, Subsystem};
use unpi::transport::open_device;
use unpi::{Unpi, UnpiConfig};

const SYS_PING: u8 = 0x01;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let path = args.next().ok_or("usage: sys-ping <device> [width]")?;
    let width = match args.next() {
        Some(raw) => LengthWidth::try_from(raw.parse::<u8>()?)?,
        None => LengthWidth::One,
    };

    let mut config = UnpiConfig::with_width(width);
    config.frame.read_timeout = Some(Duration::from_secs(2));
    let mut link = Unpi::with_config(open_device(&path)?, config)?;

    link.write_frame(&Frame::without_payload(
        CommandType::Sreq,
        Subsystem::Sys,
        SYS_PING,
    ))?;
    eprintln!("Sent SYS_PING to {path}");

    loop {
        match link.read_frame() {
            Ok(frame)
                if frame.command_type == CommandType::Srsp
                    && frame.subsystem == Subsystem::Sys
                    && frame.command == SYS_PING =>
            {
                let capabilities = match frame.payload.as_ref() {
                    [lo, hi, ..] => u16::from_le_bytes([*lo, *hi]),
                    _ => 0,
                };
                println!("capabilities: {capabilities:#06x}");
                return Ok(());
            }
            Ok(frame) => eprintln!("Skipping unrelated frame: {frame:?}"),
            Err(FrameError::Timeout(_)) => return Err("no response to SYS_PING".into()),
            Err(e) => eprintln!("Framing error: {e}"),
        }
    }
}
