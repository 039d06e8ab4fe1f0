use std::io::Write;

use unpi::{Unpi, UnpiConfig};
use unpi_transport::open_device;

use crate::cmd::{parse_duration, ListenArgs};
use crate::exit::{frame_error, transport_error, CliError, CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let length_width = args.width.length_width()?;
    let mut config = UnpiConfig::with_width(length_width);
    config.frame.read_timeout = args
        .read_timeout
        .as_deref()
        .map(parse_duration)
        .transpose()?;

    let device = open_device(&args.path).map_err(|err| transport_error("open failed", err))?;
    let mut unpi =
        Unpi::with_config(device, config).map_err(|err| frame_error("link setup failed", err))?;

    install_ctrlc_handler()?;

    let mut printed = 0usize;
    loop {
        let frame = match unpi.read_frame() {
            Ok(frame) => frame,
            Err(err) if err.is_framing() && !args.strict => {
                tracing::warn!(error = %err, "dropping malformed frame");
                continue;
            }
            Err(err) => return Err(frame_error("receive failed", err)),
        };

        print_frame(&frame, format);
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count {
                return Ok(SUCCESS);
            }
        }
    }
}

// read_frame blocks without a deadline, so stop from the handler itself.
fn install_ctrlc_handler() -> CliResult<()> {
    ctrlc::set_handler(|| {
        let _ = std::io::stdout().flush();
        std::process::exit(SUCCESS);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
