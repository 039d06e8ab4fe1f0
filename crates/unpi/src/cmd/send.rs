use std::time::{Duration, Instant};

use unpi::{Unpi, UnpiConfig};
use unpi_frame::{Frame, FrameError};
use unpi_transport::open_device;

use crate::cmd::{parse_duration, SendArgs};
use crate::exit::{frame_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let length_width = args.width.length_width()?;
    let frame = args.frame.to_frame()?;
    let wait_timeout = parse_duration(&args.wait_timeout)?;

    let device = open_device(&args.path).map_err(|err| transport_error("open failed", err))?;
    let mut unpi = Unpi::with_config(device, UnpiConfig::with_width(length_width))
        .map_err(|err| frame_error("link setup failed", err))?;

    unpi.write_frame(&frame).map_err(|err| frame_error("send failed", err))?;

    if args.wait {
        let response = wait_for_response(&mut unpi, &frame, wait_timeout)
            .map_err(|err| frame_error("receive failed", err))?;
        print_frame(&response, format);
    }

    Ok(SUCCESS)
}

trait FrameReceiver {
    fn receive_before(&mut self, deadline: Instant) -> unpi_frame::Result<Frame>;
}

impl<W: std::io::Write> FrameReceiver for Unpi<W> {
    fn receive_before(&mut self, deadline: Instant) -> unpi_frame::Result<Frame> {
        self.read_frame_before(deadline)
    }
}

/// Return the first frame addressed back to the sender's subsystem,
/// skipping unrelated asynchronous indications and malformed frames.
///
/// `timeout` bounds the whole wait, however many frames pass by.
fn wait_for_response<R: FrameReceiver>(
    receiver: &mut R,
    request: &Frame,
    timeout: Duration,
) -> unpi_frame::Result<Frame> {
    let deadline = Instant::now() + timeout;
    loop {
        if Instant::now() >= deadline {
            return Err(FrameError::Timeout(timeout));
        }
        let frame = match receiver.receive_before(deadline) {
            Ok(frame) => frame,
            Err(FrameError::Timeout(_)) => return Err(FrameError::Timeout(timeout)),
            Err(err) if err.is_framing() => {
                tracing::warn!(error = %err, "dropping malformed frame");
                continue;
            }
            Err(err) => return Err(err),
        };
        if frame.subsystem == request.subsystem && frame.command == request.command {
            return Ok(frame);
        }
        tracing::debug!(
            command_type = %frame.command_type,
            subsystem = %frame.subsystem,
            command = frame.command,
            "skipping unrelated frame"
        );
    }
}
