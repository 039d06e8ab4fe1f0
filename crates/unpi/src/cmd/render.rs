use unpi_frame::render_frame;

use crate::cmd::RenderArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_wire, OutputFormat};

pub fn run(args: RenderArgs, format: OutputFormat) -> CliResult<i32> {
    let length_width = args.width.length_width()?;
    let frame = args.frame.to_frame()?;

    if frame.payload.len() > length_width.max_payload() {
        tracing::warn!(
            payload_len = frame.payload.len(),
            max = length_width.max_payload(),
            "payload does not fit the length field; length will wrap"
        );
    }

    let wire = render_frame(&frame, length_width);
    print_wire(&wire, length_width.size(), format);
    Ok(SUCCESS)
}
