use bytes::BytesMut;
use unpi_frame::{decode_frame, Frame, LengthWidth};

use crate::cmd::{parse_hex, DecodeArgs};
use crate::exit::{frame_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let length_width = args.width.length_width()?;
    let wire = parse_hex(&args.hex)?;

    for frame in decode_all(&wire, length_width)? {
        print_frame(&frame, format);
    }
    Ok(SUCCESS)
}

/// Decode every frame in `wire`; trailing bytes that do not complete a frame
/// are an error.
fn decode_all(wire: &[u8], length_width: LengthWidth) -> CliResult<Vec<Frame>> {
    let mut buf = BytesMut::from(wire);
    let mut frames = Vec::new();

    while !buf.is_empty() {
        let offset = wire.len() - buf.len();
        match decode_frame(&mut buf, length_width) {
            Ok(Some(frame)) => frames.push(frame),
            Ok(None) => {
                return Err(CliError::new(
                    DATA_INVALID,
                    format!(
                        "incomplete frame at offset {offset} ({} trailing bytes)",
                        buf.len()
                    ),
                ));
            }
            Err(err) => return Err(frame_error(&format!("frame at offset {offset}"), err)),
        }
    }

    Ok(frames)
}

#[cfg(test)]
mod tests {
    use unpi_frame::{CommandType, Subsystem};

    use super::*;

    #[test]
    fn decodes_back_to_back_frames() {
        let wire = [
            0xFE, 0x00, 0x66, 0x00, 0x66, 0xFE, 0x03, 0x26, 0x00, 0x00, 0x01, 0x02, 0x26,
        ];
        let frames = decode_all(&wire, LengthWidth::One).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].command_type, CommandType::Srsp);
        assert_eq!(frames[1].subsystem, Subsystem::Sapi);
        assert_eq!(frames[1].payload.as_ref(), &[0x00, 0x01, 0x02]);
    }

    #[test]
    fn reports_offset_of_bad_frame() {
        let wire = [0xFE, 0x00, 0x66, 0x00, 0x66, 0x00];
        let err = decode_all(&wire, LengthWidth::One).unwrap_err();
        assert_eq!(err.code, DATA_INVALID);
        assert!(err.message.contains("offset 5"), "{}", err.message);
    }

    #[test]
    fn reports_truncated_tail() {
        let wire = [0xFE, 0x00, 0x00, 0x66];
        let err = decode_all(&wire, LengthWidth::Two).unwrap_err();
        assert!(err.message.starts_with("incomplete frame at offset 0"));
    }
}
