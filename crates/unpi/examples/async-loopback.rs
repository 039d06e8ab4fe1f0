//! Drive UNPI frames through tokio's codec framework over an in-memory pipe.
//!
//! Run with:
//!   cargo run --example async-loopback --features async

use futures_util::{SinkExt, StreamExt};
use tokio_util::codec::{FramedRead, FramedWrite};
use unpi::frame::{CommandType, Frame, LengthWidth, Subsystem, UnpiCodec};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (host, device) = tokio::io::duplex(1024);
    let codec = UnpiCodec::new(LengthWidth::Two);
    let mut tx = FramedWrite::new(host, codec.clone());
    let mut rx = FramedRead::new(device, codec);

    let frames = [
        Frame::without_payload(CommandType::Sreq, Subsystem::Sys, 0x01),
        Frame::new(CommandType::Sreq, Subsystem::Sapi, 0x00, vec![0, 1, 2]),
        Frame::new(CommandType::Areq, Subsystem::Zdo, 0xC0, vec![0x09]),
    ];

    let sender = tokio::spawn(async move {
        for frame in frames {
            tx.send(frame).await?;
        }
        Ok::<_, unpi::frame::FrameError>(())
    });

    for _ in 0..3 {
        match rx.next().await {
            Some(Ok(frame)) => println!(
                "{} {} {:#04x} payload={:02x?}",
                frame.command_type,
                frame.subsystem,
                frame.command,
                frame.payload.as_ref()
            ),
            Some(Err(e)) => return Err(e.into()),
            None => break,
        }
    }

    sender.await??;
    Ok(())
}
