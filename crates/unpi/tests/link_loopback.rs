#![cfg(unix)]

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::thread;
use std::time::Duration;

use unpi::frame::{render_frame, CommandType, Frame, FrameError, LengthWidth, Subsystem};
use unpi::{Unpi, UnpiConfig};

fn linked_pair(width: LengthWidth) -> (Unpi<UnixStream>, Unpi<UnixStream>) {
    let (host, device) = UnixStream::pair().expect("socket pair should open");
    let host = Unpi::new(width, host).expect("host link should start");
    let device = Unpi::new(width, device).expect("device link should start");
    (host, device)
}

#[test]
fn sys_ping_roundtrip_both_widths() {
    for width in [LengthWidth::One, LengthWidth::Two] {
        let (mut host, mut device) = linked_pair(width);

        let ping = Frame::without_payload(CommandType::Sreq, Subsystem::Sys, 0x01);
        host.write_frame(&ping).expect("ping should send");

        let received = device.read_frame().expect("device should read ping");
        assert_eq!(received, ping);

        let pong = Frame::new(CommandType::Srsp, Subsystem::Sys, 0x01, vec![0x79, 0x01]);
        device.write_frame(&pong).expect("pong should send");
        assert_eq!(host.read_frame().expect("host should read pong"), pong);
    }
}

#[test]
fn large_payload_with_two_byte_length() {
    let (mut host, mut device) = linked_pair(LengthWidth::Two);
    let payload: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
    let frame = Frame::new(CommandType::Areq, Subsystem::Af, 0x81, payload);

    let writer = thread::spawn(move || {
        host.write_frame(&frame).expect("large frame should send");
        (host, frame)
    });

    let received = device.read_frame().expect("large frame should arrive");
    let (_host, frame) = writer.join().expect("writer thread should finish");
    assert_eq!(received, frame);
}

#[test]
fn caller_recovers_after_garbage() {
    let (mut raw, device) = UnixStream::pair().expect("socket pair should open");
    let mut device = Unpi::new(LengthWidth::One, device).expect("device link should start");

    let good = Frame::new(CommandType::Sreq, Subsystem::Sapi, 0, vec![0, 1, 2]);
    let mut corrupted = render_frame(&good, LengthWidth::One).to_vec();
    let last = corrupted.len() - 1;
    corrupted[last] ^= 0x01;

    raw.write_all(&[0x00]).unwrap();
    raw.write_all(&corrupted).unwrap();
    raw.write_all(&render_frame(&good, LengthWidth::One)).unwrap();

    assert!(matches!(
        device.read_frame(),
        Err(FrameError::InvalidStartOfFrame { found: 0x00 })
    ));
    assert!(matches!(
        device.read_frame(),
        Err(FrameError::ChecksumMismatch { .. })
    ));
    assert_eq!(device.read_frame().expect("next frame should decode"), good);
}

#[test]
fn many_frames_stay_in_order() {
    let (mut host, mut device) = linked_pair(LengthWidth::One);

    let writer = thread::spawn(move || {
        for i in 0..200u16 {
            let frame = Frame::new(
                CommandType::Areq,
                Subsystem::from_bits(i as u8),
                (i % 256) as u8,
                format!("msg-{i}").into_bytes(),
            );
            host.write_frame(&frame).expect("frame should send");
        }
        host
    });

    for i in 0..200u16 {
        let frame = device.read_frame().expect("frame should arrive");
        assert_eq!(frame.command, (i % 256) as u8);
        assert_eq!(frame.subsystem, Subsystem::from_bits(i as u8));
        assert_eq!(frame.payload.as_ref(), format!("msg-{i}").as_bytes());
    }

    let _host = writer.join().expect("writer thread should finish");
}

#[test]
fn written_bytes_match_known_vector_on_the_wire() {
    let (host, mut raw) = UnixStream::pair().expect("socket pair should open");
    let mut host = Unpi::new(LengthWidth::Two, host).expect("host link should start");

    host.write_frame(&Frame::new(
        CommandType::Sreq,
        Subsystem::Sapi,
        0,
        vec![0x00, 0x01, 0x02],
    ))
    .expect("frame should send");

    let mut wire = [0u8; 9];
    raw.read_exact(&mut wire).unwrap();
    assert_eq!(wire, [0xFE, 0x00, 0x03, 0x26, 0x00, 0x00, 0x01, 0x02, 0x26]);
}

#[test]
fn read_timeout_then_late_frame() {
    let (mut raw, device) = UnixStream::pair().expect("socket pair should open");
    let mut config = UnpiConfig::with_width(LengthWidth::One);
    config.frame.read_timeout = Some(Duration::from_millis(50));
    let mut device = Unpi::with_config(device, config).expect("device link should start");

    assert!(matches!(device.read_frame(), Err(FrameError::Timeout(_))));

    raw.write_all(&[0xFE, 0x00, 0x66, 0x00, 0x66]).unwrap();
    let frame = device.read_frame().expect("late frame should still decode");
    assert_eq!(frame.command_type, CommandType::Srsp);
}

#[test]
fn peer_closing_mid_frame_keeps_reader_waiting() {
    let (mut raw, device) = UnixStream::pair().expect("socket pair should open");
    let mut config = UnpiConfig::with_width(LengthWidth::One);
    config.frame.read_timeout = Some(Duration::from_millis(100));
    let mut device = Unpi::with_config(device, config).expect("device link should start");

    raw.write_all(&[0xFE, 0x03]).unwrap();
    drop(raw);

    // A closed stream reads as zero bytes, which the source treats as "not yet".
    assert!(matches!(device.read_frame(), Err(FrameError::Timeout(_))));
}
