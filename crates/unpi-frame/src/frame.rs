//! Frame model and the command type / subsystem tables.
//!
//! Header byte 0 packs the command type into bits 7-5 and the subsystem into
//! bits 4-0. Header byte 1 is the command identifier, whose meaning depends
//! on the (command type, subsystem) pair and is opaque at this layer.

use std::fmt;
use std::hash::{Hash, Hasher};

use bytes::Bytes;

use crate::codec::LengthWidth;
use crate::error::{FrameError, Result};

/// Bits of header byte 0 holding the command type.
pub const COMMAND_TYPE_MASK: u8 = 0xE0;
/// Bits of header byte 0 holding the subsystem.
pub const SUBSYSTEM_MASK: u8 = 0x1F;

/// Message category, 3 bits on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandType {
    /// Poll the co-processor for queued asynchronous data.
    Poll,
    /// Synchronous request; the peer answers with an `Srsp`.
    Sreq,
    /// Asynchronous request or indication.
    Areq,
    /// Synchronous response.
    Srsp,
    Res0,
    Res1,
    Res2,
    Res3,
}

impl CommandType {
    /// All command types, in wire order.
    pub const ALL: [CommandType; 8] = [
        CommandType::Poll,
        CommandType::Sreq,
        CommandType::Areq,
        CommandType::Srsp,
        CommandType::Res0,
        CommandType::Res1,
        CommandType::Res2,
        CommandType::Res3,
    ];

    /// Decode from the low 3 bits of `raw`; higher bits are ignored.
    pub fn from_bits(raw: u8) -> Self {
        Self::ALL[usize::from(raw & 0x07)]
    }

    /// The 3-bit wire value.
    pub fn to_bits(self) -> u8 {
        self as u8
    }

    /// Canonical upper-case name, e.g. `"SREQ"`.
    pub fn name(self) -> &'static str {
        match self {
            CommandType::Poll => "POLL",
            CommandType::Sreq => "SREQ",
            CommandType::Areq => "AREQ",
            CommandType::Srsp => "SRSP",
            CommandType::Res0 => "RES0",
            CommandType::Res1 => "RES1",
            CommandType::Res2 => "RES2",
            CommandType::Res3 => "RES3",
        }
    }

    /// Look up a command type by name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.name().eq_ignore_ascii_case(name))
    }
}

impl TryFrom<u8> for CommandType {
    type Error = FrameError;

    fn try_from(raw: u8) -> Result<Self> {
        if raw > 0x07 {
            return Err(FrameError::CommandTypeOutOfRange(raw));
        }
        Ok(Self::from_bits(raw))
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Functional module on the co-processor, 5 bits on the wire.
///
/// Values without a table entry decode to [`Subsystem::Unknown`] carrying
/// the raw bits. Equality and hashing go by the wire value, so
/// `Unknown(6)` equals `Sapi` and `Unknown(0x26)` equals `Sapi` too.
#[derive(Debug, Clone, Copy)]
pub enum Subsystem {
    Res0,
    Sys,
    Mac,
    Nwk,
    Af,
    Zdo,
    Sapi,
    Util,
    Dbg,
    App,
    Ota,
    Znp,
    Spare12,
    Ubl,
    Res14,
    AppCnf,
    Res16,
    Protobuf,
    /// RPC_SYS_PB_NWK_MGR
    Res18,
    /// RPC_SYS_PB_GW
    Res19,
    /// RPC_SYS_PB_OTA_MGR
    Res20,
    Gp,
    Unknown(u8),
}

impl Subsystem {
    /// Every subsystem with a table entry, in wire order.
    pub const KNOWN: [Subsystem; 22] = [
        Subsystem::Res0,
        Subsystem::Sys,
        Subsystem::Mac,
        Subsystem::Nwk,
        Subsystem::Af,
        Subsystem::Zdo,
        Subsystem::Sapi,
        Subsystem::Util,
        Subsystem::Dbg,
        Subsystem::App,
        Subsystem::Ota,
        Subsystem::Znp,
        Subsystem::Spare12,
        Subsystem::Ubl,
        Subsystem::Res14,
        Subsystem::AppCnf,
        Subsystem::Res16,
        Subsystem::Protobuf,
        Subsystem::Res18,
        Subsystem::Res19,
        Subsystem::Res20,
        Subsystem::Gp,
    ];

    /// Decode from the low 5 bits of `raw`; higher bits are ignored.
    pub fn from_bits(raw: u8) -> Self {
        let bits = raw & SUBSYSTEM_MASK;
        Self::KNOWN
            .get(usize::from(bits))
            .copied()
            .unwrap_or(Subsystem::Unknown(bits))
    }

    /// The 5-bit wire value. An out-of-range `Unknown` is masked.
    pub fn to_bits(self) -> u8 {
        let raw = match self {
            Subsystem::Res0 => 0,
            Subsystem::Sys => 1,
            Subsystem::Mac => 2,
            Subsystem::Nwk => 3,
            Subsystem::Af => 4,
            Subsystem::Zdo => 5,
            Subsystem::Sapi => 6,
            Subsystem::Util => 7,
            Subsystem::Dbg => 8,
            Subsystem::App => 9,
            Subsystem::Ota => 10,
            Subsystem::Znp => 11,
            Subsystem::Spare12 => 12,
            Subsystem::Ubl => 13,
            Subsystem::Res14 => 14,
            Subsystem::AppCnf => 15,
            Subsystem::Res16 => 16,
            Subsystem::Protobuf => 17,
            Subsystem::Res18 => 18,
            Subsystem::Res19 => 19,
            Subsystem::Res20 => 20,
            Subsystem::Gp => 21,
            Subsystem::Unknown(raw) => raw,
        };
        raw & SUBSYSTEM_MASK
    }

    /// The variant [`Subsystem::from_bits`] yields for this wire value.
    pub fn canonical(self) -> Self {
        Self::from_bits(self.to_bits())
    }

    /// Canonical upper-case name, e.g. `"SAPI"`. Ids without a table entry
    /// yield `"UNKNOWN"`.
    pub fn name(self) -> &'static str {
        match self.canonical() {
            Subsystem::Res0 => "RES0",
            Subsystem::Sys => "SYS",
            Subsystem::Mac => "MAC",
            Subsystem::Nwk => "NWK",
            Subsystem::Af => "AF",
            Subsystem::Zdo => "ZDO",
            Subsystem::Sapi => "SAPI",
            Subsystem::Util => "UTIL",
            Subsystem::Dbg => "DBG",
            Subsystem::App => "APP",
            Subsystem::Ota => "OTA",
            Subsystem::Znp => "ZNP",
            Subsystem::Spare12 => "SPARE_12",
            Subsystem::Ubl => "UBL",
            Subsystem::Res14 => "RES14",
            Subsystem::AppCnf => "APP_CNF",
            Subsystem::Res16 => "RES16",
            Subsystem::Protobuf => "PROTOBUF",
            Subsystem::Res18 => "RES18",
            Subsystem::Res19 => "RES19",
            Subsystem::Res20 => "RES20",
            Subsystem::Gp => "GP",
            Subsystem::Unknown(_) => "UNKNOWN",
        }
    }

    /// Look up a known subsystem by name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::KNOWN
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(name))
    }
}

impl TryFrom<u8> for Subsystem {
    type Error = FrameError;

    fn try_from(raw: u8) -> Result<Self> {
        if raw > SUBSYSTEM_MASK {
            return Err(FrameError::SubsystemOutOfRange(raw));
        }
        Ok(Self::from_bits(raw))
    }
}

impl PartialEq for Subsystem {
    fn eq(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

impl Eq for Subsystem {}

impl Hash for Subsystem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_bits().hash(state);
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.canonical() {
            Subsystem::Unknown(raw) => write!(f, "UNKNOWN({raw:#04x})"),
            known => f.write_str(known.name()),
        }
    }
}

/// One UNPI message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command_type: CommandType,
    pub subsystem: Subsystem,
    /// Command identifier, opaque at this layer.
    pub command: u8,
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(
        command_type: CommandType,
        subsystem: Subsystem,
        command: u8,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            command_type,
            subsystem,
            command,
            payload: payload.into(),
        }
    }

    /// Create a frame with no payload.
    ///
    /// Equal to (and wire-identical with) a frame built with an empty payload.
    pub fn without_payload(command_type: CommandType, subsystem: Subsystem, command: u8) -> Self {
        Self::new(command_type, subsystem, command, Bytes::new())
    }

    /// The two header bytes as they appear on the wire.
    pub fn header(&self) -> [u8; 2] {
        let cmd0 = ((self.command_type.to_bits() << 5) & COMMAND_TYPE_MASK)
            | (self.subsystem.to_bits() & SUBSYSTEM_MASK);
        [cmd0, self.command]
    }

    /// Rebuild a frame from its wire header and payload.
    pub fn from_header(header: [u8; 2], payload: Bytes) -> Self {
        let [cmd0, cmd1] = header;
        Self {
            command_type: CommandType::from_bits((cmd0 & COMMAND_TYPE_MASK) >> 5),
            subsystem: Subsystem::from_bits(cmd0 & SUBSYSTEM_MASK),
            command: cmd1,
            payload,
        }
    }

    /// The total wire size of this frame for the given length field width.
    pub fn wire_size(&self, width: LengthWidth) -> usize {
        1 + width.size() + 2 + self.payload.len() + 1
    }
}
