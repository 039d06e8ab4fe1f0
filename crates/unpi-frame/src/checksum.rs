/// Frame check sequence: XOR of every byte, starting from zero.
///
/// On the wire this covers everything after the start marker and before the
/// checksum byte itself.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |fcs, b| fcs ^ b)
}
