use zedmd_protocol::{Command, ZedmdError, command::HEADER, compress::deflate};

/// Encodes a frame onto the wire: `[HEADER][command]` for a zero-payload
/// frame, or `[HEADER][command][len_hi][len_lo][deflate(payload)]` for one
/// carrying data.
pub fn encode(command: Command, payload: &[u8]) -> Result<Vec<u8>, ZedmdError> {
    if payload.is_empty() {
        let mut out = Vec::with_capacity(HEADER.len() + 1);
        out.extend_from_slice(&HEADER);
        out.push(command as u8);
        return Ok(out);
    }

    let compressed = deflate(payload)?;
    let len = u16::try_from(compressed.len())
        .map_err(|_| ZedmdError::CompressionError("compressed payload too large".into()))?;

    let mut out = Vec::with_capacity(HEADER.len() + 3 + compressed.len());
    out.extend_from_slice(&HEADER);
    out.push(command as u8);
    out.push((len >> 8) as u8);
    out.push((len & 0xff) as u8);
    out.extend_from_slice(&compressed);

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_payload_is_header_plus_command() {
        let wire = encode(Command::ClearScreen, &[]).unwrap();
        assert_eq!(wire.len(), HEADER.len() + 1);
        assert_eq!(wire[HEADER.len()], Command::ClearScreen as u8);
    }

    #[test]
    fn payload_is_compressed_and_length_prefixed() {
        let payload = vec![0xab; 256];
        let wire = encode(Command::Rgb24, &payload).unwrap();
        assert_eq!(&wire[..HEADER.len()], &HEADER);
        assert_eq!(wire[HEADER.len()], Command::Rgb24 as u8);
        let len = (u16::from(wire[HEADER.len() + 1]) << 8) | u16::from(wire[HEADER.len() + 2]);
        assert_eq!(len as usize, wire.len() - HEADER.len() - 3);
    }
}
