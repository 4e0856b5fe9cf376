/// Size of every frame on the wire, regardless of command.
///
/// Layout: `cmd:u8`, six little-endian `u16` words, `flag:u8`, `reserved:u8`, `tail:u8`.
pub const FRAME_LEN: usize = 16;

/// Offset of the checksum byte. Assembled as the `reserved` field, then overwritten.
pub const CHECKSUM_OFFSET: usize = 14;

/// A complete, checksummed frame.
pub type Frame = [u8; FRAME_LEN];

/// Nominal contents of a frame before the checksum is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFields {
    pub cmd: u8,
    pub words: [u16; 6],
    pub flag: u8,
    pub reserved: u8,
    pub tail: u8,
}

/// Pack the fields into the fixed frame layout, without a checksum.
pub fn assemble(fields: &FrameFields) -> Frame {
    let mut frame = [0u8; FRAME_LEN];

    frame[0] = fields.cmd;
    for (i, word) in fields.words.iter().enumerate() {
        let offset = 1 + i * 2;
        frame[offset..offset + 2].copy_from_slice(&word.to_le_bytes());
    }
    frame[13] = fields.flag;
    frame[CHECKSUM_OFFSET] = fields.reserved;
    frame[15] = fields.tail;

    frame
}

/// XOR of bytes 1 through 13. The command byte and everything from the
/// checksum offset onwards are excluded.
pub fn checksum(frame: &Frame) -> u8 {
    frame[1..CHECKSUM_OFFSET].iter().fold(0u8, |acc, &byte| acc ^ byte)
}

/// Overwrite the checksum offset with the checksum of the assembled frame.
pub fn insert_checksum(mut frame: Frame) -> Frame {
    frame[CHECKSUM_OFFSET] = checksum(&frame);
    frame
}

/// Assemble the nominal frame, then stamp the checksum over it.
pub fn build_frame(fields: &FrameFields) -> Frame {
    insert_checksum(assemble(fields))
}

/// Lowercase hex dump, space separated
pub fn hex(frame: &[u8]) -> String {
    frame
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fields() -> FrameFields {
        FrameFields {
            cmd: 0x28,
            words: [0x1388, 0x0102, 0, 0, 0, 0x32],
            flag: 0x0F,
            reserved: 0,
            tail: 0x29,
        }
    }

    #[test]
    fn test_assemble_layout_is_little_endian() {
        let frame = assemble(&sample_fields());
        assert_eq!(frame.len(), FRAME_LEN);
        assert_eq!(frame[0], 0x28);
        assert_eq!(&frame[1..3], &[0x88, 0x13]);
        assert_eq!(&frame[3..5], &[0x02, 0x01]);
        assert_eq!(&frame[11..13], &[0x32, 0x00]);
        assert_eq!(frame[13], 0x0F);
        assert_eq!(frame[14], 0x00);
        assert_eq!(frame[15], 0x29);
    }

    #[test]
    fn test_checksum_covers_bytes_one_to_thirteen() {
        let mut frame = [0u8; FRAME_LEN];
        frame[0] = 0xFF; // excluded
        frame[1] = 0x0F;
        frame[13] = 0xF0;
        frame[14] = 0xAA; // excluded
        frame[15] = 0x55; // excluded
        assert_eq!(checksum(&frame), 0xFF);
    }

    #[test]
    fn test_insert_checksum_overwrites_placeholder() {
        let mut fields = sample_fields();
        fields.reserved = 0x77;
        let frame = build_frame(&fields);
        assert_eq!(frame[CHECKSUM_OFFSET], checksum(&frame));
        assert_ne!(frame[CHECKSUM_OFFSET], 0x77);
        // 0x88 ^ 0x13 ^ 0x02 ^ 0x01 ^ 0x32 ^ 0x0F
        assert_eq!(frame[CHECKSUM_OFFSET], 0xA5);
        assert_eq!(frame[15], 0x29);
    }

    #[test]
    fn test_checksum_independent_of_tail() {
        let mut a = sample_fields();
        let mut b = sample_fields();
        a.tail = 0x00;
        b.tail = 0xFB;
        assert_eq!(build_frame(&a)[CHECKSUM_OFFSET], build_frame(&b)[CHECKSUM_OFFSET]);
    }

    #[test]
    fn test_hex_dump() {
        assert_eq!(hex(&[0xFA, 0x23, 0x00]), "fa 23 00");
    }
}
