//! Sample type and byte-order helpers for byte-stream drivers.

/// One channel of one frame: signed 16-bit PCM.
pub type Sample = i16;

/// Byte order of 16-bit samples in a raw driver buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    /// Most significant byte first. What the playback device is negotiated for.
    #[default]
    BigEndian,
    LittleEndian,
}

impl ByteOrder {
    /// Encode one sample into two bytes in this order.
    #[inline]
    pub fn encode(self, sample: Sample) -> [u8; 2] {
        match self {
            ByteOrder::BigEndian => sample.to_be_bytes(),
            ByteOrder::LittleEndian => sample.to_le_bytes(),
        }
    }

    /// Decode two bytes in this order back into a sample.
    #[inline]
    pub fn decode(self, bytes: [u8; 2]) -> Sample {
        match self {
            ByteOrder::BigEndian => Sample::from_be_bytes(bytes),
            ByteOrder::LittleEndian => Sample::from_le_bytes(bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn big_endian_puts_high_byte_first() {
        assert_eq!(ByteOrder::BigEndian.encode(0x1234), [0x12, 0x34]);
        assert_eq!(ByteOrder::LittleEndian.encode(0x1234), [0x34, 0x12]);
    }

    #[test]
    fn negative_samples_keep_their_sign() {
        let bytes = ByteOrder::BigEndian.encode(-2);
        assert_eq!(bytes, [0xFF, 0xFE]);
        assert_eq!(ByteOrder::BigEndian.decode(bytes), -2);
    }
}
