use crate::consts::CID_LENGTH;
use crate::types::DeserializationError;

/// The component identifier a sender stamps into every packet.
/// It stays the same for the lifetime of the sending device, so receivers
/// use it to tell concurrent senders on the same universe apart.
/// Ties in the merge are broken by comparing identifiers, which is why this
/// type is ordered.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct SourceCid([u8; CID_LENGTH]);

impl core::fmt::Display for SourceCid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for (index, byte) in self.0.iter().enumerate() {
            if matches!(index, 4 | 6 | 8 | 10) {
                write!(f, "-")?;
            }
            write!(f, "{:02x}", byte)?;
        }

        Ok(())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for SourceCid {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{=[u8]:02x}", self.0.as_slice());
    }
}

impl SourceCid {
    pub const fn new(bytes: [u8; CID_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn from_bytes(buffer: &[u8; CID_LENGTH]) -> Self {
        Self(*buffer)
    }

    /// Parses a hex identifier. Hyphens may be used for grouping like in
    /// the common 8-4-4-4-12 uuid notation.
    pub fn try_parse(text: &str) -> Result<Self, DeserializationError> {
        let mut bytes = [0u8; CID_LENGTH];
        let mut nibble_count = 0;

        for character in text.chars() {
            if character == '-' {
                continue;
            }

            let nibble = character.to_digit(16).ok_or(DeserializationError)? as u8;
            if nibble_count >= CID_LENGTH * 2 {
                return Err(DeserializationError);
            }

            bytes[nibble_count / 2] = (bytes[nibble_count / 2] << 4) | nibble;
            nibble_count += 1;
        }

        if nibble_count != CID_LENGTH * 2 {
            return Err(DeserializationError);
        }

        Ok(Self(bytes))
    }

    pub fn to_bytes(&self) -> [u8; CID_LENGTH] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; CID_LENGTH] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_uuid_notation() {
        let cid = SourceCid::new([
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB, 0xCC, 0xDD,
            0xEE, 0xFF,
        ]);

        assert_eq!(
            format!("{}", cid),
            "00112233-4455-6677-8899-aabbccddeeff"
        );
    }

    #[test]
    fn test_try_parse_success() {
        let parsed = SourceCid::try_parse("00112233-4455-6677-8899-aabbccddeeff").unwrap();
        let plain = SourceCid::try_parse("00112233445566778899AABBCCDDEEFF").unwrap();

        assert_eq!(parsed, plain);
        assert_eq!(parsed.to_bytes()[0], 0x00);
        assert_eq!(parsed.to_bytes()[15], 0xFF);
    }

    #[test]
    fn test_try_parse_failure() {
        SourceCid::try_parse("00112233-4455").unwrap_err();
        SourceCid::try_parse("00112233-4455-6677-8899-aabbccddeeff00").unwrap_err();
        SourceCid::try_parse("0011223g-4455-6677-8899-aabbccddeeff").unwrap_err();
    }

    #[test]
    fn test_ordering_is_byte_order() {
        let smaller = SourceCid::new([0x01; 16]);
        let bigger = SourceCid::new([0x02; 16]);

        assert!(smaller < bigger);
    }
}
