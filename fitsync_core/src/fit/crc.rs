/// Nibble lookup table for the FIT CRC (CRC-16 with the reflected 0x8005
/// polynomial, i.e. 0xA001), as given in the FIT SDK.
const CRC_TABLE: [u16; 16] = [
    0x0000, 0xCC01, 0xD801, 0x1400, 0xF001, 0x3C00, 0x2800, 0xE401, 0xA001, 0x6C00, 0x7800, 0xB401,
    0x5000, 0x9C01, 0x8801, 0x4400,
];

/// Feeds one byte into a running CRC, low nibble first.
pub fn fit_crc_byte(mut crc: u16, byte: u8) -> u16 {
    let mut tmp = CRC_TABLE[(crc & 0xF) as usize];
    crc = (crc >> 4) & 0x0FFF;
    crc ^= tmp ^ CRC_TABLE[(byte & 0xF) as usize];

    tmp = CRC_TABLE[(crc & 0xF) as usize];
    crc = (crc >> 4) & 0x0FFF;
    crc ^= tmp ^ CRC_TABLE[((byte >> 4) & 0xF) as usize];

    crc
}

pub fn fit_crc_update(crc: u16, data: &[u8]) -> u16 {
    data.iter().fold(crc, |crc, &byte| fit_crc_byte(crc, byte))
}

/// The CRC of `data`, starting from 0.
pub fn fit_crc(data: &[u8]) -> u16 {
    fit_crc_update(0, data)
}

/// Checks a complete file whose last two bytes are the little-endian CRC
/// of everything before them. Running the CRC over the whole file,
/// trailer included, leaves zero if and only if they match.
pub fn fit_crc_is_valid(file: &[u8]) -> bool {
    file.len() >= 2 && fit_crc(file) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn standard_check_value() {
        // The CRC-16/ARC check value.
        assert_eq!(fit_crc(b"123456789"), 0xBB3D);
    }

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(fit_crc(&[]), 0);
        assert!(!fit_crc_is_valid(&[]));
    }

    #[test]
    fn update_is_incremental() {
        let data = b"some FIT bytes";
        let (a, b) = data.split_at(5);
        assert_eq!(fit_crc_update(fit_crc(a), b), fit_crc(data));
    }

    #[test]
    fn appended_crc_validates_and_tampering_does_not() {
        let mut file = b"\x0c\x10\x98\x00\x00\x00\x00\x00.FIT".to_vec();
        let crc = fit_crc(&file);
        file.extend_from_slice(&crc.to_le_bytes());
        assert!(fit_crc_is_valid(&file));

        for i in 0..file.len() {
            let mut tampered = file.clone();
            tampered[i] ^= 0x01;
            assert!(!fit_crc_is_valid(&tampered), "flip at byte {i}");
        }
    }
}
