//! AVR serial programming instructions
//!
//! Every instruction is four bytes long. The target echoes each byte one
//! byte late, so the third byte returned during Programming Enable is
//! the second byte sent.

/// Programming Enable: `AC 53 00 00`
pub const PROGRAMMING_ENABLE: [u8; 4] = [0xAC, 0x53, 0x00, 0x00];

/// Byte the target echoes in position 2 once programming is enabled
pub const ENABLE_ECHO: u8 = 0x53;

/// Read Program Memory
pub const READ_FLASH: u8 = 0x20;

/// Opcode bit carrying address bit 12
pub const READ_FLASH_ADDR_HIGH: u8 = 0x08;

/// Read Signature Byte: `30 00 idx 00`
pub const READ_SIGNATURE: u8 = 0x30;

/// Number of signature bytes
pub const SIGNATURE_LEN: usize = 3;

/// Build the Read Program Memory instruction for a 13-bit address.
///
/// Address bit 12 rides in the opcode, bits 11..8 and 7..0 follow.
pub const fn read_flash(addr: u32) -> [u8; 4] {
    let opcode = READ_FLASH | (((addr >> 12) & 1) as u8) << 3;
    [opcode, ((addr >> 8) & 0x0F) as u8, addr as u8, 0x00]
}

/// Address carried by a Read Program Memory instruction
pub const fn flash_address(command: &[u8; 4]) -> u32 {
    ((command[0] & READ_FLASH_ADDR_HIGH) as u32) << 9
        | ((command[1] & 0x0F) as u32) << 8
        | command[2] as u32
}

/// Build the Read Signature Byte instruction
pub const fn read_signature(index: u8) -> [u8; 4] {
    [READ_SIGNATURE, 0x00, index, 0x00]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_flash_address_layout() {
        assert_eq!(read_flash(0), [0x20, 0x00, 0x00, 0x00]);
        assert_eq!(read_flash(1), [0x20, 0x00, 0x01, 0x00]);
        assert_eq!(read_flash(0x1000), [0x28, 0x00, 0x00, 0x00]);
        assert_eq!(read_flash(0x0FFF), [0x20, 0x0F, 0xFF, 0x00]);
        assert_eq!(read_flash(0x1FFF), [0x28, 0x0F, 0xFF, 0x00]);
        assert_eq!(read_flash(0x0202), [0x20, 0x02, 0x02, 0x00]);
    }

    #[test]
    fn test_flash_address_inverts_read_flash() {
        for addr in [0, 1, 0x00FF, 0x0100, 0x0FFF, 0x1000, 0x1234, 0x1FFF] {
            assert_eq!(flash_address(&read_flash(addr)), addr);
        }
    }

    #[test]
    fn test_read_signature() {
        assert_eq!(read_signature(2), [0x30, 0x00, 0x02, 0x00]);
    }
}
