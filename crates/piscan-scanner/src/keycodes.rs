// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Scancode to character table for keyboard-emulating barcode scanners.
//!
//! Only the keys a scanner types are mapped: the digit row, the hyphen and the
//! three lowercase letter rows of a US layout.

/// Key code of Enter, which a scanner sends after the last character.
pub const KEY_ENTER: u16 = 28;

/// Reserved key code that never carries a character.
pub const KEY_RESERVED: u16 = 0;

/// Character returned for codes missing from the table.
pub const UNKNOWN_KEY: char = '-';

/// Map a key code to the character it types.
///
/// Lookups use the low byte of the code. Codes outside the table yield
/// [`UNKNOWN_KEY`] so an unfamiliar key degrades one character of the barcode
/// instead of aborting the scan.
pub fn lookup(code: u16) -> char {
    match code as u8 {
        0x02 => '1',
        0x03 => '2',
        0x04 => '3',
        0x05 => '4',
        0x06 => '5',
        0x07 => '6',
        0x08 => '7',
        0x09 => '8',
        0x0a => '9',
        0x0b => '0',
        0x0c => '-',
        0x10 => 'q',
        0x11 => 'w',
        0x12 => 'e',
        0x13 => 'r',
        0x14 => 't',
        0x15 => 'y',
        0x16 => 'u',
        0x17 => 'i',
        0x18 => 'o',
        0x19 => 'p',
        0x1e => 'a',
        0x1f => 's',
        0x20 => 'd',
        0x21 => 'f',
        0x22 => 'g',
        0x23 => 'h',
        0x24 => 'j',
        0x25 => 'k',
        0x26 => 'l',
        0x2c => 'z',
        0x2d => 'x',
        0x2e => 'c',
        0x2f => 'v',
        0x30 => 'b',
        0x31 => 'n',
        0x32 => 'm',
        _ => UNKNOWN_KEY,
    }
}

/// Inverse of [`lookup`] for the mapped characters.
///
/// Used to build synthetic event streams; `'-'` maps to the hyphen key.
pub fn code_for(ch: char) -> Option<u16> {
    let code = match ch {
        '1' => 0x02,
        '2' => 0x03,
        '3' => 0x04,
        '4' => 0x05,
        '5' => 0x06,
        '6' => 0x07,
        '7' => 0x08,
        '8' => 0x09,
        '9' => 0x0a,
        '0' => 0x0b,
        '-' => 0x0c,
        'q' => 0x10,
        'w' => 0x11,
        'e' => 0x12,
        'r' => 0x13,
        't' => 0x14,
        'y' => 0x15,
        'u' => 0x16,
        'i' => 0x17,
        'o' => 0x18,
        'p' => 0x19,
        'a' => 0x1e,
        's' => 0x1f,
        'd' => 0x20,
        'f' => 0x21,
        'g' => 0x22,
        'h' => 0x23,
        'j' => 0x24,
        'k' => 0x25,
        'l' => 0x26,
        'z' => 0x2c,
        'x' => 0x2d,
        'c' => 0x2e,
        'v' => 0x2f,
        'b' => 0x30,
        'n' => 0x31,
        'm' => 0x32,
        _ => return None,
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digit_row() {
        let digits: String = (0x02..=0x0b).map(lookup).collect();
        assert_eq!(digits, "1234567890");
    }

    #[test]
    fn test_letter_rows() {
        let top: String = (0x10..=0x19).map(lookup).collect();
        let home: String = (0x1e..=0x26).map(lookup).collect();
        let bottom: String = (0x2c..=0x32).map(lookup).collect();
        assert_eq!(top, "qwertyuiop");
        assert_eq!(home, "asdfghjkl");
        assert_eq!(bottom, "zxcvbnm");
    }

    #[test]
    fn test_unknown_code_yields_sentinel() {
        assert_eq!(lookup(0x3b), UNKNOWN_KEY); // F1
        assert_eq!(lookup(0x01), UNKNOWN_KEY); // Esc
        assert_eq!(lookup(KEY_ENTER), UNKNOWN_KEY);
    }

    #[test]
    fn test_lookup_uses_low_byte() {
        assert_eq!(lookup(0x0102), '1');
    }

    #[test]
    fn test_code_for_inverts_lookup() {
        for ch in "0123456789-abcdefghijklmnopqrstuvwxyz".chars() {
            let code = code_for(ch).unwrap();
            assert_eq!(lookup(code), ch);
        }
        assert_eq!(code_for('A'), None);
        assert_eq!(code_for('\n'), None);
    }
}
