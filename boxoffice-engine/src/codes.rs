//! Hold identifiers and reversible confirmation codes.
//!
//! A hold id is folded out of a SHA-1 digest over the customer email, a
//! secret salt and the creation time in milliseconds, so one cannot be
//! forged from the email and time alone. The confirmation code is a two-way
//! mapping from the id (XOR with a fixed mask plus a one-byte checksum), so
//! an agent can recover the originating hold from the code with no extra
//! bookkeeping.

use sha1::{Digest, Sha1};

const CODE_MASK: u32 = 0xCAFE_BABE;

/// Folds a SHA-1 digest of (email, salt, millis) into a 32-bit id.
///
/// Each 4-byte digest group collapses into one word by OR-ing the
/// sign-extended bytes, then mixes into the id through a 4-bit shift and
/// XOR. The arithmetic (sign extension, wrapping shift) is part of the code
/// format: the published confirmation fixtures are computed against exactly
/// this fold.
pub fn derive_hold_id(email: &str, salt: &str, millis: i64) -> i32 {
    let digest = Sha1::digest(format!("{email}{salt}{millis}").as_bytes());
    let mut id: i32 = 0;
    for group in digest.chunks_exact(4) {
        let mut folded: i32 = 0;
        for &byte in group {
            folded |= i32::from(byte as i8);
        }
        id = id.wrapping_shl(4) ^ folded;
    }
    id
}

fn checksum(code: u32) -> u8 {
    ((code & 0xff) ^ ((code >> 4) & 0xff) ^ ((code >> 16) & 0xff) ^ ((code >> 24) & 0xff)) as u8
}

/// Renders the confirmation code for a hold id, e.g. `CAEE4FB1-6E`.
pub fn encode_confirmation(hold_id: i32) -> String {
    let code = (hold_id as u32) ^ CODE_MASK;
    format!("{:08X}-{:02X}", code, checksum(code))
}

/// Recovers the hold id from a confirmation code; `None` when the shape or
/// the checksum does not match.
pub fn decode_confirmation(code: &str) -> Option<i32> {
    let (value, check) = code.split_once('-')?;
    if value.len() != 8 || check.len() != 2 {
        return None;
    }
    let value = u32::from_str_radix(value, 16).ok()?;
    let check = u8::from_str_radix(check, 16).ok()?;
    if checksum(value) != check {
        return None;
    }
    Some((value ^ CODE_MASK) as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_confirmation_code() {
        // the id handed to customer two at millisecond 1 with the test salt
        let id = derive_hold_id("customer@two.org", "SALT", 1);
        assert_eq!(0x0010_F50F, id);
        assert_eq!("CAEE4FB1-6E", encode_confirmation(id));
    }

    #[test]
    fn test_fold_is_sensitive_to_every_input() {
        let base = derive_hold_id("a@b.c", "SALT", 42);
        assert_ne!(base, derive_hold_id("a@b.d", "SALT", 42));
        assert_ne!(base, derive_hold_id("a@b.c", "PEPPER", 42));
        assert_ne!(base, derive_hold_id("a@b.c", "SALT", 43));
    }

    #[test]
    fn test_encode_decode_round_trip() {
        for id in [0, 1, -1, i32::MIN, i32::MAX, 0x0010_F50F, -123_456_789] {
            let code = encode_confirmation(id);
            assert_eq!(Some(id), decode_confirmation(&code), "code {code}");
        }
    }

    #[test]
    fn test_decode_rejects_malformed_codes() {
        assert_eq!(None, decode_confirmation(""));
        assert_eq!(None, decode_confirmation("CAEE4FB1"));
        assert_eq!(None, decode_confirmation("CAEE4FB1-6F")); // bad checksum
        assert_eq!(None, decode_confirmation("XYEE4FB1-6E"));
        assert_eq!(None, decode_confirmation("CAEE4FB16-E"));
    }
}
