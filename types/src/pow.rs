//! Proof-of-work difficulty counting.

/// Count the number of leading zero bits in a hex-encoded identifier.
///
/// This is the difficulty measure used by the PoW guards: the more leading
/// zero bits an event id (or pubkey) has, the more work went into mining it.
/// Returns 0 for input that is not valid hex.
pub fn pow_difficulty(hex_str: &str) -> u32 {
    let bytes = match hex::decode(hex_str) {
        Ok(bytes) => bytes,
        Err(_) => return 0,
    };

    let mut total = 0;
    for byte in bytes {
        total += byte.leading_zeros();
        if byte != 0 {
            break;
        }
    }
    total
}
