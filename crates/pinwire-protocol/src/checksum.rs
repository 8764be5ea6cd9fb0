//! Fletcher-16 checksum.
//!
//! Two running sums reduced modulo 255: `s1` accumulates bytes and `s2`
//! accumulates `s1`. The result packs them as `(s2 << 8) | s1`.
//!
//! The check catches every single-bit error and nearly all short bursts, but
//! it is not cryptographic. Because the sums are taken modulo 255, a byte of
//! `0x00` replaced by `0xFF` (or the reverse) leaves both sums unchanged and
//! goes undetected. That is a property of the algorithm, not of this code.

/// Compute the Fletcher-16 checksum of `bytes`.
pub fn compute(bytes: &[u8]) -> u16 {
    let mut s1: u16 = 0;
    let mut s2: u16 = 0;
    for &byte in bytes {
        s1 = (s1 + byte as u16) % 255;
        s2 = (s2 + s1) % 255;
    }
    (s2 << 8) | s1
}

/// Check that `bytes` hashes to `expected`.
pub fn verify(bytes: &[u8], expected: u16) -> bool {
    compute(bytes) == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        assert_eq!(compute(b""), 0x0000);
        assert_eq!(compute(b"abcde"), 0xC8F0);
        assert_eq!(compute(b"abcdef"), 0x2057);
        assert_eq!(compute(b"abcdefgh"), 0x0627);
    }

    #[test]
    fn test_pure_function() {
        let data: Vec<u8> = (0..=255u8).collect();
        let first = compute(&data);
        for _ in 0..3 {
            assert_eq!(compute(&data), first);
        }
        assert!(verify(&data, first));
        assert!(!verify(&data, first ^ 1));
    }

    #[test]
    fn test_order_sensitive() {
        // A plain sum would miss a swap; the second accumulator does not.
        assert_ne!(compute(&[0x01, 0x02]), compute(&[0x02, 0x01]));
    }

    #[test]
    fn test_every_single_bit_flip_detected() {
        let data = [0x03, 0x02, 13, 1, 0x00, 0xFF, 0x7F];
        let sum = compute(&data);
        for index in 0..data.len() {
            for bit in 0..8 {
                let mut flipped = data;
                flipped[index] ^= 1 << bit;
                assert!(
                    !verify(&flipped, sum),
                    "flip of bit {} in byte {} went undetected",
                    bit,
                    index
                );
            }
        }
    }

    #[test]
    fn test_zero_ff_substitution_blind_spot() {
        let data = [0x04, 0x01, 0x00];
        let mut substituted = data;
        substituted[2] = 0xFF;
        assert_eq!(compute(&data), compute(&substituted));
    }
}
