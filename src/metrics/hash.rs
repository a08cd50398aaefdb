//! 32-bit FNV-1a, used as the sync value binding metadata to values.

const OFFSET_BASIS: u32 = 0x811c_9dc5;
const PRIME: u32 = 0x0100_0193;

/// Hash `data` with 32-bit FNV-1a
pub fn fnv1a32(data: &[u8]) -> u32 {
    data.iter().fold(OFFSET_BASIS, |hash, &byte| {
        (hash ^ u32::from(byte)).wrapping_mul(PRIME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        assert_eq!(fnv1a32(b""), 0x811c_9dc5);
        assert_eq!(fnv1a32(b"a"), 0xe40c_292c);
        assert_eq!(fnv1a32(b"foobar"), 0xbf9c_f968);
    }

    #[test]
    fn test_single_byte_change_changes_hash() {
        assert_ne!(fnv1a32(b"counter_a"), fnv1a32(b"counter_b"));
    }
}
