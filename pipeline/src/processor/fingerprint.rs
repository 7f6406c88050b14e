use chrono::Utc;
use rand::Rng;

/// Upper bound (inclusive) of the random salt mixed into every id.
pub const MAX_SALT: u64 = 9999;

/// Derives a transaction id from the tuple text, the stage entry time and a salt.
///
/// Each character is weighted by its byte offset in the UTF-8 text.
/// Not a content hash: the same tuple submitted twice normally gets two ids.
pub fn transaction_id(tuple: &str, timestamp_nanos: u64, salt: u64) -> u64 {
    let weighted = tuple
        .char_indices()
        .fold(0u64, |acc, (offset, c)| {
            acc.wrapping_add((c as u64).wrapping_mul(offset as u64))
        });

    timestamp_nanos.wrapping_add(salt).wrapping_add(weighted)
}

/// [`transaction_id`] salted with the current clock and a random draw.
pub fn generate(tuple: &str) -> u64 {
    let now = Utc::now().timestamp_nanos_opt().unwrap_or_default().max(0) as u64;
    let salt = rand::rng().random_range(0..=MAX_SALT);
    transaction_id(tuple, now, salt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_char_sum() {
        // 'a' * 0 + 'b' * 1 + 'c' * 2 = 98 + 198
        assert_eq!(transaction_id("abc", 0, 0), 296);
        assert_eq!(transaction_id("abc", 1_000, 7), 1_303);
    }

    #[test]
    fn test_weights_by_byte_offset() {
        // 'é' takes two bytes, so 'a' sits at offset 2: 233 * 0 + 97 * 2
        assert_eq!(transaction_id("éa", 0, 0), 194);
    }

    #[test]
    fn test_deterministic_for_same_inputs() {
        let tuple = "1,1,2019-05-13 10:00:00";
        assert_eq!(
            transaction_id(tuple, 1_557_741_600, 42),
            transaction_id(tuple, 1_557_741_600, 42)
        );
    }

    #[test]
    fn test_wraps_instead_of_overflowing() {
        assert_eq!(transaction_id("", u64::MAX, 2), 1);
    }

    #[test]
    fn test_generate_stays_within_salt_window() {
        let before = Utc::now().timestamp_nanos_opt().unwrap() as u64;
        let id = generate("ab");
        let after = Utc::now().timestamp_nanos_opt().unwrap() as u64;

        // "ab" weighs 'b' * 1 = 98
        assert!(id >= before + 98);
        assert!(id <= after + 98 + MAX_SALT);
    }
}
