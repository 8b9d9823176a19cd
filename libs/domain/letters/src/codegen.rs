use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const RANDOM_SUFFIX_LEN: usize = 4;

static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generates a barcode candidate: a base-36 monotonic counter padded to 8
/// characters, followed by 4 random alphanumeric characters (spec §4.6
/// "Codes are monotonic + random"). Collisions are handled by the caller
/// retrying with a fresh candidate.
pub fn generate_candidate() -> String {
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);
    let monotonic = to_base36(counter, 8);
    let mut rng = rand::thread_rng();
    let suffix: String = (0..RANDOM_SUFFIX_LEN).map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char).collect();
    format!("{monotonic}{suffix}")
}

fn to_base36(mut value: u64, width: usize) -> String {
    let mut digits = Vec::with_capacity(width);
    if value == 0 {
        digits.push(b'0');
    }
    while value > 0 {
        digits.push(ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    while digits.len() < width {
        digits.push(b'0');
    }
    digits.reverse();
    String::from_utf8(digits).expect("base36 alphabet is ASCII")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn candidates_have_fixed_length_and_charset() {
        let code = generate_candidate();
        assert_eq!(code.len(), 12);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn successive_candidates_differ() {
        let mut seen = HashSet::new();
        for _ in 0..50 {
            seen.insert(generate_candidate());
        }
        assert_eq!(seen.len(), 50);
    }
}
