use chrono::{DateTime, Utc};
use rand::Rng;

const SUFFIX_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SUFFIX_LEN: usize = 4;

/// `INV-YYYYMMDD-XXXX`. Uniqueness is probabilistic (36^4 per day) and
/// collisions are not retried.
pub fn generate_invoice_number<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> String {
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();
    format!("INV-{}-{}", now.format("%Y%m%d"), suffix)
}

pub fn is_invoice_number(candidate: &str) -> bool {
    let mut parts = candidate.splitn(3, '-');
    let (Some("INV"), Some(date), Some(suffix)) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    date.len() == 8
        && date.bytes().all(|b| b.is_ascii_digit())
        && suffix.len() == SUFFIX_LEN
        && suffix.bytes().all(|b| SUFFIX_ALPHABET.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_invoice_number_format() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 23, 59, 0).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let number = generate_invoice_number(now, &mut rng);
            assert!(number.starts_with("INV-20240309-"), "{number}");
            assert_eq!(number.len(), "INV-20240309-XXXX".len());
            assert!(is_invoice_number(&number), "{number}");
        }
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let a = generate_invoice_number(now, &mut StdRng::seed_from_u64(42));
        let b = generate_invoice_number(now, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_malformed_numbers() {
        assert!(!is_invoice_number("INV-2024-ABCD"));
        assert!(!is_invoice_number("INV-20240101-abcd"));
        assert!(!is_invoice_number("BILL-20240101-ABCD"));
        assert!(!is_invoice_number("INV-20240101-ABCDE"));
    }
}
