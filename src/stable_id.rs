use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

/// Highest value representable in 7 base36 digits ("zzzzzzz").
const MAX_BASE36_7: u64 = 78_364_164_095;

const ID_LEN: usize = 7;

/// Generates unique 7-character base36 stable IDs.
///
/// The counter is seeded from the highest ID already present in the
/// document, so a file's IDs grow monotonically; the first ID in a fresh
/// file starts from a time-derived value to keep IDs from different
/// documents apart.
pub struct StableIdGenerator {
    used: HashSet<String>,
    counter: u64,
}

impl StableIdGenerator {
    pub fn new<I, S>(existing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut used = HashSet::new();
        let mut max_value = 0u64;
        for id in existing {
            let id = id.as_ref();
            if let Ok(value) = u64::from_str_radix(id, 36) {
                max_value = max_value.max(value);
            }
            used.insert(id.to_string());
        }

        let counter = if max_value > 0 {
            max_value
        } else {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64 % MAX_BASE36_7)
                .unwrap_or(0)
        };

        Self { used, counter }
    }

    pub fn generate(&mut self) -> Result<String> {
        for _ in 0..1000 {
            self.counter += 1;
            if self.counter > MAX_BASE36_7 {
                return Err(Error::limit("stable ID space exhausted"));
            }
            let id = format_base36(self.counter);
            debug_assert!(crate::validate::is_valid_stable_id(&id));
            if self.used.insert(id.clone()) {
                return Ok(id);
            }
        }
        Err(Error::limit(
            "failed to generate unique stable ID after 1000 attempts",
        ))
    }
}

fn format_base36(mut value: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut buf = [b'0'; ID_LEN];
    let mut pos = ID_LEN;
    while value > 0 && pos > 0 {
        pos -= 1;
        buf[pos] = DIGITS[(value % 36) as usize];
        value /= 36;
    }
    String::from_utf8(buf.to_vec()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::is_valid_stable_id;

    #[test]
    fn generates_valid_ids() {
        let mut gen = StableIdGenerator::new(Vec::<String>::new());
        for _ in 0..100 {
            let id = gen.generate().unwrap();
            assert!(is_valid_stable_id(&id), "bad id: {id}");
        }
    }

    #[test]
    fn never_reuses_existing_ids() {
        let existing = vec!["0000005".to_string(), "0000006".to_string()];
        let mut gen = StableIdGenerator::new(&existing);
        for _ in 0..10 {
            let id = gen.generate().unwrap();
            assert!(!existing.contains(&id));
        }
    }

    #[test]
    fn seeds_counter_past_highest_existing() {
        let mut gen = StableIdGenerator::new(["0000009"]);
        assert_eq!(gen.generate().unwrap(), "000000a");
    }

    #[test]
    fn base36_formatting_pads_to_seven() {
        assert_eq!(format_base36(1), "0000001");
        assert_eq!(format_base36(35), "000000z");
        assert_eq!(format_base36(36), "0000010");
        assert_eq!(format_base36(MAX_BASE36_7), "zzzzzzz");
    }
}
