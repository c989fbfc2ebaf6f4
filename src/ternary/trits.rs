use thiserror::Error;

/// Tryte alphabet of the legacy ledger, ordered by value `0..=13` then `-13..=-1`.
pub const TRYTE_ALPHABET: &[u8; 27] = b"9ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const MIN_TRYTE_VALUE: i8 = -13;
pub const MAX_TRYTE_VALUE: i8 = 13;
pub const TRITS_PER_TRYTE: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TernaryError {
    #[error("invalid tryte {character:?} at position {position}")]
    InvalidTryte { character: char, position: usize },
    #[error("trit length {0} is not a multiple of {TRITS_PER_TRYTE}")]
    UnalignedTrits(usize),
    #[error("trit value {0} is outside -1..=1")]
    InvalidTrit(i8),
    #[error("value {value} does not fit into {length} trits")]
    Overflow { value: i64, length: usize },
    #[error("expected {expected} trits, got {actual}")]
    Length { expected: usize, actual: usize },
}

/// Value of a single tryte character, `None` when it is outside the alphabet.
pub fn tryte_value(character: u8) -> Option<i8> {
    match character {
        b'9' => Some(0),
        b'A'..=b'M' => Some((character - b'A') as i8 + 1),
        b'N'..=b'Z' => Some((character - b'N') as i8 - 13),
        _ => None,
    }
}

pub fn is_trytes(value: &str) -> bool {
    value.bytes().all(|c| tryte_value(c).is_some())
}

pub fn trytes_to_trits(trytes: &str) -> Result<Vec<i8>, TernaryError> {
    let mut trits = Vec::with_capacity(trytes.len() * TRITS_PER_TRYTE);
    for (position, character) in trytes.bytes().enumerate() {
        let value = tryte_value(character).ok_or(TernaryError::InvalidTryte {
            character: character as char,
            position,
        })?;
        let mut remaining = i64::from(value);
        for _ in 0..TRITS_PER_TRYTE {
            let (trit, carry) = balanced_digit(remaining);
            trits.push(trit);
            remaining = carry;
        }
    }
    Ok(trits)
}

pub fn trits_to_trytes(trits: &[i8]) -> Result<String, TernaryError> {
    if trits.len() % TRITS_PER_TRYTE != 0 {
        return Err(TernaryError::UnalignedTrits(trits.len()));
    }
    let mut out = String::with_capacity(trits.len() / TRITS_PER_TRYTE);
    for chunk in trits.chunks(TRITS_PER_TRYTE) {
        for trit in chunk {
            if !(-1..=1).contains(trit) {
                return Err(TernaryError::InvalidTrit(*trit));
            }
        }
        let value = chunk[0] + chunk[1] * 3 + chunk[2] * 9;
        let index = if value < 0 { value + 27 } else { value };
        out.push(TRYTE_ALPHABET[index as usize] as char);
    }
    Ok(out)
}

/// Minimal balanced ternary representation of `value`, least significant trit first.
pub fn value_to_trits(value: i64) -> Vec<i8> {
    let mut trits = Vec::new();
    let mut remaining = value;
    while remaining != 0 {
        let (trit, carry) = balanced_digit(remaining);
        trits.push(trit);
        remaining = carry;
    }
    trits
}

/// Balanced representation of `value` padded with zero trits to `length`.
pub fn value_to_padded_trits(value: i64, length: usize) -> Result<Vec<i8>, TernaryError> {
    let mut trits = value_to_trits(value);
    if trits.len() > length {
        return Err(TernaryError::Overflow { value, length });
    }
    trits.resize(length, 0);
    Ok(trits)
}

pub fn trits_to_value(trits: &[i8]) -> i64 {
    trits
        .iter()
        .rev()
        .fold(0_i64, |acc, trit| acc * 3 + i64::from(*trit))
}

/// Adds one to a balanced ternary number in place, dropping any final carry.
pub fn increment(trits: &mut [i8]) {
    for trit in trits.iter_mut() {
        if *trit == 1 {
            *trit = -1;
        } else {
            *trit += 1;
            return;
        }
    }
}

fn balanced_digit(value: i64) -> (i8, i64) {
    let mut rem = value % 3;
    let mut quotient = value / 3;
    if rem > 1 {
        rem -= 3;
        quotient += 1;
    } else if rem < -1 {
        rem += 3;
        quotient -= 1;
    }
    (rem as i8, quotient)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tryte_values_cover_alphabet() {
        for (index, character) in TRYTE_ALPHABET.iter().enumerate() {
            let expected = if index > 13 {
                index as i8 - 27
            } else {
                index as i8
            };
            assert_eq!(tryte_value(*character), Some(expected));
        }
        assert_eq!(tryte_value(b'a'), None);
        assert_eq!(tryte_value(b'0'), None);
    }

    #[test]
    fn trytes_roundtrip_through_trits() {
        let trytes = "HELLOWORLD9NZ";
        let trits = trytes_to_trits(trytes).unwrap();
        assert_eq!(trits.len(), trytes.len() * 3);
        assert_eq!(trits_to_trytes(&trits).unwrap(), trytes);
    }

    #[test]
    fn rejects_lowercase_trytes() {
        let err = trytes_to_trits("ABc").unwrap_err();
        assert_eq!(
            err,
            TernaryError::InvalidTryte {
                character: 'c',
                position: 2
            }
        );
    }

    #[test]
    fn values_roundtrip_through_trits() {
        for value in [-1_000_000_i64, -13, -1, 0, 1, 2, 13, 14, 2_779_530_283_277_761] {
            assert_eq!(trits_to_value(&value_to_trits(value)), value);
        }
        assert!(value_to_trits(0).is_empty());
    }

    #[test]
    fn padded_trits_detect_overflow() {
        assert_eq!(value_to_padded_trits(4, 3).unwrap(), vec![1, 1, 0]);
        assert!(matches!(
            value_to_padded_trits(14, 2),
            Err(TernaryError::Overflow { .. })
        ));
    }

    #[test]
    fn increment_carries() {
        let mut trits = vec![1, 1, 0];
        increment(&mut trits);
        assert_eq!(trits_to_value(&trits), 5);
        assert_eq!(trits, vec![-1, -1, 1]);
    }
}
