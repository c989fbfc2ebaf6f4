use sha3::{Digest, Keccak384};

use super::trits::TernaryError;

pub const HASH_LENGTH: usize = 243;
const BYTE_LENGTH: usize = 48;
const WORDS: usize = BYTE_LENGTH / 4;

/// Keccak-384 sponge over 243-trit blocks.
///
/// Every block is mapped to a signed 384-bit integer (trit 242 is forced to
/// zero) before entering Keccak, and squeezed digests are mapped back the same
/// way. Squeezing more than one block re-absorbs the bitwise complement of the
/// previous digest.
#[derive(Clone, Default)]
pub struct Kerl {
    keccak: Keccak384,
}

impl Kerl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.keccak = Keccak384::default();
    }

    pub fn absorb(&mut self, trits: &[i8]) -> Result<(), TernaryError> {
        if trits.len() % HASH_LENGTH != 0 {
            return Err(TernaryError::Length {
                expected: HASH_LENGTH,
                actual: trits.len(),
            });
        }
        for chunk in trits.chunks(HASH_LENGTH) {
            let bytes = trits_to_bytes(chunk)?;
            self.keccak.update(bytes);
        }
        Ok(())
    }

    pub fn squeeze(&mut self, out: &mut [i8]) -> Result<(), TernaryError> {
        if out.len() % HASH_LENGTH != 0 {
            return Err(TernaryError::Length {
                expected: HASH_LENGTH,
                actual: out.len(),
            });
        }
        for chunk in out.chunks_mut(HASH_LENGTH) {
            let digest = self.keccak.finalize_reset();
            chunk.copy_from_slice(&bytes_to_trits(&digest));
            let flipped: Vec<u8> = digest.iter().map(|byte| !byte).collect();
            self.keccak.update(&flipped);
        }
        Ok(())
    }
}

/// Two's complement big-endian encoding of a 243-trit block, ignoring trit 242.
pub fn trits_to_bytes(trits: &[i8]) -> Result<[u8; BYTE_LENGTH], TernaryError> {
    if trits.len() != HASH_LENGTH {
        return Err(TernaryError::Length {
            expected: HASH_LENGTH,
            actual: trits.len(),
        });
    }
    let mut words = [0_u32; WORDS];
    for trit in trits[..HASH_LENGTH - 1].iter().rev() {
        multiply_by_three(&mut words);
        match trit {
            1 => add_one(&mut words),
            -1 => subtract_one(&mut words),
            0 => {}
            other => return Err(TernaryError::InvalidTrit(*other)),
        }
    }

    let mut bytes = [0_u8; BYTE_LENGTH];
    for (position, word) in words.iter().rev().enumerate() {
        bytes[position * 4..position * 4 + 4].copy_from_slice(&word.to_be_bytes());
    }
    Ok(bytes)
}

/// Inverse of [`trits_to_bytes`]: the digest is read as a signed 384-bit value
/// and expanded into 242 balanced trits, trit 242 stays zero.
pub fn bytes_to_trits(bytes: &[u8]) -> [i8; HASH_LENGTH] {
    let mut words = [0_u32; WORDS];
    for (position, chunk) in bytes.chunks(4).take(WORDS).enumerate() {
        let mut buf = [0_u8; 4];
        buf[..chunk.len()].copy_from_slice(chunk);
        words[WORDS - 1 - position] = u32::from_be_bytes(buf);
    }

    let negative = words[WORDS - 1] >> 31 == 1;
    if negative {
        for word in words.iter_mut() {
            *word = !*word;
        }
        add_one(&mut words);
    }

    let mut trits = [0_i8; HASH_LENGTH];
    for trit in trits.iter_mut().take(HASH_LENGTH - 1) {
        let remainder = divide_by_three(&mut words);
        *trit = match remainder {
            0 => 0,
            1 => 1,
            _ => {
                add_one(&mut words);
                -1
            }
        };
    }
    if negative {
        for trit in trits.iter_mut() {
            *trit = -*trit;
        }
    }
    trits
}

fn multiply_by_three(words: &mut [u32; WORDS]) {
    let mut carry = 0_u64;
    for word in words.iter_mut() {
        let value = u64::from(*word) * 3 + carry;
        *word = value as u32;
        carry = value >> 32;
    }
}

fn divide_by_three(words: &mut [u32; WORDS]) -> u64 {
    let mut remainder = 0_u64;
    for word in words.iter_mut().rev() {
        let current = (remainder << 32) | u64::from(*word);
        *word = (current / 3) as u32;
        remainder = current % 3;
    }
    remainder
}

fn add_one(words: &mut [u32; WORDS]) {
    for word in words.iter_mut() {
        let (value, overflow) = word.overflowing_add(1);
        *word = value;
        if !overflow {
            return;
        }
    }
}

fn subtract_one(words: &mut [u32; WORDS]) {
    for word in words.iter_mut() {
        let (value, underflow) = word.overflowing_sub(1);
        *word = value;
        if !underflow {
            return;
        }
    }
}
