//! Unsigned legacy bundle construction and finalisation.

use serde::{Deserialize, Serialize};

use super::error::MigrationError;
use crate::ternary::transaction::{
    BUNDLE_LENGTH, BUNDLE_OFFSET, CURRENT_INDEX_LENGTH, CURRENT_INDEX_OFFSET,
    ISSUANCE_TIMESTAMP_LENGTH, ISSUANCE_TIMESTAMP_OFFSET, LAST_INDEX_LENGTH, LAST_INDEX_OFFSET,
    OBSOLETE_TAG_LENGTH, OBSOLETE_TAG_OFFSET, TRANSACTION_ESSENCE_LENGTH,
    TRANSACTION_ESSENCE_OFFSET, TRANSACTION_LENGTH, VALUE_LENGTH, VALUE_OFFSET,
};
use crate::ternary::{
    increment, trits_to_trytes, trytes_to_trits, value_to_padded_trits, Kerl, TransactionObject,
    HASH_LENGTH, MAX_TRYTE_VALUE, MIN_TRYTE_VALUE,
};

pub const ADDRESS_TRYTES_LENGTH: usize = 81;
pub const CHECKSUM_LENGTH: usize = 9;
const NORMALIZED_FRAGMENT_LENGTH: usize = 27;

/// Input side of an unsigned bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedInput {
    pub address: String,
    pub balance: u64,
    pub security_level: u8,
}

/// Builds the unsigned bundle that moves every input to `output_address`.
///
/// The output transaction comes first carrying `value`, followed by
/// `security_level` transactions per input, the first of which debits that
/// input's balance. Input balances must add up to `value`.
pub fn create_unsigned_bundle(
    output_address: &str,
    inputs: &[UnsignedInput],
    value: u64,
    timestamp: u64,
) -> Result<Vec<String>, MigrationError> {
    let output = address_trits(output_address)?;
    let debited: u64 = inputs.iter().map(|input| input.balance).sum();
    if debited != value {
        return Err(MigrationError::protocol(format!(
            "inputs hold {debited} but the transfer moves {value}"
        )));
    }

    let timestamp = to_signed(timestamp)?;
    let mut bundle: Vec<i8> = Vec::new();
    add_entry(&mut bundle, &output, to_signed(value)?, timestamp)?;
    for input in inputs {
        if !(1..=3).contains(&input.security_level) {
            return Err(MigrationError::protocol(format!(
                "security level {} is outside 1..=3",
                input.security_level
            )));
        }
        let address = address_trits(&input.address)?;
        add_entry(&mut bundle, &address, -to_signed(input.balance)?, timestamp)?;
        for _ in 1..input.security_level {
            add_entry(&mut bundle, &address, 0, timestamp)?;
        }
    }

    finalize_bundle(&mut bundle)?;
    bundle
        .chunks(TRANSACTION_LENGTH)
        .map(|tx| trits_to_trytes(tx).map_err(MigrationError::from))
        .collect()
}

/// Hashes the bundle essence, bumping the first obsolete tag until the
/// normalised hash holds no maximal tryte, then stamps the hash on every
/// transaction.
pub fn finalize_bundle(bundle: &mut [i8]) -> Result<[i8; HASH_LENGTH], MigrationError> {
    if bundle.is_empty() || bundle.len() % TRANSACTION_LENGTH != 0 {
        return Err(MigrationError::protocol(format!(
            "bundle of {} trits is not a whole number of transactions",
            bundle.len()
        )));
    }

    let mut kerl = Kerl::new();
    let mut hash = [0_i8; HASH_LENGTH];
    loop {
        kerl.reset();
        for tx in bundle.chunks(TRANSACTION_LENGTH) {
            kerl.absorb(
                &tx[TRANSACTION_ESSENCE_OFFSET
                    ..TRANSACTION_ESSENCE_OFFSET + TRANSACTION_ESSENCE_LENGTH],
            )?;
        }
        kerl.squeeze(&mut hash)?;

        if !normalized_bundle(&hash).contains(&MAX_TRYTE_VALUE) {
            break;
        }
        increment(&mut bundle[OBSOLETE_TAG_OFFSET..OBSOLETE_TAG_OFFSET + OBSOLETE_TAG_LENGTH]);
    }

    for tx in bundle.chunks_mut(TRANSACTION_LENGTH) {
        tx[BUNDLE_OFFSET..BUNDLE_OFFSET + BUNDLE_LENGTH].copy_from_slice(&hash);
    }
    Ok(hash)
}

/// Normalises a bundle hash into 81 tryte values whose three 27-tryte
/// fragments each sum to zero.
pub fn normalized_bundle(hash: &[i8]) -> [i8; 81] {
    let mut normalized = [0_i8; 81];
    for fragment in 0..3 {
        let range =
            fragment * NORMALIZED_FRAGMENT_LENGTH..(fragment + 1) * NORMALIZED_FRAGMENT_LENGTH;
        let mut sum: i32 = 0;
        for j in range.clone() {
            normalized[j] = hash[j * 3] + hash[j * 3 + 1] * 3 + hash[j * 3 + 2] * 9;
            sum += i32::from(normalized[j]);
        }

        while sum > 0 {
            sum -= 1;
            if let Some(tryte) = normalized[range.clone()]
                .iter_mut()
                .find(|tryte| **tryte > MIN_TRYTE_VALUE)
            {
                *tryte -= 1;
            }
        }
        while sum < 0 {
            sum += 1;
            if let Some(tryte) = normalized[range.clone()]
                .iter_mut()
                .find(|tryte| **tryte < MAX_TRYTE_VALUE)
            {
                *tryte += 1;
            }
        }
    }
    normalized
}

pub fn decode_bundle(trytes: &[String]) -> Result<Vec<TransactionObject>, MigrationError> {
    trytes
        .iter()
        .map(|tx| TransactionObject::from_trytes(tx).map_err(MigrationError::from))
        .collect()
}

/// Bundle hash carried by the first transaction.
pub fn bundle_hash(trytes: &[String]) -> Result<String, MigrationError> {
    let first = trytes
        .first()
        .ok_or_else(|| MigrationError::protocol("bundle has no transactions"))?;
    Ok(TransactionObject::from_trytes(first)?.bundle)
}

/// Drops the checksum from a 90-tryte address; 81-tryte addresses pass through.
pub fn remove_checksum(address: &str) -> &str {
    if address.len() == ADDRESS_TRYTES_LENGTH + CHECKSUM_LENGTH {
        &address[..ADDRESS_TRYTES_LENGTH]
    } else {
        address
    }
}

fn add_entry(
    bundle: &mut Vec<i8>,
    address: &[i8],
    value: i64,
    timestamp: i64,
) -> Result<(), MigrationError> {
    let mut tx = vec![0_i8; TRANSACTION_LENGTH];
    let start = TRANSACTION_ESSENCE_OFFSET;
    tx[start..start + address.len()].copy_from_slice(address);
    tx[VALUE_OFFSET..VALUE_OFFSET + VALUE_LENGTH]
        .copy_from_slice(&value_to_padded_trits(value, VALUE_LENGTH)?);
    tx[ISSUANCE_TIMESTAMP_OFFSET..ISSUANCE_TIMESTAMP_OFFSET + ISSUANCE_TIMESTAMP_LENGTH]
        .copy_from_slice(&value_to_padded_trits(timestamp, ISSUANCE_TIMESTAMP_LENGTH)?);
    bundle.extend_from_slice(&tx);

    let count = bundle.len() / TRANSACTION_LENGTH;
    let last_index = value_to_padded_trits(count as i64 - 1, LAST_INDEX_LENGTH)?;
    for (position, tx) in bundle.chunks_mut(TRANSACTION_LENGTH).enumerate() {
        tx[CURRENT_INDEX_OFFSET..CURRENT_INDEX_OFFSET + CURRENT_INDEX_LENGTH].copy_from_slice(
            &value_to_padded_trits(position as i64, CURRENT_INDEX_LENGTH)?,
        );
        tx[LAST_INDEX_OFFSET..LAST_INDEX_OFFSET + LAST_INDEX_LENGTH].copy_from_slice(&last_index);
    }
    Ok(())
}

fn address_trits(address: &str) -> Result<Vec<i8>, MigrationError> {
    if address.len() != ADDRESS_TRYTES_LENGTH {
        return Err(MigrationError::protocol(format!(
            "address must be {ADDRESS_TRYTES_LENGTH} trytes, got {}",
            address.len()
        )));
    }
    Ok(trytes_to_trits(address)?)
}

fn to_signed(value: u64) -> Result<i64, MigrationError> {
    i64::try_from(value)
        .map_err(|_| MigrationError::protocol(format!("value {value} exceeds the ledger range")))
}
