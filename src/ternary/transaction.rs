//! Fixed trit layout of a legacy transaction.

use serde::{Deserialize, Serialize};

use super::trits::{trits_to_value, tryte_value, trytes_to_trits, TernaryError};

pub const TRANSACTION_LENGTH: usize = 8019;
pub const TRANSACTION_TRYTES_LENGTH: usize = TRANSACTION_LENGTH / 3;

pub const SIGNATURE_OR_MESSAGE_OFFSET: usize = 0;
pub const SIGNATURE_OR_MESSAGE_LENGTH: usize = 6561;
pub const ADDRESS_OFFSET: usize = SIGNATURE_OR_MESSAGE_OFFSET + SIGNATURE_OR_MESSAGE_LENGTH;
pub const ADDRESS_LENGTH: usize = 243;
pub const VALUE_OFFSET: usize = ADDRESS_OFFSET + ADDRESS_LENGTH;
pub const VALUE_LENGTH: usize = 81;
pub const OBSOLETE_TAG_OFFSET: usize = VALUE_OFFSET + VALUE_LENGTH;
pub const OBSOLETE_TAG_LENGTH: usize = 81;
pub const ISSUANCE_TIMESTAMP_OFFSET: usize = OBSOLETE_TAG_OFFSET + OBSOLETE_TAG_LENGTH;
pub const ISSUANCE_TIMESTAMP_LENGTH: usize = 27;
pub const CURRENT_INDEX_OFFSET: usize = ISSUANCE_TIMESTAMP_OFFSET + ISSUANCE_TIMESTAMP_LENGTH;
pub const CURRENT_INDEX_LENGTH: usize = 27;
pub const LAST_INDEX_OFFSET: usize = CURRENT_INDEX_OFFSET + CURRENT_INDEX_LENGTH;
pub const LAST_INDEX_LENGTH: usize = 27;
pub const BUNDLE_OFFSET: usize = LAST_INDEX_OFFSET + LAST_INDEX_LENGTH;
pub const BUNDLE_LENGTH: usize = 243;
pub const TRUNK_TRANSACTION_OFFSET: usize = BUNDLE_OFFSET + BUNDLE_LENGTH;
pub const TRUNK_TRANSACTION_LENGTH: usize = 243;
pub const BRANCH_TRANSACTION_OFFSET: usize = TRUNK_TRANSACTION_OFFSET + TRUNK_TRANSACTION_LENGTH;
pub const BRANCH_TRANSACTION_LENGTH: usize = 243;
pub const TAG_OFFSET: usize = BRANCH_TRANSACTION_OFFSET + BRANCH_TRANSACTION_LENGTH;
pub const TAG_LENGTH: usize = 81;
pub const ATTACHMENT_TIMESTAMP_OFFSET: usize = TAG_OFFSET + TAG_LENGTH;
pub const ATTACHMENT_TIMESTAMP_LENGTH: usize = 27;
pub const ATTACHMENT_TIMESTAMP_LOWER_BOUND_OFFSET: usize =
    ATTACHMENT_TIMESTAMP_OFFSET + ATTACHMENT_TIMESTAMP_LENGTH;
pub const ATTACHMENT_TIMESTAMP_LOWER_BOUND_LENGTH: usize = 27;
pub const ATTACHMENT_TIMESTAMP_UPPER_BOUND_OFFSET: usize =
    ATTACHMENT_TIMESTAMP_LOWER_BOUND_OFFSET + ATTACHMENT_TIMESTAMP_LOWER_BOUND_LENGTH;
pub const ATTACHMENT_TIMESTAMP_UPPER_BOUND_LENGTH: usize = 27;
pub const TRANSACTION_NONCE_OFFSET: usize =
    ATTACHMENT_TIMESTAMP_UPPER_BOUND_OFFSET + ATTACHMENT_TIMESTAMP_UPPER_BOUND_LENGTH;
pub const TRANSACTION_NONCE_LENGTH: usize = 81;

/// Address, value, obsolete tag, timestamp and both indexes: the part of a
/// transaction that feeds the bundle hash.
pub const TRANSACTION_ESSENCE_OFFSET: usize = ADDRESS_OFFSET;
pub const TRANSACTION_ESSENCE_LENGTH: usize = BUNDLE_OFFSET - ADDRESS_OFFSET;

/// Decoded view of one transaction's trytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionObject {
    pub signature_message_fragment: String,
    pub address: String,
    pub value: i64,
    pub obsolete_tag: String,
    pub timestamp: i64,
    pub current_index: i64,
    pub last_index: i64,
    pub bundle: String,
    pub trunk_transaction: String,
    pub branch_transaction: String,
    pub tag: String,
    pub attachment_timestamp: i64,
    pub attachment_timestamp_lower_bound: i64,
    pub attachment_timestamp_upper_bound: i64,
    pub nonce: String,
}

impl TransactionObject {
    pub fn from_trytes(trytes: &str) -> Result<Self, TernaryError> {
        if trytes.len() != TRANSACTION_TRYTES_LENGTH {
            return Err(TernaryError::Length {
                expected: TRANSACTION_TRYTES_LENGTH,
                actual: trytes.len(),
            });
        }
        if let Some(position) = trytes.bytes().position(|c| tryte_value(c).is_none()) {
            return Err(TernaryError::InvalidTryte {
                character: trytes.as_bytes()[position] as char,
                position,
            });
        }

        let text =
            |offset: usize, length: usize| trytes[offset / 3..(offset + length) / 3].to_string();
        let number = |offset: usize, length: usize| -> Result<i64, TernaryError> {
            let trits = trytes_to_trits(&trytes[offset / 3..(offset + length) / 3])?;
            Ok(trits_to_value(&trits))
        };

        Ok(Self {
            signature_message_fragment: text(
                SIGNATURE_OR_MESSAGE_OFFSET,
                SIGNATURE_OR_MESSAGE_LENGTH,
            ),
            address: text(ADDRESS_OFFSET, ADDRESS_LENGTH),
            value: number(VALUE_OFFSET, VALUE_LENGTH)?,
            obsolete_tag: text(OBSOLETE_TAG_OFFSET, OBSOLETE_TAG_LENGTH),
            timestamp: number(ISSUANCE_TIMESTAMP_OFFSET, ISSUANCE_TIMESTAMP_LENGTH)?,
            current_index: number(CURRENT_INDEX_OFFSET, CURRENT_INDEX_LENGTH)?,
            last_index: number(LAST_INDEX_OFFSET, LAST_INDEX_LENGTH)?,
            bundle: text(BUNDLE_OFFSET, BUNDLE_LENGTH),
            trunk_transaction: text(TRUNK_TRANSACTION_OFFSET, TRUNK_TRANSACTION_LENGTH),
            branch_transaction: text(BRANCH_TRANSACTION_OFFSET, BRANCH_TRANSACTION_LENGTH),
            tag: text(TAG_OFFSET, TAG_LENGTH),
            attachment_timestamp: number(ATTACHMENT_TIMESTAMP_OFFSET, ATTACHMENT_TIMESTAMP_LENGTH)?,
            attachment_timestamp_lower_bound: number(
                ATTACHMENT_TIMESTAMP_LOWER_BOUND_OFFSET,
                ATTACHMENT_TIMESTAMP_LOWER_BOUND_LENGTH,
            )?,
            attachment_timestamp_upper_bound: number(
                ATTACHMENT_TIMESTAMP_UPPER_BOUND_OFFSET,
                ATTACHMENT_TIMESTAMP_UPPER_BOUND_LENGTH,
            )?,
            nonce: text(TRANSACTION_NONCE_OFFSET, TRANSACTION_NONCE_LENGTH),
        })
    }
}
