//! Balanced ternary primitives of the legacy ledger.

mod kerl;
pub mod transaction;
mod trits;

pub use kerl::{bytes_to_trits, trits_to_bytes, Kerl, HASH_LENGTH};
pub use transaction::TransactionObject;
pub use trits::{
    increment, is_trytes, tryte_value, trits_to_trytes, trits_to_value, trytes_to_trits,
    value_to_padded_trits, value_to_trits, TernaryError, MAX_TRYTE_VALUE, MIN_TRYTE_VALUE,
    TRYTE_ALPHABET,
};
