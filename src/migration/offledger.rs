//! Binary encoding of off-ledger migration requests for the migrator contract.
//!
//! Layout: request kind, chain id, contract hname, entry point, one
//! argument (`"b"`) holding the bundle trytes, zero nonce and allowance
//! bytes, and an empty 33-byte public key.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};

use super::error::MigrationError;

pub const CONTRACT_HNAME: &str = "69492005";
pub const CONTRACT_ENTRY_POINT: &str = "060d3f50";

const REQUEST_KIND_OFF_LEDGER: u8 = 1;
const ARGUMENT_COUNT: u8 = 1;
const BUNDLE_KEY: &[u8] = b"b";
const TRAILING_ZEROES: usize = 3;
const PUBLIC_KEY_LENGTH: usize = 33;
const REQUEST_ID_SUFFIX: [u8; 2] = [0, 0];

type Blake2b256 = Blake2b<U32>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OffLedgerRequest {
    /// `0x`-prefixed hex of the request bytes.
    pub request: String,
    /// `0x`-prefixed hex of blake2b-256(request) followed by two zero bytes.
    pub request_id: String,
}

/// Contract identity the request is addressed to, all as hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    pub chain_id_hex: String,
    pub contract_hname: String,
    pub entry_point: String,
}

pub fn encode_off_ledger_request(
    bundle_trytes: &[String],
    target: &RequestTarget,
) -> Result<OffLedgerRequest, MigrationError> {
    let bytes = request_bytes(bundle_trytes, target)?;
    Ok(OffLedgerRequest {
        request: format!("0x{}", hex::encode(&bytes)),
        request_id: request_id(&bytes),
    })
}

pub fn request_bytes(
    bundle_trytes: &[String],
    target: &RequestTarget,
) -> Result<Vec<u8>, MigrationError> {
    let payload = bundle_argument(bundle_trytes)?;
    let payload_length = u32::try_from(payload.len())
        .map_err(|_| MigrationError::Encoding("bundle argument is too large".into()))?;

    let mut out = vec![REQUEST_KIND_OFF_LEDGER];
    out.extend(decode_hex("chain id", &target.chain_id_hex)?);
    out.extend(decode_hex("contract hname", &target.contract_hname)?);
    out.extend(decode_hex("entry point", &target.entry_point)?);
    out.push(ARGUMENT_COUNT);
    out.push(BUNDLE_KEY.len() as u8);
    out.extend_from_slice(BUNDLE_KEY);
    out.extend(vlu_encode(payload_length));
    out.extend(payload);
    out.extend([0_u8; TRAILING_ZEROES]);
    out.extend([0_u8; PUBLIC_KEY_LENGTH]);
    Ok(out)
}

/// Count byte followed by each transaction as a little-endian u16 length and
/// its ASCII bytes.
pub fn bundle_argument(bundle_trytes: &[String]) -> Result<Vec<u8>, MigrationError> {
    let count = u8::try_from(bundle_trytes.len()).map_err(|_| {
        MigrationError::Encoding(format!(
            "bundle of {} transactions does not fit a count byte",
            bundle_trytes.len()
        ))
    })?;
    let mut out = vec![count];
    for tx in bundle_trytes {
        if !tx.is_ascii() {
            return Err(MigrationError::Encoding(
                "transaction trytes must be ASCII".into(),
            ));
        }
        let length = u16::try_from(tx.len()).map_err(|_| {
            MigrationError::Encoding(format!("transaction of {} bytes is too long", tx.len()))
        })?;
        out.extend_from_slice(&length.to_le_bytes());
        out.extend_from_slice(tx.as_bytes());
    }
    Ok(out)
}

/// Variable length unsigned integer: 7 bits per byte, low bits first, high
/// bit set on every byte but the last.
pub fn vlu_encode(mut value: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(5);
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

/// Returns the decoded value and the number of bytes consumed.
pub fn vlu_decode(bytes: &[u8]) -> Result<(u32, usize), MigrationError> {
    let mut value: u64 = 0;
    for (position, byte) in bytes.iter().enumerate().take(5) {
        value |= u64::from(byte & 0x7f) << (7 * position);
        if byte & 0x80 == 0 {
            let value = u32::try_from(value)
                .map_err(|_| MigrationError::Encoding("VLU value overflows u32".into()))?;
            return Ok((value, position + 1));
        }
    }
    Err(MigrationError::Encoding("unterminated VLU".into()))
}

pub fn request_id(request: &[u8]) -> String {
    let digest = Blake2b256::digest(request);
    let mut id = digest.to_vec();
    id.extend_from_slice(&REQUEST_ID_SUFFIX);
    format!("0x{}", hex::encode(id))
}

fn decode_hex(field: &str, value: &str) -> Result<Vec<u8>, MigrationError> {
    let trimmed = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(trimmed).map_err(|err| MigrationError::Encoding(format!("{field}: {err}")))
}
