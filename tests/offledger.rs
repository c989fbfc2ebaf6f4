#![allow(clippy::unwrap_used, clippy::expect_used)]

use legacy_migration::migration::offledger::{
    encode_off_ledger_request, request_bytes, request_id, vlu_decode, vlu_encode, RequestTarget,
    CONTRACT_ENTRY_POINT, CONTRACT_HNAME,
};
use legacy_migration::migration::MigrationError;
use legacy_migration::MigrationConfig;
use proptest::prelude::*;

fn target() -> RequestTarget {
    RequestTarget {
        chain_id_hex: "ab".repeat(32),
        contract_hname: CONTRACT_HNAME.into(),
        entry_point: CONTRACT_ENTRY_POINT.into(),
    }
}

fn bundle() -> Vec<String> {
    ["A", "B", "C"].iter().map(|c| c.repeat(2673)).collect()
}

#[test]
fn request_length_follows_layout() {
    let payload = 1 + 3 * (2 + 2673);
    let expected = 1 + 32 + 4 + 4 + 1 + 1 + 1 + vlu_encode(payload as u32).len() + payload + 3 + 33;
    assert_eq!(expected, 8108);

    let request = encode_off_ledger_request(&bundle(), &target()).unwrap();
    assert!(request.request.starts_with("0x"));
    assert_eq!(request.request.len(), 2 + 2 * expected);
}

#[test]
fn request_fields_sit_at_fixed_offsets() {
    let bytes = request_bytes(&bundle(), &target()).unwrap();
    assert_eq!(bytes[0], 1);
    assert_eq!(&bytes[1..33], &[0xab; 32]);
    assert_eq!(hex::encode(&bytes[33..37]), CONTRACT_HNAME);
    assert_eq!(hex::encode(&bytes[37..41]), CONTRACT_ENTRY_POINT);
    assert_eq!(&bytes[41..44], &[1, 1, b'b']);

    let (payload_len, consumed) = vlu_decode(&bytes[44..]).unwrap();
    assert_eq!(payload_len, 8026);
    let payload_start = 44 + consumed;
    assert_eq!(bytes[payload_start], 3);
    assert_eq!(
        u16::from_le_bytes([bytes[payload_start + 1], bytes[payload_start + 2]]),
        2673
    );
    assert_eq!(bytes[payload_start + 3], b'A');

    let tail = &bytes[payload_start + payload_len as usize..];
    assert_eq!(tail.len(), 36);
    assert!(tail.iter().all(|b| *b == 0));
}

#[test]
fn request_id_is_hash_plus_two_zero_bytes() {
    let request = encode_off_ledger_request(&bundle(), &target()).unwrap();
    assert_eq!(request.request_id.len(), 2 + 68);
    assert!(request.request_id.ends_with("0000"));

    let bytes = request_bytes(&bundle(), &target()).unwrap();
    assert_eq!(request_id(&bytes), request.request_id);

    let mut other = bundle();
    other[0] = "Z".repeat(2673);
    let changed = encode_off_ledger_request(&other, &target()).unwrap();
    assert_ne!(changed.request_id, request.request_id);
}

#[test]
fn configured_chain_encodes() {
    let target = MigrationConfig::production().request_target().unwrap();
    assert_eq!(
        target.chain_id_hex,
        "59220e3311f6e6eafe0f6eb426b9de1b1116c14121abcd4ea6e7dbecdcaad487"
    );
    let bytes = request_bytes(&bundle(), &target).unwrap();
    assert_eq!(bytes[1], 0x59);
}

#[test]
fn oversized_or_non_ascii_bundles_fail_to_encode() {
    let too_many: Vec<String> = (0..256).map(|_| "9".to_string()).collect();
    assert!(matches!(
        encode_off_ledger_request(&too_many, &target()),
        Err(MigrationError::Encoding(_))
    ));
    assert!(matches!(
        encode_off_ledger_request(&["ÄÖ".to_string()], &target()),
        Err(MigrationError::Encoding(_))
    ));
}

proptest! {
    #[test]
    fn vlu_roundtrips(value in any::<u32>()) {
        let encoded = vlu_encode(value);
        prop_assert!(encoded.len() <= 5);
        prop_assert_eq!(vlu_decode(&encoded).unwrap(), (value, encoded.len()));
    }
}
