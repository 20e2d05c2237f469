//! Property-based tests for the BER codec and OID ordering.

use bytes::Bytes;
use proptest::prelude::*;
use snmp_stack::ber::{self, EncodeBuf, decode_length, tag};
use snmp_stack::{AsnValue, Oid, Pdu};

// =============================================================================
// Strategies
// =============================================================================

/// OIDs with at least two arcs that survive a BER round trip.
///
/// The first two arcs share one subidentifier (`arc1 * 40 + arc2`), so
/// `arc2` must stay below 40 unless `arc1` is 2.
fn arb_oid() -> impl Strategy<Value = Oid> {
    (0u64..=2, any::<u32>(), prop::collection::vec(any::<u32>(), 0..=20)).prop_map(
        |(arc1, arc2, rest)| {
            let arc2 = if arc1 < 2 {
                u64::from(arc2 % 40)
            } else {
                u64::from(arc2)
            };
            Oid::new([arc1, arc2].into_iter().chain(rest.into_iter().map(u64::from)))
        },
    )
}

/// Short OIDs over a tiny alphabet so that prefixes and ties are common.
fn arb_dense_oid() -> impl Strategy<Value = Oid> {
    prop::collection::vec(0u64..4, 0..6).prop_map(Oid::new)
}

/// Integers weighted towards the octet boundaries where a sign octet is
/// added or dropped.
fn arb_integer() -> impl Strategy<Value = i64> {
    prop_oneof![
        -70_000i64..70_000,
        (0u32..7, any::<bool>(), -2i64..=1).prop_map(|(octets, negative, delta)| {
            let edge = 1i64 << (octets * 8 + 7);
            if negative { -edge + delta } else { edge + delta }
        }),
        Just(i64::from(i32::MAX)),
        Just(i64::from(i32::MIN)),
        any::<i64>(),
    ]
}

fn arb_scalar() -> impl Strategy<Value = AsnValue> {
    prop_oneof![
        arb_integer().prop_map(AsnValue::integer),
        any::<u32>().prop_map(AsnValue::counter32),
        any::<u32>().prop_map(AsnValue::gauge32),
        any::<u32>().prop_map(AsnValue::timeticks),
        any::<u64>().prop_map(AsnValue::counter64),
        prop::collection::vec(any::<u8>(), 0..300).prop_map(AsnValue::octet_string),
        any::<[u8; 4]>().prop_map(AsnValue::ip_address),
        (0u8..8, prop::collection::vec(any::<u8>(), 1..16))
            .prop_map(|(unused, bits)| AsnValue::bit_string(unused, bits)),
        arb_oid().prop_map(AsnValue::oid),
        Just(AsnValue::null()),
        Just(AsnValue::no_such_object()),
        Just(AsnValue::end_of_mib_view()),
    ]
}

fn arb_value() -> impl Strategy<Value = AsnValue> {
    arb_scalar().prop_recursive(3, 32, 6, |inner| {
        prop::collection::vec(inner, 0..6).prop_map(AsnValue::sequence)
    })
}

// =============================================================================
// OID ordering
// =============================================================================

proptest! {
    #[test]
    fn oid_order_is_antisymmetric(a in arb_dense_oid(), b in arb_dense_oid()) {
        prop_assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
        prop_assert_eq!(a.cmp(&b).is_eq(), a == b);
    }

    #[test]
    fn oid_order_is_transitive(
        a in arb_dense_oid(),
        b in arb_dense_oid(),
        c in arb_dense_oid(),
    ) {
        if a <= b && b <= c {
            prop_assert!(a <= c);
        }
    }

    #[test]
    fn subtree_members_sort_after_root(root in arb_dense_oid(), tail in arb_dense_oid()) {
        let member = root.append(tail.arcs().iter().copied());
        prop_assert!(root.contains(&member));
        prop_assert!(member >= root);
        prop_assert_eq!(member.suffix_after(&root), Some(tail.arcs()));
    }

    #[test]
    fn child_is_strict_successor(oid in arb_dense_oid(), arc in 0u64..4) {
        let child = oid.child(arc);
        prop_assert!(child > oid);
        prop_assert!(oid.contains(&child));
        prop_assert!(!child.contains(&oid));
    }

    #[test]
    fn oid_display_parses_back(oid in arb_oid()) {
        let parsed = Oid::parse(&oid.to_string()).unwrap();
        prop_assert_eq!(parsed, oid);
    }
}

// =============================================================================
// BER codec
// =============================================================================

proptest! {
    #[test]
    fn oid_ber_roundtrip(oid in arb_oid()) {
        let encoded = oid.to_ber().unwrap();
        prop_assert_eq!(encoded.len(), oid.ber_len());
        prop_assert_eq!(Oid::from_ber(&encoded).unwrap(), oid);
    }

    #[test]
    fn value_roundtrip(value in arb_value()) {
        let encoded = ber::encode(&value).unwrap();
        prop_assert_eq!(encoded.len(), value.encoded_len());
        let decoded = ber::decode(encoded).unwrap();
        prop_assert!(decoded.is_correct());
        prop_assert_eq!(decoded, value);
    }

    #[test]
    fn integer_roundtrip(v in arb_integer()) {
        let value = AsnValue::integer(v);
        let encoded = ber::encode(&value).unwrap();
        prop_assert_eq!(ber::decode(encoded).unwrap().as_i64(), Some(v));
    }

    #[test]
    fn request_id_roundtrip(id in any::<i32>()) {
        let pdu = Pdu::get_request(id, &[]);
        prop_assert_eq!(Pdu::decode(pdu.encode().unwrap()).unwrap().request_id, id);
    }

    #[test]
    fn length_roundtrip(len in 0usize..=0xFF_FFFF) {
        let mut buf = EncodeBuf::new();
        buf.push_length(len).unwrap();
        let encoded = buf.finish_vec();
        prop_assert_eq!(encoded.len() == 1, len <= 127);
        let (decoded, consumed) = decode_length(&encoded, 0).unwrap();
        prop_assert_eq!(decoded, len);
        prop_assert_eq!(consumed, encoded.len());
    }

    #[test]
    fn decoder_never_panics(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = ber::decode(Bytes::from(data.clone()));
        let _ = Pdu::decode(Bytes::from(data));
    }

    #[test]
    fn sequence_framing_never_panics(body in prop::collection::vec(any::<u8>(), 0..256)) {
        let mut buf = EncodeBuf::new();
        buf.push_constructed(tag::universal::SEQUENCE, |buf| {
            buf.push_bytes(&body);
            Ok(())
        }).unwrap();
        let _ = Pdu::decode(buf.finish());
    }
}

#[test]
fn length_boundary_uses_long_form() {
    let mut buf = EncodeBuf::new();
    buf.push_length(128).unwrap();
    assert_eq!(buf.finish_vec(), vec![0x81, 0x80]);

    let mut buf = EncodeBuf::new();
    buf.push_length(127).unwrap();
    assert_eq!(buf.finish_vec(), vec![0x7F]);
}
