//! Property-based tests for the Diameter wire codec and framer
//!
//! These verify the codec laws: AVP and message round-trips, the padding
//! and length invariants, the flag predicates, and framing idempotence
//! under arbitrary chunking.

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use proptest::prelude::*;

    use crate::avp::{Avp, AvpDataType, AvpValue};
    use crate::framer::MessageByteReader;
    use crate::message::{msg_flags, Message, MSG_HEADER_SIZE};

    fn arb_avp() -> impl Strategy<Value = Avp> {
        (
            any::<u32>(),
            prop_oneof![Just(0u32), Just(10415u32)],
            any::<bool>(),
            prop::collection::vec(any::<u8>(), 0..48),
        )
            .prop_map(|(code, vendor_id, mandatory, data)| {
                Avp::new(code, vendor_id, mandatory, &data)
            })
    }

    fn arb_message() -> impl Strategy<Value = Message> {
        (
            any::<u8>(),
            0u32..0x0100_0000,
            any::<u32>(),
            any::<u32>(),
            any::<u32>(),
            prop::collection::vec(arb_avp(), 0..6),
        )
            .prop_map(|(flags, code, app_id, hop_by_hop_id, end_to_end_id, avps)| {
                Message::new(flags, code, app_id, hop_by_hop_id, end_to_end_id, vec![], avps)
            })
    }

    mod avp_props {
        use super::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(200))]

            #[test]
            fn prop_avp_round_trip(avp in arb_avp()) {
                let encoded = avp.encode_to_vec();
                prop_assert_eq!(encoded.len(), avp.padded_length);

                let mut buf = Bytes::from(encoded);
                let decoded = Avp::decode(&mut buf).unwrap();
                prop_assert_eq!(&decoded, &avp);
                prop_assert_eq!(decoded.encode_to_vec(), avp.encode_to_vec());
            }

            #[test]
            fn prop_padding_invariant(avp in arb_avp()) {
                prop_assert_eq!(avp.padded_length % 4, 0);
                let pad = avp.padded_length - avp.length;
                prop_assert!(pad <= 3);
            }

            #[test]
            fn prop_unsigned32_typed_round_trip(code in any::<u32>(), value in any::<u32>()) {
                let avp = Avp::new_typed(code, 0, true, AvpDataType::Unsigned32, value).unwrap();
                let mut buf = Bytes::from(avp.encode_to_vec());
                let decoded = Avp::decode(&mut buf).unwrap();

                prop_assert_eq!(&decoded, &avp);
                prop_assert_eq!(
                    decoded.to_typed(AvpDataType::Unsigned32).unwrap(),
                    AvpValue::Unsigned32(value)
                );
            }

            #[test]
            fn prop_unsigned64_typed_round_trip(value in any::<u64>()) {
                let avp = Avp::new_typed(1, 0, true, AvpDataType::Unsigned64, value).unwrap();
                let mut buf = Bytes::from(avp.encode_to_vec());
                let decoded = Avp::decode(&mut buf).unwrap();
                prop_assert_eq!(
                    decoded.to_typed(AvpDataType::Unsigned64).unwrap(),
                    AvpValue::Unsigned64(value)
                );
            }

            #[test]
            fn prop_integer_typed_round_trips(v32 in any::<i32>(), v64 in any::<i64>()) {
                let avp = Avp::new_typed(1, 0, true, AvpDataType::Integer32, v32).unwrap();
                prop_assert_eq!(
                    avp.to_typed(AvpDataType::Integer32).unwrap(),
                    AvpValue::Integer32(v32)
                );

                let avp = Avp::new_typed(1, 0, true, AvpDataType::Integer64, v64).unwrap();
                prop_assert_eq!(
                    avp.to_typed(AvpDataType::Integer64).unwrap(),
                    AvpValue::Integer64(v64)
                );
            }

            #[test]
            fn prop_float_typed_round_trips(
                v32 in prop::num::f32::NORMAL,
                v64 in prop::num::f64::NORMAL,
            ) {
                let avp = Avp::new_typed(1, 0, true, AvpDataType::Float32, v32).unwrap();
                prop_assert_eq!(
                    avp.to_typed(AvpDataType::Float32).unwrap(),
                    AvpValue::Float32(v32)
                );

                let avp = Avp::new_typed(1, 0, true, AvpDataType::Float64, v64).unwrap();
                prop_assert_eq!(
                    avp.to_typed(AvpDataType::Float64).unwrap(),
                    AvpValue::Float64(v64)
                );
            }

            #[test]
            fn prop_utf8_string_typed_round_trip(s in "[a-zA-Z0-9.\\-]{0,32}") {
                let avp =
                    Avp::new_typed(263, 0, true, AvpDataType::Utf8String, s.clone()).unwrap();
                let mut buf = Bytes::from(avp.encode_to_vec());
                let decoded = Avp::decode(&mut buf).unwrap();
                prop_assert_eq!(
                    decoded.to_typed(AvpDataType::Utf8String).unwrap(),
                    AvpValue::Utf8String(s)
                );
            }

            #[test]
            fn prop_octet_string_typed_round_trip(data in prop::collection::vec(any::<u8>(), 0..48)) {
                let avp =
                    Avp::new_typed(7, 0, false, AvpDataType::OctetString, data.clone()).unwrap();
                let mut buf = Bytes::from(avp.encode_to_vec());
                let decoded = Avp::decode(&mut buf).unwrap();
                prop_assert_eq!(
                    decoded.to_typed(AvpDataType::OctetString).unwrap(),
                    AvpValue::OctetString(data)
                );
            }

            #[test]
            fn prop_time_typed_round_trip(seconds in any::<u32>()) {
                let avp = Avp::new_typed(55, 0, true, AvpDataType::Time, seconds).unwrap();
                let mut buf = Bytes::from(avp.encode_to_vec());
                let decoded = Avp::decode(&mut buf).unwrap();
                prop_assert_eq!(
                    decoded.to_typed(AvpDataType::Time).unwrap(),
                    AvpValue::Time(seconds)
                );
            }

            #[test]
            fn prop_ipv4_address_typed_round_trip(octets in prop::array::uniform4(any::<u8>())) {
                let ip = std::net::IpAddr::V4(octets.into());
                let avp = Avp::new_typed(257, 0, true, AvpDataType::Address, ip).unwrap();
                prop_assert_eq!(avp.data.len(), 6);

                match avp.to_typed(AvpDataType::Address).unwrap() {
                    AvpValue::Address(a) => prop_assert_eq!(a.to_ip(), Some(ip)),
                    other => prop_assert!(false, "expected Address, got {:?}", other),
                }
            }

            #[test]
            fn prop_ipv6_address_typed_round_trip(octets in prop::array::uniform16(any::<u8>())) {
                let ip = std::net::IpAddr::V6(octets.into());
                let avp = Avp::new_typed(257, 0, true, AvpDataType::Address, ip).unwrap();
                prop_assert_eq!(avp.data.len(), 18);

                match avp.to_typed(AvpDataType::Address).unwrap() {
                    AvpValue::Address(a) => prop_assert_eq!(a.to_ip(), Some(ip)),
                    other => prop_assert!(false, "expected Address, got {:?}", other),
                }
            }

            #[test]
            fn prop_grouped_typed_round_trip(inner in prop::collection::vec(arb_avp(), 0..4)) {
                let group =
                    Avp::new_typed(260, 0, true, AvpDataType::Grouped, inner.clone()).unwrap();
                match group.to_typed(AvpDataType::Grouped).unwrap() {
                    AvpValue::Grouped(decoded) => prop_assert_eq!(decoded, inner),
                    other => prop_assert!(false, "expected Grouped, got {:?}", other),
                }
            }
        }
    }

    mod message_props {
        use super::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(200))]

            #[test]
            fn prop_message_round_trip(message in arb_message()) {
                let mut encoded = message.encode();
                let decoded = Message::decode(&mut encoded).unwrap();

                prop_assert_eq!(decoded.version, 1);
                prop_assert_eq!(decoded.flags, message.flags);
                prop_assert_eq!(decoded.code, message.code);
                prop_assert_eq!(decoded.app_id, message.app_id);
                prop_assert_eq!(decoded.hop_by_hop_id, message.hop_by_hop_id);
                prop_assert_eq!(decoded.end_to_end_id, message.end_to_end_id);
                prop_assert_eq!(&decoded.avps, &message.avps);
                prop_assert_eq!(&decoded, &message);
            }

            #[test]
            fn prop_message_length_invariant(message in arb_message()) {
                let avp_total: usize = message.avps.iter().map(|a| a.padded_length).sum();
                prop_assert_eq!(message.length as usize, MSG_HEADER_SIZE + avp_total);
                prop_assert_eq!(message.encode().len(), message.length as usize);
            }

            #[test]
            fn prop_flag_predicates(message in arb_message()) {
                prop_assert_eq!(message.is_request(), message.flags & msg_flags::REQUEST != 0);
                prop_assert_eq!(message.is_answer(), !message.is_request());
                prop_assert_eq!(message.is_proxiable(), message.flags & msg_flags::PROXIABLE != 0);
                prop_assert_eq!(message.is_error(), message.flags & msg_flags::ERROR != 0);
                prop_assert_eq!(
                    message.is_potentially_retransmitted(),
                    message.flags & msg_flags::RETRANSMIT != 0
                );
            }

            #[test]
            fn prop_matching_response_mirrors_identifiers(message in arb_message()) {
                let answer = message.generate_matching_response(vec![], vec![]);
                prop_assert!(answer.is_answer());
                prop_assert_eq!(answer.code, message.code);
                prop_assert_eq!(answer.app_id, message.app_id);
                prop_assert_eq!(answer.hop_by_hop_id, message.hop_by_hop_id);
                prop_assert_eq!(answer.end_to_end_id, message.end_to_end_id);
            }
        }
    }

    mod framer_props {
        use super::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(100))]

            #[test]
            fn prop_chunked_framing_is_idempotent(
                messages in prop::collection::vec(arb_message(), 1..4),
                chunk_len in 1usize..64,
            ) {
                let mut stream = Vec::new();
                for message in &messages {
                    stream.extend_from_slice(&message.encode());
                }

                let mut whole_reader = MessageByteReader::new();
                let at_once = whole_reader.receive_bytes(&stream).unwrap();

                let mut chunked_reader = MessageByteReader::new();
                let mut chunked = Vec::new();
                for chunk in stream.chunks(chunk_len) {
                    chunked.extend(chunked_reader.receive_bytes(chunk).unwrap());
                }

                prop_assert_eq!(at_once.len(), messages.len());
                prop_assert_eq!(&at_once, &chunked);
                prop_assert_eq!(&at_once, &messages);
            }
        }
    }
}
