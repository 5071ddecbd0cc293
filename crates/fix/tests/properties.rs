// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2025 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Property suites for the universal invariants.

use std::{collections::HashMap, sync::Arc};

use marlin_fix::{
    Message, ParseError, Payload, SessionId, Stage,
    codec::{Decoder, Encoder, GroupTemplates, checksum},
    dictionary::MsgType,
    message::{
        field::Field,
        group::Group,
        map::{Entry, FieldMap},
    },
    pipeline::PipelineHandle,
    sequence::SequenceStage,
    store::MemoryStore,
};
use proptest::prelude::*;

/// Application-level tags outside the generated header set.
fn app_tag() -> impl Strategy<Value = u32> {
    prop_oneof![
        Just(1u32),
        Just(11u32),
        Just(38u32),
        Just(40u32),
        Just(44u32),
        Just(54u32),
        Just(55u32),
        Just(58u32),
        Just(60u32),
    ]
}

fn value() -> impl Strategy<Value = String> {
    "[A-Za-z0-9.]{1,12}"
}

fn body_fields() -> impl Strategy<Value = HashMap<u32, String>> {
    proptest::collection::hash_map(app_tag(), value(), 0..6)
}

fn build_message(msg_type: &str, seq: u64, fields: &HashMap<u32, String>) -> Message {
    let mut message = Message::from_pairs([(35, msg_type)]).unwrap();
    message.set(34, seq);
    for (tag, value) in fields {
        message.set(*tag, value.as_str());
    }
    message
}

fn encoder() -> Encoder {
    Encoder::new("FIX.4.4", "SENDER", "TARGET")
}

proptest! {
    /// Decoding an encoded message yields the same tags and values, modulo
    /// the auto-generated header fields.
    #[test]
    fn prop_encode_decode_round_trip(
        fields in body_fields(),
        msg_type in "[A-Z]",
        seq in 1u64..100_000,
    ) {
        let message = build_message(&msg_type, seq, &fields);
        let frame = encoder().encode(&message, chrono::Utc::now()).unwrap();
        let decoded = Decoder::default().decode(&frame).unwrap();

        prop_assert_eq!(decoded.msg_type().unwrap(), msg_type.as_str());
        prop_assert_eq!(decoded.seq_num().unwrap(), seq);
        for (tag, value) in &fields {
            prop_assert_eq!(decoded.field(*tag).unwrap().as_str().unwrap(), value.as_str());
        }
    }

    /// The declared checksum equals the byte sum of the frame before the
    /// checksum field, modulo 256.
    #[test]
    fn prop_checksum_correct(
        fields in body_fields(),
        msg_type in "[A-Z]",
        seq in 1u64..100_000,
    ) {
        let message = build_message(&msg_type, seq, &fields);
        let frame = encoder().encode(&message, chrono::Utc::now()).unwrap();

        let checksum_start = frame.len() - 7;
        let declared: u32 = std::str::from_utf8(&frame[checksum_start + 3..frame.len() - 1])
            .unwrap()
            .parse()
            .unwrap();
        prop_assert_eq!(declared, checksum(&frame[..checksum_start]));
    }

    /// The declared body length equals the byte count between the start of
    /// tag 35 and the start of tag 10.
    #[test]
    fn prop_body_length_correct(
        fields in body_fields(),
        msg_type in "[A-Z]",
        seq in 1u64..100_000,
    ) {
        let message = build_message(&msg_type, seq, &fields);
        let frame = encoder().encode(&message, chrono::Utc::now()).unwrap();
        let text = std::str::from_utf8(&frame).unwrap();

        let declared: usize = text
            .split('\x01')
            .find_map(|f| f.strip_prefix("9="))
            .unwrap()
            .parse()
            .unwrap();
        let body_start = text.find("\x0135=").unwrap() + 1;
        let body_end = text.rfind("\x0110=").unwrap() + 1;
        prop_assert_eq!(declared, body_end - body_start);
    }

    /// Serializing a message to its structural form and back yields an equal
    /// message.
    #[test]
    fn prop_json_round_trip(
        fields in body_fields(),
        msg_type in "[A-Z]",
        seq in 1u64..100_000,
    ) {
        let message = build_message(&msg_type, seq, &fields);
        let json = serde_json::to_string(&message).unwrap();
        let restored: Message = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(restored, message);
    }

    /// Every field inside a parsed group lies in its template, and the
    /// identifier value equals the instance count.
    #[test]
    fn prop_group_template_conformance(
        prefixes in proptest::collection::vec(1usize..=3, 1..5),
        values in proptest::collection::vec("[A-Za-z0-9]{1,8}", 15),
    ) {
        const TEMPLATE: [u32; 3] = [448, 447, 452];

        let mut value_iter = values.iter();
        let instances: Vec<FieldMap> = prefixes
            .iter()
            .map(|&len| {
                let mut instance = FieldMap::new();
                for tag in &TEMPLATE[..len] {
                    let value = value_iter.next().unwrap().as_str();
                    instance.set(Entry::Field(Field::new(*tag, value)));
                }
                instance
            })
            .collect();
        let group = Group::with_instances(453, TEMPLATE.to_vec(), instances).unwrap();

        let mut message = Message::from_pairs([(35, "D"), (34, "1")]).unwrap();
        message.set_group(group);
        let frame = encoder().encode(&message, chrono::Utc::now()).unwrap();

        let mut templates = GroupTemplates::new();
        templates.add(453, None, TEMPLATE.to_vec()).unwrap();
        let decoded = Decoder::new(templates).decode(&frame).unwrap();

        let parsed = decoded.group(453).unwrap();
        prop_assert_eq!(parsed.len(), prefixes.len());
        prop_assert_eq!(parsed.identifier().as_u64().unwrap(), prefixes.len() as u64);
        for instance in parsed.instances() {
            for entry in instance.entries() {
                prop_assert!(TEMPLATE.contains(&entry.tag()));
            }
        }
    }

    /// Parsing any frame with a repeated non-group tag fails.
    #[test]
    fn prop_duplicate_tag_rejected(tag in app_tag(), value in value()) {
        let body = format!("35=D\x01{tag}={value}\x01{tag}={value}\x01");
        let frame = format!("8=FIX.4.4\x019={}\x01{body}10=000\x01", body.len());

        let result = Decoder::default().decode(frame.as_bytes());
        prop_assert_eq!(result.unwrap_err(), ParseError::DuplicateTag(tag));
    }

    /// Outbound stamping yields 1, 2, 3, … with no gaps, and accepted
    /// inbound traffic advances the receive counter by exactly one per
    /// message.
    #[test]
    fn prop_sequence_monotonic(count in 1u64..40) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        rt.block_on(async {
            let (handle, _rx) = PipelineHandle::channel();
            let mut stage = SequenceStage::new(
                handle,
                Arc::new(MemoryStore::new()),
                SessionId::new("SENDER", "TARGET"),
                false,
                false,
            );

            for expected in 1..=count {
                let payload = stage
                    .on_send(Payload::Message(Message::of_type(MsgType::NewOrderSingle)))
                    .await
                    .unwrap();
                let Payload::Message(message) = payload else {
                    panic!("expected message");
                };
                assert_eq!(message.seq_num().unwrap(), expected);
            }

            for seq in 1..=count {
                let mut inbound = Message::of_type(MsgType::ExecutionReport);
                inbound.set(34, seq);
                stage.on_receive(Payload::Message(inbound)).await.unwrap();
                assert_eq!(stage.recv_seq_num(), seq);
            }
        });
    }
}
