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

//! End-to-end codec scenarios over the public API.

use chrono::{TimeZone, Utc};
use marlin_fix::{
    Message,
    codec::{Decoder, Encoder, GroupTemplates, checksum},
};
use rstest::rstest;

#[rstest]
fn test_encode_logon_frame() {
    let message = Message::from_pairs([
        (35, "A"),
        (34, "1"),
        (49, "SENDER"),
        (52, "20181206-10:24:27.018"),
        (56, "TARGET"),
        (98, "0"),
        (108, "30"),
        (553, "USERNAME"),
        (554, "PASSWORD"),
        (141, "Y"),
    ])
    .unwrap();

    let encoder = Encoder::new("FIX.4.4", "SENDER", "TARGET");
    let now = Utc.with_ymd_and_hms(2018, 12, 6, 10, 24, 27).unwrap()
        + chrono::Duration::milliseconds(18);
    let frame = encoder.encode(&message, now).unwrap();

    assert!(frame.starts_with(b"8=FIX.4.4\x019=99\x0135=A\x0134=1\x0149=SENDER\x01"));

    // The trailer is 10=NNN<SOH> where NNN is the three-digit checksum of
    // everything before it.
    let trailer_start = frame.len() - 7;
    assert_eq!(&frame[trailer_start..trailer_start + 3], b"10=");
    assert_eq!(frame[frame.len() - 1], 0x01);
    let declared: u32 = std::str::from_utf8(&frame[trailer_start + 3..frame.len() - 1])
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(declared, checksum(&frame[..trailer_start]));
}

#[rstest]
fn test_checksum_reference_value() {
    let frame = b"8=FIXT.1.1\x019=75\x0135=A\x0134=1\x0149=ROFX\x01\
        52=20170417-18:29:09.599\x0156=eco\x0198=0\x01108=20\x01141=Y\x011137=9\x01";
    assert_eq!(checksum(frame), 79);
}

#[rstest]
fn test_leading_junk_tolerated() {
    let decoder = Decoder::default();
    let message = decoder
        .decode(b"1=2\x013=4\x018=FIX.4.4\x019=5\x0135=0\x0110=161\x01")
        .unwrap();

    assert_eq!(message.field(8).unwrap().as_str().unwrap(), "FIX.4.4");
    assert!(!message.contains(1));
    assert!(!message.contains(3));
}

#[rstest]
fn test_nested_group_parse() {
    let mut templates = GroupTemplates::new();
    templates.add(539, None, vec![524, 525, 538, 804]).unwrap();
    templates.add(804, None, vec![545, 805]).unwrap();
    let decoder = Decoder::new(templates);

    let data = b"8=FIX.4.4\x019=150\x0135=AE\x01539=2\x01\
        524=PARTY1\x01525=D\x01538=1\x01804=2\x01545=SUB1\x01805=1\x01545=SUB2\x01805=2\x01\
        524=PARTY2\x01525=D\x01538=2\x01804=2\x01545=SUB3\x01805=1\x01545=SUB4\x01805=2\x01\
        10=000\x01";
    let message = decoder.decode(data).unwrap();

    let group = message.group(539).unwrap();
    assert_eq!(group.len(), 2);
    assert_eq!(group.identifier().as_u64().unwrap(), 2);

    let first = group.get(0).unwrap();
    assert_eq!(first.field(524).unwrap().as_str().unwrap(), "PARTY1");
    let inner = first.group(804).unwrap();
    assert_eq!(inner.len(), 2);
    assert_eq!(
        inner.get(1).unwrap().field(545).unwrap().as_str().unwrap(),
        "SUB2"
    );

    let second = group.get(1).unwrap();
    assert_eq!(second.field(524).unwrap().as_str().unwrap(), "PARTY2");
    assert_eq!(second.group(804).unwrap().len(), 2);
}

#[rstest]
fn test_encode_decode_preserves_groups() {
    use marlin_fix::message::{
        field::Field,
        group::Group,
        map::{Entry, FieldMap},
    };

    let mut instance = FieldMap::new();
    instance.set(Entry::Field(Field::new(448, "TRADER")));
    instance.set(Entry::Field(Field::new(452, "11")));
    let group = Group::with_instances(453, vec![448, 447, 452], vec![instance]).unwrap();

    let mut message = Message::from_pairs([(35, "D"), (34, "2"), (55, "EURUSD")]).unwrap();
    message.set_group(group);

    let encoder = Encoder::new("FIX.4.4", "SENDER", "TARGET");
    let frame = encoder.encode(&message, Utc::now()).unwrap();

    let mut templates = GroupTemplates::new();
    templates.add(453, None, vec![448, 447, 452]).unwrap();
    let decoded = Decoder::new(templates).decode(&frame).unwrap();

    let group = decoded.group(453).unwrap();
    assert_eq!(group.len(), 1);
    assert_eq!(
        group.get(0).unwrap().field(448).unwrap().as_str().unwrap(),
        "TRADER"
    );
    assert_eq!(decoded.field(55).unwrap().as_str().unwrap(), "EURUSD");
}
