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

//! The structural (JSON) form of a message.
//!
//! Used by keyed store backends to persist messages, and round-trippable:
//! serializing a message and deserializing it back yields an equal message,
//! including entry order and nested repeating groups.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::message::{
    Message,
    field::Field,
    group::Group,
    map::{Entry, FieldMap},
};

#[derive(Serialize, Deserialize)]
struct JsonField {
    tag: u32,
    value: String,
}

#[derive(Serialize, Deserialize)]
struct JsonGroup {
    tag: u32,
    template: Vec<u32>,
    instances: Vec<Vec<JsonEntry>>,
}

// Untagged: groups are distinguished by their `template` member.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum JsonEntry {
    Group(JsonGroup),
    Field(JsonField),
}

fn entry_to_json(entry: &Entry) -> JsonEntry {
    match entry {
        Entry::Field(field) => JsonEntry::Field(JsonField {
            tag: field.tag(),
            value: String::from_utf8_lossy(field.value().as_bytes()).into_owned(),
        }),
        Entry::Group(group) => JsonEntry::Group(JsonGroup {
            tag: group.tag(),
            template: group.template().to_vec(),
            instances: group
                .instances()
                .iter()
                .map(|instance| instance.entries().map(entry_to_json).collect())
                .collect(),
        }),
    }
}

fn entry_from_json(entry: JsonEntry) -> Result<Entry, String> {
    match entry {
        JsonEntry::Field(field) => Ok(Entry::Field(Field::new(field.tag, field.value))),
        JsonEntry::Group(group) => {
            let identifier = Field::new(group.tag, group.instances.len() as u64);
            let mut out = Group::new(identifier, group.template);
            for instance in group.instances {
                let mut map = FieldMap::new();
                for entry in instance {
                    map.set(entry_from_json(entry)?);
                }
                out.push_instance(map).map_err(|e| e.to_string())?;
            }
            Ok(Entry::Group(out))
        }
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries: Vec<JsonEntry> = self.entries().map(entry_to_json).collect();
        entries.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = Vec::<JsonEntry>::deserialize(deserializer)?;
        let mut map = FieldMap::new();
        for entry in entries {
            map.set(entry_from_json(entry).map_err(serde::de::Error::custom)?);
        }
        Ok(Self::from_field_map(map))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::message::{Message, field::Field, group::Group, map::{Entry, FieldMap}};

    #[rstest]
    fn test_json_round_trip_flat() {
        let message =
            Message::from_pairs([(35, "D"), (55, "EURUSD"), (54, "1"), (38, "1000")]).unwrap();

        let json = serde_json::to_string(&message).unwrap();
        let restored: Message = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, message);
    }

    #[rstest]
    fn test_json_round_trip_nested_groups() {
        let mut inner_instance = FieldMap::new();
        inner_instance.set(Entry::Field(Field::new(545, "SUB")));
        inner_instance.set(Entry::Field(Field::new(805, "1")));
        let inner = Group::with_instances(804, vec![545, 805], vec![inner_instance]).unwrap();

        let mut outer_instance = FieldMap::new();
        outer_instance.set(Entry::Field(Field::new(524, "PARTY")));
        outer_instance.set(Entry::Group(inner));
        let outer =
            Group::with_instances(539, vec![524, 525, 538, 804], vec![outer_instance]).unwrap();

        let mut message = Message::from_pairs([(35, "8"), (55, "EURUSD")]).unwrap();
        message.set_group(outer);

        let json = serde_json::to_string(&message).unwrap();
        let restored: Message = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, message);
        let group = restored.group(539).unwrap();
        assert_eq!(group.len(), 1);
        assert_eq!(group.get(0).unwrap().group(804).unwrap().len(), 1);
    }

    #[rstest]
    fn test_json_preserves_entry_order() {
        let message = Message::from_pairs([(35, "0"), (112, "probe"), (58, "txt")]).unwrap();
        let json = serde_json::to_string(&message).unwrap();
        let restored: Message = serde_json::from_str(&json).unwrap();

        let tags: Vec<u32> = restored.entries().map(crate::message::map::Entry::tag).collect();
        assert_eq!(tags, vec![35, 112, 58]);
    }
}
