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

//! Ordered tag-keyed field collections.
//!
//! Two implementations satisfy the same lookup contract: [`FieldMap`] (keyed,
//! fast lookup, rejects duplicate tags outside declared groups) and
//! [`FieldSeq`] (sequenced, retains raw ordering, permits duplicates). The
//! keyed form is the canonical storage for messages.

use std::fmt;

use indexmap::IndexMap;

use crate::{
    error::FieldMapError,
    message::{field::Field, group::Group},
};

/// A field-map entry: a single field or a repeating group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Entry {
    Field(Field),
    Group(Group),
}

impl Entry {
    /// The tag keying this entry (the identifier tag for groups).
    #[must_use]
    pub const fn tag(&self) -> u32 {
        match self {
            Self::Field(field) => field.tag(),
            Self::Group(group) => group.tag(),
        }
    }

    /// Views this entry as a single field.
    #[must_use]
    pub const fn as_field(&self) -> Option<&Field> {
        match self {
            Self::Field(field) => Some(field),
            Self::Group(_) => None,
        }
    }

    /// Views this entry as a repeating group.
    #[must_use]
    pub const fn as_group(&self) -> Option<&Group> {
        match self {
            Self::Field(_) => None,
            Self::Group(group) => Some(group),
        }
    }

    pub(crate) fn to_wire(&self, buf: &mut Vec<u8>) {
        match self {
            Self::Field(field) => field.to_wire(buf),
            Self::Group(group) => group.to_wire(buf),
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(field) => write!(f, "{field}"),
            Self::Group(group) => write!(f, "{group}"),
        }
    }
}

/// The keyed field map: insertion-ordered, unique tags.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldMap {
    entries: IndexMap<u32, Entry>,
}

impl FieldMap {
    /// Creates a new empty [`FieldMap`] instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry, rejecting duplicates.
    ///
    /// # Errors
    ///
    /// Returns an error if an entry with the same tag already exists.
    pub fn insert(&mut self, entry: Entry) -> Result<(), FieldMapError> {
        let tag = entry.tag();
        if self.entries.contains_key(&tag) {
            return Err(FieldMapError::DuplicateTag(tag));
        }
        self.entries.insert(tag, entry);
        Ok(())
    }

    /// Sets an entry, replacing any existing entry with the same tag while
    /// preserving its position.
    pub fn set(&mut self, entry: Entry) {
        self.entries.insert(entry.tag(), entry);
    }

    /// Returns the entry for `tag`, if present.
    #[must_use]
    pub fn get(&self, tag: u32) -> Option<&Entry> {
        self.entries.get(&tag)
    }

    /// Returns the single field at `tag`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag is absent or keys a repeating group.
    pub fn field(&self, tag: u32) -> Result<&Field, FieldMapError> {
        match self.entries.get(&tag) {
            Some(Entry::Field(field)) => Ok(field),
            Some(Entry::Group(_)) => Err(FieldMapError::InvalidGroup(tag)),
            None => Err(FieldMapError::TagNotFound(tag)),
        }
    }

    /// Returns the repeating group at `tag`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag is absent or keys a single field.
    pub fn group(&self, tag: u32) -> Result<&Group, FieldMapError> {
        match self.entries.get(&tag) {
            Some(Entry::Group(group)) => Ok(group),
            Some(Entry::Field(_)) => Err(FieldMapError::InvalidGroup(tag)),
            None => Err(FieldMapError::TagNotFound(tag)),
        }
    }

    /// Whether an entry with `tag` exists.
    #[must_use]
    pub fn contains(&self, tag: u32) -> bool {
        self.entries.contains_key(&tag)
    }

    /// Removes and returns the entry for `tag`, preserving the order of the
    /// remaining entries.
    pub fn remove(&mut self, tag: u32) -> Option<Entry> {
        self.entries.shift_remove(&tag)
    }

    /// Iterates entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    /// The number of top-level entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn to_wire(&self, buf: &mut Vec<u8>) {
        for entry in self.entries.values() {
            entry.to_wire(buf);
        }
    }
}

impl fmt::Display for FieldMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.values().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{entry}")?;
        }
        Ok(())
    }
}

impl FromIterator<Entry> for FieldMap {
    fn from_iter<I: IntoIterator<Item = Entry>>(iter: I) -> Self {
        let mut map = Self::new();
        for entry in iter {
            map.set(entry);
        }
        map
    }
}

/// The sequenced field collection: retains raw wire ordering and permits
/// duplicate tags, at the cost of linear lookup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldSeq {
    entries: Vec<Entry>,
}

impl FieldSeq {
    /// Creates a new empty [`FieldSeq`] instance.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Appends an entry (duplicates permitted).
    pub fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    /// Returns the first entry with `tag`, if present.
    #[must_use]
    pub fn get(&self, tag: u32) -> Option<&Entry> {
        self.entries.iter().find(|e| e.tag() == tag)
    }

    /// Returns the first single field at `tag`.
    ///
    /// # Errors
    ///
    /// Returns an error if no field entry with the tag exists.
    pub fn field(&self, tag: u32) -> Result<&Field, FieldMapError> {
        self.entries
            .iter()
            .find_map(|e| match e {
                Entry::Field(field) if field.tag() == tag => Some(field),
                _ => None,
            })
            .ok_or(FieldMapError::TagNotFound(tag))
    }

    /// Counts entries with the given tag.
    #[must_use]
    pub fn count(&self, tag: u32) -> usize {
        self.entries.iter().filter(|e| e.tag() == tag).count()
    }

    /// Whether an entry with `tag` exists.
    #[must_use]
    pub fn contains(&self, tag: u32) -> bool {
        self.entries.iter().any(|e| e.tag() == tag)
    }

    /// Iterates entries in raw order.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// The number of entries, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the sequence is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<Entry> for FieldSeq {
    fn from_iter<I: IntoIterator<Item = Entry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
