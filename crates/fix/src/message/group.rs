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

//! Repeating groups: a count field followed by a templated sequence of field
//! sets, repeated count times. Instances may themselves contain nested groups.

use std::fmt;

use crate::{
    error::ValidationError,
    message::{field::Field, map::FieldMap},
};

/// A repeating group of field-map instances under a `NoXxx` identifier field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    identifier: Field,
    template: Vec<u32>,
    instances: Vec<FieldMap>,
}

impl Group {
    /// Creates a new empty [`Group`] with the given identifier field and
    /// instance template.
    #[must_use]
    pub const fn new(identifier: Field, template: Vec<u32>) -> Self {
        Self {
            identifier,
            template,
            instances: Vec::new(),
        }
    }

    /// Creates a [`Group`] from complete instances, deriving the identifier
    /// value from the instance count.
    ///
    /// # Errors
    ///
    /// Returns an error if any instance contains a tag outside the template.
    pub fn with_instances(
        identifier_tag: u32,
        template: Vec<u32>,
        instances: Vec<FieldMap>,
    ) -> Result<Self, ValidationError> {
        let identifier = Field::new(identifier_tag, instances.len() as u64);
        let mut group = Self::new(identifier, template);
        for instance in instances {
            group.push_instance(instance)?;
        }
        Ok(group)
    }

    /// The group identifier (count) field.
    #[must_use]
    pub const fn identifier(&self) -> &Field {
        &self.identifier
    }

    /// The identifier tag number.
    #[must_use]
    pub const fn tag(&self) -> u32 {
        self.identifier.tag()
    }

    /// The ordered instance template.
    #[must_use]
    pub fn template(&self) -> &[u32] {
        &self.template
    }

    /// The group instances.
    #[must_use]
    pub fn instances(&self) -> &[FieldMap] {
        &self.instances
    }

    /// Returns the instance at `index`, if present.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&FieldMap> {
        self.instances.get(index)
    }

    /// The number of instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether the group has no instances.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Appends an instance.
    ///
    /// Instances may be partial (missing optional trailing tags) but must not
    /// contain out-of-template tags.
    ///
    /// # Errors
    ///
    /// Returns an error if the instance contains a tag outside the template.
    pub fn push_instance(&mut self, instance: FieldMap) -> Result<(), ValidationError> {
        for entry in instance.entries() {
            if !self.template.contains(&entry.tag()) {
                return Err(ValidationError::BadGroupTemplate(format!(
                    "tag {} not in template for group {}",
                    entry.tag(),
                    self.identifier.tag(),
                )));
            }
        }
        self.instances.push(instance);
        Ok(())
    }

    /// Validates that the identifier value equals the instance count.
    ///
    /// # Errors
    ///
    /// Returns an error on a count mismatch or a non-numeric identifier value.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let declared = self.identifier.as_u64()?;
        if declared != self.instances.len() as u64 {
            return Err(ValidationError::InvalidValue {
                tag: self.identifier.tag(),
                reason: format!(
                    "declared {declared} group instances, parsed {}",
                    self.instances.len()
                ),
            });
        }
        Ok(())
    }

    /// Appends the identifier and all instances in wire form to `buf`.
    pub(crate) fn to_wire(&self, buf: &mut Vec<u8>) {
        self.identifier.to_wire(buf);
        for instance in &self.instances {
            instance.to_wire(buf);
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [", self.identifier)?;
        for (i, instance) in self.instances.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{instance}")?;
        }
        write!(f, "]")
    }
}
