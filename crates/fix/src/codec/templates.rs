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

//! Repeating-group templates.
//!
//! A mapping `identifier_tag → (message_type ⇒ instance_template)`, where the
//! message type `"*"` provides a default. Group templates may be
//! message-type-specific because the same identifier tag can carry different
//! instance layouts per message type.

use indexmap::IndexMap;

use crate::error::{ConfigError, ValidationError};

/// The wildcard message type matching any message.
pub const ANY_MSG_TYPE: &str = "*";

/// The set of declared repeating-group templates.
#[derive(Clone, Debug, Default)]
pub struct GroupTemplates {
    templates: IndexMap<u32, IndexMap<String, Vec<u32>>>,
}

impl GroupTemplates {
    /// Creates a new empty [`GroupTemplates`] instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a template for `identifier_tag`, scoped to `msg_type`
    /// (`None` declares the `"*"` default).
    ///
    /// # Errors
    ///
    /// Returns an error if the template is empty.
    pub fn add(
        &mut self,
        identifier_tag: u32,
        msg_type: Option<&str>,
        template: Vec<u32>,
    ) -> Result<(), ValidationError> {
        if template.is_empty() {
            return Err(ValidationError::BadGroupTemplate(format!(
                "at least one instance tag must be defined for group {identifier_tag}"
            )));
        }
        self.templates
            .entry(identifier_tag)
            .or_default()
            .insert(msg_type.unwrap_or(ANY_MSG_TYPE).to_string(), template);
        Ok(())
    }

    /// Removes all templates for `identifier_tag`.
    pub fn remove(&mut self, identifier_tag: u32) {
        self.templates.shift_remove(&identifier_tag);
    }

    /// Whether `tag` is a declared group identifier for any message type.
    #[must_use]
    pub fn is_identifier(&self, tag: u32) -> bool {
        self.templates.contains_key(&tag)
    }

    /// Returns the instance template for `tag` within a message of
    /// `msg_type`, falling back to the `"*"` default.
    #[must_use]
    pub fn template_for(&self, tag: u32, msg_type: &str) -> Option<&[u32]> {
        let by_type = self.templates.get(&tag)?;
        by_type
            .get(msg_type)
            .or_else(|| by_type.get(ANY_MSG_TYPE))
            .map(Vec::as_slice)
    }

    /// Parses templates from their JSON configuration form:
    /// `{"539": {"*": [524, 525, 538, 804]}, "804": {"*": [545, 805]}}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a key is not a tag number.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid {
            key: "group_templates".to_string(),
            reason,
        };

        let parsed: IndexMap<String, IndexMap<String, Vec<u32>>> =
            serde_json::from_str(json).map_err(|e| invalid(e.to_string()))?;

        let mut templates = Self::new();
        for (tag, by_type) in parsed {
            let tag: u32 = tag
                .parse()
                .map_err(|_| invalid(format!("'{tag}' is not a tag number")))?;
            for (msg_type, template) in by_type {
                templates
                    .add(tag, Some(&msg_type), template)
                    .map_err(|e| invalid(e.to_string()))?;
            }
        }
        Ok(templates)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_wildcard_fallback() {
        let mut templates = GroupTemplates::new();
        templates.add(453, None, vec![448, 447, 452]).unwrap();
        templates.add(453, Some("8"), vec![448]).unwrap();

        assert!(templates.is_identifier(453));
        assert_eq!(templates.template_for(453, "8").unwrap(), &[448]);
        assert_eq!(templates.template_for(453, "D").unwrap(), &[448, 447, 452]);
        assert!(templates.template_for(268, "D").is_none());
    }

    #[rstest]
    fn test_type_specific_only() {
        let mut templates = GroupTemplates::new();
        templates.add(268, Some("W"), vec![269, 270, 271]).unwrap();

        assert!(templates.is_identifier(268));
        assert!(templates.template_for(268, "W").is_some());
        assert!(templates.template_for(268, "D").is_none());
    }

    #[rstest]
    fn test_empty_template_rejected() {
        let mut templates = GroupTemplates::new();
        assert!(templates.add(453, None, vec![]).is_err());
    }

    #[rstest]
    fn test_from_json() {
        let templates =
            GroupTemplates::from_json(r#"{"539": {"*": [524, 525, 538, 804]}, "804": {"*": [545, 805]}}"#)
                .unwrap();

        assert_eq!(
            templates.template_for(539, "AE").unwrap(),
            &[524, 525, 538, 804]
        );
        assert_eq!(templates.template_for(804, "AE").unwrap(), &[545, 805]);
    }

    #[rstest]
    fn test_from_json_rejects_bad_key() {
        assert!(GroupTemplates::from_json(r#"{"abc": {"*": [1]}}"#).is_err());
    }
}
