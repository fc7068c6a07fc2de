use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Directive appended to every opening prompt so the model produces an
/// in-character greeting instead of answering user text.
pub const GREETING_DIRECTIVE: &str =
    "Please provide your initial greeting based on your character settings.";

/// The attributes that can be excluded from prompt composition. `File`
/// carries no text; it gates whether the character's reference file is
/// attached to the opening turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharacterField {
    Name,
    Description,
    Personality,
    Appearance,
    ResponseGuidelines,
    File,
}

impl CharacterField {
    pub fn label(self) -> &'static str {
        match self {
            CharacterField::Name => "Name",
            CharacterField::Description => "Description",
            CharacterField::Personality => "Personality",
            CharacterField::Appearance => "Appearance",
            CharacterField::ResponseGuidelines => "Response Guidelines",
            CharacterField::File => "File",
        }
    }
}

/// Per-attribute exclusion flags. A `true` flag removes the attribute
/// from the composed prompt and from required-field validation.
///
/// Every flag defaults to `false` on deserialization, so characters
/// stored before an attribute existed come back fully enabled.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisabledFields {
    #[serde(default)]
    pub name: bool,
    #[serde(default)]
    pub description: bool,
    #[serde(default)]
    pub personality: bool,
    #[serde(default)]
    pub appearance: bool,
    #[serde(default)]
    pub response_guidelines: bool,
    #[serde(default)]
    pub file: bool,
}

impl DisabledFields {
    pub fn is_disabled(&self, field: CharacterField) -> bool {
        match field {
            CharacterField::Name => self.name,
            CharacterField::Description => self.description,
            CharacterField::Personality => self.personality,
            CharacterField::Appearance => self.appearance,
            CharacterField::ResponseGuidelines => self.response_guidelines,
            CharacterField::File => self.file,
        }
    }

    /// Flips the flag for one attribute, leaving the others untouched.
    pub fn toggle(&mut self, field: CharacterField) {
        let flag = match field {
            CharacterField::Name => &mut self.name,
            CharacterField::Description => &mut self.description,
            CharacterField::Personality => &mut self.personality,
            CharacterField::Appearance => &mut self.appearance,
            CharacterField::ResponseGuidelines => &mut self.response_guidelines,
            CharacterField::File => &mut self.file,
        };
        *flag = !*flag;
    }

    /// A text attribute must be non-empty on save iff it is enabled.
    pub fn is_required(&self, field: CharacterField) -> bool {
        !self.is_disabled(field)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub personality: String,
    pub appearance: String,
    pub response_guidelines: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default, rename = "disabled_states")]
    pub disabled: DisabledFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Identity attributes in their fixed prompt order.
const IDENTITY_FIELDS: [CharacterField; 4] = [
    CharacterField::Name,
    CharacterField::Description,
    CharacterField::Personality,
    CharacterField::Appearance,
];

/// Text attributes subject to required-field validation.
const TEXT_FIELDS: [CharacterField; 5] = [
    CharacterField::Name,
    CharacterField::Description,
    CharacterField::Personality,
    CharacterField::Appearance,
    CharacterField::ResponseGuidelines,
];

impl Character {
    fn field_value(&self, field: CharacterField) -> Option<&str> {
        match field {
            CharacterField::Name => Some(&self.name),
            CharacterField::Description => Some(&self.description),
            CharacterField::Personality => Some(&self.personality),
            CharacterField::Appearance => Some(&self.appearance),
            CharacterField::ResponseGuidelines => Some(&self.response_guidelines),
            CharacterField::File => None,
        }
    }

    /// Composes the synthetic first-turn message sent to the model when
    /// a chat session opens.
    ///
    /// Layout: a `=== CHARACTER IDENTITY ===` block of `Label: value`
    /// lines (an attribute contributes a line iff its trimmed value is
    /// non-empty and it is not disabled), a `=== RESPONSE GUIDELINES ===`
    /// block with the raw guideline text, and the greeting directive. A
    /// block is omitted entirely when it would have no content, so a
    /// maximally empty character yields just the directive line. Pure
    /// function of the character: no randomness, no timestamps.
    pub fn opening_prompt(&self) -> String {
        let mut sections: Vec<String> = Vec::new();

        let identity: Vec<String> = IDENTITY_FIELDS
            .iter()
            .filter_map(|&field| {
                let value = self.field_value(field)?;
                if value.trim().is_empty() || self.disabled.is_disabled(field) {
                    return None;
                }
                Some(format!("{}: {}", field.label(), value))
            })
            .collect();

        if !identity.is_empty() {
            sections.push("=== CHARACTER IDENTITY ===".to_string());
            sections.extend(identity);
            sections.push(String::new());
        }

        if !self.response_guidelines.trim().is_empty()
            && !self.disabled.is_disabled(CharacterField::ResponseGuidelines)
        {
            sections.push("=== RESPONSE GUIDELINES ===".to_string());
            sections.push(self.response_guidelines.clone());
            sections.push(String::new());
        }

        sections.push(GREETING_DIRECTIVE.to_string());
        sections.join("\n")
    }

    /// Checks that every enabled text attribute is non-empty.
    pub fn validate(&self) -> Result<(), CharacterValidationError> {
        let missing: Vec<&'static str> = TEXT_FIELDS
            .iter()
            .filter(|&&field| {
                self.disabled.is_required(field)
                    && self
                        .field_value(field)
                        .is_some_and(|value| value.trim().is_empty())
            })
            .map(|&field| field.label())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CharacterValidationError { fields: missing })
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("missing required fields: {}", .fields.join(", "))]
pub struct CharacterValidationError {
    pub fields: Vec<&'static str>,
}

/// Payload for creating a character, and for full replacement on update.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CreateCharacterRequest {
    pub name: String,
    pub description: String,
    pub personality: String,
    pub appearance: String,
    #[serde(default)]
    pub response_guidelines: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default, rename = "disabled_states")]
    pub disabled: DisabledFields,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_character() -> Character {
        let now = Utc::now();
        Character {
            id: Uuid::new_v4(),
            name: String::new(),
            description: String::new(),
            personality: String::new(),
            appearance: String::new(),
            response_guidelines: String::new(),
            avatar_url: None,
            file_url: None,
            disabled: DisabledFields::default(),
            created_at: now,
            updated_at: now,
        }
    }

    fn aria() -> Character {
        Character {
            name: "Aria".to_string(),
            description: "A sarcastic robot.".to_string(),
            response_guidelines: "Be brief.".to_string(),
            ..blank_character()
        }
    }

    #[test]
    fn empty_character_composes_directive_only() {
        assert_eq!(blank_character().opening_prompt(), GREETING_DIRECTIVE);
    }

    #[test]
    fn fully_disabled_character_composes_directive_only() {
        let mut character = aria();
        character.personality = "Cheerful".to_string();
        character.appearance = "Tall".to_string();
        for field in [
            CharacterField::Name,
            CharacterField::Description,
            CharacterField::Personality,
            CharacterField::Appearance,
            CharacterField::ResponseGuidelines,
        ] {
            character.disabled.toggle(field);
        }
        assert_eq!(character.opening_prompt(), GREETING_DIRECTIVE);
    }

    #[test]
    fn composes_identity_and_guideline_blocks() {
        let expected = "=== CHARACTER IDENTITY ===\n\
                        Name: Aria\n\
                        Description: A sarcastic robot.\n\
                        \n\
                        === RESPONSE GUIDELINES ===\n\
                        Be brief.\n\
                        \n\
                        Please provide your initial greeting based on your character settings.";
        assert_eq!(aria().opening_prompt(), expected);
    }

    #[test]
    fn disabling_description_removes_only_that_line() {
        let mut character = aria();
        character.disabled.toggle(CharacterField::Description);

        let prompt = character.opening_prompt();
        assert!(prompt.contains("Name: Aria"));
        assert!(!prompt.contains("Description:"));
        assert!(prompt.contains("Be brief."));
    }

    #[test]
    fn disabling_name_keeps_other_identity_lines() {
        let mut character = aria();
        character.personality = "Dry wit".to_string();
        character.disabled.toggle(CharacterField::Name);

        let prompt = character.opening_prompt();
        assert!(!prompt.contains("Name: Aria"));
        assert!(prompt.contains("Description: A sarcastic robot."));
        assert!(prompt.contains("Personality: Dry wit"));
    }

    #[test]
    fn whitespace_only_field_is_excluded() {
        let mut character = aria();
        character.appearance = "   ".to_string();
        assert!(!character.opening_prompt().contains("Appearance:"));
    }

    #[test]
    fn composition_is_deterministic() {
        let character = aria();
        assert_eq!(character.opening_prompt(), character.opening_prompt());
    }

    #[test]
    fn toggle_flips_single_flag() {
        let mut disabled = DisabledFields::default();
        disabled.toggle(CharacterField::Name);
        assert!(disabled.name);
        assert_eq!(
            DisabledFields {
                name: true,
                ..DisabledFields::default()
            },
            disabled
        );

        disabled.toggle(CharacterField::Name);
        assert_eq!(disabled, DisabledFields::default());
    }

    #[test]
    fn disabled_states_default_to_enabled() {
        // Payload shaped like a character stored before disabled_states existed.
        let json = r#"{
            "id": "7f8d3b64-0c0a-4a8f-9e6f-0e6f66dc8a11",
            "name": "Aria",
            "description": "A sarcastic robot.",
            "personality": "Dry",
            "appearance": "Chrome",
            "response_guidelines": "Be brief.",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        }"#;
        let character: Character = serde_json::from_str(json).unwrap();
        assert_eq!(character.disabled, DisabledFields::default());
    }

    #[test]
    fn validation_requires_enabled_fields() {
        let character = aria();
        let err = character.validate().unwrap_err();
        assert_eq!(err.fields, vec!["Personality", "Appearance"]);
    }

    #[test]
    fn validation_accepts_disabled_empty_fields() {
        let mut character = aria();
        character.disabled.toggle(CharacterField::Personality);
        character.disabled.toggle(CharacterField::Appearance);
        assert!(character.validate().is_ok());
    }
}
