//! Core types for formkit
//!
//! Defines the data model shared by the builder and the public filling flow:
//! - Forms, cards and fields (with type-specific attributes)
//! - Form summaries returned by listings
//! - Answer mappings collected from respondents

use crate::ids::IdGenerator;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Message stored in the error map for a required field left empty
pub const REQUIRED_MESSAGE: &str = "This field is required.";

/// Publication status of a form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormStatus {
    /// Being edited, not reachable by respondents
    #[default]
    Draft,
    /// Accepting submissions
    Published,
    /// Closed and kept for reference
    Archived,
}

impl fmt::Display for FormStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        };
        f.write_str(s)
    }
}

/// Share-preview metadata edited on the settings page
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OgMetadata {
    /// Page title used in previews
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Description used in search results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Featured image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// A form definition, and the builder's working copy of it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    /// Form identifier
    #[serde(alias = "id")]
    pub form_id: String,
    /// Display name
    pub name: String,
    /// Optional description shown above the first card
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Publication status
    #[serde(default)]
    pub status: FormStatus,
    /// Ordered cards (pages)
    #[serde(default)]
    pub cards: Vec<Card>,
    /// Whether one browser may submit more than once (absent means yes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_submissions: Option<bool>,
    /// Share-preview metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub og_metadata: Option<OgMetadata>,
    /// Creation time, set by the service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time, set by the service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Form {
    /// Create a new draft holding a single empty card
    #[must_use]
    pub fn new(form_id: impl Into<String>, name: impl Into<String>, ids: &dyn IdGenerator) -> Self {
        Self {
            form_id: form_id.into(),
            name: name.into(),
            description: None,
            status: FormStatus::Draft,
            cards: vec![Card::new(ids.generate(), "Untitled card")],
            multiple_submissions: None,
            og_metadata: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Whether respondents may start another submission after finishing one
    #[inline]
    #[must_use]
    pub fn allows_multiple_submissions(&self) -> bool {
        self.multiple_submissions.unwrap_or(true)
    }

    /// Iterate every field in card order
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.cards.iter().flat_map(|card| card.fields.iter())
    }

    /// Field identifiers that collect an answer, in card order
    #[must_use]
    pub fn answerable_field_ids(&self) -> Vec<&str> {
        self.fields()
            .filter(|f| f.collects_answer())
            .map(|f| f.field_id.as_str())
            .collect()
    }

    /// An answer mapping with an empty string for every answerable field
    #[must_use]
    pub fn blank_answers(&self) -> Answers {
        self.answerable_field_ids()
            .into_iter()
            .map(|id| (id.to_string(), String::new()))
            .collect()
    }

    /// Find a card by id
    #[must_use]
    pub fn card(&self, card_id: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.card_id == card_id)
    }

    /// Find a card by id, mutably
    pub fn card_mut(&mut self, card_id: &str) -> Option<&mut Card> {
        self.cards.iter_mut().find(|c| c.card_id == card_id)
    }

    /// Position of a card
    #[must_use]
    pub fn card_index(&self, card_id: &str) -> Option<usize> {
        self.cards.iter().position(|c| c.card_id == card_id)
    }

    /// Find a field anywhere in the form
    #[must_use]
    pub fn field(&self, field_id: &str) -> Option<&Field> {
        self.fields().find(|f| f.field_id == field_id)
    }

    /// Find a field anywhere in the form, mutably
    pub fn field_mut(&mut self, field_id: &str) -> Option<&mut Field> {
        self.cards
            .iter_mut()
            .flat_map(|c| c.fields.iter_mut())
            .find(|f| f.field_id == field_id)
    }
}

/// One page of a form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Card identifier (client-generated for new cards)
    #[serde(alias = "id")]
    pub card_id: String,
    /// Card heading
    #[serde(default)]
    pub title: String,
    /// Optional body text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ordered fields
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Card {
    /// Create an empty card
    #[inline]
    #[must_use]
    pub fn new(card_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            card_id: card_id.into(),
            title: title.into(),
            description: None,
            fields: Vec::new(),
        }
    }

    /// With a field appended
    #[inline]
    #[must_use]
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Find a field on this card
    #[must_use]
    pub fn field(&self, field_id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.field_id == field_id)
    }
}

/// One question or content block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Field identifier, the key of its answer
    #[serde(alias = "id")]
    pub field_id: String,
    /// Question text
    #[serde(default)]
    pub label: String,
    /// Helper text; the body of a static block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether an answer is required before moving on
    #[serde(rename = "isRequired", default)]
    pub required: bool,
    /// Type and type-specific attributes
    #[serde(flatten)]
    pub kind: FieldKind,
}

impl Field {
    /// Create a field of the given type with the defaults the type selector uses
    #[must_use]
    pub fn with_defaults(field_id: impl Into<String>, field_type: FieldType) -> Self {
        let label = if field_type == FieldType::Static {
            "Untitled block"
        } else {
            "Untitled question"
        };
        Self {
            field_id: field_id.into(),
            label: label.to_string(),
            description: None,
            required: false,
            kind: FieldKind::default_for(field_type),
        }
    }

    /// Mark the field as required
    #[inline]
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// With a label
    #[inline]
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Field type discriminant
    #[inline]
    #[must_use]
    pub fn field_type(&self) -> FieldType {
        self.kind.field_type()
    }

    /// Static blocks display content and never hold an answer
    #[inline]
    #[must_use]
    pub fn collects_answer(&self) -> bool {
        !matches!(self.kind, FieldKind::Static { .. })
    }

    /// Choice options, if this is a choice field
    #[must_use]
    pub fn options(&self) -> Option<&[String]> {
        match &self.kind {
            FieldKind::MultipleChoice { options } | FieldKind::MultipleSelect { options } => {
                Some(options)
            }
            _ => None,
        }
    }
}

/// Field type with its type-specific attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// Single line text
    ShortText,
    /// Multi-line text
    LongText,
    /// Email address
    Email,
    /// Phone number
    Phone,
    /// Numeric input with optional bounds
    Number {
        /// Lower bound
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        /// Upper bound
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    /// Website URL
    Url,
    /// Calendar date
    Date,
    /// Date and time
    Timestamp,
    /// Boolean choice
    YesNo,
    /// Single selection from options
    MultipleChoice {
        /// Available options (never empty)
        #[serde(default)]
        options: Vec<String>,
    },
    /// Several selections from options
    MultipleSelect {
        /// Available options (never empty)
        #[serde(default)]
        options: Vec<String>,
    },
    /// Display-only content
    Static {
        /// Block heading
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        /// Image URL
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image: Option<String>,
    },
}

impl FieldKind {
    /// Default attributes for a newly added field
    #[must_use]
    pub fn default_for(field_type: FieldType) -> Self {
        match field_type {
            FieldType::ShortText => Self::ShortText,
            FieldType::LongText => Self::LongText,
            FieldType::Email => Self::Email,
            FieldType::Phone => Self::Phone,
            FieldType::Number => Self::Number { min: None, max: None },
            FieldType::Url => Self::Url,
            FieldType::Date => Self::Date,
            FieldType::Timestamp => Self::Timestamp,
            FieldType::YesNo => Self::YesNo,
            FieldType::MultipleChoice => Self::MultipleChoice {
                options: vec!["Yes".to_string(), "No".to_string()],
            },
            FieldType::MultipleSelect => Self::MultipleSelect {
                options: vec!["Option 1".to_string()],
            },
            FieldType::Static => Self::Static {
                title: None,
                image: None,
            },
        }
    }

    /// Discriminant of this kind
    #[must_use]
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::ShortText => FieldType::ShortText,
            Self::LongText => FieldType::LongText,
            Self::Email => FieldType::Email,
            Self::Phone => FieldType::Phone,
            Self::Number { .. } => FieldType::Number,
            Self::Url => FieldType::Url,
            Self::Date => FieldType::Date,
            Self::Timestamp => FieldType::Timestamp,
            Self::YesNo => FieldType::YesNo,
            Self::MultipleChoice { .. } => FieldType::MultipleChoice,
            Self::MultipleSelect { .. } => FieldType::MultipleSelect,
            Self::Static { .. } => FieldType::Static,
        }
    }
}

/// Field type without attributes, as offered by the type selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Single line text
    ShortText,
    /// Multi-line text
    LongText,
    /// Email address
    Email,
    /// Phone number
    Phone,
    /// Number
    Number,
    /// URL
    Url,
    /// Date
    Date,
    /// Timestamp
    Timestamp,
    /// Yes/No
    YesNo,
    /// Multiple choice
    MultipleChoice,
    /// Multiple select
    MultipleSelect,
    /// Static content
    Static,
}

impl FieldType {
    /// Every type, in selector order
    pub const ALL: [FieldType; 12] = [
        FieldType::ShortText,
        FieldType::LongText,
        FieldType::Email,
        FieldType::Phone,
        FieldType::Number,
        FieldType::Url,
        FieldType::Date,
        FieldType::Timestamp,
        FieldType::YesNo,
        FieldType::MultipleChoice,
        FieldType::MultipleSelect,
        FieldType::Static,
    ];

    /// Wire name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShortText => "short_text",
            Self::LongText => "long_text",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Number => "number",
            Self::Url => "url",
            Self::Date => "date",
            Self::Timestamp => "timestamp",
            Self::YesNo => "yes_no",
            Self::MultipleChoice => "multiple_choice",
            Self::MultipleSelect => "multiple_select",
            Self::Static => "static",
        }
    }

    /// Choice types carry an option list
    #[inline]
    #[must_use]
    pub fn is_choice(&self) -> bool {
        matches!(self, Self::MultipleChoice | Self::MultipleSelect)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown field type: {s}"))
    }
}

/// Listing entry for a form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSummary {
    /// Form identifier
    #[serde(alias = "id")]
    pub form_id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Publication status
    #[serde(default)]
    pub status: FormStatus,
    /// Creation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Form> for FormSummary {
    fn from(form: &Form) -> Self {
        Self {
            form_id: form.form_id.clone(),
            name: form.name.clone(),
            status: form.status,
            created_at: form.created_at,
            updated_at: form.updated_at,
        }
    }
}

/// Answers keyed by field id, in form order
///
/// Multi-select answers are stored comma-joined.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Answers(IndexMap<String, String>);

impl Answers {
    /// Create an empty mapping
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prior values laid over blank defaults
    ///
    /// Fields missing from `prior` keep their blank value instead of
    /// disappearing from the mapping.
    #[must_use]
    pub fn merged_over(blank: &Answers, prior: Answers) -> Self {
        let mut merged = blank.clone();
        for (field_id, value) in prior.0 {
            merged.0.insert(field_id, value);
        }
        merged
    }

    /// Value for a field
    #[inline]
    #[must_use]
    pub fn get(&self, field_id: &str) -> Option<&str> {
        self.0.get(field_id).map(String::as_str)
    }

    /// Set a value
    pub fn set(&mut self, field_id: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field_id.into(), value.into());
    }

    /// Set a multi-select value from its selected options
    pub fn set_selection<S: AsRef<str>>(&mut self, field_id: impl Into<String>, selected: &[S]) {
        let joined = selected
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(",");
        self.set(field_id, joined);
    }

    /// Selected options of a multi-select value
    #[must_use]
    pub fn selection(&self, field_id: &str) -> Vec<&str> {
        self.get(field_id)
            .map(|v| v.split(',').filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }

    /// Absent or empty
    #[inline]
    #[must_use]
    pub fn is_empty_value(&self, field_id: &str) -> bool {
        self.get(field_id).map_or(true, str::is_empty)
    }

    /// Whether any value holds more than whitespace
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.0.values().any(|v| !v.trim().is_empty())
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// No entries at all
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate entries in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Underlying map
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> IndexMap<String, String> {
        self.0
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Answers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use pretty_assertions::assert_eq;

    fn sample_form() -> Form {
        let ids = SequentialIds::new("card");
        let mut form = Form::new("f1", "Survey", &ids);
        form.cards[0].fields.push(Field::with_defaults("a", FieldType::ShortText));
        form.cards[0].fields.push(Field::with_defaults("intro", FieldType::Static));
        form.cards.push(Card::new("c2", "Second").with_field(Field::with_defaults("b", FieldType::Email)));
        form
    }

    #[test]
    fn new_form_has_one_card() {
        let ids = SequentialIds::new("card");
        let form = Form::new("f1", "Survey", &ids);
        assert_eq!(form.cards.len(), 1);
        assert_eq!(form.status, FormStatus::Draft);
        assert!(form.allows_multiple_submissions());
    }

    #[test]
    fn blank_answers_skip_static_blocks() {
        let form = sample_form();
        let blank = form.blank_answers();
        assert_eq!(blank.iter().collect::<Vec<_>>(), vec![("a", ""), ("b", "")]);
    }

    #[test]
    fn merged_over_keeps_missing_fields() {
        let blank: Answers = [("a", ""), ("b", ""), ("c", "")].into_iter().collect();
        let prior: Answers = [("a", "1"), ("b", "2")].into_iter().collect();

        let merged = Answers::merged_over(&blank, prior);
        let expected: Answers = [("a", "1"), ("b", "2"), ("c", "")].into_iter().collect();
        assert_eq!(merged, expected);
    }

    #[test]
    fn selection_is_comma_joined() {
        let mut answers = Answers::new();
        answers.set_selection("colors", &["red", "blue"]);
        assert_eq!(answers.get("colors"), Some("red,blue"));
        assert_eq!(answers.selection("colors"), vec!["red", "blue"]);
    }

    #[test]
    fn has_content_ignores_whitespace() {
        let answers: Answers = [("a", "  "), ("b", "")].into_iter().collect();
        assert!(!answers.has_content());
        let answers: Answers = [("a", "x")].into_iter().collect();
        assert!(answers.has_content());
    }

    #[test]
    fn field_wire_format() {
        let field = Field::with_defaults("q1", FieldType::MultipleChoice).required();
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["fieldId"], "q1");
        assert_eq!(json["type"], "multiple_choice");
        assert_eq!(json["isRequired"], true);
        assert_eq!(json["options"], serde_json::json!(["Yes", "No"]));
    }

    #[test]
    fn form_accepts_id_aliases() {
        let json = serde_json::json!({
            "id": "f9",
            "name": "Signup",
            "status": "published",
            "multipleSubmissions": false,
            "cards": [{
                "id": "c1",
                "title": "About you",
                "fields": [
                    { "id": "n", "label": "Name", "type": "short_text", "isRequired": true },
                    { "fieldId": "age", "label": "Age", "type": "number", "min": 0.0 }
                ]
            }]
        });
        let form: Form = serde_json::from_value(json).unwrap();
        assert_eq!(form.form_id, "f9");
        assert_eq!(form.status, FormStatus::Published);
        assert!(!form.allows_multiple_submissions());
        assert_eq!(form.cards[0].fields[1].kind, FieldKind::Number { min: Some(0.0), max: None });
        assert!(form.cards[0].fields[0].required);
    }

    #[test]
    fn field_type_parses_wire_names() {
        for t in FieldType::ALL {
            assert_eq!(t.as_str().parse::<FieldType>().unwrap(), t);
        }
        assert!("checkbox".parse::<FieldType>().is_err());
    }
}
