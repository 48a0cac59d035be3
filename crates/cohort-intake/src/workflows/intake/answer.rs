use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::schema::{FieldId, FieldKind, FieldRole, FormField};

/// Display sentinel for an answer the form marked as not applicable.
pub const NOT_APPLICABLE: &str = "No aplica";

pub const DEFAULT_COUNTRY_CODE: &str = "+54";

/// Phone number split into country code and subscriber digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumber {
    pub country_code: String,
    pub number: String,
}

impl PhoneNumber {
    pub fn new(country_code: &str, number: &str) -> Result<Self, AnswerError> {
        let code = country_code.trim();
        let code_digits = code.strip_prefix('+').unwrap_or(code);
        if code_digits.is_empty()
            || code_digits.len() > 4
            || !code_digits.chars().all(|c| c.is_ascii_digit())
        {
            return Err(AnswerError::InvalidPhone(format!("{country_code} {number}")));
        }

        Ok(Self {
            country_code: format!("+{code_digits}"),
            number: number.chars().filter(char::is_ascii_digit).collect(),
        })
    }

    /// Parses `+<code> <number>`; input without a leading `+` gets the default code.
    pub fn parse(raw: &str) -> Result<Self, AnswerError> {
        let trimmed = raw.trim();
        if !trimmed.starts_with('+') {
            return Self::new(DEFAULT_COUNTRY_CODE, trimmed);
        }
        match trimmed.split_once(char::is_whitespace) {
            Some((code, number)) => Self::new(code, number),
            None => Self::new(trimmed, ""),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.number.is_empty()
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.country_code, self.number)
    }
}

/// Typed answer for a single field, keyed by the field's declared kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Answer {
    Text(String),
    Choice(String),
    Choices(Vec<String>),
    Date(NaiveDate),
    Phone(PhoneNumber),
    /// Explicit absence filled in by the engine, never typed by the applicant.
    NotApplicable,
}

impl Answer {
    pub fn text(value: &str) -> Self {
        Self::Text(value.to_string())
    }

    pub fn choice(value: &str) -> Self {
        Self::Choice(value.to_string())
    }

    pub fn phone(raw: &str) -> Result<Self, AnswerError> {
        PhoneNumber::parse(raw).map(Self::Phone)
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(value) | Self::Choice(value) => value.trim().is_empty(),
            Self::Choices(values) => values.iter().all(|value| value.trim().is_empty()),
            Self::Phone(phone) => phone.is_blank(),
            Self::Date(_) | Self::NotApplicable => false,
        }
    }

    /// Blank, or only the engine's not-applicable marker.
    pub fn is_unanswered(&self) -> bool {
        matches!(self, Self::NotApplicable) || self.is_blank()
    }

    pub fn fits(&self, kind: FieldKind) -> bool {
        matches!(
            (self, kind),
            (Self::Text(_), FieldKind::ShortText | FieldKind::LongText)
                | (Self::Choice(_), FieldKind::SingleChoice)
                | (Self::Choices(_), FieldKind::MultiChoice)
                | (Self::Date(_), FieldKind::Date)
                | (Self::Phone(_), FieldKind::Phone)
        )
    }

    /// Checks kind and options against the field and returns the normalized answer.
    pub fn validated_for(self, field: &FormField) -> Result<Self, AnswerError> {
        if matches!(self, Self::NotApplicable) {
            return Err(AnswerError::Reserved(field.id.clone()));
        }
        if !self.fits(field.kind) {
            return Err(AnswerError::KindMismatch {
                field: field.id.clone(),
                expected: field.kind,
            });
        }

        let unknown = |option: &String| {
            !option.trim().is_empty() && !field.options.iter().any(|known| known == option)
        };
        let stray = match &self {
            Self::Choice(option) => unknown(option).then(|| option.clone()),
            Self::Choices(options) => options.iter().find(|option| unknown(*option)).cloned(),
            _ => None,
        };
        if let Some(option) = stray {
            return Err(AnswerError::UnknownOption {
                field: field.id.clone(),
                option,
            });
        }

        match self {
            Self::Text(value) => Ok(Self::Text(value.trim().to_string())),
            Self::Choices(options) => Ok(Self::Choices(
                options
                    .into_iter()
                    .filter(|option| !option.trim().is_empty())
                    .collect(),
            )),
            Self::Phone(phone) => PhoneNumber::new(&phone.country_code, &phone.number).map(Self::Phone),
            other => Ok(other),
        }
    }

    /// Presentation text; the not-applicable marker becomes its display sentinel here.
    pub fn display_for(&self, field: Option<&FormField>) -> String {
        match self {
            Self::Text(value) | Self::Choice(value) => value.clone(),
            Self::Choices(values) => values.join(", "),
            Self::Date(date) => date.format("%Y-%m-%d").to_string(),
            Self::Phone(phone) => phone.to_string(),
            Self::NotApplicable => match field.map(|field| field.role) {
                Some(FieldRole::Disclosure(disclosure)) => disclosure.absent_display().to_string(),
                _ => NOT_APPLICABLE.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnswerError {
    #[error("field {0} is not part of this form")]
    UnknownField(FieldId),
    #[error("field {field} expects a {} answer", .expected.label())]
    KindMismatch { field: FieldId, expected: FieldKind },
    #[error("'{option}' is not an option of field {field}")]
    UnknownOption { field: FieldId, option: String },
    #[error("'{0}' is not a phone number of the form +<code> <number>")]
    InvalidPhone(String),
    #[error("field {0} cannot be marked not applicable by hand")]
    Reserved(FieldId),
    #[error("field {0} is locked because its disclosure was answered no")]
    Suppressed(FieldId),
}
