use std::fmt;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

/// Identifier of an intake field, unique within a schema.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(pub String);

impl FieldId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FieldId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Input kind declared for a field; answers must carry the matching variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    ShortText,
    LongText,
    SingleChoice,
    MultiChoice,
    Date,
    Phone,
}

impl FieldKind {
    pub const fn is_choice(self) -> bool {
        matches!(self, Self::SingleChoice | Self::MultiChoice)
    }

    pub const fn is_text(self) -> bool {
        matches!(self, Self::ShortText | Self::LongText)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::ShortText => "short_text",
            Self::LongText => "long_text",
            Self::SingleChoice => "single_choice",
            Self::MultiChoice => "multi_choice",
            Self::Date => "date",
            Self::Phone => "phone",
        }
    }
}

/// Form section; each non-terminal intake step validates exactly one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Intro,
    Personal,
    Medical,
    Payment,
}

impl Section {
    pub const fn ordered() -> [Self; 4] {
        [Self::Intro, Self::Personal, Self::Medical, Self::Payment]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Intro => "Introducción",
            Self::Personal => "Datos Personales",
            Self::Medical => "Ficha Médica y Salud",
            Self::Payment => "Pago",
        }
    }
}

/// Health disclosures answered through yes/no toggles rather than ordinary fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disclosure {
    Treatment,
    Medication,
    Allergy,
}

impl Disclosure {
    pub const fn ordered() -> [Self; 3] {
        [Self::Treatment, Self::Medication, Self::Allergy]
    }

    /// Section whose step requires the toggle to be answered.
    pub const fn section(self) -> Section {
        Section::Medical
    }

    /// Field id used for the paired detail field in the default schema.
    pub const fn detail_field(self) -> &'static str {
        match self {
            Self::Treatment => "treatmentDetails",
            Self::Medication => "medication",
            Self::Allergy => "allergies",
        }
    }

    pub const fn unset_message(self) -> &'static str {
        match self {
            Self::Treatment => "Por favor indica si estás bajo tratamiento.",
            Self::Medication => "Por favor indica si tomas medicación.",
            Self::Allergy => "Por favor indica si tienes alergias o condiciones.",
        }
    }

    /// Display text for a detail suppressed by a "no" answer.
    pub const fn absent_display(self) -> &'static str {
        match self {
            Self::Treatment | Self::Medication => super::answer::NOT_APPLICABLE,
            Self::Allergy => "Perfecto estado",
        }
    }
}

/// How the engine treats a field beyond its required flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRole {
    #[default]
    Standard,
    /// Optional referral-style field; auto-filled as not applicable when blank.
    Referral,
    /// Detail text whose requiredness follows the paired disclosure toggle.
    Disclosure(Disclosure),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub id: FieldId,
    pub kind: FieldKind,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default)]
    pub required: bool,
    pub section: Section,
    #[serde(default)]
    pub role: FieldRole,
}

impl FormField {
    pub fn new(id: &str, kind: FieldKind, label: &str, section: Section) -> Self {
        Self {
            id: FieldId::new(id),
            kind,
            label: label.to_string(),
            placeholder: None,
            options: Vec::new(),
            required: false,
            section,
            role: FieldRole::Standard,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_placeholder(mut self, placeholder: &str) -> Self {
        self.placeholder = Some(placeholder.to_string());
        self
    }

    pub fn with_options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().map(|option| option.to_string()).collect();
        self
    }

    pub fn with_role(mut self, role: FieldRole) -> Self {
        self.role = role;
        self
    }

    pub fn disclosure(&self) -> Option<Disclosure> {
        match self.role {
            FieldRole::Disclosure(disclosure) => Some(disclosure),
            _ => None,
        }
    }

    fn check(&self) -> Result<(), SchemaError> {
        if self.id.as_str().trim().is_empty() {
            return Err(SchemaError::BlankId);
        }
        if self.kind.is_choice() && self.options.is_empty() {
            return Err(SchemaError::MissingOptions(self.id.clone()));
        }
        if let FieldRole::Disclosure(disclosure) = self.role {
            if !self.kind.is_text() || self.section != disclosure.section() {
                return Err(SchemaError::ProtectedField {
                    id: self.id.clone(),
                    reason: "disclosure details must be text fields in the medical section",
                });
            }
        }
        Ok(())
    }
}

/// Ordered field definitions. Declared order drives rendering and error focus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSchema {
    revision: u64,
    fields: Vec<FormField>,
}

impl FormSchema {
    pub fn new(fields: Vec<FormField>) -> Result<Self, SchemaError> {
        let mut schema = Self {
            revision: 1,
            fields: Vec::with_capacity(fields.len()),
        };
        for field in fields {
            schema.push(field)?;
        }
        Ok(schema)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn field(&self, id: &FieldId) -> Option<&FormField> {
        self.fields.iter().find(|field| &field.id == id)
    }

    pub fn section_fields(&self, section: Section) -> impl Iterator<Item = &FormField> {
        self.fields
            .iter()
            .filter(move |field| field.section == section)
    }

    pub fn disclosure_field(&self, disclosure: Disclosure) -> Option<&FormField> {
        self.fields
            .iter()
            .find(|field| field.role == FieldRole::Disclosure(disclosure))
    }

    fn position(&self, id: &FieldId) -> Result<usize, SchemaError> {
        self.fields
            .iter()
            .position(|field| &field.id == id)
            .ok_or_else(|| SchemaError::UnknownField(id.clone()))
    }

    fn push(&mut self, field: FormField) -> Result<(), SchemaError> {
        field.check()?;
        if self.field(&field.id).is_some() {
            return Err(SchemaError::DuplicateField(field.id));
        }
        if let Some(disclosure) = field.disclosure() {
            if self.disclosure_field(disclosure).is_some() {
                return Err(SchemaError::DuplicateDisclosure(disclosure));
            }
        }
        self.fields.push(field);
        Ok(())
    }
}

impl Default for FormSchema {
    fn default() -> Self {
        Self {
            revision: 1,
            fields: default_fields(),
        }
    }
}

/// Field id of the package selection answered in the payment step.
pub const PACKAGE_FIELD: &str = "selectedPackage";

fn default_fields() -> Vec<FormField> {
    use FieldKind::*;
    use Section::*;

    vec![
        FormField::new("firstName", ShortText, "Nombre", Personal).required(),
        FormField::new("lastName", ShortText, "Apellido", Personal).required(),
        FormField::new("email", ShortText, "Email", Personal).required(),
        FormField::new("phone", Phone, "Teléfono (WhatsApp)", Personal)
            .with_placeholder("+54 9...")
            .required(),
        FormField::new("birthDate", Date, "Fecha de Nacimiento", Personal).required(),
        FormField::new("city", ShortText, "Ciudad / País", Personal).required(),
        FormField::new("referredBy", ShortText, "Referido por (Opcional)", Personal)
            .with_role(FieldRole::Referral),
        FormField::new(
            Disclosure::Treatment.detail_field(),
            LongText,
            "Detalles del tratamiento",
            Medical,
        )
        .with_placeholder("Describe brevemente...")
        .with_role(FieldRole::Disclosure(Disclosure::Treatment)),
        FormField::new(
            Disclosure::Medication.detail_field(),
            LongText,
            "¿Tomas alguna medicación? (Detallar cuál y dosis)",
            Medical,
        )
        .with_placeholder("Nombre del medicamento, dosis, frecuencia...")
        .with_role(FieldRole::Disclosure(Disclosure::Medication)),
        FormField::new(
            Disclosure::Allergy.detail_field(),
            LongText,
            "Alergias o condiciones físicas relevantes",
            Medical,
        )
        .with_placeholder("Describe tu alergia o condición...")
        .with_role(FieldRole::Disclosure(Disclosure::Allergy)),
        FormField::new("emergencyName", ShortText, "Nombre Contacto Emergencia", Medical)
            .required(),
        FormField::new("emergencyPhone", Phone, "Teléfono Contacto Emergencia", Medical)
            .required(),
        FormField::new(
            "intention",
            LongText,
            "¿Qué buscas llevarte de esta experiencia? (Intención)",
            Medical,
        )
        .required(),
        FormField::new(PACKAGE_FIELD, SingleChoice, "Paquete elegido", Payment)
            .with_options(&[
                "INICIAL",
                "AVANZADO",
                "PROGRAMA LIDER",
                "COMBO INICIAL+AVANZADO",
                "FULL EXPERIENCE",
            ])
            .required(),
    ]
}

/// Partial edit applied by the schema editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldUpdate {
    pub kind: Option<FieldKind>,
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub options: Option<Vec<String>>,
    pub required: Option<bool>,
    pub section: Option<Section>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("field id must not be blank")]
    BlankId,
    #[error("field {0} already exists")]
    DuplicateField(FieldId),
    #[error("field {0} does not exist")]
    UnknownField(FieldId),
    #[error("choice field {0} needs at least one option")]
    MissingOptions(FieldId),
    #[error("the {0:?} disclosure already has a detail field")]
    DuplicateDisclosure(Disclosure),
    #[error("field {id} is protected: {reason}")]
    ProtectedField { id: FieldId, reason: &'static str },
    #[error("position {index} is outside the {len} declared fields")]
    PositionOutOfRange { index: usize, len: usize },
}

/// Single owner of the editable intake schema.
///
/// Each edit publishes a new immutable revision; sessions keep the snapshot they started
/// with, so an edit never changes a form somebody is halfway through.
#[derive(Debug)]
pub struct FormSchemaRegistry {
    current: RwLock<Arc<FormSchema>>,
}

impl Default for FormSchemaRegistry {
    fn default() -> Self {
        Self::new(FormSchema::default())
    }
}

impl FormSchemaRegistry {
    pub fn new(schema: FormSchema) -> Self {
        Self {
            current: RwLock::new(Arc::new(schema)),
        }
    }

    pub fn snapshot(&self) -> Arc<FormSchema> {
        self.current
            .read()
            .expect("schema lock poisoned")
            .clone()
    }

    pub fn fields(&self) -> Vec<FormField> {
        self.snapshot().fields().to_vec()
    }

    pub fn add_field(&self, field: FormField) -> Result<FormField, SchemaError> {
        self.edit(|schema| {
            schema.push(field.clone())?;
            Ok(field)
        })
    }

    pub fn update_field(&self, id: &FieldId, update: FieldUpdate) -> Result<FormField, SchemaError> {
        self.edit(|schema| {
            let index = schema.position(id)?;
            let mut field = schema.fields[index].clone();

            if field.disclosure().is_some()
                && (update.kind.is_some_and(|kind| kind != field.kind)
                    || update.section.is_some_and(|section| section != field.section))
            {
                return Err(SchemaError::ProtectedField {
                    id: id.clone(),
                    reason: "disclosure details keep their kind and section",
                });
            }

            if let Some(kind) = update.kind {
                field.kind = kind;
            }
            if let Some(label) = update.label {
                field.label = label;
            }
            if let Some(placeholder) = update.placeholder {
                field.placeholder = (!placeholder.is_empty()).then_some(placeholder);
            }
            if let Some(options) = update.options {
                field.options = options;
            }
            if let Some(required) = update.required {
                field.required = required;
            }
            if let Some(section) = update.section {
                field.section = section;
            }

            field.check()?;
            schema.fields[index] = field.clone();
            Ok(field)
        })
    }

    pub fn remove_field(&self, id: &FieldId) -> Result<FormField, SchemaError> {
        self.edit(|schema| {
            let index = schema.position(id)?;
            if schema.fields[index].disclosure().is_some() {
                return Err(SchemaError::ProtectedField {
                    id: id.clone(),
                    reason: "disclosure details cannot be removed",
                });
            }
            Ok(schema.fields.remove(index))
        })
    }

    pub fn move_field(&self, id: &FieldId, index: usize) -> Result<(), SchemaError> {
        self.edit(|schema| {
            let len = schema.fields.len();
            if index >= len {
                return Err(SchemaError::PositionOutOfRange { index, len });
            }
            let from = schema.position(id)?;
            let field = schema.fields.remove(from);
            schema.fields.insert(index, field);
            Ok(())
        })
    }

    fn edit<T>(
        &self,
        apply: impl FnOnce(&mut FormSchema) -> Result<T, SchemaError>,
    ) -> Result<T, SchemaError> {
        let mut guard = self.current.write().expect("schema lock poisoned");
        let mut next = FormSchema::clone(&guard);
        let outcome = apply(&mut next)?;
        next.revision += 1;
        *guard = Arc::new(next);
        Ok(outcome)
    }
}
