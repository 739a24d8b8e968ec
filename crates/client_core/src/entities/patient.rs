use std::sync::OnceLock;

use chrono::Local;
use shared::domain::{Choice, Patient, PatientId, PatientStatus};

use crate::{
    entity::{self, Entity, FieldError, FieldKind, FieldSpec, FieldValue},
    validation::{static_regex, Rule},
};

pub(super) const STATUS_OPTIONS: &[&str] = &["active", "inactive"];

const FIELDS: &[FieldSpec] = &[
    FieldSpec::new("id", "El identificador", FieldKind::Id),
    FieldSpec::new("first_name", "El nombre", FieldKind::Text),
    FieldSpec::new("last_name", "El apellido", FieldKind::Text),
    FieldSpec::new("document_number", "El DNI", FieldKind::Text),
    FieldSpec::new("email", "El email", FieldKind::Text),
    FieldSpec::new("phone", "El teléfono", FieldKind::Text),
    FieldSpec::new("birth_date", "La fecha de nacimiento", FieldKind::Date),
    FieldSpec::new("insurance", "La obra social", FieldKind::Text),
    FieldSpec::new("status", "El estado", FieldKind::Choice(STATUS_OPTIONS)),
];

impl Entity for Patient {
    const RESOURCE: &'static str = "patients";
    const LABEL: &'static str = "Paciente";

    fn fields() -> &'static [FieldSpec] {
        FIELDS
    }

    fn search_fields() -> &'static [&'static str] {
        &["id", "first_name", "last_name", "document_number", "email"]
    }

    fn rules() -> &'static [Rule<Self>] {
        static RULES: OnceLock<Vec<Rule<Patient>>> = OnceLock::new();
        RULES.get_or_init(|| {
            vec![
                Rule::required("first_name", "El nombre es obligatorio"),
                Rule::required("last_name", "El apellido es obligatorio"),
                Rule::required("document_number", "El DNI es obligatorio"),
                Rule::pattern(
                    "document_number",
                    static_regex(r"^\d{7,8}$"),
                    "El DNI debe tener 7 u 8 dígitos",
                ),
                Rule::pattern(
                    "email",
                    static_regex(r"^[^@\s]+@[^@\s]+\.[^@\s]+$"),
                    "El email no es válido",
                ),
                Rule::custom(
                    Some("birth_date"),
                    "La fecha de nacimiento no puede ser futura",
                    |patient| {
                        patient
                            .birth_date
                            .map_or(true, |date| date <= Local::now().date_naive())
                    },
                ),
            ]
        })
    }

    fn id(&self) -> Option<&str> {
        self.id.as_ref().map(PatientId::as_str)
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        let value = match name {
            "id" => FieldValue::opt_text(self.id()),
            "first_name" => FieldValue::Text(self.first_name.clone()),
            "last_name" => FieldValue::Text(self.last_name.clone()),
            "document_number" => FieldValue::Text(self.document_number.clone()),
            "email" => FieldValue::Text(self.email.clone()),
            "phone" => FieldValue::Text(self.phone.clone()),
            "birth_date" => self.birth_date.map_or(FieldValue::Empty, FieldValue::Date),
            "insurance" => FieldValue::Text(self.insurance.clone()),
            "status" => FieldValue::Choice(self.status.as_str().to_string()),
            _ => return None,
        };
        Some(value)
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError> {
        match name {
            "id" => return Err(FieldError::ReadOnly(name.to_string())),
            "first_name" => self.first_name = entity::text(name, value)?,
            "last_name" => self.last_name = entity::text(name, value)?,
            "document_number" => self.document_number = entity::text(name, value)?,
            "email" => self.email = entity::text(name, value)?,
            "phone" => self.phone = entity::text(name, value)?,
            "birth_date" => self.birth_date = entity::date(name, value)?,
            "insurance" => self.insurance = entity::text(name, value)?,
            "status" => self.status = entity::choice::<PatientStatus>(name, value)?,
            _ => return Err(FieldError::Unknown(name.to_string())),
        }
        Ok(())
    }
}
