use std::sync::OnceLock;

use shared::domain::{Choice, ConsentTemplateId, DoctorId, Treatment, TreatmentCategory, TreatmentId};

use crate::{
    entity::{self, Entity, FieldError, FieldKind, FieldSpec, FieldValue},
    validation::Rule,
};

pub(super) const CATEGORY_OPTIONS: &[&str] = &["consultation", "aesthetic", "surgical", "diagnostic"];

const FIELDS: &[FieldSpec] = &[
    FieldSpec::new("id", "El identificador", FieldKind::Id),
    FieldSpec::new("name", "El nombre", FieldKind::Text),
    FieldSpec::new("description", "La descripción", FieldKind::Text),
    FieldSpec::new("price", "El precio", FieldKind::Decimal),
    FieldSpec::new("duration_minutes", "La duración", FieldKind::Integer),
    FieldSpec::new("category", "La categoría", FieldKind::Choice(CATEGORY_OPTIONS)),
    FieldSpec::new("requires_consent", "Requiere consentimiento", FieldKind::Flag),
    FieldSpec::new("consent_template_id", "La plantilla de consentimiento", FieldKind::Text),
    FieldSpec::new("doctor_ids", "Los doctores habilitados", FieldKind::IdList),
    FieldSpec::new("active", "Activo", FieldKind::Flag),
];

impl Entity for Treatment {
    const RESOURCE: &'static str = "treatments";
    const LABEL: &'static str = "Tratamiento";

    fn fields() -> &'static [FieldSpec] {
        FIELDS
    }

    fn search_fields() -> &'static [&'static str] {
        &["id", "name", "description"]
    }

    fn rules() -> &'static [Rule<Self>] {
        static RULES: OnceLock<Vec<Rule<Treatment>>> = OnceLock::new();
        RULES.get_or_init(|| {
            vec![
                Rule::required("name", "El nombre es obligatorio"),
                Rule::positive("price", "El precio debe ser mayor a 0"),
                Rule::positive("duration_minutes", "La duración debe ser mayor a 0"),
                Rule::required_when(
                    "consent_template_id",
                    "requires_consent",
                    "Debe seleccionar una plantilla de consentimiento",
                ),
            ]
        })
    }

    fn id(&self) -> Option<&str> {
        self.id.as_ref().map(TreatmentId::as_str)
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        let value = match name {
            "id" => FieldValue::opt_text(self.id()),
            "name" => FieldValue::Text(self.name.clone()),
            "description" => FieldValue::Text(self.description.clone()),
            "price" => FieldValue::Decimal(self.price),
            "duration_minutes" => FieldValue::Integer(self.duration_minutes),
            "category" => FieldValue::Choice(self.category.as_str().to_string()),
            "requires_consent" => FieldValue::Flag(self.requires_consent),
            "consent_template_id" => {
                FieldValue::opt_text(self.consent_template_id.as_ref().map(ConsentTemplateId::as_str))
            }
            "doctor_ids" => {
                FieldValue::IdList(self.doctor_ids.iter().map(|id| id.0.clone()).collect())
            }
            "active" => FieldValue::Flag(self.active),
            _ => return None,
        };
        Some(value)
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError> {
        match name {
            "id" => return Err(FieldError::ReadOnly(name.to_string())),
            "name" => self.name = entity::text(name, value)?,
            "description" => self.description = entity::text(name, value)?,
            "price" => self.price = entity::decimal(name, value)?,
            "duration_minutes" => self.duration_minutes = entity::integer(name, value)?,
            "category" => self.category = entity::choice::<TreatmentCategory>(name, value)?,
            "requires_consent" => self.requires_consent = entity::flag(name, value)?,
            "consent_template_id" => {
                self.consent_template_id = entity::opt_text(name, value)?.map(ConsentTemplateId)
            }
            "doctor_ids" => {
                self.doctor_ids = entity::id_list(name, value)?
                    .into_iter()
                    .map(DoctorId)
                    .collect()
            }
            "active" => self.active = entity::flag(name, value)?,
            _ => return Err(FieldError::Unknown(name.to_string())),
        }
        Ok(())
    }
}
