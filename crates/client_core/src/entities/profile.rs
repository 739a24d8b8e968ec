use std::sync::OnceLock;

use shared::{
    domain::{Choice, StaffRole, UserId, UserProfile},
    protocol::AssetKind,
};

use crate::{
    entity::{self, Entity, FieldError, FieldKind, FieldSpec, FieldValue},
    validation::{static_regex, Rule},
};

pub(super) const ROLE_OPTIONS: &[&str] = &["admin", "doctor", "receptionist"];

const FIELDS: &[FieldSpec] = &[
    FieldSpec::new("id", "El identificador", FieldKind::Id),
    FieldSpec::new("first_name", "El nombre", FieldKind::Text),
    FieldSpec::new("last_name", "El apellido", FieldKind::Text),
    FieldSpec::new("email", "El email", FieldKind::Text),
    FieldSpec::new("phone", "El teléfono", FieldKind::Text),
    FieldSpec::new("specialty", "La especialidad", FieldKind::Text),
    FieldSpec::new("role", "El rol", FieldKind::Choice(ROLE_OPTIONS)),
    FieldSpec::new("photo_url", "La foto", FieldKind::Asset(AssetKind::ProfilePhoto)),
];

impl Entity for UserProfile {
    const RESOURCE: &'static str = "profiles";
    const LABEL: &'static str = "Perfil";

    fn fields() -> &'static [FieldSpec] {
        FIELDS
    }

    fn search_fields() -> &'static [&'static str] {
        &["id", "first_name", "last_name", "email", "specialty"]
    }

    fn rules() -> &'static [Rule<Self>] {
        static RULES: OnceLock<Vec<Rule<UserProfile>>> = OnceLock::new();
        RULES.get_or_init(|| {
            vec![
                Rule::required("first_name", "El nombre es obligatorio"),
                Rule::required("last_name", "El apellido es obligatorio"),
                Rule::required("email", "El email es obligatorio"),
                Rule::pattern(
                    "email",
                    static_regex(r"^[^@\s]+@[^@\s]+\.[^@\s]+$"),
                    "El email no es válido",
                ),
                Rule::pattern(
                    "phone",
                    static_regex(r"^\+?[0-9 \-]{6,20}$"),
                    "El teléfono no es válido",
                ),
                Rule::custom(
                    Some("specialty"),
                    "La especialidad es obligatoria para médicos",
                    |profile| profile.role != StaffRole::Doctor || !profile.specialty.trim().is_empty(),
                ),
            ]
        })
    }

    fn id(&self) -> Option<&str> {
        self.id.as_ref().map(UserId::as_str)
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        let value = match name {
            "id" => FieldValue::opt_text(self.id()),
            "first_name" => FieldValue::Text(self.first_name.clone()),
            "last_name" => FieldValue::Text(self.last_name.clone()),
            "email" => FieldValue::Text(self.email.clone()),
            "phone" => FieldValue::Text(self.phone.clone()),
            "specialty" => FieldValue::Text(self.specialty.clone()),
            "role" => FieldValue::Choice(self.role.as_str().to_string()),
            "photo_url" => FieldValue::opt_text(self.photo_url.as_deref()),
            _ => return None,
        };
        Some(value)
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError> {
        match name {
            "id" => return Err(FieldError::ReadOnly(name.to_string())),
            "first_name" => self.first_name = entity::text(name, value)?,
            "last_name" => self.last_name = entity::text(name, value)?,
            "email" => self.email = entity::text(name, value)?,
            "phone" => self.phone = entity::text(name, value)?,
            "specialty" => self.specialty = entity::text(name, value)?,
            "role" => self.role = entity::choice::<StaffRole>(name, value)?,
            "photo_url" => self.photo_url = entity::opt_text(name, value)?,
            _ => return Err(FieldError::Unknown(name.to_string())),
        }
        Ok(())
    }
}
