use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(PatientId);
id_newtype!(TreatmentId);
id_newtype!(UserId);
id_newtype!(DoctorId);
id_newtype!(ConsentTemplateId);

pub trait Choice: Sized + Copy + 'static {
    const ALL: &'static [Self];

    fn as_str(self) -> &'static str;

    fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|value| value.as_str().eq_ignore_ascii_case(raw.trim()))
    }

    fn options() -> Vec<&'static str> {
        Self::ALL.iter().map(|value| value.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatientStatus {
    #[default]
    Active,
    Inactive,
}

impl Choice for PatientStatus {
    const ALL: &'static [Self] = &[Self::Active, Self::Inactive];

    fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreatmentCategory {
    #[default]
    Consultation,
    Aesthetic,
    Surgical,
    Diagnostic,
}

impl Choice for TreatmentCategory {
    const ALL: &'static [Self] = &[
        Self::Consultation,
        Self::Aesthetic,
        Self::Surgical,
        Self::Diagnostic,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::Consultation => "consultation",
            Self::Aesthetic => "aesthetic",
            Self::Surgical => "surgical",
            Self::Diagnostic => "diagnostic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Admin,
    Doctor,
    #[default]
    Receptionist,
}

impl Choice for StaffRole {
    const ALL: &'static [Self] = &[Self::Admin, Self::Doctor, Self::Receptionist];

    fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Doctor => "doctor",
            Self::Receptionist => "receptionist",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Patient {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PatientId>,
    pub first_name: String,
    pub last_name: String,
    pub document_number: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub insurance: String,
    #[serde(default)]
    pub status: PatientStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Treatment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TreatmentId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub duration_minutes: i64,
    #[serde(default)]
    pub category: TreatmentCategory,
    #[serde(default)]
    pub requires_consent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consent_template_id: Option<ConsentTemplateId>,
    #[serde(default)]
    pub doctor_ids: Vec<DoctorId>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl Default for Treatment {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            description: String::new(),
            price: 0.0,
            duration_minutes: 0,
            category: TreatmentCategory::default(),
            requires_consent: false,
            consent_template_id: None,
            doctor_ids: Vec::new(),
            active: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub specialty: String,
    #[serde(default)]
    pub role: StaffRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: DoctorId,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub specialty: String,
}

impl Doctor {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentTemplate {
    pub id: ConsentTemplateId,
    pub title: String,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choice_parse_is_case_insensitive_and_trims() {
        assert_eq!(PatientStatus::parse(" Inactive "), Some(PatientStatus::Inactive));
        assert_eq!(TreatmentCategory::parse("SURGICAL"), Some(TreatmentCategory::Surgical));
        assert_eq!(StaffRole::parse("nurse"), None);
    }

    #[test]
    fn treatment_defaults_to_active_when_field_is_missing() {
        let treatment: Treatment = serde_json::from_str(
            r#"{"id":"t1","name":"Peeling","price":120.5,"duration_minutes":30}"#,
        )
        .expect("parse treatment");
        assert!(treatment.active);
        assert_eq!(treatment.id, Some(TreatmentId::from("t1")));
        assert!(treatment.doctor_ids.is_empty());
    }

    #[test]
    fn new_drafts_serialize_without_id() {
        let json = serde_json::to_value(Patient::default()).expect("serialize");
        assert!(json.get("id").is_none());
        assert_eq!(json["status"], "active");
    }
}
