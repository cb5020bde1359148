use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Upper bound per free-text field, in characters.
pub const MAX_FIELD_CHARS: usize = 2000;

/// Intake as submitted by a client. Every field is optional on the wire;
/// [`normalize_intake`] enforces what is required.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RawIntake {
    #[serde(default)]
    pub key_symptoms: Option<String>,
    #[serde(default)]
    pub tongue: Option<String>,
    #[serde(default)]
    pub pulse: Option<String>,
    #[serde(default)]
    pub constitution: Option<String>,
    #[serde(default)]
    pub lifestyle: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
}

/// Normalized intake: whitespace collapsed, blank fields absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Intake {
    pub key_symptoms: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tongue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pulse: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constitution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifestyle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

/// Intake fields in their fixed narrative and summary order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeField {
    KeySymptoms,
    Tongue,
    Pulse,
    Constitution,
    Lifestyle,
    Duration,
}

impl IntakeField {
    pub const ALL: [IntakeField; 6] = [
        IntakeField::KeySymptoms,
        IntakeField::Tongue,
        IntakeField::Pulse,
        IntakeField::Constitution,
        IntakeField::Lifestyle,
        IntakeField::Duration,
    ];

    /// Wire name of the field.
    pub fn as_str(self) -> &'static str {
        match self {
            IntakeField::KeySymptoms => "keySymptoms",
            IntakeField::Tongue => "tongue",
            IntakeField::Pulse => "pulse",
            IntakeField::Constitution => "constitution",
            IntakeField::Lifestyle => "lifestyle",
            IntakeField::Duration => "duration",
        }
    }

    /// Label used in the human-readable intake summary.
    pub fn label(self) -> &'static str {
        match self {
            IntakeField::KeySymptoms => "主要症状",
            IntakeField::Tongue => "舌象",
            IntakeField::Pulse => "脉象",
            IntakeField::Constitution => "体质",
            IntakeField::Lifestyle => "生活习惯",
            IntakeField::Duration => "病程",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntakeError {
    #[error("keySymptoms must not be empty")]
    MissingKeySymptoms,
    #[error("{field} exceeds {max} characters ({actual})")]
    FieldTooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },
}

impl IntakeError {
    pub fn field(&self) -> &'static str {
        match self {
            IntakeError::MissingKeySymptoms => IntakeField::KeySymptoms.as_str(),
            IntakeError::FieldTooLong { field, .. } => field,
        }
    }
}

impl Intake {
    /// Intake with only key symptoms set.
    pub fn from_symptoms(key_symptoms: impl Into<String>) -> Self {
        Self {
            key_symptoms: key_symptoms.into(),
            tongue: None,
            pulse: None,
            constitution: None,
            lifestyle: None,
            duration: None,
        }
    }

    pub fn get(&self, field: IntakeField) -> Option<&str> {
        match field {
            IntakeField::KeySymptoms => Some(self.key_symptoms.as_str()),
            IntakeField::Tongue => self.tongue.as_deref(),
            IntakeField::Pulse => self.pulse.as_deref(),
            IntakeField::Constitution => self.constitution.as_deref(),
            IntakeField::Lifestyle => self.lifestyle.as_deref(),
            IntakeField::Duration => self.duration.as_deref(),
        }
    }

    /// Present, non-blank fields in fixed order.
    pub fn present_fields(&self) -> impl Iterator<Item = (IntakeField, &str)> {
        IntakeField::ALL.into_iter().filter_map(|field| {
            self.get(field)
                .filter(|value| !value.trim().is_empty())
                .map(|value| (field, value))
        })
    }
}

/// First workflow step: clean up a raw intake.
pub fn normalize_intake(raw: RawIntake) -> Result<Intake, IntakeError> {
    let key_symptoms = clean_field(IntakeField::KeySymptoms, raw.key_symptoms)?
        .ok_or(IntakeError::MissingKeySymptoms)?;

    Ok(Intake {
        key_symptoms,
        tongue: clean_field(IntakeField::Tongue, raw.tongue)?,
        pulse: clean_field(IntakeField::Pulse, raw.pulse)?,
        constitution: clean_field(IntakeField::Constitution, raw.constitution)?,
        lifestyle: clean_field(IntakeField::Lifestyle, raw.lifestyle)?,
        duration: clean_field(IntakeField::Duration, raw.duration)?,
    })
}

fn clean_field(field: IntakeField, value: Option<String>) -> Result<Option<String>, IntakeError> {
    let Some(value) = value else {
        return Ok(None);
    };

    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return Ok(None);
    }

    let actual = collapsed.chars().count();
    if actual > MAX_FIELD_CHARS {
        return Err(IntakeError::FieldTooLong {
            field: field.as_str(),
            max: MAX_FIELD_CHARS,
            actual,
        });
    }
    Ok(Some(collapsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace_and_drops_blank_fields() {
        let intake = normalize_intake(RawIntake {
            key_symptoms: Some("  恶寒\t 头痛\n无汗 ".to_string()),
            tongue: Some("   ".to_string()),
            pulse: Some("浮紧".to_string()),
            ..RawIntake::default()
        })
        .expect("intake should normalize");

        assert_eq!(intake.key_symptoms, "恶寒 头痛 无汗");
        assert_eq!(intake.tongue, None);
        assert_eq!(intake.pulse.as_deref(), Some("浮紧"));
    }

    #[test]
    fn missing_key_symptoms_is_rejected() {
        let err = normalize_intake(RawIntake {
            key_symptoms: Some(" \n ".to_string()),
            tongue: Some("舌淡".to_string()),
            ..RawIntake::default()
        })
        .expect_err("blank key symptoms");
        assert_eq!(err, IntakeError::MissingKeySymptoms);
        assert_eq!(err.field(), "keySymptoms");
    }

    #[test]
    fn overlong_field_is_rejected() {
        let err = normalize_intake(RawIntake {
            key_symptoms: Some("头痛".to_string()),
            lifestyle: Some("熬".repeat(MAX_FIELD_CHARS + 1)),
            ..RawIntake::default()
        })
        .expect_err("lifestyle too long");
        assert_eq!(err.field(), "lifestyle");
    }

    #[test]
    fn raw_intake_accepts_camel_case_json() {
        let raw: RawIntake = serde_json::from_str(r#"{"keySymptoms":"乏力","duration":"两周"}"#)
            .expect("raw intake should deserialize");
        assert_eq!(raw.key_symptoms.as_deref(), Some("乏力"));
        assert_eq!(raw.duration.as_deref(), Some("两周"));
        assert_eq!(raw.tongue, None);
    }

    #[test]
    fn present_fields_follow_fixed_order() {
        let mut intake = Intake::from_symptoms("乏力");
        intake.duration = Some("两周".to_string());
        intake.tongue = Some("舌淡".to_string());
        let order: Vec<IntakeField> = intake.present_fields().map(|(f, _)| f).collect();
        assert_eq!(
            order,
            vec![IntakeField::KeySymptoms, IntakeField::Tongue, IntakeField::Duration]
        );
    }
}
