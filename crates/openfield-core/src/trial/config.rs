use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Validated parameters of one trial. Immutable once the trial starts.
///
/// Deserializing goes through [`TrialConfig::new`], so stored configs are
/// validated like typed input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTrialConfig")]
pub struct TrialConfig {
    animal_id: String,
    duration_secs: u64,
}

#[derive(Deserialize)]
struct RawTrialConfig {
    animal_id: String,
    duration_secs: u64,
}

impl TryFrom<RawTrialConfig> for TrialConfig {
    type Error = ValidationError;

    fn try_from(raw: RawTrialConfig) -> Result<Self, Self::Error> {
        TrialConfig::new(&raw.animal_id, raw.duration_secs)
    }
}

impl TrialConfig {
    /// Build a config from typed input.
    ///
    /// The animal id is trimmed. The id is checked before the duration.
    pub fn new(animal_id: &str, duration_secs: u64) -> Result<Self, ValidationError> {
        let animal_id = validate_animal_id(animal_id)?;
        if duration_secs == 0 {
            return Err(ValidationError::InvalidDuration {
                value: duration_secs.to_string(),
            });
        }
        Ok(Self {
            animal_id,
            duration_secs,
        })
    }

    /// Build a config from raw form input, as typed by the observer.
    pub fn parse(animal_id: &str, duration: &str) -> Result<Self, ValidationError> {
        let animal_id = validate_animal_id(animal_id)?;
        let duration_secs = parse_duration_secs(duration)?;
        Ok(Self {
            animal_id,
            duration_secs,
        })
    }

    pub fn animal_id(&self) -> &str {
        &self.animal_id
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }
}

fn validate_animal_id(raw: &str) -> Result<String, ValidationError> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(ValidationError::MissingAnimalId);
    }
    Ok(id.to_string())
}

/// Positive whole seconds. Accepts surrounding whitespace and a leading `+`.
fn parse_duration_secs(raw: &str) -> Result<u64, ValidationError> {
    let invalid = || ValidationError::InvalidDuration {
        value: raw.to_string(),
    };
    let secs: i64 = raw.trim().parse().map_err(|_| invalid())?;
    if secs <= 0 {
        return Err(invalid());
    }
    u64::try_from(secs).map_err(|_| invalid())
}
