use serde::{Deserialize, Serialize};

use crate::{EquipmentID, Extra};

string_id!(ExerciseID);

#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TrackingType {
    #[default]
    WeightReps,
    Time,
    Completion,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: ExerciseID,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub equipment_ids: Vec<EquipmentID>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_type: Option<TrackingType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_sets: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_reps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_time_seconds: Option<u32>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Exercise {
    #[must_use]
    pub fn new(name: &str, tracking_type: TrackingType) -> Self {
        Self {
            id: ExerciseID::generate(),
            name: name.trim().to_string(),
            tracking_type: Some(tracking_type),
            ..Self::default()
        }
        .with_defaults()
    }

    /// Exercises stored before tracking types existed are weight/reps exercises.
    #[must_use]
    pub fn tracking(&self) -> TrackingType {
        self.tracking_type.unwrap_or_default()
    }

    /// Fills the defaults that are meaningful for the tracking type, keeping explicit values.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        match self.tracking() {
            TrackingType::WeightReps => {
                self.default_sets.get_or_insert(3);
                self.default_reps.get_or_insert(10);
            }
            TrackingType::Time => {
                self.default_sets.get_or_insert(3);
                self.default_time_seconds.get_or_insert(30);
            }
            TrackingType::Completion => {
                self.default_sets.get_or_insert(1);
            }
        }
        self
    }

    #[must_use]
    pub fn uses_equipment(&self, id: &EquipmentID) -> bool {
        self.equipment_ids.contains(id)
    }
}
