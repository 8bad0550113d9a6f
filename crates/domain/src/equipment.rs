use serde::{Deserialize, Serialize};

use crate::Extra;

string_id!(EquipmentID);

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    pub id: EquipmentID,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Equipment {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            id: EquipmentID::generate(),
            name: name.trim().to_string(),
            ..Self::default()
        }
    }
}
