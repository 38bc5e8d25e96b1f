use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::de;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Agent {
    #[serde(deserialize_with = "de::int")]
    pub id: i64,
    #[serde(default, deserialize_with = "de::string")]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
