use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::de;

/// Tariff body as returned inside `getTarif` results.
///
/// Fields the tools reason about are typed; everything else the remote side
/// sends lands in `extra` and takes part in equivalence checks untouched.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct TariffBody {
    #[serde(rename = "tarid", default, deserialize_with = "de::int")]
    pub id: i64,
    #[serde(rename = "type", default, deserialize_with = "de::int")]
    pub category_type: i64,
    #[serde(rename = "descr", default, deserialize_with = "de::string")]
    pub display_name: String,
    #[serde(rename = "descrfull", default, deserialize_with = "de::string")]
    pub full_description: String,
    #[serde(rename = "used", default, deserialize_with = "de::int")]
    pub in_use: i64,
    #[serde(
        default,
        deserialize_with = "de::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub uuid: Option<String>,
    #[serde(rename = "trafflimit", default, deserialize_with = "de::int")]
    pub traffic_limit: i64,
    #[serde(rename = "archive", default, deserialize_with = "de::int")]
    pub archived: i64,
    #[serde(rename = "catnumbers", default, deserialize_with = "de::one_or_many")]
    pub catalog_refs: Vec<Value>,
    #[serde(rename = "additional", default, deserialize_with = "de::int")]
    pub additional_flag: i64,
    #[serde(
        rename = "saledictionaryid",
        default,
        deserialize_with = "de::opt_int",
        skip_serializing_if = "Option::is_none"
    )]
    pub sale_dictionary_id: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TariffBody {
    /// Commercial terms: every field except identity, naming and bookkeeping
    /// (`tarid`, `type`, `descr`, `descrfull`, `used`, `uuid`,
    /// `saledictionaryid`).
    pub fn same_terms(&self, other: &TariffBody) -> bool {
        self.traffic_limit == other.traffic_limit
            && self.archived == other.archived
            && self.catalog_refs == other.catalog_refs
            && self.additional_flag == other.additional_flag
            && self.extra == other.extra
    }
}

/// A tariff together with its rate shapes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct TariffRecord {
    #[serde(rename = "tarif")]
    pub tariff: TariffBody,
    #[serde(rename = "sizeshapes", default, deserialize_with = "de::one_or_many")]
    pub size_shapes: Vec<Value>,
    #[serde(rename = "timeshapes", default, deserialize_with = "de::one_or_many")]
    pub time_shapes: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TariffRecord {
    pub fn id(&self) -> i64 {
        self.tariff.id
    }

    pub fn category_type(&self) -> i64 {
        self.tariff.category_type
    }

    /// Reasons this tariff can not be compared or cloned automatically.
    /// Empty means supported.
    pub fn unsupported_reasons(&self) -> Vec<&'static str> {
        let mut reasons = Vec::new();
        if !self.size_shapes.is_empty() {
            reasons.push("sizeshapes");
        }
        if !self.time_shapes.is_empty() {
            reasons.push("timeshapes");
        }
        if self.tariff.traffic_limit != 0 {
            reasons.push("trafflimit");
        }
        if self.tariff.archived != 0 {
            reasons.push("archive");
        }
        if !self.tariff.catalog_refs.is_empty() {
            reasons.push("catnumbers");
        }
        if self.tariff.additional_flag != 0 {
            reasons.push("additional");
        }
        if self.tariff.sale_dictionary_id.unwrap_or(0) != 0 {
            reasons.push("saledictionaryid");
        }
        reasons
    }

    pub fn is_supported(&self) -> bool {
        self.unsupported_reasons().is_empty()
    }
}

/// Row of the `getTarifs` listing; only the id is used.
#[derive(Deserialize, Debug, Clone)]
pub struct TariffListItem {
    #[serde(deserialize_with = "de::int")]
    pub id: i64,
}
