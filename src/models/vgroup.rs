use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::de;

/// Row of the `getVgroups` listing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct VgroupSummary {
    #[serde(rename = "vgid", deserialize_with = "de::int")]
    pub vgroup_id: i64,
    #[serde(rename = "id", default, deserialize_with = "de::int")]
    pub agent_id: i64,
    #[serde(rename = "tarid", default, deserialize_with = "de::int")]
    pub tariff_id: i64,
    #[serde(default, deserialize_with = "de::string")]
    pub login: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `vgroup` part of a `getVgroup` result.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct VgroupBody {
    #[serde(rename = "vgid", default, deserialize_with = "de::int")]
    pub vgroup_id: i64,
    #[serde(rename = "id", default, deserialize_with = "de::int")]
    pub agent_id: i64,
    #[serde(rename = "tarid", default, deserialize_with = "de::int")]
    pub tariff_id: i64,
    #[serde(default, deserialize_with = "de::string")]
    pub login: String,
    #[serde(rename = "parentvgid", default, deserialize_with = "de::int")]
    pub parent_vgroup_id: i64,
    #[serde(default, deserialize_with = "de::int")]
    pub blocked: i64,
    #[serde(
        rename = "parentvglogin",
        default,
        deserialize_with = "de::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_login: Option<String>,
    #[serde(default, deserialize_with = "de::int")]
    pub dirty: i64,
    /// Internal unique record id; dropped when the record is re-created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<Value>,
    #[serde(
        rename = "ipdet",
        default,
        deserialize_with = "de::opt_int",
        skip_serializing_if = "Option::is_none"
    )]
    pub ip_details: Option<i64>,
    #[serde(
        rename = "portdet",
        default,
        deserialize_with = "de::opt_int",
        skip_serializing_if = "Option::is_none"
    )]
    pub port_details: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Full vgroup as returned by `getVgroup` and accepted by `insupdVgroup`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct VgroupDetail {
    pub vgroup: VgroupBody,
    #[serde(default, deserialize_with = "de::one_or_many")]
    pub services: Vec<Value>,
    #[serde(default, deserialize_with = "de::one_or_many")]
    pub addons: Vec<Value>,
    #[serde(rename = "macstaff", default, deserialize_with = "de::one_or_many")]
    pub mac_staff: Vec<Value>,
    #[serde(rename = "telstaff", default, deserialize_with = "de::one_or_many")]
    pub tel_staff: Vec<Value>,
    #[serde(default, deserialize_with = "de::one_or_many")]
    pub staff: Vec<Value>,
    #[serde(rename = "blockrasp", default, deserialize_with = "de::one_or_many")]
    pub block_requests: Vec<Value>,
    #[serde(rename = "tarrasp", default, deserialize_with = "de::one_or_many")]
    pub tariff_requests: Vec<Value>,
    #[serde(
        rename = "agentname",
        default,
        deserialize_with = "de::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub agent_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VgroupDetail {
    pub fn vgroup_id(&self) -> i64 {
        self.vgroup.vgroup_id
    }

    /// Reasons this vgroup can not be migrated. Empty means migratable.
    pub fn unsupported_reasons(&self) -> Vec<&'static str> {
        let collections: [(&'static str, &Vec<Value>); 7] = [
            ("services", &self.services),
            ("addons", &self.addons),
            ("macstaff", &self.mac_staff),
            ("telstaff", &self.tel_staff),
            ("staff", &self.staff),
            ("blockrasp", &self.block_requests),
            ("tarrasp", &self.tariff_requests),
        ];
        let mut reasons: Vec<&'static str> = collections
            .iter()
            .filter(|(_, items)| !items.is_empty())
            .map(|(name, _)| *name)
            .collect();

        if self.vgroup.parent_vgroup_id != 0 {
            reasons.push("parentvgid");
        }
        if self.vgroup.blocked != 0 {
            reasons.push("blocked");
        }
        if self.vgroup.parent_login.is_some() {
            reasons.push("parentvglogin");
        }
        if self.vgroup.dirty != 0 {
            reasons.push("dirty");
        }
        reasons
    }

    pub fn is_migratable(&self) -> bool {
        self.unsupported_reasons().is_empty()
    }
}
