//! In-memory billing used by service tests.

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

use crate::models::{Agent, TariffBody, TariffRecord, VgroupBody, VgroupDetail};
use crate::rpc::{self, RpcArgs, RpcError, RpcGateway};

/// A supported tariff with ordinary commercial terms.
pub fn tariff(id: i64, category_type: i64, descr: &str) -> TariffRecord {
    let mut extra = Map::new();
    extra.insert("rent".to_string(), json!("300.000000"));
    extra.insert("curid".to_string(), json!("1"));
    TariffRecord {
        tariff: TariffBody {
            id,
            category_type,
            display_name: descr.to_string(),
            uuid: Some(format!("uuid-{id}")),
            extra,
            ..Default::default()
        },
        ..Default::default()
    }
}

pub type RecordedCall = (String, Vec<(String, Value)>);

#[derive(Default)]
pub struct FakeBilling {
    tariffs: BTreeMap<i64, TariffRecord>,
    vgroups: BTreeMap<i64, VgroupDetail>,
    agents: Vec<Agent>,
    calls: Vec<RecordedCall>,
    failures: Vec<String>,
    next_tariff_id: i64,
    next_vgroup_id: i64,
}

fn int(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n.as_i64().unwrap_or_default(),
        Value::String(s) => s.trim().parse().unwrap_or_default(),
        _ => 0,
    }
}

fn fault(message: String) -> RpcError {
    RpcError::Fault {
        code: "SOAP-ENV:Server".to_string(),
        message,
    }
}

impl FakeBilling {
    pub fn new() -> Self {
        Self {
            next_tariff_id: 1,
            next_vgroup_id: 1,
            ..Default::default()
        }
    }

    pub fn add_tariff(&mut self, record: TariffRecord) {
        self.next_tariff_id = self.next_tariff_id.max(record.id() + 1);
        self.tariffs.insert(record.id(), record);
    }

    pub fn add_vgroup(
        &mut self,
        vgroup_id: i64,
        agent_id: i64,
        tariff_id: i64,
        login: &str,
    ) -> &mut VgroupDetail {
        self.next_vgroup_id = self.next_vgroup_id.max(vgroup_id + 1);
        let detail = VgroupDetail {
            vgroup: VgroupBody {
                vgroup_id,
                agent_id,
                tariff_id,
                login: login.to_string(),
                uid: Some(json!(format!("uid-{vgroup_id}"))),
                ..Default::default()
            },
            ..Default::default()
        };
        self.vgroups.entry(vgroup_id).or_insert(detail)
    }

    pub fn add_agent(&mut self, id: i64, name: &str) {
        self.agents.push(Agent {
            id,
            name: name.to_string(),
            extra: Map::new(),
        });
    }

    /// Makes the next call of `method` fail with a remote fault.
    pub fn fail_next(&mut self, method: &str) {
        self.failures.push(method.to_string());
    }

    pub fn tariff(&self, id: i64) -> Option<TariffRecord> {
        self.tariffs.get(&id).cloned()
    }

    pub fn tariffs_of_type(&self, category_type: i64) -> Vec<TariffRecord> {
        self.tariffs
            .values()
            .filter(|t| t.category_type() == category_type)
            .cloned()
            .collect()
    }

    pub fn detail(&self, vgroup_id: i64) -> Option<VgroupDetail> {
        self.vgroups.get(&vgroup_id).cloned()
    }

    pub fn vgroup_by_login(&self, login: &str) -> Option<VgroupDetail> {
        self.vgroups
            .values()
            .find(|v| v.vgroup.login == login)
            .cloned()
    }

    pub fn calls(&self) -> &[RecordedCall] {
        &self.calls
    }

    pub fn methods(&self) -> Vec<&str> {
        self.calls.iter().map(|(m, _)| m.as_str()).collect()
    }

    pub fn calls_to(&self, method: &str) -> usize {
        self.calls.iter().filter(|(m, _)| m == method).count()
    }

    /// Arguments of the latest call of `method`; empty if it was never made.
    pub fn last_args(&self, method: &str) -> Vec<(String, Value)> {
        self.calls
            .iter()
            .rev()
            .find(|(m, _)| m == method)
            .map(|(_, args)| args.clone())
            .unwrap_or_default()
    }

    fn save_tariff(&mut self, val: Value) -> Result<Vec<Value>, RpcError> {
        let mut record: TariffRecord =
            serde_json::from_value(val).map_err(|e| RpcError::Decode(e.to_string()))?;
        if record.tariff.id == 0 {
            record.tariff.id = self.next_tariff_id;
            self.next_tariff_id += 1;
        }
        let id = record.id();
        self.tariffs.insert(id, record);
        Ok(vec![json!(id.to_string())])
    }

    fn save_vgroup(&mut self, val: Value) -> Result<Vec<Value>, RpcError> {
        let mut detail: VgroupDetail =
            serde_json::from_value(val).map_err(|e| RpcError::Decode(e.to_string()))?;
        let taken = self.vgroups.values().any(|v| {
            v.vgroup.login == detail.vgroup.login && v.vgroup.vgroup_id != detail.vgroup.vgroup_id
        });
        if taken {
            return Err(fault(format!(
                "Login {} is already in use",
                detail.vgroup.login
            )));
        }
        if detail.vgroup.vgroup_id == 0 {
            detail.vgroup.vgroup_id = self.next_vgroup_id;
            detail.vgroup.uid = Some(json!(format!("uid-{}", self.next_vgroup_id)));
            self.next_vgroup_id += 1;
        } else if !self.vgroups.contains_key(&detail.vgroup.vgroup_id) {
            return Err(fault(format!("No vgroup {}", detail.vgroup.vgroup_id)));
        }
        let id = detail.vgroup.vgroup_id;
        self.vgroups.insert(id, detail);
        Ok(vec![json!(id)])
    }

    fn list_vgroups(&self, flt: &Value) -> Vec<Value> {
        let archive_of = |v: &VgroupBody| v.extra.get("archive").map(int).unwrap_or(0);
        let matches = |v: &VgroupBody| {
            let Some(flt) = flt.as_object() else {
                return true;
            };
            flt.iter().all(|(key, expected)| match key.as_str() {
                "vgid" => v.vgroup_id == int(expected),
                "agentid" => v.agent_id == int(expected),
                "tarid" => v.tariff_id == int(expected),
                "archive" => archive_of(v) == int(expected),
                "login" => expected.as_str() == Some(v.login.as_str()),
                _ => true,
            })
        };
        self.vgroups
            .values()
            .map(|detail| &detail.vgroup)
            .filter(|v| matches(*v))
            .map(|v| {
                json!({
                    "vgid": v.vgroup_id.to_string(),
                    "id": v.agent_id.to_string(),
                    "tarid": v.tariff_id.to_string(),
                    "login": v.login,
                    "archive": archive_of(v).to_string(),
                })
            })
            .collect()
    }

    fn vgroup_mut(&mut self, val: &Value) -> Result<&mut VgroupBody, RpcError> {
        let id = int(&val["vgid"]);
        self.vgroups
            .get_mut(&id)
            .map(|detail| &mut detail.vgroup)
            .ok_or_else(|| fault(format!("No vgroup {id}")))
    }
}

#[async_trait]
impl RpcGateway for FakeBilling {
    async fn call(&mut self, method: &str, args: &RpcArgs<'_>) -> Result<Vec<Value>, RpcError> {
        self.calls.push((
            method.to_string(),
            args.iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect(),
        ));
        if let Some(pos) = self.failures.iter().position(|m| m == method) {
            self.failures.remove(pos);
            return Err(fault(format!("{method} failed")));
        }

        let arg = |name: &str| {
            args.iter()
                .find(|(n, _)| *n == name)
                .map(|(_, value)| value.clone())
                .unwrap_or(Value::Null)
        };

        match method {
            rpc::GET_TARIFFS => Ok(self
                .tariffs
                .values()
                .map(|t| json!({"id": t.id().to_string(), "descr": t.tariff.display_name}))
                .collect()),
            rpc::GET_TARIFF => Ok(self
                .tariffs
                .get(&int(&arg("id")))
                .map(serde_json::to_value)
                .transpose()
                .map_err(|e| RpcError::Encode(e.to_string()))?
                .into_iter()
                .collect()),
            rpc::SAVE_TARIFF => self.save_tariff(arg("val")),
            rpc::GET_VGROUPS => Ok(self.list_vgroups(&arg("flt"))),
            rpc::GET_VGROUP => Ok(self
                .vgroups
                .get(&int(&arg("id")))
                .map(serde_json::to_value)
                .transpose()
                .map_err(|e| RpcError::Encode(e.to_string()))?
                .into_iter()
                .collect()),
            rpc::SAVE_VGROUP => self.save_vgroup(arg("val")),
            rpc::GET_AGENTS => Ok(self
                .agents
                .iter()
                .map(|a| json!({"id": a.id.to_string(), "name": a.name}))
                .collect()),
            rpc::SET_BLOCK => {
                let val = arg("val");
                let vgroup = self.vgroup_mut(&val)?;
                vgroup.blocked = int(&val["blkreq"]);
                Ok(vec![json!(1)])
            }
            rpc::ASSIGN_TARIFF => {
                let val = arg("val");
                let vgroup = self.vgroup_mut(&val)?;
                vgroup.tariff_id = int(&val["tarid"]);
                Ok(vec![json!(1)])
            }
            other => Err(fault(format!("Unknown method {other}"))),
        }
    }
}
