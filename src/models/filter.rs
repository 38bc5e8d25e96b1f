use serde_json::{Map, Value, json};

use crate::error::{ToolError, ToolResult};

use super::vgroup::VgroupSummary;

/// Record selection shared by every tool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub from_tar_id: Option<i64>,
    pub to_tar_id: Option<i64>,
    pub from_vg_id: Option<i64>,
    pub to_vg_id: Option<i64>,
    pub login: Option<String>,
    pub agent_id: Option<i64>,
    pub archived: Option<bool>,
}

fn single(from: Option<i64>, to: Option<i64>) -> Option<i64> {
    match (from, to) {
        (Some(from), Some(to)) if from == to => Some(from),
        _ => None,
    }
}

fn in_range(value: i64, from: Option<i64>, to: Option<i64>) -> bool {
    from.is_none_or(|from| value >= from) && to.is_none_or(|to| value <= to)
}

impl RecordFilter {
    pub fn validate(&self) -> ToolResult<()> {
        if let (Some(from), Some(to)) = (self.from_tar_id, self.to_tar_id) {
            if from > to {
                return Err(ToolError::InvalidArguments(
                    "\"from-tar-id\" is greater than \"to-tar-id\"".to_string(),
                ));
            }
        }
        if let (Some(from), Some(to)) = (self.from_vg_id, self.to_vg_id) {
            if from > to {
                return Err(ToolError::InvalidArguments(
                    "\"from-vg-id\" is greater than \"to-vg-id\"".to_string(),
                ));
            }
        }
        if matches!(self.login.as_deref(), Some("")) {
            return Err(ToolError::InvalidArguments(
                "\"login\" must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// True when any criterion can only be answered by looking at vgroups.
    pub fn selects_by_vgroup(&self) -> bool {
        self.from_vg_id.is_some()
            || self.to_vg_id.is_some()
            || self.login.is_some()
            || self.agent_id.is_some()
            || self.archived.is_some()
    }

    pub fn single_tariff_id(&self) -> Option<i64> {
        single(self.from_tar_id, self.to_tar_id)
    }

    pub fn single_vgroup_id(&self) -> Option<i64> {
        single(self.from_vg_id, self.to_vg_id)
    }

    /// Server-side part of the selection, sent as the `flt` argument of
    /// `getVgroups`.
    pub fn vgroup_request(&self) -> Value {
        let mut flt = Map::new();
        if let Some(vg_id) = self.single_vgroup_id() {
            flt.insert("vgid".to_string(), json!(vg_id));
        }
        if let Some(login) = &self.login {
            flt.insert("login".to_string(), json!(login));
        }
        if let Some(agent_id) = self.agent_id {
            flt.insert("agentid".to_string(), json!(agent_id));
        }
        if let Some(archived) = self.archived {
            flt.insert("archive".to_string(), json!(i64::from(archived)));
        }
        if let Some(tar_id) = self.single_tariff_id() {
            flt.insert("tarid".to_string(), json!(tar_id));
        }
        Value::Object(flt)
    }

    /// Client-side part of the selection: id ranges the server was not asked
    /// to apply.
    pub fn matches_vgroup(&self, vgroup: &VgroupSummary) -> bool {
        let vg_ok = self.single_vgroup_id().is_some()
            || in_range(vgroup.vgroup_id, self.from_vg_id, self.to_vg_id);
        let tar_ok = self.single_tariff_id().is_some()
            || in_range(vgroup.tariff_id, self.from_tar_id, self.to_tar_id);
        vg_ok && tar_ok
    }

    pub fn matches_tariff_id(&self, tariff_id: i64) -> bool {
        in_range(tariff_id, self.from_tar_id, self.to_tar_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vgroup(vgroup_id: i64, tariff_id: i64) -> VgroupSummary {
        VgroupSummary {
            vgroup_id,
            tariff_id,
            ..Default::default()
        }
    }

    #[test]
    fn test_inverted_ranges_are_rejected() {
        let filter = RecordFilter {
            from_tar_id: Some(10),
            to_tar_id: Some(2),
            ..Default::default()
        };
        assert!(matches!(filter.validate(), Err(ToolError::InvalidArguments(_))));

        let filter = RecordFilter {
            from_vg_id: Some(5),
            to_vg_id: Some(4),
            ..Default::default()
        };
        assert!(filter.validate().is_err());

        let filter = RecordFilter {
            from_vg_id: Some(4),
            to_vg_id: Some(4),
            ..Default::default()
        };
        assert!(filter.validate().is_ok());
    }

    #[test]
    fn test_request_carries_single_ids_only() {
        let filter = RecordFilter {
            from_vg_id: Some(3),
            to_vg_id: Some(3),
            from_tar_id: Some(1),
            to_tar_id: Some(9),
            agent_id: Some(2),
            archived: Some(false),
            ..Default::default()
        };
        assert_eq!(
            filter.vgroup_request(),
            json!({"vgid": 3, "agentid": 2, "archive": 0})
        );
    }

    #[test]
    fn test_client_side_ranges() {
        let filter = RecordFilter {
            from_vg_id: Some(10),
            to_tar_id: Some(5),
            ..Default::default()
        };
        assert!(filter.matches_vgroup(&vgroup(10, 5)));
        assert!(!filter.matches_vgroup(&vgroup(9, 5)));
        assert!(!filter.matches_vgroup(&vgroup(11, 6)));
    }

    #[test]
    fn test_selects_by_vgroup() {
        assert!(!RecordFilter::default().selects_by_vgroup());
        let filter = RecordFilter {
            archived: Some(true),
            ..Default::default()
        };
        assert!(filter.selects_by_vgroup());
    }
}
