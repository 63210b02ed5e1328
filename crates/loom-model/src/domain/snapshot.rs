use serde::{Deserialize, Serialize};

use crate::{GroupName, SlotId, SlotStatus};

/// Point-in-time view of one slot, as returned by `status()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotInfo {
    /// Slot index inside the group.
    pub id: SlotId,
    /// OS pid, `0` once the process has been reaped.
    pub pid: u32,
    /// Concrete argv the process was started with.
    pub args: Vec<String>,
    /// Current state.
    pub status: SlotStatus,
    /// Milliseconds since the last spawn while the process is live.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_ms: Option<u64>,
    /// Last exit code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
    /// Last terminating signal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<String>,
}

/// Point-in-time view of a task group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStatus {
    pub name: GroupName,
    pub count: usize,
    pub source: String,
    pub persistent: bool,
    /// `true` once the group left the configuration and is draining.
    #[serde(default)]
    pub draining: bool,
    pub subtasks: Vec<SlotInfo>,
}

impl GroupStatus {
    /// Number of slots backed by a live process.
    pub fn live(&self) -> usize {
        self.subtasks.iter().filter(|s| s.pid != 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exited_slot_omits_runtime_fields() {
        let info = SlotInfo {
            id: 0,
            pid: 0,
            args: vec![],
            status: SlotStatus::Done,
            uptime_ms: None,
            code: Some(0),
            signal: None,
        };

        let json = serde_json::to_string(&info).unwrap();
        assert!(!json.contains("uptimeMs"));
        assert!(!json.contains("signal"));
        assert!(json.contains(r#""code":0"#));
    }
}
