//! Windows Security state: protection toggles and the quarantine list.
//! Both are persisted through the file system's settings map.

use serde::{Deserialize, Serialize};

use super::ctf;
use super::store::{Store, VfsResult};
use super::vfs::VirtualFs;

pub const SECURITY_KEY: &str = "security";
pub const QUARANTINE_KEY: &str = "quarantine";

/// All protections start switched off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySettings {
    #[serde(default)]
    pub realtime_protection: bool,
    #[serde(default)]
    pub cloud_protection: bool,
    #[serde(default)]
    pub firewall_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protection {
    Realtime,
    Cloud,
    Firewall,
}

impl Protection {
    pub const ALL: [Protection; 3] = [Protection::Realtime, Protection::Cloud, Protection::Firewall];

    pub fn label(self) -> &'static str {
        match self {
            Protection::Realtime => "Real-time protection",
            Protection::Cloud => "Cloud-delivered protection",
            Protection::Firewall => "Firewall & network protection",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Protection::Realtime => "Finds and stops malware from installing or running",
            Protection::Cloud => "Provides increased and faster protection",
            Protection::Firewall => "Monitors and controls network traffic",
        }
    }
}

impl SecuritySettings {
    pub fn is_enabled(&self, p: Protection) -> bool {
        match p {
            Protection::Realtime => self.realtime_protection,
            Protection::Cloud => self.cloud_protection,
            Protection::Firewall => self.firewall_enabled,
        }
    }

    fn slot(&mut self, p: Protection) -> &mut bool {
        match p {
            Protection::Realtime => &mut self.realtime_protection,
            Protection::Cloud => &mut self.cloud_protection,
            Protection::Firewall => &mut self.firewall_enabled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarantinedItem {
    pub id: String,
    pub file_name: String,
    pub original_path: String,
    pub detection_reason: String,
    pub threat_level: String,
    pub quarantined_at: i64,
}

impl QuarantinedItem {
    fn flagged_detection() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            file_name: ctf::FLAGGED_NAME.to_string(),
            original_path: ctf::FLAGGED_PATH.to_string(),
            detection_reason: ctf::FLAGGED_DETECTION_REASON.to_string(),
            threat_level: ctf::FLAGGED_THREAT_LEVEL.to_string(),
            quarantined_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn quarantined_at_display(&self) -> String {
        chrono::DateTime::from_timestamp_millis(self.quarantined_at)
            .map(|t| {
                t.with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
            })
            .unwrap_or_else(|| "unknown".to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SecurityCenter {
    pub settings: SecuritySettings,
    pub quarantine: Vec<QuarantinedItem>,
}

impl SecurityCenter {
    /// Load saved state, writing defaults and the seeded detection when absent.
    pub fn load<S: Store>(fs: &mut VirtualFs<S>) -> VfsResult<Self> {
        let settings = match fs.get_setting(SECURITY_KEY)? {
            Some(value) => serde_json::from_value(value).unwrap_or_else(|err| {
                tracing::warn!(%err, "security settings malformed, using defaults");
                SecuritySettings::default()
            }),
            None => {
                let defaults = SecuritySettings::default();
                fs.set_setting(SECURITY_KEY, serde_json::to_value(defaults)?)?;
                defaults
            }
        };

        let quarantine = match fs.get_setting(QUARANTINE_KEY)? {
            Some(value) => serde_json::from_value(value).unwrap_or_else(|err| {
                tracing::warn!(%err, "quarantine list malformed, starting empty");
                Vec::new()
            }),
            None => {
                let seeded = vec![QuarantinedItem::flagged_detection()];
                fs.set_setting(QUARANTINE_KEY, serde_json::to_value(&seeded)?)?;
                seeded
            }
        };

        Ok(Self {
            settings,
            quarantine,
        })
    }

    pub fn set_protection<S: Store>(
        &mut self,
        fs: &mut VirtualFs<S>,
        p: Protection,
        enabled: bool,
    ) -> VfsResult<()> {
        *self.settings.slot(p) = enabled;
        tracing::info!(protection = p.label(), enabled, "security toggle");
        fs.set_setting(SECURITY_KEY, serde_json::to_value(self.settings)?)
    }

    pub fn toggle<S: Store>(&mut self, fs: &mut VirtualFs<S>, p: Protection) -> VfsResult<()> {
        let enabled = !self.settings.is_enabled(p);
        self.set_protection(fs, p, enabled)
    }

    /// Drop the entry if the flagged file is still on disk. Returns whether
    /// anything changed.
    pub fn restore_from_quarantine<S: Store>(
        &mut self,
        fs: &mut VirtualFs<S>,
        id: &str,
    ) -> VfsResult<bool> {
        if !self.quarantine.iter().any(|item| item.id == id) {
            return Ok(false);
        }
        if !fs.exists(ctf::FLAGGED_PATH)? {
            return Ok(false);
        }
        self.quarantine.retain(|item| item.id != id);
        self.persist_quarantine(fs)?;
        Ok(true)
    }

    pub fn delete_from_quarantine<S: Store>(
        &mut self,
        fs: &mut VirtualFs<S>,
        id: &str,
    ) -> VfsResult<bool> {
        let before = self.quarantine.len();
        self.quarantine.retain(|item| item.id != id);
        if self.quarantine.len() == before {
            return Ok(false);
        }
        self.persist_quarantine(fs)?;
        Ok(true)
    }

    fn persist_quarantine<S: Store>(&self, fs: &mut VirtualFs<S>) -> VfsResult<()> {
        fs.set_setting(QUARANTINE_KEY, serde_json::to_value(&self.quarantine)?)
    }

    /// Desktop banner naming every protection that is switched off.
    pub fn warning_line(&self) -> Option<String> {
        let off: Vec<&str> = Protection::ALL
            .iter()
            .filter(|p| !self.settings.is_enabled(**p))
            .map(|p| p.label())
            .collect();
        if off.is_empty() {
            None
        } else {
            Some(format!("Security warning: {} turned off", off.join(", ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::{JsonFileStore, MemoryStore};

    fn fs() -> VirtualFs<MemoryStore> {
        let mut fs = VirtualFs::new(MemoryStore::new());
        fs.initialize().unwrap();
        fs
    }

    #[test]
    fn first_load_seeds_defaults_and_detection() {
        let mut fs = fs();
        let center = SecurityCenter::load(&mut fs).unwrap();
        assert_eq!(center.settings, SecuritySettings::default());
        assert_eq!(center.quarantine.len(), 1);
        let item = &center.quarantine[0];
        assert_eq!(item.file_name, "system_helper.dll");
        assert_eq!(item.threat_level, "High");
        assert!(fs.get_setting(SECURITY_KEY).unwrap().is_some());
        assert!(fs.get_setting(QUARANTINE_KEY).unwrap().is_some());
    }

    #[test]
    fn toggles_and_quarantine_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("fs.json");
        let kept_id;
        {
            let mut fs = VirtualFs::new(JsonFileStore::open(&file).unwrap());
            fs.initialize().unwrap();
            let mut center = SecurityCenter::load(&mut fs).unwrap();
            center.toggle(&mut fs, Protection::Firewall).unwrap();
            center
                .set_protection(&mut fs, Protection::Realtime, true)
                .unwrap();
            kept_id = center.quarantine[0].id.clone();
        }
        let mut fs = VirtualFs::new(JsonFileStore::open(&file).unwrap());
        fs.initialize().unwrap();
        let center = SecurityCenter::load(&mut fs).unwrap();
        assert!(center.settings.firewall_enabled);
        assert!(center.settings.realtime_protection);
        assert!(!center.settings.cloud_protection);
        assert_eq!(center.quarantine.len(), 1);
        assert_eq!(center.quarantine[0].id, kept_id);
    }

    #[test]
    fn restore_requires_flagged_file_present() {
        let mut fs = fs();
        let mut center = SecurityCenter::load(&mut fs).unwrap();
        let id = center.quarantine[0].id.clone();
        assert!(!center.restore_from_quarantine(&mut fs, &id).unwrap());
        assert_eq!(center.quarantine.len(), 1);

        fs.write(ctf::FLAGGED_PATH, ctf::FLAGGED_CONTENT, "text/plain")
            .unwrap();
        assert!(center.restore_from_quarantine(&mut fs, &id).unwrap());
        assert!(center.quarantine.is_empty());
    }

    #[test]
    fn delete_removes_entry_and_persists() {
        let mut fs = fs();
        let mut center = SecurityCenter::load(&mut fs).unwrap();
        let id = center.quarantine[0].id.clone();
        assert!(center.delete_from_quarantine(&mut fs, &id).unwrap());
        assert!(!center.delete_from_quarantine(&mut fs, &id).unwrap());
        let reloaded = SecurityCenter::load(&mut fs).unwrap();
        assert!(reloaded.quarantine.is_empty());
    }

    #[test]
    fn warning_lists_disabled_protections() {
        let mut fs = fs();
        let mut center = SecurityCenter::load(&mut fs).unwrap();
        let line = center.warning_line().unwrap();
        assert!(line.contains("Real-time protection"));
        assert!(line.contains("Firewall"));
        for p in Protection::ALL {
            center.set_protection(&mut fs, p, true).unwrap();
        }
        assert_eq!(center.warning_line(), None);
    }
}
