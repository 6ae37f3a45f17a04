use std::path::PathBuf;

use anyhow::Result;
use tokio::sync::RwLock;

use crate::models::{AppConfig, PersistedAppConfig};

pub struct SettingsManager {
    path: PathBuf,
    data: RwLock<PersistedAppConfig>,
}

impl SettingsManager {
    pub async fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let initial = match tokio::fs::read(&path).await {
            Ok(bytes) if !bytes.is_empty() => {
                match serde_json::from_slice::<PersistedAppConfig>(&bytes) {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::warn!("配置文件解析失败，使用默认配置: {}", e);
                        PersistedAppConfig::default()
                    }
                }
            }
            _ => {
                let default = PersistedAppConfig::default();
                let json = serde_json::to_string_pretty(&default)?;
                tokio::fs::write(&path, json).await?;
                default
            }
        };

        Ok(Self {
            path,
            data: RwLock::new(initial),
        })
    }

    pub async fn get(&self) -> PersistedAppConfig {
        self.data.read().await.clone()
    }

    pub async fn update(&self, update: AppConfig) -> Result<PersistedAppConfig> {
        let mut config = self.data.write().await;

        if let Some(api) = update.api {
            config.api = api;
        }
        if let Some(methods) = update.methods {
            config.methods = methods;
        }
        if let Some(profiles) = update.profiles {
            config.profiles.extend(profiles);
        }
        if let Some(capacity) = update.event_bus_capacity {
            config.event_bus_capacity = capacity;
        }

        self.save(&config).await?;
        Ok(config.clone())
    }

    async fn save(&self, config: &PersistedAppConfig) -> Result<()> {
        let json = serde_json::to_string_pretty(config)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApiSettings, EntityKind, EntityProfile};
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("settings.json");

        let manager = SettingsManager::new(path.clone()).await.unwrap();
        assert!(path.exists());
        assert_eq!(manager.get().await, PersistedAppConfig::default());
    }

    #[tokio::test]
    async fn test_update_persists_partial_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let manager = SettingsManager::new(path.clone()).await.unwrap();

        let mut profile = EntityProfile::default_for(EntityKind::Proof);
        profile.case_sensitive = true;
        let update = AppConfig {
            api: Some(ApiSettings {
                mock_api: true,
                ..Default::default()
            }),
            profiles: Some(BTreeMap::from([(EntityKind::Proof, profile)])),
            ..Default::default()
        };
        let updated = manager.update(update).await.unwrap();
        assert!(updated.api.mock_api);
        assert_eq!(updated.methods, PersistedAppConfig::default().methods);

        let reloaded = SettingsManager::new(path).await.unwrap().get().await;
        assert!(reloaded.profile(EntityKind::Proof).case_sensitive);
        assert!(!reloaded.profile(EntityKind::Shipment).case_sensitive);
    }

    #[tokio::test]
    async fn test_corrupt_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let manager = SettingsManager::new(path).await.unwrap();
        assert_eq!(manager.get().await.event_bus_capacity, 256);
    }
}
