//! 医生目录缓存
//!
//! 按专科缓存检索结果，目录发生任何写入时整体失效。
//! 缓存只是加速手段，查询路径绕过缓存也能得到相同结果。

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::directory::DoctorDirectoryEntry;

/// 医生目录缓存
#[derive(Debug, Default)]
pub struct DirectoryCache {
    by_specialty: Arc<RwLock<HashMap<String, Vec<DoctorDirectoryEntry>>>>,
}

impl DirectoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取某专科的缓存结果
    pub async fn get(&self, specialty: &str) -> Option<Vec<DoctorDirectoryEntry>> {
        let map = self.by_specialty.read().await;
        map.get(&specialty.to_lowercase()).cloned()
    }

    /// 写入某专科的检索结果
    pub async fn put(&self, specialty: &str, entries: Vec<DoctorDirectoryEntry>) {
        let mut map = self.by_specialty.write().await;
        map.insert(specialty.to_lowercase(), entries);
    }

    /// 使单个专科的缓存失效
    pub async fn evict(&self, specialty: &str) {
        let mut map = self.by_specialty.write().await;
        map.remove(&specialty.to_lowercase());
    }

    /// 目录写入后整体失效
    pub async fn clear(&self) {
        let mut map = self.by_specialty.write().await;
        if !map.is_empty() {
            tracing::debug!(entries = map.len(), "Doctor directory cache cleared");
        }
        map.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn entry(username: &str) -> DoctorDirectoryEntry {
        DoctorDirectoryEntry {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: format!("{}@clinic.test", username),
            specialty: "Cardiology".to_string(),
        }
    }

    #[tokio::test]
    async fn test_cache_round_trip_is_case_insensitive() {
        let cache = DirectoryCache::new();
        cache.put("Cardiology", vec![entry("dr_chen")]).await;

        let hit = cache.get("cardiology").await.unwrap();
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].username, "dr_chen");
    }

    #[tokio::test]
    async fn test_evict_single_specialty() {
        let cache = DirectoryCache::new();
        cache.put("Cardiology", vec![entry("dr_chen")]).await;
        cache.put("Dermatology", vec![entry("dr_wang")]).await;

        cache.evict("CARDIOLOGY").await;
        assert!(cache.get("Cardiology").await.is_none());
        assert!(cache.get("Dermatology").await.is_some());
    }

    #[tokio::test]
    async fn test_clear_evicts_everything() {
        let cache = DirectoryCache::new();
        cache.put("Cardiology", vec![entry("dr_chen")]).await;
        cache.put("Dermatology", vec![entry("dr_wang")]).await;

        cache.clear().await;
        assert!(cache.get("Cardiology").await.is_none());
        assert!(cache.get("Dermatology").await.is_none());
    }
}
