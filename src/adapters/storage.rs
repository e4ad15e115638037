use crate::domain::model::{Freshness, HolidaySet, Jurisdiction};
use crate::domain::ports::HolidayStore;
use crate::utils::error::Result;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Durable holiday cache: one JSON document per jurisdiction and year under
/// `base_path/<jurisdiction>/<year>.json`.
#[derive(Debug, Clone)]
pub struct FileHolidayStore {
    base_path: PathBuf,
}

impl FileHolidayStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn entry_path(&self, jurisdiction: Jurisdiction, year: i32) -> PathBuf {
        self.base_path
            .join(jurisdiction.slug())
            .join(format!("{}.json", year))
    }
}

impl HolidayStore for FileHolidayStore {
    async fn load(&self, jurisdiction: Jurisdiction, year: i32) -> Result<Option<HolidaySet>> {
        let path = self.entry_path(jurisdiction, year);
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // A corrupt or mismatched entry is as good as no entry.
        match serde_json::from_slice::<HolidaySet>(&data) {
            Ok(set) if set.jurisdiction == jurisdiction && set.year == year => Ok(Some(set)),
            Ok(_) => {
                tracing::warn!("Ignoring mismatched cache entry {}", path.display());
                Ok(None)
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable cache entry {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    async fn save(&self, set: &HolidaySet) -> Result<()> {
        let path = self.entry_path(set.jurisdiction, set.year);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let stored = HolidaySet {
            freshness: Freshness::Fresh,
            ..set.clone()
        };
        let data = serde_json::to_vec_pretty(&stored)?;

        // Write-then-rename so readers never see a half-written entry.
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &data).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        tracing::debug!("Cached {} holidays at {}", set.dates.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use tempfile::TempDir;

    fn set(jurisdiction: Jurisdiction, year: i32) -> HolidaySet {
        HolidaySet::new(
            jurisdiction,
            year,
            [NaiveDate::from_ymd_opt(year, 12, 25).unwrap()],
            Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
            Freshness::Fresh,
        )
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileHolidayStore::new(temp_dir.path());
        let original = set(Jurisdiction::Scotland, 2025);

        tokio_test::block_on(store.save(&original)).unwrap();
        let loaded = tokio_test::block_on(store.load(Jurisdiction::Scotland, 2025)).unwrap();

        assert_eq!(loaded, Some(original));
        assert!(temp_dir.path().join("scotland").join("2025.json").exists());
        assert!(!temp_dir.path().join("scotland").join("2025.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_missing_entry_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileHolidayStore::new(temp_dir.path());

        assert_eq!(store.load(Jurisdiction::EnglandAndWales, 2025).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_stale_sets_are_stored_as_fetched() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileHolidayStore::new(temp_dir.path());

        store
            .save(&set(Jurisdiction::NorthernIreland, 2024).into_stale())
            .await
            .unwrap();
        let loaded = store
            .load(Jurisdiction::NorthernIreland, 2024)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(loaded.freshness, Freshness::Fresh);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("england-and-wales");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("2025.json"), b"{ truncated").unwrap();

        let store = FileHolidayStore::new(temp_dir.path());
        assert_eq!(store.load(Jurisdiction::EnglandAndWales, 2025).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_mismatched_entry_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileHolidayStore::new(temp_dir.path());
        store.save(&set(Jurisdiction::Scotland, 2025)).await.unwrap();

        std::fs::create_dir_all(temp_dir.path().join("england-and-wales")).unwrap();
        std::fs::copy(
            temp_dir.path().join("scotland").join("2025.json"),
            temp_dir.path().join("england-and-wales").join("2025.json"),
        )
        .unwrap();

        assert_eq!(store.load(Jurisdiction::EnglandAndWales, 2025).await.unwrap(), None);
    }
}
