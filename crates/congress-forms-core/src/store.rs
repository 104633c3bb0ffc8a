//! Typed storage wrappers around congress-forms-storage.

use crate::models::{FillOutcome, LegislatorProfile, RecentFillStatus};
use crate::office::OfficeCode;
use anyhow::Result;
use chrono::Utc;
use congress_forms_storage::{LegislatorKeys, Storage};
use std::path::Path;
use tracing::{debug, info};

/// Append-only destination for fill outcomes.
pub trait FillStatusSink: Send + Sync {
    fn record(&self, outcome: &FillOutcome) -> Result<()>;
}

/// Typed fill status log.
#[derive(Clone)]
pub struct FillStatusStore {
    inner: congress_forms_storage::FillStatusStorage,
}

impl FillStatusStore {
    pub fn new(inner: congress_forms_storage::FillStatusStorage) -> Self {
        Self { inner }
    }

    pub fn get(&self, id: &str) -> Result<Option<FillOutcome>> {
        self.inner
            .get(id)?
            .map(|bytes| serde_json::from_slice(&bytes).map_err(Into::into))
            .transpose()
    }

    /// Every outcome for a legislator, oldest first.
    pub fn list_for_legislator(&self, bioguide_id: &str) -> Result<Vec<FillOutcome>> {
        decode_all(self.inner.list_for_legislator(bioguide_id)?)
    }

    /// Outcomes created strictly after `since_ms`, oldest first.
    pub fn list_since(&self, bioguide_id: &str, since_ms: i64) -> Result<Vec<FillOutcome>> {
        decode_all(self.inner.list_for_legislator_since(bioguide_id, since_ms)?)
    }

    /// Outcomes across all legislators created in `[from_ms, to_ms)`.
    pub fn list_between(&self, from_ms: i64, to_ms: i64) -> Result<Vec<FillOutcome>> {
        decode_all(self.inner.list_created_between(from_ms, to_ms)?)
    }

    /// Outcome counts since the profile was last updated.
    pub fn recent_fill_status(&self, profile: &LegislatorProfile) -> Result<RecentFillStatus> {
        let outcomes = self.list_since(&profile.bioguide_id, profile.updated_at_ms)?;
        Ok(RecentFillStatus::from_outcomes(&outcomes))
    }

    pub fn count(&self) -> Result<usize> {
        self.inner.count()
    }
}

impl FillStatusSink for FillStatusStore {
    fn record(&self, outcome: &FillOutcome) -> Result<()> {
        let bytes = serde_json::to_vec(outcome)?;
        self.inner
            .append(&outcome.id, &outcome.bioguide_id, outcome.created_at_ms, &bytes)?;
        debug!(id = %outcome.id, bioguide_id = %outcome.bioguide_id, status = %outcome.status, "Recorded fill status");
        Ok(())
    }
}

fn decode_all(records: Vec<Vec<u8>>) -> Result<Vec<FillOutcome>> {
    records
        .iter()
        .map(|bytes| serde_json::from_slice(bytes).map_err(Into::into))
        .collect()
}

/// Typed legislator profile storage.
#[derive(Clone)]
pub struct LegislatorStore {
    inner: congress_forms_storage::LegislatorStorage,
}

impl LegislatorStore {
    pub fn new(inner: congress_forms_storage::LegislatorStorage) -> Self {
        Self { inner }
    }

    pub fn save(&self, profile: &LegislatorProfile) -> Result<()> {
        profile.validate()?;
        let seat = OfficeCode::for_profile(profile).map(|code| code.seat_key());
        let keys = LegislatorKeys {
            id: &profile.id,
            bioguide_id: &profile.bioguide_id,
            seat: seat.as_deref(),
            created_at_ms: profile.created_at_ms,
        };
        self.inner.put(&keys, &serde_json::to_vec(profile)?)
    }

    /// Save `profile`, taking over the identity of the existing profile for
    /// the same bioguide id if there is one.
    pub fn import(&self, mut profile: LegislatorProfile) -> Result<LegislatorProfile> {
        if let Some(existing) = self.by_bioguide(&profile.bioguide_id)? {
            profile.id = existing.id;
            profile.created_at_ms = existing.created_at_ms;
            profile.updated_at_ms = Utc::now().timestamp_millis();
            info!(bioguide_id = %profile.bioguide_id, "Updating legislator profile");
        } else {
            info!(bioguide_id = %profile.bioguide_id, "Creating legislator profile");
        }
        self.save(&profile)?;
        Ok(profile)
    }

    pub fn get(&self, id: &str) -> Result<Option<LegislatorProfile>> {
        decode_opt(self.inner.get(id)?)
    }

    /// Most recently created profile for a bioguide id.
    pub fn by_bioguide(&self, bioguide_id: &str) -> Result<Option<LegislatorProfile>> {
        decode_opt(self.inner.newest_by_bioguide(bioguide_id)?)
    }

    /// Most recently created profile holding the office's seat. `None` means
    /// the caller should use the web form path.
    pub fn find_by_office_code(&self, code: &OfficeCode) -> Result<Option<LegislatorProfile>> {
        decode_opt(self.inner.newest_for_seat(&code.seat_key())?)
    }

    /// All profiles, sorted by bioguide id.
    pub fn list(&self) -> Result<Vec<LegislatorProfile>> {
        let mut profiles = self
            .inner
            .list()?
            .into_iter()
            .map(|(_, bytes)| serde_json::from_slice(&bytes).map_err(Into::into))
            .collect::<Result<Vec<LegislatorProfile>>>()?;
        profiles.sort_by(|a, b| a.bioguide_id.cmp(&b.bioguide_id));
        Ok(profiles)
    }

    pub fn delete(&self, id: &str) -> Result<bool> {
        self.inner.delete(id)
    }
}

fn decode_opt(bytes: Option<Vec<u8>>) -> Result<Option<LegislatorProfile>> {
    bytes
        .map(|bytes| serde_json::from_slice(&bytes).map_err(Into::into))
        .transpose()
}

/// Typed views over one [`Storage`] database.
pub struct FormsStore {
    pub fill_statuses: FillStatusStore,
    pub legislators: LegislatorStore,
}

impl FormsStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let storage = Storage::new(path)?;
        Ok(Self {
            fill_statuses: FillStatusStore::new(storage.fill_statuses),
            legislators: LegislatorStore::new(storage.legislators),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FillError;

    fn test_store() -> (FormsStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = FormsStore::new(dir.path().join("forms.db")).unwrap();
        (store, dir)
    }

    #[test]
    fn find_by_office_code_prefers_newest_profile() {
        let (store, _dir) = test_store();
        let mut old = LegislatorProfile::senator("B000711", "CA", 3);
        old.created_at_ms = 1_000;
        let mut new = LegislatorProfile::senator("P000145", "CA", 3);
        new.created_at_ms = 2_000;
        store.legislators.save(&old).unwrap();
        store.legislators.save(&new).unwrap();

        let code: OfficeCode = "SCA02".parse().unwrap();
        let found = store.legislators.find_by_office_code(&code).unwrap().unwrap();
        assert_eq!(found.bioguide_id, "P000145");

        let vacant: OfficeCode = "SCA00".parse().unwrap();
        assert!(store.legislators.find_by_office_code(&vacant).unwrap().is_none());
    }

    #[test]
    fn import_keeps_identity_of_existing_profile() {
        let (store, _dir) = test_store();
        let first = store
            .legislators
            .import(LegislatorProfile::representative("B001291", "TX", 36))
            .unwrap();
        let second = store
            .legislators
            .import(LegislatorProfile::representative("B001291", "TX", 36))
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.legislators.list().unwrap().len(), 1);
        assert!(second.updated_at_ms >= first.updated_at_ms);
    }

    #[test]
    fn save_rejects_invalid_profiles() {
        let (store, _dir) = test_store();
        assert!(store.legislators.save(&LegislatorProfile::new("", "CA")).is_err());
    }

    #[test]
    fn recent_fill_status_counts_outcomes_after_update() {
        let (store, _dir) = test_store();
        let mut profile = LegislatorProfile::senator("S000148", "NY", 3);
        profile.updated_at_ms = 5_000;

        let mut before = FillOutcome::success("S000148", None);
        before.created_at_ms = 4_000;
        let mut ok = FillOutcome::success("S000148", None);
        ok.created_at_ms = 6_000;
        let mut failed = FillOutcome::failure("S000148", None, None, vec![]);
        failed.created_at_ms = 7_000;
        let mut broken =
            FillOutcome::error("S000148", None, &FillError::Navigation("timeout".into()), None, vec![]);
        broken.created_at_ms = 8_000;

        for outcome in [&before, &ok, &failed, &broken] {
            store.fill_statuses.record(outcome).unwrap();
        }

        let recent = store.fill_statuses.recent_fill_status(&profile).unwrap();
        assert_eq!(
            recent,
            RecentFillStatus {
                successes: 1,
                errors: 1,
                failures: 1
            }
        );
        assert_eq!(store.fill_statuses.list_for_legislator("S000148").unwrap().len(), 4);
        assert_eq!(store.fill_statuses.get(&ok.id).unwrap().unwrap(), ok);
    }
}
