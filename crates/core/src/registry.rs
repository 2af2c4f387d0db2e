//! Synchronized in-memory registries for patients and providers.
//!
//! The registries are the single source of truth for profile data:
//! the agent facade owns them and the monitoring supervisor shares the
//! same `Arc`, so a synchronous risk query and a running monitoring
//! cycle always observe identical state. All access goes through
//! accessor methods holding a short read or write lock — callers never
//! hold a lock across an external call.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::CoreError;
use crate::patient::{Biometrics, HealthcareProvider, Patient};
use crate::types::{PatientId, ProviderId};

// ---------------------------------------------------------------------------
// PatientRegistry
// ---------------------------------------------------------------------------

/// Owned, synchronized patient store.
///
/// Reads return clones so no lock outlives the accessor call.
#[derive(Default)]
pub struct PatientRegistry {
    inner: RwLock<HashMap<PatientId, Patient>>,
}

impl PatientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a newly registered patient.
    pub fn insert(&self, patient: Patient) {
        let mut map = self.inner.write().expect("patient registry lock poisoned");
        map.insert(patient.id, patient);
    }

    /// Whether a patient id is registered.
    pub fn contains(&self, id: &PatientId) -> bool {
        let map = self.inner.read().expect("patient registry lock poisoned");
        map.contains_key(id)
    }

    /// Snapshot of a patient's current profile and history.
    pub fn get(&self, id: &PatientId) -> Option<Patient> {
        let map = self.inner.read().expect("patient registry lock poisoned");
        map.get(id).cloned()
    }

    /// Number of registered patients.
    pub fn len(&self) -> usize {
        let map = self.inner.read().expect("patient registry lock poisoned");
        map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a biometric snapshot to a patient's history.
    ///
    /// Snapshots are immutable; the history only grows.
    pub fn append_biometrics(
        &self,
        id: &PatientId,
        snapshot: Biometrics,
    ) -> Result<(), CoreError> {
        let mut map = self.inner.write().expect("patient registry lock poisoned");
        let patient = map.get_mut(id).ok_or(CoreError::NotFound {
            entity: "patient",
            id: *id,
        })?;
        patient.biometric_history.push(snapshot);
        Ok(())
    }

    /// Record a newly diagnosed condition on the patient's profile.
    pub fn add_condition(&self, id: &PatientId, condition: String) -> Result<(), CoreError> {
        let mut map = self.inner.write().expect("patient registry lock poisoned");
        let patient = map.get_mut(id).ok_or(CoreError::NotFound {
            entity: "patient",
            id: *id,
        })?;
        if !patient.conditions.contains(&condition) {
            patient.conditions.push(condition);
        }
        Ok(())
    }

    /// Record a newly prescribed medication on the patient's profile.
    pub fn add_medication(&self, id: &PatientId, medication: String) -> Result<(), CoreError> {
        let mut map = self.inner.write().expect("patient registry lock poisoned");
        let patient = map.get_mut(id).ok_or(CoreError::NotFound {
            entity: "patient",
            id: *id,
        })?;
        if !patient.medications.contains(&medication) {
            patient.medications.push(medication);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ProviderRegistry
// ---------------------------------------------------------------------------

/// Owned, synchronized provider store.
#[derive(Default)]
pub struct ProviderRegistry {
    inner: RwLock<HashMap<ProviderId, HealthcareProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, provider: HealthcareProvider) {
        let mut map = self.inner.write().expect("provider registry lock poisoned");
        map.insert(provider.id, provider);
    }

    pub fn get(&self, id: &ProviderId) -> Option<HealthcareProvider> {
        let map = self.inner.read().expect("provider registry lock poisoned");
        map.get(id).cloned()
    }

    pub fn contains(&self, id: &ProviderId) -> bool {
        let map = self.inner.read().expect("provider registry lock poisoned");
        map.contains_key(id)
    }

    /// Snapshot of all registered providers.
    pub fn all(&self) -> Vec<HealthcareProvider> {
        let map = self.inner.read().expect("provider registry lock poisoned");
        map.values().cloned().collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
