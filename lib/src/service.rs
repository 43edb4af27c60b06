// lib/src/service.rs

use std::path::Path;
use std::sync::Arc;

use models::errors::ClinicalResult;
use models::medical::TransitionPolicy;
use security::PasswordDigest;
use tracing::info;

use crate::encounters::EncounterLedger;
use crate::identity::IdentityRegistry;
use crate::notifier::Notifier;
use crate::patients::PatientRegistry;
use crate::router::ActionRouter;
use crate::seed::seed_demo_data;
use crate::stats::StatsAggregator;
use crate::storage_engine::{open_storage, ClinicalStorageEngine, SledClinicalStorage};

/// Every component wired over one store and one notifier.
#[derive(Clone)]
pub struct MediConnect {
    pub identity: IdentityRegistry,
    pub patients: PatientRegistry,
    pub encounters: EncounterLedger,
    pub router: ActionRouter,
    pub stats: StatsAggregator,
    pub notifier: Notifier,
    storage: Arc<dyn ClinicalStorageEngine>,
    digest: Arc<dyn PasswordDigest>,
}

impl MediConnect {
    pub fn new(
        storage: Arc<dyn ClinicalStorageEngine>,
        digest: Arc<dyn PasswordDigest>,
        notifier: Notifier,
        policy: TransitionPolicy,
    ) -> Self {
        MediConnect {
            identity: IdentityRegistry::new(storage.clone(), digest.clone()),
            patients: PatientRegistry::new(storage.clone(), notifier.clone()),
            encounters: EncounterLedger::new(storage.clone(), notifier.clone()),
            router: ActionRouter::new(storage.clone(), notifier.clone(), policy),
            stats: StatsAggregator::new(storage.clone()),
            notifier,
            storage,
            digest,
        }
    }

    /// Opens the sled store under `data_directory`.
    pub fn open<P: AsRef<Path>>(
        data_directory: P,
        digest: Arc<dyn PasswordDigest>,
        notifier: Notifier,
        policy: TransitionPolicy,
    ) -> ClinicalResult<Self> {
        let storage = open_storage(data_directory)?;
        info!(engine = storage.get_type(), ?policy, "Clinical store ready");
        Ok(Self::new(storage, digest, notifier, policy))
    }

    /// Throwaway in-memory instance.
    pub fn temporary(digest: Arc<dyn PasswordDigest>, policy: TransitionPolicy) -> ClinicalResult<Self> {
        let storage = Arc::new(SledClinicalStorage::open_temporary()?);
        Ok(Self::new(storage, digest, Notifier::default(), policy))
    }

    pub async fn flush(&self) -> ClinicalResult<usize> {
        self.storage.flush().await
    }

    /// See [`seed_demo_data`].
    pub async fn seed_demo_data(&self) -> ClinicalResult<bool> {
        seed_demo_data(self.storage.as_ref(), self.digest.clone()).await
    }
}
