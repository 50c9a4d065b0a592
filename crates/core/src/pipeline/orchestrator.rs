//! Incremental re-clustering coordinator.
//!
//! Owns the debounce timer, the single-run lock, and the observable state
//! machine (`idle -> detecting -> clustering -> idle`). Constructed once per
//! process and shared by reference; there is no module-level state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;

use crate::clustering::domain::cluster_engine::ClusterParams;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::thumbnail_extractor::ThumbnailExtractor;
use crate::shared::constants::DEBOUNCE_QUIET_MS;
use crate::shared::person::PersonSummary;
use crate::shared::photo::Photo;
use crate::storage::domain::identity_store::IdentityStore;

use super::debounce::DebounceTimer;
use super::recluster_use_case::{ReclusterError, ReclusterUseCase};

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error(transparent)]
    Recluster(#[from] ReclusterError),
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("no person with id {0}")]
    UnknownPerson(String),
    #[error("internal: {0}")]
    Internal(String),
}

/// Observable engine state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Detecting,
    Clustering,
}

pub type SubscriptionId = u64;
type StateCallback = Box<dyn Fn(EngineState) + Send>;

struct StateHub {
    state: Mutex<EngineState>,
    subscribers: Mutex<HashMap<SubscriptionId, StateCallback>>,
    next_subscription: AtomicU64,
}

impl StateHub {
    fn new() -> Self {
        Self {
            state: Mutex::new(EngineState::Idle),
            subscribers: Mutex::new(HashMap::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    fn set(&self, state: EngineState) {
        if let Ok(mut current) = self.state.lock() {
            *current = state;
        }
        if let Ok(subscribers) = self.subscribers.lock() {
            for callback in subscribers.values() {
                callback(state);
            }
        }
    }

    fn current(&self) -> EngineState {
        self.state.lock().map(|s| *s).unwrap_or(EngineState::Idle)
    }

    fn subscribe(&self, callback: StateCallback) -> SubscriptionId {
        let id = self.next_subscription.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.insert(id, callback);
        }
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.remove(&id);
        }
    }
}

/// State shared between the orchestrator handle and the timer thread.
struct OrchestratorCore {
    store: Mutex<Box<dyn IdentityStore>>,
    thumbnailer: Mutex<Box<dyn ThumbnailExtractor>>,
    params: ClusterParams,
    states: StateHub,
    recluster_in_flight: AtomicBool,
    run_seq: AtomicU64,
}

impl OrchestratorCore {
    /// One guarded clustering pass. Returns false when the request is
    /// dropped because a run is already in flight. Nothing is lost by the
    /// drop: the debounce timer re-fires for anything completing afterward,
    /// and a run always reads the full current photo set.
    fn run_recluster(&self) -> Result<bool, ReclusterError> {
        if self
            .recluster_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::debug!("re-cluster requested while one is in flight; dropping");
            return Ok(false);
        }

        self.states.set(EngineState::Clustering);
        let result = self.recluster_locked();
        self.states.set(EngineState::Idle);
        self.recluster_in_flight.store(false, Ordering::SeqCst);
        result.map(|_| true)
    }

    fn recluster_locked(&self) -> Result<(), ReclusterError> {
        let mut store = self
            .store
            .lock()
            .map_err(|e| ReclusterError::Storage(format!("store lock poisoned: {e}")))?;
        let mut thumbnailer = self
            .thumbnailer
            .lock()
            .map_err(|e| ReclusterError::Storage(format!("thumbnailer lock poisoned: {e}")))?;

        let run = self.run_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let persons =
            ReclusterUseCase::new(&mut **store, &mut **thumbnailer, self.params).execute(run)?;
        log::info!("re-cluster #{run} resolved {} person(s)", persons.len());
        Ok(())
    }
}

/// The identity engine's front door.
pub struct IdentityOrchestrator {
    core: Arc<OrchestratorCore>,
    detector: Mutex<Box<dyn FaceDetector>>,
    debounce: DebounceTimer,
}

impl IdentityOrchestrator {
    pub fn new(
        store: Box<dyn IdentityStore>,
        detector: Box<dyn FaceDetector>,
        thumbnailer: Box<dyn ThumbnailExtractor>,
        params: ClusterParams,
    ) -> Self {
        Self::with_quiet_period(
            store,
            detector,
            thumbnailer,
            params,
            Duration::from_millis(DEBOUNCE_QUIET_MS),
        )
    }

    pub fn with_quiet_period(
        store: Box<dyn IdentityStore>,
        detector: Box<dyn FaceDetector>,
        thumbnailer: Box<dyn ThumbnailExtractor>,
        params: ClusterParams,
        quiet: Duration,
    ) -> Self {
        let core = Arc::new(OrchestratorCore {
            store: Mutex::new(store),
            thumbnailer: Mutex::new(thumbnailer),
            params,
            states: StateHub::new(),
            recluster_in_flight: AtomicBool::new(false),
            run_seq: AtomicU64::new(0),
        });

        let timer_core = Arc::clone(&core);
        let debounce = DebounceTimer::spawn(quiet, move || {
            if let Err(e) = timer_core.run_recluster() {
                log::error!("debounced re-cluster failed: {e}");
            }
        });

        Self {
            core,
            detector: Mutex::new(detector),
            debounce,
        }
    }

    /// Runs detection on one photo, persists it, and schedules a debounced
    /// re-cluster. A detector failure degrades the photo to zero faces and
    /// never aborts the rest of the collection.
    pub fn process_faces_in_photo(&self, mut photo: Photo) -> Result<Photo, OrchestratorError> {
        self.core.states.set(EngineState::Detecting);

        let detected = {
            let mut detector = self
                .detector
                .lock()
                .map_err(|e| OrchestratorError::Internal(format!("detector lock poisoned: {e}")))?;
            detector.detect(&photo)
        };
        photo.faces = match detected {
            Ok(faces) => faces,
            Err(e) => {
                log::warn!(
                    "face detection failed for photo {}: {e}; treating as zero faces",
                    photo.id
                );
                Vec::new()
            }
        };

        let saved = self.with_store(|store| store.save_photo(&photo));
        self.core.states.set(EngineState::Idle);
        saved?;

        self.debounce.schedule();
        Ok(photo)
    }

    /// Deletes a photo and schedules a debounced re-cluster.
    pub fn remove_photo(&self, photo_id: &str) -> Result<(), OrchestratorError> {
        self.with_store(|store| store.remove_photo(photo_id))?;
        self.debounce.schedule();
        Ok(())
    }

    /// Manual trigger. Runs synchronously; returns false when dropped
    /// because a run was already in flight.
    pub fn trigger_recluster(&self) -> Result<bool, OrchestratorError> {
        Ok(self.core.run_recluster()?)
    }

    pub fn state(&self) -> EngineState {
        self.core.states.current()
    }

    pub fn subscribe_to_state<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(EngineState) + Send + 'static,
    {
        self.core.states.subscribe(Box::new(callback))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.core.states.unsubscribe(id);
    }

    pub fn people_with_thumbnails(&self) -> Result<Vec<PersonSummary>, OrchestratorError> {
        let persons = self.with_store(|store| store.all_persons())?;
        Ok(persons.iter().map(|p| p.summary()).collect())
    }

    /// Assigns a user-chosen display name; the name then survives future
    /// re-clustering through the content vote.
    pub fn assign_person_name(&self, person_id: &str, name: &str) -> Result<(), OrchestratorError> {
        let mut persons = self.with_store(|store| store.all_persons())?;
        let Some(person) = persons.iter_mut().find(|p| p.id == person_id) else {
            return Err(OrchestratorError::UnknownPerson(person_id.to_string()));
        };
        person.name = name.to_string();
        person.auto_named = false;
        self.with_store(|store| store.replace_all_persons(persons))
    }

    fn with_store<T>(
        &self,
        f: impl FnOnce(&mut dyn IdentityStore) -> Result<T, Box<dyn std::error::Error>>,
    ) -> Result<T, OrchestratorError> {
        let mut store = self
            .core
            .store
            .lock()
            .map_err(|e| OrchestratorError::Internal(format!("store lock poisoned: {e}")))?;
        f(&mut **store).map_err(|e| OrchestratorError::Storage(e.to_string()))
    }
}
