//! Visitor-side state: favorites, the comparison tray, current search
//! filters and the analytics session id.
//!
//! [`ClientState`] owns the values and publishes every change on a `watch`
//! channel. Persistence happens through a [`StatePersistence`] adapter that
//! is called explicitly after each transition.

use chrono::Utc;
use parking_lot::RwLock;
use rand::Rng;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

use crate::error::AppError;
use crate::feed::SearchFilters;
use crate::models::Property;

pub const FAVORITES_KEY: &str = "favorites";
pub const COMPARE_KEY: &str = "compare";
pub const SESSION_KEY: &str = "analytics_session_id";

/// Listings that fit in the comparison tray.
pub const COMPARE_LIMIT: usize = 3;

pub trait StatePersistence: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, AppError>;
    fn save(&self, key: &str, value: &str) -> Result<(), AppError>;
}

/// One JSON file per key inside `dir`.
pub struct FileStatePersistence {
    dir: PathBuf,
}

impl FileStatePersistence {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(FileStatePersistence { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl StatePersistence for FileStatePersistence {
    fn load(&self, key: &str) -> Result<Option<String>, AppError> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), AppError> {
        std::fs::write(self.path(key), value)?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStatePersistence {
    values: RwLock<HashMap<String, String>>,
}

impl StatePersistence for MemoryStatePersistence {
    fn load(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.values.read().get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClientSnapshot {
    pub favorites: Vec<Uuid>,
    pub compare: Vec<Property>,
    pub filters: SearchFilters,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareToggle {
    Added,
    Removed,
    /// The tray already holds [`COMPARE_LIMIT`] listings.
    Full,
}

pub struct ClientState {
    persistence: Arc<dyn StatePersistence>,
    snapshot: watch::Sender<ClientSnapshot>,
}

impl ClientState {
    /// Restores favorites and the comparison tray. Unreadable entries start empty.
    pub fn load(persistence: Arc<dyn StatePersistence>) -> Self {
        let favorites = restore(persistence.as_ref(), FAVORITES_KEY);
        let mut compare: Vec<Property> = restore(persistence.as_ref(), COMPARE_KEY);
        compare.truncate(COMPARE_LIMIT);
        let (snapshot, _) = watch::channel(ClientSnapshot {
            favorites,
            compare,
            filters: SearchFilters::default(),
        });
        ClientState { persistence, snapshot }
    }

    pub fn snapshot(&self) -> ClientSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ClientSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn is_favorite(&self, id: Uuid) -> bool {
        self.snapshot.borrow().favorites.contains(&id)
    }

    /// Returns whether `id` is a favorite afterwards.
    pub fn toggle_favorite(&self, id: Uuid) -> bool {
        let mut now_favorite = false;
        self.snapshot.send_modify(|s| {
            if let Some(pos) = s.favorites.iter().position(|f| *f == id) {
                s.favorites.remove(pos);
            } else {
                s.favorites.push(id);
                now_favorite = true;
            }
        });
        self.persist(FAVORITES_KEY, &self.snapshot.borrow().favorites);
        now_favorite
    }

    pub fn is_comparing(&self, id: Uuid) -> bool {
        self.snapshot.borrow().compare.iter().any(|p| p.id == id)
    }

    pub fn toggle_compare(&self, property: Property) -> CompareToggle {
        let mut outcome = CompareToggle::Full;
        self.snapshot.send_if_modified(|s| {
            if let Some(pos) = s.compare.iter().position(|p| p.id == property.id) {
                s.compare.remove(pos);
                outcome = CompareToggle::Removed;
                true
            } else if s.compare.len() < COMPARE_LIMIT {
                s.compare.push(property);
                outcome = CompareToggle::Added;
                true
            } else {
                false
            }
        });
        if outcome != CompareToggle::Full {
            self.persist(COMPARE_KEY, &self.snapshot.borrow().compare);
        }
        outcome
    }

    pub fn clear_compare(&self) {
        self.snapshot.send_modify(|s| s.compare.clear());
        self.persist(COMPARE_KEY, &Vec::<Property>::new());
    }

    pub fn filters(&self) -> SearchFilters {
        self.snapshot.borrow().filters.clone()
    }

    pub fn set_filters(&self, filters: SearchFilters) {
        self.snapshot.send_modify(|s| s.filters = filters);
    }

    pub fn update_filters(&self, update: impl FnOnce(&mut SearchFilters)) {
        self.snapshot.send_modify(|s| update(&mut s.filters));
    }

    pub fn clear_filters(&self) {
        self.snapshot.send_modify(|s| s.filters.clear());
    }

    /// Persisted analytics session id, created on first use.
    pub fn session_id(&self) -> String {
        match self.persistence.load(SESSION_KEY) {
            Ok(Some(id)) if !id.trim().is_empty() => return id.trim().to_string(),
            Ok(_) => {}
            Err(e) => log::error!("Error loading session id: {}", e),
        }
        let id = generate_session_id(&mut rand::thread_rng());
        if let Err(e) = self.persistence.save(SESSION_KEY, &id) {
            log::error!("Error saving session id: {}", e);
        }
        id
    }

    fn persist<T: Serialize>(&self, key: &str, value: &T) {
        let result = serde_json::to_string(value)
            .map_err(AppError::from)
            .and_then(|json| self.persistence.save(key, &json));
        if let Err(e) = result {
            log::error!("Error saving {}: {}", key, e);
        }
    }
}

fn restore<T: serde::de::DeserializeOwned + Default>(persistence: &dyn StatePersistence, key: &str) -> T {
    let loaded = persistence.load(key).and_then(|raw| match raw {
        Some(raw) => serde_json::from_str(&raw).map_err(AppError::from),
        None => Ok(T::default()),
    });
    loaded.unwrap_or_else(|e| {
        log::error!("Error loading {}: {}", key, e);
        T::default()
    })
}

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// `session_<unix millis>_<9 base36 chars>`.
pub fn generate_session_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    let suffix: String = (0..9)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("session_{}_{}", Utc::now().timestamp_millis(), suffix)
}
