use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::store::{FavoriteStore, FAVORITES_KEY};

/// Unique movie ids in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavoriteSet {
    ids: Vec<i32>,
}

impl FavoriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: i32) -> bool {
        self.ids.contains(&id)
    }

    /// Returns false when the id was already present.
    pub fn insert(&mut self, id: i32) -> bool {
        if self.contains(id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    /// Returns false when the id was absent.
    pub fn remove(&mut self, id: i32) -> bool {
        let before = self.ids.len();
        self.ids.retain(|&existing| existing != id);
        self.ids.len() != before
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[i32] {
        &self.ids
    }

    /// Canonical form: a JSON array of integers.
    pub fn to_json(&self) -> String {
        crate::navigation::encode_ids(&self.ids)
    }

    /// Duplicates in the payload collapse to their first occurrence.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        let ids: Vec<i32> = serde_json::from_str(raw)?;
        Ok(ids.into_iter().collect())
    }
}

impl FromIterator<i32> for FavoriteSet {
    fn from_iter<I: IntoIterator<Item = i32>>(iter: I) -> Self {
        let mut set = FavoriteSet::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

/// The single authoritative favorite set, persisted write-through.
///
/// Every mutation holds the lock across the store write, so writes are
/// applied one at a time in call order and a failed write leaves the
/// in-memory set as it was.
pub struct FavoritesManager {
    store: Arc<dyn FavoriteStore>,
    state: Mutex<Option<FavoriteSet>>,
}

impl FavoritesManager {
    /// The set is read from the store on first use.
    pub fn new(store: Arc<dyn FavoriteStore>) -> Self {
        Self {
            store,
            state: Mutex::new(None),
        }
    }

    /// Like [`FavoritesManager::new`], but reads the store immediately so start-up fails fast.
    pub async fn load(store: Arc<dyn FavoriteStore>) -> Result<Self> {
        let manager = Self::new(store);
        let count = manager.all().await?.len();
        info!("Loaded {} favorite(s)", count);
        Ok(manager)
    }

    pub async fn is_favorite(&self, id: i32) -> Result<bool> {
        let mut guard = self.state.lock().await;
        Ok(self.current(&mut guard).await?.contains(id))
    }

    /// Flips membership and returns the new state.
    pub async fn toggle(&self, id: i32) -> Result<bool> {
        let (_, member) = self
            .commit(id, |set| {
                if !set.remove(id) {
                    set.insert(id);
                }
                true
            })
            .await?;
        Ok(member)
    }

    /// Returns true if the set changed.
    pub async fn add(&self, id: i32) -> Result<bool> {
        let (changed, _) = self.commit(id, |set| set.insert(id)).await?;
        Ok(changed)
    }

    /// Returns true if the set changed.
    pub async fn remove(&self, id: i32) -> Result<bool> {
        let (changed, _) = self.commit(id, |set| set.remove(id)).await?;
        Ok(changed)
    }

    /// Snapshot of the current ids, in insertion order.
    pub async fn all(&self) -> Result<Vec<i32>> {
        let mut guard = self.state.lock().await;
        Ok(self.current(&mut guard).await?.ids().to_vec())
    }

    /// Forget the cached set; the next call re-reads the store.
    pub async fn reload(&self) {
        *self.state.lock().await = None;
        debug!("Favorite cache dropped");
    }

    async fn commit<F>(&self, id: i32, op: F) -> Result<(bool, bool)>
    where
        F: FnOnce(&mut FavoriteSet) -> bool,
    {
        let mut guard = self.state.lock().await;
        let set = self.current(&mut guard).await?;
        let mut next = set.clone();
        if !op(&mut next) {
            return Ok((false, next.contains(id)));
        }
        if let Err(e) = self.store.set(FAVORITES_KEY, &next.to_json()).await {
            warn!(id, "Favorite write failed, keeping previous set: {}", e);
            return Err(e);
        }
        *set = next;
        let member = set.contains(id);
        debug!(id, member, total = set.len(), "Favorite set updated");
        Ok((true, member))
    }

    async fn current<'a>(&self, slot: &'a mut Option<FavoriteSet>) -> Result<&'a mut FavoriteSet> {
        if slot.is_none() {
            *slot = Some(self.read_store().await?);
        }
        Ok(slot.get_or_insert_with(FavoriteSet::new))
    }

    async fn read_store(&self) -> Result<FavoriteSet> {
        let raw = self.store.get(FAVORITES_KEY).await?;
        let Some(raw) = raw else {
            return Ok(FavoriteSet::new());
        };
        match FavoriteSet::from_json(&raw) {
            Ok(set) => Ok(set),
            Err(e) => {
                warn!("Stored favorites are unreadable, starting empty: {}", e);
                Ok(FavoriteSet::new())
            }
        }
    }
}
