use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use crate::matchup::Tournament;
use crate::types::MatchupPost;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreSnapshot {
    next_id: u64,
    posts: Vec<MatchupPost>,
}

/// Match-up posts addressable by id, optionally mirrored to a JSON file.
#[derive(Debug)]
pub struct MatchupStore {
    posts: BTreeMap<u64, MatchupPost>,
    next_id: u64,
    data_path: Option<PathBuf>,
}

impl MatchupStore {
    pub fn in_memory() -> Self {
        MatchupStore {
            posts: BTreeMap::new(),
            next_id: 1,
            data_path: None,
        }
    }

    /// Loads an existing snapshot from `path`, or starts empty if the file
    /// does not exist yet.
    pub fn open(path: &Path) -> Result<Self, String> {
        let mut store = MatchupStore::in_memory();
        store.data_path = Some(path.to_path_buf());
        if !path.is_file() {
            info!("no match-up data at {}, starting empty", path.display());
            return Ok(store);
        }
        let data = fs::read_to_string(path).map_err(|e| format!("read match-ups {}: {e}", path.display()))?;
        let snapshot: StoreSnapshot =
            serde_json::from_str(&data).map_err(|e| format!("parse match-ups {}: {e}", path.display()))?;
        let highest = snapshot.posts.iter().map(|post| post.id).max().unwrap_or(0);
        store.next_id = snapshot.next_id.max(highest + 1);
        store.posts = snapshot.posts.into_iter().map(|post| (post.id, post)).collect();
        info!("loaded {} match-ups from {}", store.posts.len(), path.display());
        Ok(store)
    }

    pub fn insert(&mut self, title: String, tournament: Tournament) -> MatchupPost {
        let id = self.next_id;
        self.next_id += 1;
        let post = MatchupPost {
            id,
            title,
            created_at: Utc::now(),
            tournament,
        };
        self.posts.insert(id, post.clone());
        post
    }

    pub fn get(&self, id: u64) -> Option<&MatchupPost> {
        self.posts.get(&id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut MatchupPost> {
        self.posts.get_mut(&id)
    }

    pub fn remove(&mut self, id: u64) -> Option<MatchupPost> {
        self.posts.remove(&id)
    }

    /// Newest first, the way the feed shows them.
    pub fn list(&self) -> Vec<MatchupPost> {
        self.posts.values().rev().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Writes the whole store when a data path is configured.
    pub fn persist(&self) -> Result<(), String> {
        let path = match &self.data_path {
            Some(path) => path,
            None => return Ok(()),
        };
        let snapshot = StoreSnapshot {
            next_id: self.next_id,
            posts: self.posts.values().cloned().collect(),
        };
        let payload = serde_json::to_string_pretty(&snapshot).map_err(|e| e.to_string())?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("create match-up data dir {}: {e}", parent.display()))?;
        }
        fs::write(path, payload).map_err(|e| format!("write match-ups {}: {e}", path.display()))?;
        debug!("persisted {} match-ups to {}", self.posts.len(), path.display());
        Ok(())
    }
}
