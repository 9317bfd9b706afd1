use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::matchup::{MatchupPhase, Tournament};
use crate::store::MatchupStore;

// ── Constants ──────────────────────────────────────────────────────────

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:17890";
pub const DEFAULT_ADVANCE_DELAY_MS: u64 = 1500;
pub const MIN_ENTRANTS: usize = 4;
pub const MAX_ENTRANTS: usize = 20;
pub const IMAGE_REQUEST_ATTEMPTS: u32 = 3;
pub const IMAGE_RETRY_BACKOFF_MS: u64 = 500;
pub const PLACEHOLDER_IMAGE_BASE: &str = "https://placehold.co/512x512/png";

// ── Shared state type aliases ──────────────────────────────────────────

pub type SharedMatchupStore = Arc<Mutex<MatchupStore>>;

// ── App config ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub listen_addr: String,
    pub advance_delay_ms: u64,
    pub min_entrants: usize,
    pub max_entrants: usize,
    pub image_service_url: String,
    #[serde(skip_serializing)]
    pub image_service_key: String,
    pub data_path: String,
    pub static_dir: String,
    pub logs_dir: String,
    pub shuffle_seed: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            listen_addr: String::new(),
            advance_delay_ms: DEFAULT_ADVANCE_DELAY_MS,
            min_entrants: MIN_ENTRANTS,
            max_entrants: MAX_ENTRANTS,
            image_service_url: String::new(),
            image_service_key: String::new(),
            data_path: String::new(),
            static_dir: String::new(),
            logs_dir: "logs".to_string(),
            shuffle_seed: None,
        }
    }
}

// ── Match-up domain types ──────────────────────────────────────────────

/// A named entrant with its resolved image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contender {
    pub name: String,
    pub image_url: String,
}

/// A contender placed in one of the two active-round slots. `votes` is the
/// tally for the current round only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundOption {
    pub name: String,
    pub image_url: String,
    pub votes: u32,
}

impl RoundOption {
    pub fn enter(contender: Contender) -> Self {
        RoundOption {
            name: contender.name,
            image_url: contender.image_url,
            votes: 0,
        }
    }
}

/// Frozen snapshot of a decided round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundPair {
    pub pair_a: RoundOption,
    pub pair_b: RoundOption,
}

impl RoundPair {
    pub fn entry_for(&self, name: &str) -> Option<&RoundOption> {
        if self.pair_a.name == name {
            Some(&self.pair_a)
        } else if self.pair_b.name == name {
            Some(&self.pair_b)
        } else {
            None
        }
    }

    pub fn total_votes(&self) -> u32 {
        self.pair_a.votes + self.pair_b.votes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

/// A feed post carrying a match-up tournament.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchupPost {
    pub id: u64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub tournament: Tournament,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRow {
    pub name: String,
    pub image_url: String,
    pub win_percentage: f64,
    pub rounds_played: u32,
    pub rounds_won: u32,
    pub is_champion: bool,
}

// ── API payloads ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMatchupRequest {
    pub title: String,
    /// Raw comma-separated entrant text as typed or dictated.
    pub entrants: String,
    #[serde(default)]
    pub voice: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub side: Side,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchupView {
    #[serde(flatten)]
    pub post: MatchupPost,
    pub phase: MatchupPhase,
}

impl From<MatchupPost> for MatchupView {
    fn from(post: MatchupPost) -> Self {
        let phase = post.tournament.phase();
        MatchupView { post, phase }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryPayload {
    pub post_id: u64,
    pub title: String,
    pub complete: bool,
    pub rows: Vec<SummaryRow>,
}
