use rand::rngs::StdRng;
use rand::SeedableRng;
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tracing::{debug, error, info, warn};

use crate::entrants::parse_entrant_list;
use crate::error::MatchupError;
use crate::images::ImageResolver;
use crate::matchup::{AdvanceOutcome, MatchupPhase, Tournament};
use crate::summary::build_summary;
use crate::types::*;

/// Messages accepted by the match-up engine. `Advance` is only ever sent by
/// the scheduler after a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchupCommand {
    Vote { post_id: u64, side: Side },
    Advance { post_id: u64 },
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub advance_delay: Duration,
    pub min_entrants: usize,
    pub max_entrants: usize,
    pub shuffle_seed: Option<u64>,
}

impl EngineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        EngineSettings {
            advance_delay: Duration::from_millis(config.advance_delay_ms),
            min_entrants: config.min_entrants,
            max_entrants: config.max_entrants,
            shuffle_seed: config.shuffle_seed,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings::from_config(&AppConfig::default())
    }
}

pub struct MatchupService<R: ImageResolver> {
    store: SharedMatchupStore,
    resolver: Arc<R>,
    rng: Arc<Mutex<StdRng>>,
    settings: EngineSettings,
}

impl<R: ImageResolver> Clone for MatchupService<R> {
    fn clone(&self) -> Self {
        MatchupService {
            store: self.store.clone(),
            resolver: self.resolver.clone(),
            rng: self.rng.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl<R: ImageResolver> MatchupService<R> {
    pub fn new(store: SharedMatchupStore, resolver: R, settings: EngineSettings) -> Self {
        let rng = match settings.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        MatchupService {
            store,
            resolver: Arc::new(resolver),
            rng: Arc::new(Mutex::new(rng)),
            settings,
        }
    }

    pub fn store(&self) -> &SharedMatchupStore {
        &self.store
    }

    /// Parses the entrant text, resolves every image, and only then makes the
    /// match-up visible. Any failure leaves the store untouched.
    pub async fn create_matchup(&self, request: CreateMatchupRequest) -> Result<MatchupPost, MatchupError> {
        let title = request.title.trim().to_string();
        if title.is_empty() {
            return Err(MatchupError::EmptyTitle);
        }
        let names = parse_entrant_list(
            &request.entrants,
            request.voice,
            self.settings.min_entrants,
            self.settings.max_entrants,
        )?;

        let mut contenders = Vec::with_capacity(names.len());
        for name in names {
            let image_url = self
                .resolver
                .resolve_image(&name, &title)
                .await
                .map_err(|reason| {
                    warn!("image lookup for {name:?} in {title:?} failed: {reason}");
                    MatchupError::ImageResolution { name: name.clone(), reason }
                })?;
            contenders.push(Contender { name, image_url });
        }

        let count = contenders.len();
        let tournament = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            Tournament::create(contenders, &mut *rng).map_err(|_| MatchupError::EntrantCount {
                count,
                min: self.settings.min_entrants,
                max: self.settings.max_entrants,
            })?
        };

        let mut guard = self.store.lock().map_err(|e| MatchupError::Storage(e.to_string()))?;
        let post = guard.insert(title, tournament);
        if let Err(err) = guard.persist() {
            guard.remove(post.id);
            error!("failed to persist new match-up: {err}");
            return Err(MatchupError::Storage(err));
        }
        info!("created match-up {} {:?} with {count} entrants", post.id, post.title);
        Ok(post)
    }

    /// Routes a command to its transition.
    pub fn handle(&self, command: MatchupCommand) -> Result<Option<MatchupPost>, MatchupError> {
        match command {
            MatchupCommand::Vote { post_id, side } => self.vote(post_id, side).map(Some),
            MatchupCommand::Advance { post_id } => Ok(self.advance(post_id)),
        }
    }

    /// Reveal phase. A stale vote returns the post unchanged; a fresh one
    /// schedules the advance.
    pub fn vote(&self, post_id: u64, side: Side) -> Result<MatchupPost, MatchupError> {
        let mut guard = self.store.lock().map_err(|e| MatchupError::Storage(e.to_string()))?;
        let post = guard.get_mut(post_id).ok_or(MatchupError::NotFound(post_id))?;
        if !post.tournament.vote(side) {
            debug!("ignoring stale vote on match-up {post_id} ({:?})", post.tournament.phase());
            return Ok(post.clone());
        }
        let snapshot = post.clone();
        info!("match-up {post_id}: picked side {side:?}");
        if let Err(err) = guard.persist() {
            error!("failed to persist vote on match-up {post_id}: {err}");
        }
        drop(guard);

        self.schedule(MatchupCommand::Advance { post_id }, self.settings.advance_delay);
        Ok(snapshot)
    }

    /// Advance phase. Returns `None` when the post is gone or has already
    /// moved on.
    pub fn advance(&self, post_id: u64) -> Option<MatchupPost> {
        let mut guard = self.store.lock().unwrap_or_else(|e| e.into_inner());
        let post = match guard.get_mut(post_id) {
            Some(post) => post,
            None => {
                debug!("advance for deleted match-up {post_id} skipped");
                return None;
            }
        };
        match post.tournament.advance() {
            AdvanceOutcome::Ignored => {
                debug!("stale advance on match-up {post_id} skipped");
                return None;
            }
            AdvanceOutcome::NextRound { winner, eliminated, challenger } => {
                info!("match-up {post_id}: {eliminated} out, {winner} faces {challenger}");
            }
            AdvanceOutcome::Crowned { champion, eliminated } => {
                info!("match-up {post_id}: {eliminated} out, {champion} is champion");
            }
        }
        let snapshot = post.clone();
        if let Err(err) = guard.persist() {
            error!("failed to persist advance on match-up {post_id}: {err}");
        }
        Some(snapshot)
    }

    /// Re-delivers `command` to this service after `delay`. Outside a tokio
    /// runtime nothing is scheduled and the post stays where it is until
    /// `advance` or `resume_pending` runs.
    pub fn schedule(&self, command: MatchupCommand, delay: Duration) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("no async runtime; {command:?} not scheduled");
                return;
            }
        };
        let service = self.clone();
        handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(err) = service.handle(command) {
                warn!("scheduled {command:?} failed: {err}");
            }
        });
    }

    /// Re-arms the advance timer for posts saved mid-round. Returns how many
    /// were scheduled.
    pub fn resume_pending(&self) -> usize {
        let pending: Vec<u64> = {
            let guard = self.store.lock().unwrap_or_else(|e| e.into_inner());
            guard
                .list()
                .into_iter()
                .filter(|post| post.tournament.phase() == MatchupPhase::RoundDecided)
                .map(|post| post.id)
                .collect()
        };
        for &post_id in &pending {
            debug!("resuming advance for match-up {post_id}");
            self.schedule(MatchupCommand::Advance { post_id }, self.settings.advance_delay);
        }
        pending.len()
    }

    pub fn get(&self, post_id: u64) -> Result<MatchupPost, MatchupError> {
        let guard = self.store.lock().map_err(|e| MatchupError::Storage(e.to_string()))?;
        guard.get(post_id).cloned().ok_or(MatchupError::NotFound(post_id))
    }

    pub fn list(&self) -> Result<Vec<MatchupPost>, MatchupError> {
        let guard = self.store.lock().map_err(|e| MatchupError::Storage(e.to_string()))?;
        Ok(guard.list())
    }

    pub fn delete(&self, post_id: u64) -> Result<MatchupPost, MatchupError> {
        let mut guard = self.store.lock().map_err(|e| MatchupError::Storage(e.to_string()))?;
        let post = guard.remove(post_id).ok_or(MatchupError::NotFound(post_id))?;
        guard.persist().map_err(MatchupError::Storage)?;
        info!("deleted match-up {post_id}");
        Ok(post)
    }

    pub fn summary(&self, post_id: u64) -> Result<SummaryPayload, MatchupError> {
        let post = self.get(post_id)?;
        Ok(SummaryPayload {
            post_id,
            complete: post.tournament.champion.is_some(),
            rows: build_summary(&post.tournament),
            title: post.title,
        })
    }
}
