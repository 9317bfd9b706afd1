use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::types::{Contender, RoundOption, RoundPair, Side};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchupPhase {
  AwaitingVote,
  RoundDecided,
  Complete,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdvanceOutcome {
  /// The winner kept its side and a new challenger took the other slot.
  NextRound { winner: String, eliminated: String, challenger: String },
  Crowned { champion: String, eliminated: String },
  Ignored,
}

/// Single-elimination "king of the hill" bracket: the winner of each round
/// stays in its slot and faces the next contender popped from the pool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tournament {
  pub contender_pool: Vec<Contender>,
  pub initial_contenders: Vec<Contender>,
  pub slot_a: Option<RoundOption>,
  pub slot_b: Option<RoundOption>,
  pub eliminated_names: Vec<String>,
  pub round_history: Vec<RoundPair>,
  pub user_picked_names: Vec<String>,
  pub user_champion_side: Option<Side>,
  pub round_decided: bool,
  pub champion: Option<RoundOption>,
}

impl Tournament {
  /// Shuffles the entrants and seats the first pairing.
  pub fn create<R: Rng + ?Sized>(entrants: Vec<Contender>, rng: &mut R) -> Result<Self, String> {
    let mut working = entrants.clone();
    working.shuffle(rng);
    Tournament::from_shuffled(entrants, working)
  }

  /// Builds a tournament from an already-ordered working list. The last two
  /// elements become slot A and slot B; the rest is the pool.
  pub fn from_shuffled(initial: Vec<Contender>, mut working: Vec<Contender>) -> Result<Self, String> {
    if working.len() < 2 {
      return Err("A match-up needs at least two contenders.".to_string());
    }
    let slot_a = working.pop().map(RoundOption::enter);
    let slot_b = working.pop().map(RoundOption::enter);
    Ok(Tournament {
      contender_pool: working,
      initial_contenders: initial,
      slot_a,
      slot_b,
      eliminated_names: Vec::new(),
      round_history: Vec::new(),
      user_picked_names: Vec::new(),
      user_champion_side: None,
      round_decided: false,
      champion: None,
    })
  }

  pub fn phase(&self) -> MatchupPhase {
    if self.champion.is_some() {
      MatchupPhase::Complete
    } else if self.round_decided {
      MatchupPhase::RoundDecided
    } else {
      MatchupPhase::AwaitingVote
    }
  }

  pub fn slot(&self, side: Side) -> Option<&RoundOption> {
    match side {
      Side::A => self.slot_a.as_ref(),
      Side::B => self.slot_b.as_ref(),
    }
  }

  fn slot_mut(&mut self, side: Side) -> Option<&mut RoundOption> {
    match side {
      Side::A => self.slot_a.as_mut(),
      Side::B => self.slot_b.as_mut(),
    }
  }

  fn set_slot(&mut self, side: Side, option: Option<RoundOption>) {
    match side {
      Side::A => self.slot_a = option,
      Side::B => self.slot_b = option,
    }
  }

  /// Reveal phase. Returns false when the vote was stale and nothing changed.
  pub fn vote(&mut self, winner: Side) -> bool {
    if self.phase() != MatchupPhase::AwaitingVote {
      return false;
    }
    if self.slot_a.is_none() || self.slot_b.is_none() {
      return false;
    }

    let winner_name = match self.slot_mut(winner) {
      Some(slot) => {
        slot.votes = 1;
        slot.name.clone()
      }
      None => return false,
    };
    if let Some(loser) = self.slot_mut(winner.opposite()) {
      loser.votes = 0;
    }

    if !self.user_picked_names.contains(&winner_name) {
      self.user_picked_names.push(winner_name);
    }
    self.user_champion_side = Some(winner);
    self.round_decided = true;
    true
  }

  /// Advance phase, run once the reveal delay has elapsed.
  pub fn advance(&mut self) -> AdvanceOutcome {
    if self.phase() != MatchupPhase::RoundDecided {
      return AdvanceOutcome::Ignored;
    }
    let side = match self.user_champion_side {
      Some(side) => side,
      None => return AdvanceOutcome::Ignored,
    };
    let (slot_a, slot_b) = match (self.slot_a.clone(), self.slot_b.clone()) {
      (Some(a), Some(b)) => (a, b),
      _ => return AdvanceOutcome::Ignored,
    };
    let (mut winner, loser) = match side {
      Side::A => (slot_a.clone(), slot_b.clone()),
      Side::B => (slot_b.clone(), slot_a.clone()),
    };

    self.round_history.push(RoundPair { pair_a: slot_a, pair_b: slot_b });
    self.eliminated_names.push(loser.name.clone());

    match self.contender_pool.pop() {
      Some(next) => {
        let challenger = RoundOption::enter(next);
        let challenger_name = challenger.name.clone();
        winner.votes = 0;
        let winner_name = winner.name.clone();
        self.set_slot(side, Some(winner));
        self.set_slot(side.opposite(), Some(challenger));
        self.round_decided = false;
        AdvanceOutcome::NextRound {
          winner: winner_name,
          eliminated: loser.name,
          challenger: challenger_name,
        }
      }
      None => {
        let champion_name = winner.name.clone();
        self.champion = Some(winner);
        self.slot_a = None;
        self.slot_b = None;
        self.contender_pool.clear();
        self.round_decided = false;
        AdvanceOutcome::Crowned {
          champion: champion_name,
          eliminated: loser.name,
        }
      }
    }
  }

  /// Every entrant is exactly one of: eliminated, champion, pooled, or seated.
  pub fn accounted_entrants(&self) -> usize {
    self.eliminated_names.len()
      + usize::from(self.champion.is_some())
      + self.contender_pool.len()
      + usize::from(self.slot_a.is_some())
      + usize::from(self.slot_b.is_some())
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  pub(crate) fn contender(name: &str) -> Contender {
    Contender {
      name: name.to_string(),
      image_url: format!("https://img.test/{}.png", name.to_lowercase()),
    }
  }

  pub(crate) fn contenders(names: &[&str]) -> Vec<Contender> {
    names.iter().map(|name| contender(name)).collect()
  }

  /// Mon/Tue seated in A/B with Wed, Thu left in the pool.
  pub(crate) fn weekday_tournament() -> Tournament {
    let initial = contenders(&["Mon", "Tue", "Wed", "Thu"]);
    let working = contenders(&["Wed", "Thu", "Tue", "Mon"]);
    Tournament::from_shuffled(initial, working).unwrap()
  }

  fn names(pool: &[Contender]) -> Vec<&str> {
    pool.iter().map(|c| c.name.as_str()).collect()
  }

  fn assert_conserved(t: &Tournament) {
    assert_eq!(t.accounted_entrants(), t.initial_contenders.len());
  }

  #[test]
  fn test_weekday_scenario() {
    let mut t = weekday_tournament();
    assert_eq!(t.slot_a.as_ref().unwrap().name, "Mon");
    assert_eq!(t.slot_b.as_ref().unwrap().name, "Tue");
    assert_eq!(names(&t.contender_pool), vec!["Wed", "Thu"]);
    assert_eq!(t.user_champion_side, None);
    assert_eq!(t.phase(), MatchupPhase::AwaitingVote);

    assert!(t.vote(Side::A));
    assert_eq!(t.slot_a.as_ref().unwrap().votes, 1);
    assert_eq!(t.slot_b.as_ref().unwrap().votes, 0);
    assert_eq!(t.user_picked_names, vec!["Mon"]);
    assert_eq!(t.user_champion_side, Some(Side::A));
    assert!(t.round_decided);

    let outcome = t.advance();
    assert_eq!(
      outcome,
      AdvanceOutcome::NextRound {
        winner: "Mon".to_string(),
        eliminated: "Tue".to_string(),
        challenger: "Thu".to_string(),
      }
    );
    assert_eq!(t.eliminated_names, vec!["Tue"]);
    assert_eq!(t.round_history.len(), 1);
    assert_eq!(t.round_history[0].pair_a.name, "Mon");
    assert_eq!(t.round_history[0].pair_a.votes, 1);
    assert_eq!(t.round_history[0].pair_b.name, "Tue");
    assert_eq!(t.round_history[0].pair_b.votes, 0);
    assert_eq!(t.slot_a.as_ref().unwrap().name, "Mon");
    assert_eq!(t.slot_a.as_ref().unwrap().votes, 0);
    assert_eq!(t.slot_b.as_ref().unwrap().name, "Thu");
    assert_eq!(t.slot_b.as_ref().unwrap().votes, 0);
    assert_eq!(names(&t.contender_pool), vec!["Wed"]);
    assert!(!t.round_decided);

    assert!(t.vote(Side::B));
    assert_eq!(t.slot_a.as_ref().unwrap().votes, 0);
    assert_eq!(t.slot_b.as_ref().unwrap().votes, 1);
    assert_eq!(t.user_picked_names, vec!["Mon", "Thu"]);
    assert_eq!(t.user_champion_side, Some(Side::B));

    t.advance();
    assert_eq!(t.eliminated_names, vec!["Tue", "Mon"]);
    assert_eq!(t.slot_a.as_ref().unwrap().name, "Wed");
    assert_eq!(t.slot_b.as_ref().unwrap().name, "Thu");
    assert!(t.contender_pool.is_empty());

    assert!(t.vote(Side::B));
    let outcome = t.advance();
    assert_eq!(
      outcome,
      AdvanceOutcome::Crowned {
        champion: "Thu".to_string(),
        eliminated: "Wed".to_string(),
      }
    );
    let champion = t.champion.as_ref().unwrap();
    assert_eq!(champion.name, "Thu");
    assert_eq!(champion.votes, 1);
    assert!(t.slot_a.is_none());
    assert!(t.slot_b.is_none());
    assert!(!t.round_decided);
    assert_eq!(t.phase(), MatchupPhase::Complete);
    assert_conserved(&t);
  }

  #[test]
  fn test_duplicate_vote_is_ignored() {
    let mut t = weekday_tournament();
    assert!(t.vote(Side::A));
    let snapshot = t.clone();
    assert!(!t.vote(Side::B));
    assert_eq!(t, snapshot);
  }

  #[test]
  fn test_advance_without_vote_is_ignored() {
    let mut t = weekday_tournament();
    let snapshot = t.clone();
    assert_eq!(t.advance(), AdvanceOutcome::Ignored);
    assert_eq!(t, snapshot);

    t.vote(Side::A);
    t.advance();
    let snapshot = t.clone();
    assert_eq!(t.advance(), AdvanceOutcome::Ignored);
    assert_eq!(t, snapshot);
  }

  #[test]
  fn test_complete_tournament_is_terminal() {
    let mut t = weekday_tournament();
    while t.phase() != MatchupPhase::Complete {
      t.vote(Side::A);
      t.advance();
    }
    let snapshot = t.clone();
    assert!(!t.vote(Side::A));
    assert!(!t.vote(Side::B));
    assert_eq!(t.advance(), AdvanceOutcome::Ignored);
    assert_eq!(t, snapshot);
  }

  #[test]
  fn test_invariants_over_random_brackets() {
    let mut rng = StdRng::seed_from_u64(7);
    for size in 4..=20usize {
      let pool: Vec<Contender> = (0..size).map(|i| contender(&format!("E{i}"))).collect();
      let mut t = Tournament::create(pool, &mut rng).unwrap();
      assert_conserved(&t);
      let mut rounds = 0;
      while t.phase() != MatchupPhase::Complete {
        let side = if rng.gen_bool(0.5) { Side::A } else { Side::B };
        let held = t.slot(side).map(|s| s.name.clone()).unwrap();
        let eliminated_before = t.eliminated_names.clone();

        assert!(t.vote(side));
        assert_conserved(&t);
        let live = (t.slot_a.clone().unwrap(), t.slot_b.clone().unwrap());
        t.advance();
        rounds += 1;
        assert_conserved(&t);

        assert!(t.eliminated_names.starts_with(&eliminated_before));
        assert_eq!(t.eliminated_names.len(), eliminated_before.len() + 1);
        let last = t.round_history.last().unwrap();
        assert_eq!(last.pair_a, live.0);
        assert_eq!(last.pair_b, live.1);
        assert_eq!(last.total_votes(), 1);

        if t.phase() != MatchupPhase::Complete {
          assert_eq!(t.slot(side).unwrap().name, held);
          assert_eq!(t.user_champion_side, Some(side));
        } else {
          assert_eq!(t.champion.as_ref().unwrap().name, held);
        }
      }
      assert_eq!(rounds, size - 1);
      assert_eq!(t.round_history.len(), size - 1);
    }
  }

  #[test]
  fn test_create_keeps_initial_order() {
    let mut rng = StdRng::seed_from_u64(42);
    let entrants = contenders(&["Alpha", "Bravo", "Charlie", "Delta", "Echo"]);
    let t = Tournament::create(entrants.clone(), &mut rng).unwrap();
    assert_eq!(t.initial_contenders, entrants);
    assert_eq!(t.contender_pool.len(), 3);
    assert_eq!(t.slot_a.as_ref().unwrap().votes, 0);
    assert_eq!(t.slot_b.as_ref().unwrap().votes, 0);
    assert!(t.eliminated_names.is_empty());
    assert!(t.round_history.is_empty());
    assert!(t.user_picked_names.is_empty());
  }

  #[test]
  fn test_from_shuffled_rejects_single_contender() {
    let err = Tournament::from_shuffled(contenders(&["Solo"]), contenders(&["Solo"])).unwrap_err();
    assert!(err.contains("at least two"));
  }

  #[test]
  fn test_serde_round_trip_preserves_order() {
    let mut t = weekday_tournament();
    t.vote(Side::A);
    t.advance();
    let json = serde_json::to_string(&t).unwrap();
    assert!(json.contains("\"userChampionSide\":\"A\""));
    let back: Tournament = serde_json::from_str(&json).unwrap();
    assert_eq!(back, t);
  }
}
