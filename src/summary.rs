use std::cmp::Ordering;

use crate::matchup::Tournament;
use crate::types::SummaryRow;

/// Builds the end-of-tournament standings: champion first, then by win
/// percentage (descending), ties broken by name.
///
/// The percentage comes from the first decided round an entrant appeared in.
/// `rounds_played` / `rounds_won` aggregate over the whole history.
pub fn build_summary(tournament: &Tournament) -> Vec<SummaryRow> {
    let champion_name = tournament.champion.as_ref().map(|c| c.name.as_str());

    let mut rows: Vec<SummaryRow> = tournament
        .initial_contenders
        .iter()
        .map(|contender| {
            let name = contender.name.as_str();
            let win_percentage = tournament
                .round_history
                .iter()
                .find_map(|pair| pair.entry_for(name).map(|entry| (entry.votes, pair.total_votes())))
                .map(|(votes, total)| percentage(votes, total))
                .unwrap_or(0.0);

            let mut rounds_played = 0;
            let mut rounds_won = 0;
            for pair in &tournament.round_history {
                if let Some(entry) = pair.entry_for(name) {
                    rounds_played += 1;
                    let opponent_votes = pair.total_votes() - entry.votes;
                    if entry.votes > opponent_votes {
                        rounds_won += 1;
                    }
                }
            }

            SummaryRow {
                name: contender.name.clone(),
                image_url: contender.image_url.clone(),
                win_percentage,
                rounds_played,
                rounds_won,
                is_champion: champion_name == Some(name),
            }
        })
        .collect();

    rows.sort_by(|a, b| match (a.is_champion, b.is_champion) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => b
            .win_percentage
            .partial_cmp(&a.win_percentage)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name)),
    });
    rows
}

fn percentage(votes: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    f64::from(votes) * 100.0 / f64::from(total)
}
