use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::trace;

use crate::error::Result;
use crate::model::{
    api::{
        results::{CandidateResult, ElectionResults},
        stats::AggregateStats,
        turnout::{CandidateTurnout, DistrictCandidate, DistrictTurnout, OverallTurnout, Turnout},
    },
    common::election::{ElectionStatus, UNKNOWN_DISTRICT},
    db::election::{Ballot, Election},
    mongodb::Id,
};
use crate::storage::Store;

use super::election_not_found;

/// `part` as a percentage of `whole`, rounded to one decimal place.
/// Zero when `whole` is zero.
pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 1000.0).round() / 10.0
}

fn count_by_candidate<'a>(ballots: impl IntoIterator<Item = &'a Ballot>) -> HashMap<Id, u64> {
    let mut counts = HashMap::new();
    for ballot in ballots {
        *counts.entry(ballot.candidate_id).or_insert(0) += 1;
    }
    counts
}

/// Per-candidate vote counts, in the election's candidate order.
pub fn results(election: &Election) -> Vec<CandidateResult> {
    let counts = count_by_candidate(&election.ballots);
    election
        .candidates
        .iter()
        .map(|candidate| CandidateResult {
            candidate_id: candidate.id.into(),
            name: candidate.name.clone(),
            party: candidate.party.clone(),
            votes: counts.get(&candidate.id).copied().unwrap_or(0),
        })
        .collect()
}

/// Turnout of `election` given the number of voters eligible to vote in it.
pub fn turnout(election: &Election, eligible_voters: u64, now: DateTime<Utc>) -> Turnout {
    let votes_cast = election.ballots.len() as u64;
    let counts = count_by_candidate(&election.ballots);

    let candidates = election
        .candidates
        .iter()
        .map(|candidate| {
            let votes = counts.get(&candidate.id).copied().unwrap_or(0);
            CandidateTurnout {
                candidate_id: candidate.id.into(),
                name: candidate.name.clone(),
                party: candidate.party.clone(),
                votes,
                percentage: percentage(votes, votes_cast),
            }
        })
        .collect();

    // Group by district, remembering the order districts were first seen in.
    let mut districts: Vec<(&str, Vec<&Ballot>)> = Vec::new();
    for ballot in &election.ballots {
        let label = ballot
            .district
            .as_deref()
            .map(str::trim)
            .filter(|district| !district.is_empty())
            .unwrap_or(UNKNOWN_DISTRICT);
        match districts.iter_mut().find(|(name, _)| *name == label) {
            Some((_, ballots)) => ballots.push(ballot),
            None => districts.push((label, vec![ballot])),
        }
    }
    let mut district_distribution: Vec<DistrictTurnout> = districts
        .into_iter()
        .map(|(district, ballots)| {
            let counts = count_by_candidate(ballots.iter().copied());
            DistrictTurnout {
                district: district.to_string(),
                total: ballots.len() as u64,
                candidates: election
                    .candidates
                    .iter()
                    .map(|candidate| DistrictCandidate {
                        candidate_id: candidate.id.into(),
                        name: candidate.name.clone(),
                        votes: counts.get(&candidate.id).copied().unwrap_or(0),
                    })
                    .collect(),
            }
        })
        .collect();
    // Stable, so ties keep first-seen order.
    district_distribution.sort_by(|a, b| b.total.cmp(&a.total));

    Turnout {
        overall: OverallTurnout {
            eligible_voters,
            votes_cast,
            percentage: percentage(votes_cast, eligible_voters),
        },
        candidates,
        district_distribution,
        last_updated: now,
    }
}

/// Load an election and count its votes.
pub async fn compute_results(store: &Store, election_id: Id) -> Result<ElectionResults> {
    let election = store
        .election(election_id)
        .await?
        .ok_or_else(|| election_not_found(election_id))?;
    trace!("Tallying {} ballot(s) for election {election_id}", election.ballots.len());
    Ok(ElectionResults {
        election_id: election.id.into(),
        title: election.title.clone(),
        results: results(&election),
    })
}

/// Load an election and compute its turnout against all registered voters.
pub async fn compute_turnout(store: &Store, election_id: Id) -> Result<Turnout> {
    let election = store
        .election(election_id)
        .await?
        .ok_or_else(|| election_not_found(election_id))?;
    let eligible_voters = store.count_voters().await?;
    Ok(turnout(&election, eligible_voters, Utc::now()))
}

/// Dashboard counters across every election.
pub async fn aggregate_stats(store: &Store) -> Result<AggregateStats> {
    Ok(AggregateStats {
        total_elections: store.count_elections(None).await?,
        active_elections: store.count_elections(Some(ElectionStatus::Active)).await?,
        total_voters: store.count_voters().await?,
        total_votes: store.count_ballots().await?,
        pending_disputes: 0,
        system_alerts: 0,
    })
}
