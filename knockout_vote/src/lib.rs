mod config;

pub mod builder;
pub mod loader;
pub mod manual;
pub mod recorder;
pub mod session;
pub mod store;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use snafu::prelude::*;
use std::collections::HashSet;

pub use crate::config::*;

/// Checks that the candidates form a valid pool: exactly `POOL_SIZE` entries
/// with distinct identities. Categories may repeat.
pub fn validate_pool(candidates: &[Candidate]) -> TournamentResult<()> {
    ensure!(
        candidates.len() == POOL_SIZE,
        PoolSizeSnafu {
            found: candidates.len()
        }
    );
    let mut seen: HashSet<&CandidateId> = HashSet::new();
    for c in candidates.iter() {
        ensure!(
            seen.insert(&c.id),
            DuplicateCandidateSnafu { id: c.id.clone() }
        );
    }
    Ok(())
}

/// A uniformly random permutation of the pool, drawn from `rng`.
pub fn shuffle_with<R: Rng + ?Sized>(pool: &[Candidate], rng: &mut R) -> Vec<Candidate> {
    let mut order = pool.to_vec();
    order.shuffle(rng);
    order
}

/// Produces the draw order for one tournament.
pub fn seed_order(pool: &[Candidate], mode: SeedMode) -> Vec<Candidate> {
    match mode {
        SeedMode::Random => shuffle_with(pool, &mut rand::thread_rng()),
        SeedMode::Fixed(seed) => shuffle_with(pool, &mut StdRng::seed_from_u64(seed)),
    }
}

/// A survivor knockout over a fixed draw order.
///
/// The first two candidates of the order meet in round 0. From then on the
/// champion of the previous round faces `order[round + 1]`, so four matchups
/// cover all five candidates and the challengers never depend on earlier picks.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Tournament {
    seeded_order: Vec<Candidate>,
    round: u8,
    champion: Option<Candidate>,
    winner: Option<Candidate>,
    outcomes: Vec<RoundOutcome>,
}

impl Tournament {
    /// Validates and shuffles the pool, then starts at round 0.
    pub fn start(pool: &[Candidate], mode: SeedMode) -> TournamentResult<Tournament> {
        validate_pool(pool)?;
        Tournament::from_seeded_order(seed_order(pool, mode))
    }

    /// Starts a tournament over an order that has already been drawn.
    pub fn from_seeded_order(order: Vec<Candidate>) -> TournamentResult<Tournament> {
        validate_pool(&order)?;
        info!("Starting tournament over {} candidates", order.len());
        for (idx, c) in order.iter().enumerate() {
            debug!("Draw position {}: {} ({})", idx, c.name, c.id);
        }
        Ok(Tournament {
            seeded_order: order,
            round: 0,
            champion: None,
            winner: None,
            outcomes: Vec::new(),
        })
    }

    pub fn seeded_order(&self) -> &[Candidate] {
        &self.seeded_order
    }

    pub fn stage(&self) -> Stage {
        if self.winner.is_some() {
            Stage::Complete
        } else {
            Stage::Round(self.round)
        }
    }

    /// The current round index. It stays at `FINAL_ROUND` once complete.
    pub fn round(&self) -> u8 {
        self.round
    }

    pub fn champion(&self) -> Option<&Candidate> {
        self.champion.as_ref()
    }

    pub fn winner(&self) -> Option<&Candidate> {
        self.winner.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.winner.is_some()
    }

    /// The decisions taken so far, in round order.
    pub fn outcomes(&self) -> &[RoundOutcome] {
        &self.outcomes
    }

    /// Matchups left to play after the current one.
    pub fn remaining_matchups(&self) -> u8 {
        match self.stage() {
            Stage::Round(r) => FINAL_ROUND - r,
            Stage::Complete => 0,
        }
    }

    /// The pair to decide in the current round, or `None` once complete.
    pub fn current_matchup(&self) -> Option<Matchup> {
        if self.seeded_order.len() != POOL_SIZE || self.winner.is_some() {
            return None;
        }
        match (self.round, self.champion.as_ref()) {
            (0, _) => Some(Matchup::new(
                self.seeded_order[0].clone(),
                self.seeded_order[1].clone(),
            )),
            (r, Some(champion)) if r <= FINAL_ROUND => self
                .seeded_order
                .get(r as usize + 1)
                .map(|challenger| Matchup::new(champion.clone(), challenger.clone())),
            _ => None,
        }
    }

    /// Applies the pick of the current round.
    ///
    /// A pick outside the current matchup (or any pick once the tournament is
    /// complete) is rejected and leaves the state untouched.
    pub fn advance(&mut self, pick: &CandidateId) -> TournamentResult<Stage> {
        let stage = self.stage();
        let matchup = self.current_matchup().context(InvalidPickSnafu {
            candidate: pick.clone(),
            stage,
        })?;
        let chosen = matchup.get(pick).cloned().context(InvalidPickSnafu {
            candidate: pick.clone(),
            stage,
        })?;

        info!(
            "{}: {} vs {} -> {}",
            stage, matchup.left.name, matchup.right.name, chosen.name
        );
        self.outcomes.push(RoundOutcome {
            round: self.round,
            matchup,
            pick: chosen.clone(),
        });
        self.champion = Some(chosen.clone());
        if self.round < FINAL_ROUND {
            self.round += 1;
        } else {
            info!("Tournament complete, winner: {} ({})", chosen.name, chosen.category);
            self.winner = Some(chosen);
        }
        Ok(self.stage())
    }
}
