//! Ports to the persistence collaborators, and in-memory adapters for them.
//!
//! Adapters report failures as [`StoreError`]. The engine never propagates
//! those directly: the loader maps them to [`TournamentError::Fetch`] and the
//! recorder to [`TournamentError::Persistence`].

use chrono::Utc;
use log::debug;
use snafu::prelude::*;

use crate::config::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StoreError {
    #[snafu(display("store unavailable: {message}"))]
    Unavailable { message: String },

    #[snafu(display("no candidate with id {id}"))]
    CandidateNotFound { id: CandidateId },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// The table-oriented data service holding candidates and votes.
pub trait CandidateStore {
    /// All registered candidates, in no particular order.
    fn list_candidates(&self) -> StoreResult<Vec<Candidate>>;

    fn insert_candidate(&mut self, candidate: NewCandidate) -> StoreResult<Candidate>;

    fn delete_candidate(&mut self, id: &CandidateId) -> StoreResult<()>;

    fn insert_vote(&mut self, vote: &VoteRecord) -> StoreResult<()>;
}

/// Client-side key-value storage for the voter token.
pub trait VoterTokenStore {
    fn get_voter_token(&self) -> StoreResult<Option<VoterToken>>;

    fn set_voter_token(&mut self, token: &VoterToken) -> StoreResult<()>;
}

/// A store kept in memory, with switches to simulate outages.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    candidates: Vec<Candidate>,
    votes: Vec<VoteRecord>,
    unavailable: bool,
    failing_votes: u32,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn with_candidates(candidates: Vec<Candidate>) -> MemoryStore {
        MemoryStore {
            candidates,
            ..MemoryStore::default()
        }
    }

    pub fn votes(&self) -> &[VoteRecord] {
        &self.votes
    }

    /// When set, listing candidates fails.
    pub fn set_unavailable(&mut self, unavailable: bool) {
        self.unavailable = unavailable;
    }

    /// The next `count` vote insertions fail.
    pub fn fail_next_votes(&mut self, count: u32) {
        self.failing_votes = count;
    }
}

impl CandidateStore for MemoryStore {
    fn list_candidates(&self) -> StoreResult<Vec<Candidate>> {
        ensure!(
            !self.unavailable,
            UnavailableSnafu {
                message: "memory store switched off"
            }
        );
        Ok(self.candidates.clone())
    }

    fn insert_candidate(&mut self, candidate: NewCandidate) -> StoreResult<Candidate> {
        let c = Candidate {
            id: CandidateId::generate(),
            name: candidate.name,
            category: candidate.category,
            reason: candidate.reason,
            created_at: Utc::now(),
        };
        debug!("insert_candidate: {:?}", c);
        self.candidates.push(c.clone());
        Ok(c)
    }

    fn delete_candidate(&mut self, id: &CandidateId) -> StoreResult<()> {
        let before = self.candidates.len();
        self.candidates.retain(|c| c.id != *id);
        ensure!(
            self.candidates.len() < before,
            CandidateNotFoundSnafu { id: id.clone() }
        );
        Ok(())
    }

    fn insert_vote(&mut self, vote: &VoteRecord) -> StoreResult<()> {
        if self.failing_votes > 0 {
            self.failing_votes -= 1;
            whatever!("simulated failure while inserting vote for {}", vote.winner_id);
        }
        self.votes.push(vote.clone());
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryTokenStore {
    token: Option<VoterToken>,
}

impl MemoryTokenStore {
    pub fn new() -> MemoryTokenStore {
        MemoryTokenStore::default()
    }

    pub fn with_token(token: VoterToken) -> MemoryTokenStore {
        MemoryTokenStore { token: Some(token) }
    }
}

impl VoterTokenStore for MemoryTokenStore {
    fn get_voter_token(&self) -> StoreResult<Option<VoterToken>> {
        Ok(self.token.clone())
    }

    fn set_voter_token(&mut self, token: &VoterToken) -> StoreResult<()> {
        self.token = Some(token.clone());
        Ok(())
    }
}
