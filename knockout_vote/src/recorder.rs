use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rand::Rng;
use snafu::prelude::*;

use crate::config::*;
use crate::store::{CandidateStore, StoreError, VoterTokenStore};
use crate::Tournament;

const TOKEN_SUFFIX_LEN: usize = 9;

fn persistence_error(e: StoreError) -> TournamentError {
    warn!("vote recorder: {}", e);
    TournamentError::Persistence {
        message: e.to_string(),
    }
}

/// A new voter token: `voter_<unix millis>_<base-36 suffix>`.
///
/// Collisions are unlikely but possible. The token is not a security boundary.
pub fn generate_voter_token<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> VoterToken {
    let suffix: String = (0..TOKEN_SUFFIX_LEN)
        .map(|_| std::char::from_digit(rng.gen_range(0..36), 36).unwrap_or('0'))
        .collect();
    VoterToken(format!("voter_{}_{}", now.timestamp_millis(), suffix))
}

/// Returns the persisted voter token, creating and persisting one if absent.
pub fn ensure_voter_token<T, R>(
    tokens: &mut T,
    now: DateTime<Utc>,
    rng: &mut R,
) -> TournamentResult<VoterToken>
where
    T: VoterTokenStore + ?Sized,
    R: Rng + ?Sized,
{
    if let Some(token) = tokens.get_voter_token().map_err(persistence_error)? {
        debug!("reusing voter token {}", token);
        return Ok(token);
    }
    let token = generate_voter_token(now, rng);
    info!("created voter token {}", token);
    tokens.set_voter_token(&token).map_err(persistence_error)?;
    Ok(token)
}

/// Writes the single vote of a completed tournament.
///
/// Nothing is retried here: a failed insertion is returned to the caller,
/// which keeps the tournament and may submit the same winner again. Existing
/// votes for the token are not looked at.
pub struct VoteRecorder<'a, S: ?Sized, T: ?Sized> {
    store: &'a mut S,
    tokens: &'a mut T,
}

impl<'a, S, T> VoteRecorder<'a, S, T>
where
    S: CandidateStore + ?Sized,
    T: VoterTokenStore + ?Sized,
{
    pub fn new(store: &'a mut S, tokens: &'a mut T) -> Self {
        VoteRecorder { store, tokens }
    }

    pub fn submit(
        &mut self,
        tournament: &Tournament,
        winner: &Candidate,
    ) -> TournamentResult<VoteRecord> {
        self.submit_at(tournament, winner, Utc::now(), &mut rand::thread_rng())
    }

    /// Same as `submit`, with the clock and the token generator supplied.
    pub fn submit_at<R: Rng + ?Sized>(
        &mut self,
        tournament: &Tournament,
        winner: &Candidate,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> TournamentResult<VoteRecord> {
        let expected = tournament.winner().context(NotCompleteSnafu {
            stage: tournament.stage(),
        })?;
        ensure!(
            expected.id == winner.id,
            WinnerMismatchSnafu {
                expected: expected.id.clone(),
                found: winner.id.clone(),
            }
        );

        let voter_token = ensure_voter_token(&mut *self.tokens, now, rng)?;
        let record = VoteRecord {
            winner_id: winner.id.clone(),
            category: winner.category,
            voter_token,
            submitted_at: now,
        };
        self.store.insert_vote(&record).map_err(persistence_error)?;
        info!(
            "recorded vote for {} ({}) from {}",
            winner.name, record.category, record.voter_token
        );
        Ok(record)
    }
}
