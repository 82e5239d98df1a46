use log::{info, warn};

use crate::config::*;
use crate::store::CandidateStore;
use crate::{validate_pool, Tournament};

/// Fetches the candidate pool and checks it can hold a tournament.
///
/// Store failures become `Fetch`; a pool that does not have exactly
/// `POOL_SIZE` distinct candidates is rejected before any matchup exists.
pub fn load_pool<S: CandidateStore + ?Sized>(store: &S) -> TournamentResult<Vec<Candidate>> {
    let candidates = store.list_candidates().map_err(|e| {
        warn!("load_pool: fetching candidates failed: {}", e);
        TournamentError::Fetch {
            message: e.to_string(),
        }
    })?;
    info!("load_pool: fetched {} candidates", candidates.len());
    validate_pool(&candidates)?;
    Ok(candidates)
}

/// Loads the pool and draws a new tournament from it.
pub fn start_tournament<S: CandidateStore + ?Sized>(
    store: &S,
    rules: &TournamentRules,
) -> TournamentResult<Tournament> {
    let pool = load_pool(store)?;
    Tournament::start(&pool, rules.seed_mode)
}
