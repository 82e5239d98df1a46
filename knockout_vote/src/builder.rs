pub use crate::config::*;

use rand::Rng;

use crate::{shuffle_with, validate_pool, Tournament};

/// A builder for assembling a pool and drawing a tournament from it.
///
/// ```
/// use knockout_vote::builder::Builder;
/// use knockout_vote::{Category, TournamentRules, SeedMode};
/// # use knockout_vote::TournamentError;
///
/// let rules = TournamentRules { seed_mode: SeedMode::Fixed(1), ..TournamentRules::DEFAULT_RULES };
/// let mut builder = Builder::new(&rules)?;
/// builder.add_candidate("Anna", Category::Ai, "automated the release notes")?;
/// builder.add_candidate("Bob", Category::Sharing, "ran the study group")?;
/// builder.add_candidate("Clara", Category::Collaboration, "paired with everyone")?;
/// builder.add_candidate("Dan", Category::AutonomyAndResponsibility, "owned the outage")?;
/// builder.add_candidate("Eve", Category::FieldCustomerValue, "visited every dealer")?;
///
/// let tournament = builder.start()?;
/// assert!(tournament.current_matchup().is_some());
///
/// # Ok::<(), TournamentError>(())
/// ```
pub struct Builder {
    pub(crate) _rules: TournamentRules,
    pub(crate) _candidates: Vec<Candidate>,
}

impl Builder {
    pub fn new(rules: &TournamentRules) -> Result<Builder, TournamentError> {
        Ok(Builder {
            _rules: rules.clone(),
            _candidates: Vec::new(),
        })
    }

    /// Replaces the pool with candidates that already have identities.
    pub fn candidates(self, cands: &[Candidate]) -> Result<Builder, TournamentError> {
        Ok(Builder {
            _rules: self._rules,
            _candidates: cands.to_vec(),
        })
    }

    /// Registers a new candidate under a fresh identity.
    ///
    /// Name and reason must not be blank.
    pub fn add_candidate(
        &mut self,
        name: &str,
        category: Category,
        reason: &str,
    ) -> Result<CandidateId, TournamentError> {
        let nc = NewCandidate::validated(name, category, reason)?;
        let id = CandidateId::generate();
        self._candidates
            .push(Candidate::new(id.clone(), &nc.name, nc.category, &nc.reason));
        Ok(id)
    }

    /// Validates the pool and draws the order according to the rules.
    pub fn start(&self) -> Result<Tournament, TournamentError> {
        Tournament::start(&self._candidates, self._rules.seed_mode)
    }

    /// Validates the pool and draws the order from the given generator,
    /// regardless of the seed mode in the rules.
    pub fn start_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Tournament, TournamentError> {
        validate_pool(&self._candidates)?;
        Tournament::from_seeded_order(shuffle_with(&self._candidates, rng))
    }
}
