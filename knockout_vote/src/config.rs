// ********* Input data structures ***********

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use uuid::Uuid;

/// The number of candidates in every tournament.
pub const POOL_SIZE: usize = 5;

/// Index of the last round. A tournament always plays `FINAL_ROUND + 1` matchups.
pub const FINAL_ROUND: u8 = 3;

/// The five fixed categories a candidate may be nominated under.
///
/// Records written by older clients used localized labels; these are still
/// accepted when reading.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "AI")]
    Ai,
    #[serde(alias = "공유")]
    Sharing,
    #[serde(alias = "협업")]
    Collaboration,
    #[serde(alias = "자율과책임")]
    AutonomyAndResponsibility,
    #[serde(alias = "현장고객 가치실현")]
    FieldCustomerValue,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Ai,
        Category::Sharing,
        Category::Collaboration,
        Category::AutonomyAndResponsibility,
        Category::FieldCustomerValue,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Ai => "AI",
            Category::Sharing => "Sharing",
            Category::Collaboration => "Collaboration",
            Category::AutonomyAndResponsibility => "Autonomy and Responsibility",
            Category::FieldCustomerValue => "Field Customer Value",
        }
    }

    fn legacy_label(&self) -> &'static str {
        match self {
            Category::Ai => "AI",
            Category::Sharing => "공유",
            Category::Collaboration => "협업",
            Category::AutonomyAndResponsibility => "자율과책임",
            Category::FieldCustomerValue => "현장고객 가치실현",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = TournamentError;

    /// Accepts the display label, a compact form ("autonomy-and-responsibility",
    /// "FieldCustomerValue") or the legacy label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let compact: String = trimmed
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        Category::ALL
            .iter()
            .find(|c| {
                c.legacy_label() == trimmed
                    || c.label()
                        .chars()
                        .filter(|ch| ch.is_alphanumeric())
                        .collect::<String>()
                        .to_lowercase()
                        == compact
            })
            .copied()
            .context(UnknownCategorySnafu { value: trimmed })
    }
}

/// Opaque identity of a candidate, as assigned by the store.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(pub String);

impl CandidateId {
    pub fn generate() -> CandidateId {
        CandidateId(Uuid::new_v4().to_string())
    }
}

impl Display for CandidateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CandidateId {
    fn from(s: &str) -> Self {
        CandidateId(s.to_string())
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub category: Category,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl Candidate {
    pub fn new(id: CandidateId, name: &str, category: Category, reason: &str) -> Candidate {
        Candidate {
            id,
            name: name.to_string(),
            category,
            reason: reason.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// A candidate registration, before the store assigns an identity.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct NewCandidate {
    pub name: String,
    pub category: Category,
    pub reason: String,
}

impl NewCandidate {
    /// Rejects registrations with a blank name or reason.
    pub fn validated(name: &str, category: Category, reason: &str) -> TournamentResult<NewCandidate> {
        ensure!(!name.trim().is_empty(), EmptyFieldSnafu { field: "name" });
        ensure!(!reason.trim().is_empty(), EmptyFieldSnafu { field: "reason" });
        Ok(NewCandidate {
            name: name.trim().to_string(),
            category,
            reason: reason.trim().to_string(),
        })
    }
}

/// Client-persisted identifier used for soft vote deduplication.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoterToken(pub String);

impl Display for VoterToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ******** Output data structures *********

/// The pair of candidates presented for one decision.
///
/// In every round after the first, `left` is the reigning champion and
/// `right` the challenger drawn from the seeded order.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Matchup {
    pub left: Candidate,
    pub right: Candidate,
}

impl Matchup {
    pub fn new(left: Candidate, right: Candidate) -> Matchup {
        Matchup { left, right }
    }

    pub fn get(&self, id: &CandidateId) -> Option<&Candidate> {
        [&self.left, &self.right].into_iter().find(|c| c.id == *id)
    }

    pub fn contains(&self, id: &CandidateId) -> bool {
        self.get(id).is_some()
    }
}

/// Where a tournament stands.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Stage {
    /// Waiting for the pick of the given round (0 to `FINAL_ROUND`).
    Round(u8),
    Complete,
}

impl Stage {
    pub fn label(&self) -> String {
        match self {
            Stage::Round(r) if *r == FINAL_ROUND => "Final".to_string(),
            Stage::Round(r) => format!("Round {}", r + 1),
            Stage::Complete => "Complete".to_string(),
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

/// The decision taken in one round.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RoundOutcome {
    pub round: u8,
    pub matchup: Matchup,
    pub pick: Candidate,
}

/// The single record written for a completed tournament.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct VoteRecord {
    pub winner_id: CandidateId,
    pub category: Category,
    pub voter_token: VoterToken,
    pub submitted_at: DateTime<Utc>,
}

/// Errors that prevent a tournament from starting, progressing or being recorded.
#[derive(Eq, PartialEq, Debug, Clone, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TournamentError {
    #[snafu(display("expected exactly {} candidates, found {}", POOL_SIZE, found))]
    PoolSize { found: usize },
    #[snafu(display("candidate {} appears more than once in the pool", id))]
    DuplicateCandidate { id: CandidateId },
    #[snafu(display("could not fetch the candidates: {}", message))]
    Fetch { message: String },
    #[snafu(display("could not record the vote: {}", message))]
    Persistence { message: String },
    #[snafu(display("candidate {} is not part of the {} matchup", candidate, stage))]
    InvalidPick { candidate: CandidateId, stage: Stage },
    #[snafu(display("the tournament is not complete ({})", stage))]
    NotComplete { stage: Stage },
    #[snafu(display("{} is not the winner of this tournament (expected {})", found, expected))]
    WinnerMismatch {
        expected: CandidateId,
        found: CandidateId,
    },
    #[snafu(display("unknown category {:?}", value))]
    UnknownCategory { value: String },
    #[snafu(display("the {} of a candidate may not be empty", field))]
    EmptyField { field: &'static str },
}

pub type TournamentResult<T> = Result<T, TournamentError>;

// ********* Configuration **********

/// How the draw order is produced.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum SeedMode {
    /// Uniform shuffle from the thread-local generator.
    Random,
    /// Uniform shuffle from a generator seeded with this value. Reproducible.
    Fixed(u64),
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TournamentRules {
    pub seed_mode: SeedMode,
    /// How long input is ignored after a pick, before the pick is applied.
    pub transition_guard: Duration,
}

impl TournamentRules {
    pub const DEFAULT_RULES: TournamentRules = TournamentRules {
        seed_mode: SeedMode::Random,
        transition_guard: Duration::from_millis(600),
    };
}

impl Default for TournamentRules {
    fn default() -> Self {
        TournamentRules::DEFAULT_RULES
    }
}
