//! One voter's pass through a tournament, with the timing rules of the
//! interactive surface layered on top of the pure state machine.
//!
//! Time is always passed in, so nothing here sleeps or reads a clock.

use std::time::{Duration, Instant};

use log::{debug, info};

use crate::config::*;
use crate::recorder::VoteRecorder;
use crate::store::{CandidateStore, VoterTokenStore};
use crate::Tournament;

/// Blocks input for a fixed span after a pick.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TransitionGuard {
    duration: Duration,
    open_at: Option<Instant>,
}

impl TransitionGuard {
    pub fn new(duration: Duration) -> TransitionGuard {
        TransitionGuard {
            duration,
            open_at: None,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Closes the guard until `now + duration`. Returns that instant.
    pub fn engage(&mut self, now: Instant) -> Instant {
        let open_at = now + self.duration;
        self.open_at = Some(open_at);
        open_at
    }

    /// True when `now` falls inside the span of the last engagement.
    ///
    /// This only depends on time: an event stamped inside the span is
    /// blocked even if it is looked at after the span has passed.
    pub fn is_blocking(&self, now: Instant) -> bool {
        matches!(self.open_at, Some(t) if now < t)
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Phase {
    /// Waiting for a pick on the current matchup.
    Choosing,
    /// A pick was made and will be applied once the guard opens.
    Transitioning { pick: CandidateId },
    /// The tournament is complete and its vote has not been recorded yet.
    AwaitingSubmission,
    Submitted(VoteRecord),
}

/// What happened to a selection.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Selection {
    /// Accepted; it takes effect when the session is polled at or after `ready_at`.
    Pending { ready_at: Instant },
    /// Dropped because another pick is in flight or voting is over.
    Ignored,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Progress {
    /// Nothing is pending.
    Idle,
    /// A pick is pending and the guard is still closed.
    Waiting,
    /// The pick was applied; this is the next matchup.
    Advanced(Matchup),
    /// The pick was applied and decided the tournament.
    Complete(Candidate),
}

#[derive(Debug, Clone)]
pub struct VotingSession {
    tournament: Tournament,
    guard: TransitionGuard,
    phase: Phase,
}

impl VotingSession {
    pub fn new(tournament: Tournament, rules: &TournamentRules) -> VotingSession {
        VotingSession {
            tournament,
            guard: TransitionGuard::new(rules.transition_guard),
            phase: Phase::Choosing,
        }
    }

    pub fn tournament(&self) -> &Tournament {
        &self.tournament
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn current_matchup(&self) -> Option<Matchup> {
        self.tournament.current_matchup()
    }

    /// Registers a pick made at `now`.
    ///
    /// Input is ignored while a previous pick is in flight (including input
    /// stamped inside the guard span but delivered late), and once the
    /// tournament is decided. A pick outside the current matchup is an error
    /// and changes nothing.
    pub fn select(&mut self, pick: &CandidateId, now: Instant) -> TournamentResult<Selection> {
        if self.phase != Phase::Choosing || self.guard.is_blocking(now) {
            debug!("select: ignoring {} during {:?}", pick, self.phase);
            return Ok(Selection::Ignored);
        }
        let stage = self.tournament.stage();
        let valid = self
            .tournament
            .current_matchup()
            .map(|m| m.contains(pick))
            .unwrap_or(false);
        if !valid {
            return Err(TournamentError::InvalidPick {
                candidate: pick.clone(),
                stage,
            });
        }
        let ready_at = self.guard.engage(now);
        debug!("select: {} at {}, applied after {:?}", pick, stage, self.guard.duration());
        self.phase = Phase::Transitioning { pick: pick.clone() };
        Ok(Selection::Pending { ready_at })
    }

    /// Applies the pending pick if the guard has opened by `now`.
    pub fn poll(&mut self, now: Instant) -> TournamentResult<Progress> {
        let pick = match &self.phase {
            Phase::Transitioning { pick } => pick.clone(),
            _ => return Ok(Progress::Idle),
        };
        if self.guard.is_blocking(now) {
            return Ok(Progress::Waiting);
        }
        let stage = self.tournament.advance(&pick)?;
        match (stage, self.tournament.winner(), self.tournament.current_matchup()) {
            (Stage::Complete, Some(winner), _) => {
                let winner = winner.clone();
                self.phase = Phase::AwaitingSubmission;
                Ok(Progress::Complete(winner))
            }
            (_, _, Some(next)) => {
                self.phase = Phase::Choosing;
                Ok(Progress::Advanced(next))
            }
            // The state machine always has either a matchup or a winner.
            _ => Ok(Progress::Idle),
        }
    }

    /// Records the vote for the decided tournament.
    ///
    /// On failure the session stays in `AwaitingSubmission` so the same
    /// winner can be submitted again. Once recorded, further calls return
    /// the stored record without writing anything.
    pub fn submit<S, T>(&mut self, store: &mut S, tokens: &mut T) -> TournamentResult<VoteRecord>
    where
        S: CandidateStore + ?Sized,
        T: VoterTokenStore + ?Sized,
    {
        match &self.phase {
            Phase::Submitted(record) => {
                info!("submit: vote already recorded for {}", record.winner_id);
                return Ok(record.clone());
            }
            Phase::AwaitingSubmission => {}
            _ => {
                return Err(TournamentError::NotComplete {
                    stage: self.tournament.stage(),
                })
            }
        }
        let winner = self
            .tournament
            .winner()
            .cloned()
            .ok_or(TournamentError::NotComplete {
                stage: self.tournament.stage(),
            })?;
        let record = VoteRecorder::new(store, tokens).submit(&self.tournament, &winner)?;
        self.phase = Phase::Submitted(record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, MemoryTokenStore};
    use crate::test_util::*;

    fn rules(ms: u64) -> TournamentRules {
        TournamentRules {
            transition_guard: Duration::from_millis(ms),
            ..TournamentRules::DEFAULT_RULES
        }
    }

    fn session(ms: u64) -> VotingSession {
        let t = Tournament::from_seeded_order(sample_pool()).unwrap();
        VotingSession::new(t, &rules(ms))
    }

    fn play(s: &mut VotingSession, picks: &[&str], start: Instant) -> Instant {
        let mut now = start;
        for p in picks {
            s.select(&CandidateId::from(*p), now).unwrap();
            now += Duration::from_millis(600);
            s.poll(now).unwrap();
        }
        now
    }

    #[test]
    fn guard_blocks_until_its_span_has_elapsed() {
        let start = Instant::now();
        let mut g = TransitionGuard::new(Duration::from_millis(600));
        assert!(!g.is_blocking(start));
        let open_at = g.engage(start);
        assert!(g.is_blocking(start + Duration::from_millis(599)));
        assert!(!g.is_blocking(open_at));
        // Re-engaging moves the span.
        let later = start + Duration::from_secs(5);
        g.engage(later);
        assert!(g.is_blocking(later));
        assert!(!g.is_blocking(later + Duration::from_millis(600)));
    }

    #[test]
    fn second_click_during_the_transition_is_ignored() {
        init_logs();
        let start = Instant::now();
        let mut s = session(600);

        let sel = s.select(&CandidateId::from("B"), start).unwrap();
        assert_eq!(
            sel,
            Selection::Pending {
                ready_at: start + Duration::from_millis(600)
            }
        );
        // A double click on the other card, and another on the same one.
        let later = start + Duration::from_millis(100);
        assert_eq!(s.select(&CandidateId::from("A"), later).unwrap(), Selection::Ignored);
        assert_eq!(s.select(&CandidateId::from("B"), later).unwrap(), Selection::Ignored);

        assert_eq!(s.poll(later).unwrap(), Progress::Waiting);
        assert_eq!(s.tournament().round(), 0);

        let next = s.poll(start + Duration::from_millis(600)).unwrap();
        match next {
            Progress::Advanced(m) => {
                assert_eq!(m.left.id, CandidateId::from("B"));
                assert_eq!(m.right.id, CandidateId::from("C"));
            }
            other => panic!("unexpected progress {:?}", other),
        }
        assert_eq!(s.tournament().round(), 1);
        assert_eq!(s.poll(start + Duration::from_millis(700)).unwrap(), Progress::Idle);
    }

    #[test]
    fn late_delivered_input_from_inside_the_span_is_ignored() {
        let start = Instant::now();
        let mut s = session(600);
        s.select(&CandidateId::from("A"), start).unwrap();
        assert!(matches!(
            s.poll(start + Duration::from_millis(600)).unwrap(),
            Progress::Advanced(_)
        ));
        // Typed at +300ms while the pick was in flight, read only now.
        assert_eq!(
            s.select(&CandidateId::from("C"), start + Duration::from_millis(300)).unwrap(),
            Selection::Ignored
        );
        assert_eq!(s.tournament().round(), 1);
        assert!(matches!(
            s.select(&CandidateId::from("C"), start + Duration::from_millis(900)).unwrap(),
            Selection::Pending { .. }
        ));
    }

    #[test]
    fn zero_guard_applies_on_the_next_poll() {
        let now = Instant::now();
        let mut s = session(0);
        s.select(&CandidateId::from("A"), now).unwrap();
        assert!(matches!(s.poll(now).unwrap(), Progress::Advanced(_)));
    }

    #[test]
    fn invalid_selection_changes_nothing() {
        let now = Instant::now();
        let mut s = session(600);
        assert!(matches!(
            s.select(&CandidateId::from("E"), now),
            Err(TournamentError::InvalidPick { .. })
        ));
        assert_eq!(s.phase(), &Phase::Choosing);
        assert_eq!(s.poll(now + Duration::from_secs(1)).unwrap(), Progress::Idle);
    }

    #[test]
    fn completes_then_ignores_input() {
        let mut s = session(600);
        let start = Instant::now();
        let now = play(&mut s, &["B", "C", "D"], start);
        s.select(&CandidateId::from("E"), now).unwrap();
        let done = s.poll(now + Duration::from_millis(600)).unwrap();
        assert!(matches!(done, Progress::Complete(ref c) if c.id == CandidateId::from("E")));
        assert_eq!(s.phase(), &Phase::AwaitingSubmission);
        assert_eq!(
            s.select(&CandidateId::from("E"), now + Duration::from_secs(2)).unwrap(),
            Selection::Ignored
        );
    }

    #[test]
    fn submit_before_completion_is_rejected() {
        let mut s = session(0);
        let mut store = MemoryStore::new();
        let mut tokens = MemoryTokenStore::new();
        assert_eq!(
            s.submit(&mut store, &mut tokens),
            Err(TournamentError::NotComplete {
                stage: Stage::Round(0)
            })
        );
    }

    #[test]
    fn failed_submission_can_be_retried_without_replaying() {
        init_logs();
        let mut s = session(600);
        play(&mut s, &["B", "C", "D", "E"], Instant::now());
        let decided = s.tournament().clone();

        let mut store = MemoryStore::with_candidates(sample_pool());
        let mut tokens = MemoryTokenStore::new();
        store.fail_next_votes(1);

        assert!(matches!(
            s.submit(&mut store, &mut tokens),
            Err(TournamentError::Persistence { .. })
        ));
        assert_eq!(s.phase(), &Phase::AwaitingSubmission);
        assert_eq!(s.tournament(), &decided);
        assert!(store.votes().is_empty());

        let record = s.submit(&mut store, &mut tokens).unwrap();
        assert_eq!(record.winner_id, CandidateId::from("E"));
        assert_eq!(record.category, Category::FieldCustomerValue);
        assert_eq!(s.tournament(), &decided);
        assert_eq!(store.votes(), &[record.clone()]);

        // The token minted on the failed attempt is the one used for the vote.
        assert_eq!(tokens.get_voter_token().unwrap(), Some(record.voter_token.clone()));

        let again = s.submit(&mut store, &mut tokens).unwrap();
        assert_eq!(again, record);
        assert_eq!(store.votes().len(), 1);
    }
}
