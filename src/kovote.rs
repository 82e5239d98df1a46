use log::{debug, info, warn};

use knockout_vote::loader::start_tournament;
use knockout_vote::session::{Progress, Selection, VotingSession};
use knockout_vote::store::{CandidateStore, VoterTokenStore};
use knockout_vote::*;
use snafu::{prelude::*, Snafu};

use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::thread;
use std::time::Instant;

use crate::args::{Args, Command};
use crate::kovote::config_reader::*;
use crate::kovote::io_common::*;
use crate::kovote::io_json::{JsonFileStore, TokenFile};

pub mod config_reader;
pub mod io_common;
pub mod io_json;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum KovoteError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing the JSON in {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("{source}"))]
    Tournament { source: TournamentError },
    #[snafu(display("Error writing to the terminal"))]
    Terminal { source: std::io::Error },
    #[snafu(display("Input ended before the vote was recorded"))]
    InputClosed {},

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type KovoteResult<T> = Result<T, KovoteError>;

/// A line of input and the instant it was read.
pub type TimedLine = (String, Instant);

pub fn run(args: &Args) -> KovoteResult<()> {
    let file_config = match &args.config {
        Some(p) => Some(read_config(p)?),
        None => None,
    };
    let settings = resolve_settings(args, file_config)?;
    info!("settings: {:?}", settings);

    let mut store = JsonFileStore::new(&settings.store_path);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match &args.command {
        Command::Vote => {
            let mut tokens = TokenFile::new(&settings.voter_token_path);
            let mut input = spawn_stdin_reader().into_iter();
            run_vote_session(&mut store, &mut tokens, &settings.rules, &mut input, &mut out)?;
        }
        Command::List => {
            let candidates = list_candidates(&store)?;
            write!(out, "{}", render_candidate_list(&candidates)).context(TerminalSnafu)?;
        }
        Command::Add {
            name,
            category,
            reason,
        } => {
            let c = add_candidate(&mut store, name, category, reason)?;
            writeln!(out, "Registered {} ({}) with id {}", c.name, c.category, c.id)
                .context(TerminalSnafu)?;
        }
        Command::Remove { id } => {
            remove_candidate(&mut store, &CandidateId(id.clone()))?;
            writeln!(out, "Removed {}", id).context(TerminalSnafu)?;
        }
    }
    Ok(())
}

/// Reads stdin on its own thread and stamps each line when it arrives, so
/// that lines typed while a transition is pending keep their real time.
fn spawn_stdin_reader() -> mpsc::Receiver<TimedLine> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(l) => {
                    if tx.send((l, Instant::now())).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("stdin reader stopped: {}", e);
                    break;
                }
            }
        }
    });
    rx
}

pub fn list_candidates<S: CandidateStore + ?Sized>(store: &S) -> KovoteResult<Vec<Candidate>> {
    let mut candidates = store
        .list_candidates()
        .map_err(|e| TournamentError::Fetch {
            message: e.to_string(),
        })
        .context(TournamentSnafu)?;
    candidates.sort_by(|a, b| (a.category, &a.name).cmp(&(b.category, &b.name)));
    Ok(candidates)
}

pub fn add_candidate<S: CandidateStore + ?Sized>(
    store: &mut S,
    name: &str,
    category: &str,
    reason: &str,
) -> KovoteResult<Candidate> {
    let category: Category = category.parse().context(TournamentSnafu)?;
    let nc = NewCandidate::validated(name, category, reason).context(TournamentSnafu)?;
    let c = store
        .insert_candidate(nc)
        .map_err(|e| TournamentError::Persistence {
            message: e.to_string(),
        })
        .context(TournamentSnafu)?;
    info!("add_candidate: registered {:?}", c);
    Ok(c)
}

pub fn remove_candidate<S: CandidateStore + ?Sized>(
    store: &mut S,
    id: &CandidateId,
) -> KovoteResult<()> {
    store
        .delete_candidate(id)
        .map_err(|e| TournamentError::Persistence {
            message: e.to_string(),
        })
        .context(TournamentSnafu)?;
    info!("remove_candidate: removed {}", id);
    Ok(())
}

/// Plays one tournament on the terminal and records its vote.
///
/// A failed submission leaves the result on screen; the voter may retry the
/// submission or give up, the rounds are never replayed.
pub fn run_vote_session<S, T, I, W>(
    store: &mut S,
    tokens: &mut T,
    rules: &TournamentRules,
    input: &mut I,
    out: &mut W,
) -> KovoteResult<VoteRecord>
where
    S: CandidateStore + ?Sized,
    T: VoterTokenStore + ?Sized,
    I: Iterator<Item = TimedLine>,
    W: Write,
{
    let tournament = start_tournament(&*store, rules).context(TournamentSnafu)?;
    let mut session = VotingSession::new(tournament, rules);
    let mut shown: Option<Stage> = None;

    while let Some(matchup) = session.current_matchup() {
        let stage = session.tournament().stage();
        if shown != Some(stage) {
            let remaining = session.tournament().remaining_matchups();
            write!(out, "{}", render_matchup(stage, remaining, &matchup)).context(TerminalSnafu)?;
            shown = Some(stage);
        }

        let (line, at) = input.next().context(InputClosedSnafu)?;
        let side = match parse_side(&line) {
            Some(side) => side,
            None => {
                writeln!(out, "Type 1 or 2.").context(TerminalSnafu)?;
                continue;
            }
        };
        let pick = side.of(&matchup);
        match session.select(&pick.id, at).context(TournamentSnafu)? {
            Selection::Ignored => {
                debug!("run_vote_session: ignored {:?} typed during a transition", line);
            }
            Selection::Pending { ready_at } => {
                writeln!(out, "> {}", pick.name).context(TerminalSnafu)?;
                out.flush().context(TerminalSnafu)?;
                wait_for_transition(&mut session, ready_at)?;
            }
        }
    }

    loop {
        match session.submit(&mut *store, &mut *tokens) {
            Ok(record) => {
                if let Some(winner) = session.tournament().winner() {
                    write!(out, "{}", render_result(winner)).context(TerminalSnafu)?;
                }
                return Ok(record);
            }
            Err(e @ TournamentError::Persistence { .. }) => {
                if let Some(winner) = session.tournament().winner() {
                    write!(out, "{}", render_result(winner)).context(TerminalSnafu)?;
                }
                writeln!(out, "Your vote could not be saved: {}", e).context(TerminalSnafu)?;
                if !ask_retry(input, out)? {
                    return Err(e).context(TournamentSnafu);
                }
                info!("run_vote_session: retrying the submission");
            }
            Err(e) => return Err(e).context(TournamentSnafu),
        }
    }
}

fn wait_for_transition(session: &mut VotingSession, ready_at: Instant) -> KovoteResult<()> {
    loop {
        let now = Instant::now();
        if now < ready_at {
            thread::sleep(ready_at - now);
        }
        match session.poll(Instant::now()).context(TournamentSnafu)? {
            Progress::Waiting => continue,
            p => {
                debug!("wait_for_transition: {:?}", p);
                return Ok(());
            }
        }
    }
}

fn ask_retry<I, W>(input: &mut I, out: &mut W) -> KovoteResult<bool>
where
    I: Iterator<Item = TimedLine>,
    W: Write,
{
    loop {
        writeln!(out, "Type r to retry the submission, q to quit.").context(TerminalSnafu)?;
        let (line, _) = input.next().context(InputClosedSnafu)?;
        match parse_retry(&line) {
            Some(answer) => return Ok(answer),
            None => continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knockout_vote::store::{MemoryStore, MemoryTokenStore};
    use std::time::Duration;

    fn pool() -> Vec<Candidate> {
        [
            ("A", Category::Ai),
            ("B", Category::Sharing),
            ("C", Category::Collaboration),
            ("D", Category::AutonomyAndResponsibility),
            ("E", Category::FieldCustomerValue),
        ]
        .iter()
        .map(|(id, cat)| Candidate::new(CandidateId::from(*id), id, *cat, "nominated"))
        .collect()
    }

    fn rules(ms: u64) -> TournamentRules {
        TournamentRules {
            seed_mode: SeedMode::Fixed(17),
            transition_guard: Duration::from_millis(ms),
        }
    }

    fn lines(ls: &[&str]) -> impl Iterator<Item = TimedLine> {
        let now = Instant::now();
        ls.iter()
            .map(|l| (l.to_string(), now))
            .collect::<Vec<_>>()
            .into_iter()
    }

    fn draw(r: &TournamentRules) -> Vec<Candidate> {
        Tournament::start(&pool(), r.seed_mode)
            .unwrap()
            .seeded_order()
            .to_vec()
    }

    #[test]
    fn keeping_the_champion_elects_the_first_drawn() {
        let r = rules(0);
        let mut store = MemoryStore::with_candidates(pool());
        let mut tokens = MemoryTokenStore::new();
        let mut out: Vec<u8> = Vec::new();

        let record = run_vote_session(
            &mut store,
            &mut tokens,
            &r,
            &mut lines(&["1", "1", "1", "1"]),
            &mut out,
        )
        .unwrap();

        let first = &draw(&r)[0];
        assert_eq!(record.winner_id, first.id);
        assert_eq!(record.category, first.category);
        assert_eq!(store.votes().len(), 1);

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Round 1"));
        assert!(text.contains("Final"));
        assert!(text.contains(&first.name));
    }

    #[test]
    fn always_taking_the_challenger_elects_the_last_drawn() {
        let r = rules(0);
        let mut store = MemoryStore::with_candidates(pool());
        let mut tokens = MemoryTokenStore::new();
        let record = run_vote_session(
            &mut store,
            &mut tokens,
            &r,
            &mut lines(&["2", "hello", "2", "2", "2"]),
            &mut Vec::new(),
        )
        .unwrap();
        assert_eq!(record.winner_id, draw(&r)[4].id);
    }

    #[test]
    fn lines_typed_during_the_transition_are_dropped() {
        let r = rules(50);
        let mut store = MemoryStore::with_candidates(pool());
        let mut tokens = MemoryTokenStore::new();
        let t0 = Instant::now();
        let at = |ms: u64| t0 + Duration::from_millis(ms);
        // The "2" at +10ms is a second press during the first transition.
        let mut input = vec![
            ("1".to_string(), at(0)),
            ("2".to_string(), at(10)),
            ("1".to_string(), at(60)),
            ("1".to_string(), at(120)),
            ("1".to_string(), at(180)),
        ]
        .into_iter();

        let record =
            run_vote_session(&mut store, &mut tokens, &r, &mut input, &mut Vec::new()).unwrap();
        assert_eq!(record.winner_id, draw(&r)[0].id);
    }

    #[test]
    fn failed_submission_is_retried_on_request() {
        let r = rules(0);
        let mut store = MemoryStore::with_candidates(pool());
        store.fail_next_votes(1);
        let mut tokens = MemoryTokenStore::new();
        let mut out: Vec<u8> = Vec::new();

        let record = run_vote_session(
            &mut store,
            &mut tokens,
            &r,
            &mut lines(&["1", "1", "1", "1", "x", "r"]),
            &mut out,
        )
        .unwrap();
        assert_eq!(store.votes(), &[record]);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("could not be saved"));
    }

    #[test]
    fn giving_up_after_a_failed_submission() {
        let r = rules(0);
        let mut store = MemoryStore::with_candidates(pool());
        store.fail_next_votes(5);
        let mut tokens = MemoryTokenStore::new();
        let res = run_vote_session(
            &mut store,
            &mut tokens,
            &r,
            &mut lines(&["1", "1", "1", "1", "q"]),
            &mut Vec::new(),
        );
        assert!(matches!(
            res,
            Err(KovoteError::Tournament {
                source: TournamentError::Persistence { .. }
            })
        ));
        assert!(store.votes().is_empty());
    }

    #[test]
    fn short_pool_stops_before_any_matchup() {
        let mut short = pool();
        short.pop();
        let mut store = MemoryStore::with_candidates(short);
        let mut tokens = MemoryTokenStore::new();
        let mut out: Vec<u8> = Vec::new();
        let res = run_vote_session(
            &mut store,
            &mut tokens,
            &rules(0),
            &mut lines(&["1"]),
            &mut out,
        );
        assert!(matches!(
            res,
            Err(KovoteError::Tournament {
                source: TournamentError::PoolSize { found: 4 }
            })
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn input_closing_mid_vote() {
        let mut store = MemoryStore::with_candidates(pool());
        let mut tokens = MemoryTokenStore::new();
        let res = run_vote_session(
            &mut store,
            &mut tokens,
            &rules(0),
            &mut lines(&["1"]),
            &mut Vec::new(),
        );
        assert!(matches!(res, Err(KovoteError::InputClosed {})));
        assert!(store.votes().is_empty());
    }

    #[test]
    fn admin_commands() {
        let mut store = MemoryStore::new();
        let b = add_candidate(&mut store, "Bob", "Sharing", "ran the study group").unwrap();
        add_candidate(&mut store, "Anna", "AI", "automated the release notes").unwrap();
        add_candidate(&mut store, "Aaron", "sharing", "wrote the wiki").unwrap();

        let names: Vec<String> = list_candidates(&store)
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Anna", "Aaron", "Bob"]);

        assert!(matches!(
            add_candidate(&mut store, "Zed", "Leadership", "x"),
            Err(KovoteError::Tournament {
                source: TournamentError::UnknownCategory { .. }
            })
        ));
        assert!(matches!(
            add_candidate(&mut store, "Zed", "AI", "   "),
            Err(KovoteError::Tournament {
                source: TournamentError::EmptyField { field: "reason" }
            })
        ));

        remove_candidate(&mut store, &b.id).unwrap();
        assert_eq!(list_candidates(&store).unwrap().len(), 2);
        assert!(matches!(
            remove_candidate(&mut store, &b.id),
            Err(KovoteError::Tournament {
                source: TournamentError::Persistence { .. }
            })
        ));
    }
}
