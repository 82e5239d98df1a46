// Rendering and input parsing for the terminal.

use knockout_vote::{Candidate, Category, Matchup, Stage};

/// Which card of a matchup was chosen.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn of<'a>(&self, matchup: &'a Matchup) -> &'a Candidate {
        match self {
            Side::Left => &matchup.left,
            Side::Right => &matchup.right,
        }
    }
}

pub fn parse_side(line: &str) -> Option<Side> {
    match line.trim() {
        "1" => Some(Side::Left),
        "2" => Some(Side::Right),
        _ => None,
    }
}

/// `Some(true)` to retry, `Some(false)` to quit.
pub fn parse_retry(line: &str) -> Option<bool> {
    match line.trim().to_lowercase().as_str() {
        "r" | "retry" => Some(true),
        "q" | "quit" => Some(false),
        _ => None,
    }
}

fn render_card(idx: usize, c: &Candidate) -> String {
    format!("  [{}] {} ({})\n      {}\n", idx, c.name, c.category, c.reason)
}

pub fn render_matchup(stage: Stage, remaining: u8, matchup: &Matchup) -> String {
    let footer = if remaining == 0 {
        "This is the last matchup!".to_string()
    } else {
        format!("Matchups left after this one: {}", remaining)
    };
    format!(
        "\n=== {} ===\n{}        vs\n{}{}\nYour pick (1 or 2): \n",
        stage,
        render_card(1, &matchup.left),
        render_card(2, &matchup.right),
        footer
    )
}

pub fn render_result(winner: &Candidate) -> String {
    format!(
        "\n*** Your pick ***\n{}\n[{}]\n",
        winner.name, winner.category
    )
}

/// Candidates grouped under their category, in the order given.
pub fn render_candidate_list(candidates: &[Candidate]) -> String {
    if candidates.is_empty() {
        return "No candidates registered.\n".to_string();
    }
    let mut s = String::new();
    let mut current: Option<Category> = None;
    for c in candidates {
        if current != Some(c.category) {
            s.push_str(&format!("{}\n", c.category));
            current = Some(c.category);
        }
        s.push_str(&format!("  {}  {}: {}\n", c.id, c.name, c.reason));
    }
    s.push_str(&format!("{} candidate(s)\n", candidates.len()));
    s
}
