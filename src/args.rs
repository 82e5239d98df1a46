use clap::{Parser, Subcommand};

/// A five-candidate knockout vote: pick the better of two, four times, and one vote is recorded.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON configuration file. See the manual for the accepted keys.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) The JSON store holding candidates and votes. Overrides `storePath` from the
    /// configuration file.
    #[clap(short, long, value_parser)]
    pub store: Option<String>,

    /// (file path) Where the voter token is kept. Overrides `voterTokenPath`.
    #[clap(long, value_parser)]
    pub token_file: Option<String>,

    /// (milliseconds) How long input is ignored after each pick. Overrides `transitionGuardMs`.
    #[clap(long, value_parser)]
    pub transition_ms: Option<u64>,

    /// (number) Seed for the draw order, for reproducible runs. Overrides `randomSeed`.
    #[clap(long, value_parser)]
    pub seed: Option<u64>,

    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Runs the knockout and records the final pick.
    Vote,
    /// Lists the registered candidates, by category.
    List,
    /// Registers a candidate.
    Add {
        #[clap(long, value_parser)]
        name: String,
        /// One of: AI, Sharing, Collaboration, Autonomy-and-Responsibility, Field-Customer-Value
        #[clap(long, value_parser)]
        category: String,
        /// Why this candidate is nominated.
        #[clap(long, value_parser)]
        reason: String,
    },
    /// Removes a candidate by id.
    Remove {
        #[clap(long, value_parser)]
        id: String,
    },
}
