use crate::args::Args;
use crate::kovote::*;

use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

pub const DEFAULT_TOKEN_PATH: &str = ".kovote_token";

/// The optional JSON configuration file.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct KovoteConfig {
    #[serde(rename = "storePath")]
    pub store_path: Option<String>,
    #[serde(rename = "voterTokenPath")]
    pub voter_token_path: Option<String>,
    #[serde(rename = "transitionGuardMs")]
    pub transition_guard_ms: Option<u64>,
    #[serde(rename = "randomSeed")]
    pub random_seed: Option<u64>,
}

/// Everything a command needs, once the flags and the file are merged.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Settings {
    pub store_path: String,
    pub voter_token_path: String,
    pub rules: TournamentRules,
}

pub fn read_config(path: &str) -> KovoteResult<KovoteConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    debug!("read config: {:?}", contents);
    serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })
}

/// Flags take precedence over the configuration file.
pub fn resolve_settings(args: &Args, file: Option<KovoteConfig>) -> KovoteResult<Settings> {
    let file = file.unwrap_or_default();
    let store_path = match args.store.clone().or(file.store_path) {
        Some(p) if !p.trim().is_empty() => p,
        _ => whatever!("No store given: pass --store or set storePath in the configuration"),
    };
    let voter_token_path = args
        .token_file
        .clone()
        .or(file.voter_token_path)
        .unwrap_or_else(|| DEFAULT_TOKEN_PATH.to_string());
    let transition_guard = args
        .transition_ms
        .or(file.transition_guard_ms)
        .map(Duration::from_millis)
        .unwrap_or(TournamentRules::DEFAULT_RULES.transition_guard);
    let seed_mode = match args.seed.or(file.random_seed) {
        Some(seed) => SeedMode::Fixed(seed),
        None => SeedMode::Random,
    };
    Ok(Settings {
        store_path,
        voter_token_path,
        rules: TournamentRules {
            seed_mode,
            transition_guard,
        },
    })
}
