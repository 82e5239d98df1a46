// Store adapters backed by local files.

use chrono::Utc;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use knockout_vote::store::{
    CandidateNotFoundSnafu, CandidateStore, StoreResult, VoterTokenStore,
};
use knockout_vote::{Candidate, CandidateId, NewCandidate, VoteRecord, VoterToken};

/// The whole content of the store file.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreDocument {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub votes: Vec<VoteRecord>,
}

/// Candidates and votes in one JSON document. A missing file is an empty store.
///
/// Every operation reads the file again, so edits made by another process
/// between two commands are picked up.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: &str) -> JsonFileStore {
        JsonFileStore {
            path: PathBuf::from(path),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> StoreResult<StoreDocument> {
        if !self.path.exists() {
            debug!("store {:?} does not exist yet", self.path);
            return Ok(StoreDocument::default());
        }
        let contents: StoreResult<String> = fs::read_to_string(&self.path)
            .with_whatever_context(|_| format!("could not read store {}", self.path.display()));
        serde_json::from_str(contents?.as_str())
            .with_whatever_context(|_| format!("store {} is not valid", self.path.display()))
    }

    fn write(&self, doc: &StoreDocument) -> StoreResult<()> {
        let js: StoreResult<String> =
            serde_json::to_string_pretty(doc).whatever_context("could not serialize the store");
        replace_file(&self.path, js?.as_bytes())
    }
}

/// Writes `contents` to a temporary file next to `path`, then renames it over
/// `path`. Readers see either the previous file or the new one, never a
/// truncated one.
fn replace_file(path: &Path, contents: &[u8]) -> StoreResult<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp: StoreResult<NamedTempFile> = NamedTempFile::new_in(dir)
        .with_whatever_context(|_| format!("could not create a file in {}", dir.display()));
    let mut tmp = tmp?;
    let written: StoreResult<()> = tmp
        .write_all(contents)
        .and_then(|_| tmp.as_file().sync_all())
        .with_whatever_context(|_| format!("could not write {}", tmp.path().display()));
    written?;
    tmp.persist(path)
        .map(|_| ())
        .with_whatever_context(|_| format!("could not replace {}", path.display()))
}

impl CandidateStore for JsonFileStore {
    fn list_candidates(&self) -> StoreResult<Vec<Candidate>> {
        Ok(self.read()?.candidates)
    }

    fn insert_candidate(&mut self, candidate: NewCandidate) -> StoreResult<Candidate> {
        let mut doc = self.read()?;
        let c = Candidate {
            id: CandidateId::generate(),
            name: candidate.name,
            category: candidate.category,
            reason: candidate.reason,
            created_at: Utc::now(),
        };
        doc.candidates.push(c.clone());
        self.write(&doc)?;
        info!("{:?}: inserted candidate {}", self.path, c.id);
        Ok(c)
    }

    fn delete_candidate(&mut self, id: &CandidateId) -> StoreResult<()> {
        let mut doc = self.read()?;
        let before = doc.candidates.len();
        doc.candidates.retain(|c| c.id != *id);
        ensure!(
            doc.candidates.len() < before,
            CandidateNotFoundSnafu { id: id.clone() }
        );
        self.write(&doc)
    }

    fn insert_vote(&mut self, vote: &VoteRecord) -> StoreResult<()> {
        let mut doc = self.read()?;
        doc.votes.push(vote.clone());
        self.write(&doc)?;
        debug!("{:?}: {} vote(s) stored", self.path, doc.votes.len());
        Ok(())
    }
}

/// The voter token, kept as the only line of a small text file.
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: &str) -> TokenFile {
        TokenFile {
            path: PathBuf::from(path),
        }
    }
}

impl VoterTokenStore for TokenFile {
    fn get_voter_token(&self) -> StoreResult<Option<VoterToken>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents: StoreResult<String> = fs::read_to_string(&self.path)
            .with_whatever_context(|_| {
                format!("could not read voter token {}", self.path.display())
            });
        let contents = contents?;
        let token = contents.trim();
        if token.is_empty() {
            Ok(None)
        } else {
            Ok(Some(VoterToken(token.to_string())))
        }
    }

    fn set_voter_token(&mut self, token: &VoterToken) -> StoreResult<()> {
        replace_file(&self.path, format!("{}\n", token).as_bytes())
    }
}
