//! Startup dataset.
//!
//! Seed entries carry their own `id` and must otherwise satisfy the full
//! movie schema, so the store never starts in a partially valid state.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::model::Movie;
use crate::schema::{self, ValidationError};

/// Compiled into the binary; used when no seed file is configured.
pub const BUNDLED_SEED: &str = include_str!("../data/movies.json");

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("could not read seed file {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("seed is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("seed must be a JSON array of movies")]
    NotAnArray,

    #[error("seed entry {index} has no string id")]
    MissingId { index: usize },

    #[error("seed entry {index} repeats id {id}")]
    DuplicateId { index: usize, id: String },

    #[error("seed entry {index}: {source}")]
    Invalid { index: usize, source: ValidationError },
}

/// Loads `path`, or the bundled dataset when `path` is `None`.
pub fn load(path: Option<&Path>) -> Result<Vec<Movie>, SeedError> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let movies = parse(&raw)?;
            info!("Loaded {} seed movies from {}", movies.len(), path.display());
            Ok(movies)
        }
        None => {
            let movies = parse(BUNDLED_SEED)?;
            info!("Loaded {} bundled seed movies", movies.len());
            Ok(movies)
        }
    }
}

pub fn parse(raw: &str) -> Result<Vec<Movie>, SeedError> {
    let entries = match serde_json::from_str::<Value>(raw)? {
        Value::Array(entries) => entries,
        _ => return Err(SeedError::NotAnArray),
    };

    let mut seen = HashSet::new();
    let mut movies = Vec::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        let id = match entry.get("id").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => return Err(SeedError::MissingId { index }),
        };
        if !seen.insert(id.clone()) {
            return Err(SeedError::DuplicateId { index, id });
        }

        let draft = schema::validate_full(entry).map_err(|source| SeedError::Invalid { index, source })?;
        movies.push(Movie::with_id(id, draft));
    }

    Ok(movies)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_seed_is_valid() {
        let movies = parse(BUNDLED_SEED).unwrap();
        assert!(!movies.is_empty());
        assert!(movies.iter().all(|m| !m.id.is_empty()));
    }

    #[test]
    fn keeps_seed_ids_and_order() {
        let raw = r#"[
            {"id":"1","title":"A","year":2000,"director":"D","duration":90,"rate":5,"poster":"http://x/a.jpg","genre":["Drama"]},
            {"id":"2","title":"B","year":2001,"director":"E","duration":80,"poster":"http://x/b.jpg","genre":[]}
        ]"#;
        let movies = parse(raw).unwrap();
        assert_eq!(movies[0].id, "1");
        assert_eq!(movies[1].id, "2");
        assert_eq!(movies[1].rate, 0.0);
    }

    #[test]
    fn rejects_missing_id() {
        let raw = r#"[{"title":"A","year":2000,"director":"D","duration":90,"poster":"http://x/a.jpg","genre":[]}]"#;
        assert!(matches!(parse(raw), Err(SeedError::MissingId { index: 0 })));
    }

    #[test]
    fn rejects_duplicate_id() {
        let one = r#"{"id":"1","title":"A","year":2000,"director":"D","duration":90,"poster":"http://x/a.jpg","genre":[]}"#;
        let raw = format!("[{},{}]", one, one);
        assert!(matches!(parse(&raw), Err(SeedError::DuplicateId { index: 1, .. })));
    }

    #[test]
    fn rejects_invalid_entry() {
        let raw = r#"[{"id":"1","title":"A","year":1800,"director":"D","duration":90,"poster":"http://x/a.jpg","genre":[]}]"#;
        match parse(raw) {
            Err(SeedError::Invalid { index, source }) => {
                assert_eq!(index, 0);
                assert_eq!(source.issues[0].field(), Some("year"));
            }
            other => panic!("expected invalid entry, got {:?}", other),
        }
    }

    #[test]
    fn rejects_non_array() {
        assert!(matches!(parse("{}"), Err(SeedError::NotAnArray)));
        assert!(matches!(parse("nope"), Err(SeedError::Json(_))));
    }

    #[test]
    fn load_missing_file() {
        let err = load(Some(Path::new("/definitely/not/here.json"))).unwrap_err();
        assert!(matches!(err, SeedError::Io { .. }));
    }
}
