pub mod model;
pub mod schema;
pub mod query;
pub mod error;
pub mod seed;
pub mod config;
pub mod server;

use std::fmt;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::model::{Movie, MovieDraft, PartialMovie};
use crate::query::ListQuery;

/// In-memory, insertion-ordered movie collection.
///
/// Every operation holds the lock for its full duration, so a lookup and the
/// mutation that follows it can never interleave with another writer.
pub struct MovieStore {
    movies: RwLock<Vec<Movie>>,
}

impl fmt::Debug for MovieStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MovieStore")
        .field("movie_count", &self.len())
        .finish()
    }
}

impl Default for MovieStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MovieStore {
    pub fn new() -> Self {
        Self::from_seed(Vec::new())
    }

    /// Seed records are trusted to be valid and uniquely keyed (see [`seed`]).
    pub fn from_seed(movies: Vec<Movie>) -> Self {
        Self { movies: RwLock::new(movies) }
    }

    /// Still answers after a writer panicked; the count itself cannot be torn.
    pub fn len(&self) -> usize {
        self.movies.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // --- READS ---

    pub fn list(&self) -> Result<Vec<Movie>, StoreError> {
        let movies = self.movies.read().map_err(|_| StoreError::Poisoned)?;
        Ok(movies.clone())
    }

    pub fn query(&self, query: &ListQuery) -> Result<Vec<Movie>, StoreError> {
        match query {
            ListQuery::All => self.list(),
            ListQuery::Genre(genre) => self.filter_by_genre(genre),
            ListQuery::Page { page, size } => self.paginate(*page, *size),
        }
    }

    pub fn filter_by_genre(&self, genre: &str) -> Result<Vec<Movie>, StoreError> {
        let movies = self.movies.read().map_err(|_| StoreError::Poisoned)?;
        let matched: Vec<Movie> = movies.iter().filter(|m| m.has_genre(genre)).cloned().collect();
        debug!("Genre '{}' matched {} movies", genre, matched.len());
        Ok(matched)
    }

    /// 1-indexed page of `size` movies in store order.
    pub fn paginate(&self, page: u64, size: usize) -> Result<Vec<Movie>, StoreError> {
        let not_enough = || StoreError::NotEnoughData { page, size };

        let start = page
            .checked_sub(1)
            .and_then(|p| usize::try_from(p).ok())
            .and_then(|p| p.checked_mul(size))
            .ok_or_else(not_enough)?;

        let movies = self.movies.read().map_err(|_| StoreError::Poisoned)?;
        if start >= movies.len() {
            return Err(not_enough());
        }
        let end = start.saturating_add(size).min(movies.len());
        Ok(movies[start..end].to_vec())
    }

    pub fn get(&self, id: &str) -> Result<Movie, StoreError> {
        let movies = self.movies.read().map_err(|_| StoreError::Poisoned)?;
        movies
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    // --- WRITES ---

    pub fn create(&self, draft: MovieDraft) -> Result<Movie, StoreError> {
        let movie = Movie::new(draft);
        let mut movies = self.movies.write().map_err(|_| StoreError::Poisoned)?;
        movies.push(movie.clone());
        info!("Created movie {} ('{}')", movie.id, movie.title);
        Ok(movie)
    }

    /// Removes the first match; later movies shift left.
    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut movies = self.movies.write().map_err(|_| StoreError::Poisoned)?;
        let index = movies
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        let removed = movies.remove(index);
        info!("Deleted movie {} ('{}')", removed.id, removed.title);
        Ok(())
    }

    /// Overlays `delta` onto the stored movie in place.
    pub fn update_partial(&self, id: &str, delta: PartialMovie) -> Result<Movie, StoreError> {
        let mut movies = self.movies.write().map_err(|_| StoreError::Poisoned)?;
        let movie = movies
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        movie.apply(delta);
        info!("Updated movie {}", movie.id);
        Ok(movie.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn movie(id: &str, genre: &[&str]) -> Movie {
        Movie::with_id(
            id.to_string(),
            MovieDraft {
                title: format!("Movie {}", id),
                year: 2000,
                director: "D".into(),
                duration: 90,
                rate: 5.0,
                poster: format!("http://x/{}.jpg", id),
                genre: genre.iter().map(|g| g.to_string()).collect(),
            },
        )
    }

    fn store(n: usize) -> MovieStore {
        MovieStore::from_seed((1..=n).map(|i| movie(&i.to_string(), &["Drama"])).collect())
    }

    fn ids(movies: &[Movie]) -> Vec<&str> {
        movies.iter().map(|m| m.id.as_str()).collect()
    }

    fn draft() -> MovieDraft {
        MovieDraft {
            title: "New".into(),
            year: 2010,
            director: "N".into(),
            duration: 100,
            rate: 0.0,
            poster: "https://x/new.jpg".into(),
            genre: vec!["Sci-Fi".into()],
        }
    }

    #[test]
    fn list_preserves_order() {
        let s = store(3);
        assert_eq!(ids(&s.list().unwrap()), vec!["1", "2", "3"]);
    }

    #[test]
    fn create_appends_with_fresh_id() {
        let s = store(2);
        let created = s.create(draft()).unwrap();

        assert!(!created.id.is_empty());
        assert!(s.list().unwrap().iter().filter(|m| m.id == created.id).count() == 1);
        assert_eq!(s.list().unwrap().last().unwrap(), &created);
        assert_eq!(s.get(&created.id).unwrap(), created);
    }

    #[test]
    fn create_twice_yields_distinct_ids() {
        let s = MovieStore::new();
        let a = s.create(draft()).unwrap();
        let b = s.create(draft()).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn get_missing() {
        let s = store(1);
        assert_eq!(s.get("nope"), Err(StoreError::NotFound { id: "nope".into() }));
    }

    #[test]
    fn filter_by_genre_any_tag_ignoring_case() {
        let s = MovieStore::from_seed(vec![
            movie("1", &["Drama"]),
            movie("2", &["Action", "Crime"]),
            movie("3", &["crime"]),
        ]);
        assert_eq!(ids(&s.filter_by_genre("CRIME").unwrap()), vec!["2", "3"]);
        assert_eq!(ids(&s.filter_by_genre("drama").unwrap()), vec!["1"]);
        assert!(s.filter_by_genre("Western").unwrap().is_empty());
    }

    #[test]
    fn paginate_windows() {
        let s = store(10);
        assert_eq!(ids(&s.paginate(1, 4).unwrap()), vec!["1", "2", "3", "4"]);
        assert_eq!(ids(&s.paginate(2, 4).unwrap()), vec!["5", "6", "7", "8"]);
        assert_eq!(ids(&s.paginate(3, 4).unwrap()), vec!["9", "10"]);
    }

    #[test]
    fn paginate_past_end() {
        let s = store(10);
        assert_eq!(s.paginate(4, 4), Err(StoreError::NotEnoughData { page: 4, size: 4 }));
        assert!(s.paginate(0, 4).is_err());
        assert!(s.paginate(u64::MAX, usize::MAX).is_err());
        assert!(MovieStore::new().paginate(1, 4).is_err());
    }

    #[test]
    fn delete_shifts_and_shrinks() {
        let s = store(3);
        s.delete("2").unwrap();
        assert_eq!(ids(&s.list().unwrap()), vec!["1", "3"]);
        assert!(matches!(s.get("2"), Err(StoreError::NotFound { .. })));
        assert!(matches!(s.delete("2"), Err(StoreError::NotFound { .. })));
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn update_in_place() {
        let s = store(3);
        let updated = s
            .update_partial("2", PartialMovie { title: Some("Renamed".into()), ..Default::default() })
            .unwrap();

        assert_eq!(updated.id, "2");
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.year, 2000);
        assert_eq!(s.list().unwrap()[1], updated);
    }

    #[test]
    fn update_with_empty_delta_is_noop() {
        let s = store(1);
        let before = s.get("1").unwrap();
        let after = s.update_partial("1", PartialMovie::default()).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn update_missing() {
        let s = store(1);
        let res = s.update_partial("9", PartialMovie::default());
        assert_eq!(res, Err(StoreError::NotFound { id: "9".into() }));
    }

    #[test]
    fn query_dispatch() {
        let s = store(5);
        assert_eq!(s.query(&ListQuery::All).unwrap().len(), 5);
        assert_eq!(s.query(&ListQuery::Genre("drama".into())).unwrap().len(), 5);
        assert_eq!(ids(&s.query(&ListQuery::Page { page: 2, size: 2 }).unwrap()), vec!["3", "4"]);
    }

    #[test]
    fn poisoned_lock_is_reported() {
        let s = store(3);
        let _ = std::thread::scope(|scope| {
            scope
                .spawn(|| {
                    let _guard = s.movies.write().unwrap();
                    panic!("writer died");
                })
                .join()
        });

        assert!(s.movies.is_poisoned());
        assert_eq!(s.list(), Err(StoreError::Poisoned));
        assert_eq!(s.create(draft()), Err(StoreError::Poisoned));
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn concurrent_writers_never_lose_records() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 50;

        let s = store(5);
        let survivors: Vec<Vec<String>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|t| {
                    let s = &s;
                    scope.spawn(move || {
                        let created: Vec<String> = (0..PER_THREAD)
                            .map(|_| s.create(draft()).unwrap().id)
                            .collect();
                        for id in created.iter().step_by(3) {
                            let delta = PartialMovie { title: Some(format!("T{}", t)), ..Default::default() };
                            s.update_partial(id, delta).unwrap();
                        }
                        let (gone, kept): (Vec<_>, Vec<_>) =
                            created.into_iter().enumerate().partition(|(i, _)| i % 2 == 0);
                        for (_, id) in &gone {
                            s.delete(id).unwrap();
                            assert!(matches!(s.get(id), Err(StoreError::NotFound { .. })));
                        }
                        kept.into_iter().map(|(_, id)| id).collect::<Vec<String>>()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let all = s.list().unwrap();
        let kept: usize = survivors.iter().map(Vec::len).sum();
        assert_eq!(kept, THREADS * PER_THREAD / 2);
        assert_eq!(all.len(), 5 + kept);
        assert_eq!(s.len(), all.len());

        let unique: HashSet<&str> = all.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(unique.len(), all.len());
        for id in survivors.iter().flatten() {
            assert_eq!(all.iter().filter(|m| &m.id == id).count(), 1);
        }
        assert_eq!(ids(&all[..5]), vec!["1", "2", "3", "4", "5"]);
    }
}
