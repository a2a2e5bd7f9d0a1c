use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

pub const MIN_YEAR: u16 = 1900;
pub const MAX_YEAR: u16 = 2024;
pub const MAX_RATE: f64 = 10.0;

/// A stored movie. Every instance held by the store satisfies the full schema.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Movie {
    /// Assigned once at creation, never changed afterwards
    pub id: String,
    pub title: String,
    pub year: u16,
    pub director: String,
    /// Minutes
    pub duration: u32,
    #[serde(serialize_with = "serialize_rate")]
    pub rate: f64,
    pub poster: String,
    pub genre: Vec<String>,
}

/// A fully validated movie that has not been given an id yet.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct MovieDraft {
    pub title: String,
    pub year: u16,
    pub director: String,
    pub duration: u32,
    #[serde(default)]
    pub rate: f64,
    pub poster: String,
    pub genre: Vec<String>,
}

/// Sparse update. Absent fields keep their stored value.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct PartialMovie {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<Vec<String>>,
}

impl Movie {
    pub fn new(draft: MovieDraft) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), draft)
    }

    pub fn with_id(id: String, draft: MovieDraft) -> Self {
        let MovieDraft { title, year, director, duration, rate, poster, genre } = draft;
        Self { id, title, year, director, duration, rate, poster, genre }
    }

    /// Overlays the present fields of `delta`. The id is untouched.
    pub fn apply(&mut self, delta: PartialMovie) {
        let PartialMovie { title, year, director, duration, rate, poster, genre } = delta;

        if let Some(title) = title { self.title = title; }
        if let Some(year) = year { self.year = year; }
        if let Some(director) = director { self.director = director; }
        if let Some(duration) = duration { self.duration = duration; }
        if let Some(rate) = rate { self.rate = rate; }
        if let Some(poster) = poster { self.poster = poster; }
        if let Some(genre) = genre { self.genre = genre; }
    }

    /// Case-insensitive tag match.
    pub fn has_genre(&self, genre: &str) -> bool {
        let needle = genre.to_lowercase();
        self.genre.iter().any(|g| g.to_lowercase() == needle)
    }
}

impl PartialMovie {
    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Whole-number rates go out as integers (`5`, not `5.0`).
fn serialize_rate<S: Serializer>(rate: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if rate.is_finite() && rate.fract() == 0.0 && rate.abs() <= i64::MAX as f64 {
        serializer.serialize_i64(*rate as i64)
    } else {
        serializer.serialize_f64(*rate)
    }
}
