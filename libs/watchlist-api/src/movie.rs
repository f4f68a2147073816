//! Watchlist domain: the movie payload, its partial-update patch and the
//! field rules applied before any write.

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::mutation::{InvalidInput, Mutation, Validator};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieEntry {
    pub title: String,
    pub year: i32,
    #[serde(default)]
    pub watched: bool,
}

impl MovieEntry {
    pub fn new(title: impl Into<String>, year: i32) -> Self {
        Self {
            title: title.into(),
            year,
            watched: false,
        }
    }

    pub fn with_watched(mut self, watched: bool) -> Self {
        self.watched = watched;
        self
    }
}

/// Set-style partial update. Absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoviePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watched: Option<bool>,
}

impl MoviePatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// Patch that overwrites every field with `entry`.
    pub fn replace(entry: MovieEntry) -> Self {
        Self {
            title: Some(entry.title),
            year: Some(entry.year),
            watched: Some(entry.watched),
        }
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_watched(mut self, watched: bool) -> Self {
        self.watched = Some(watched);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.year.is_none() && self.watched.is_none()
    }
}

impl Mutation<MovieEntry> for MoviePatch {
    fn apply(&self, current: &MovieEntry) -> MovieEntry {
        MovieEntry {
            title: self.title.clone().unwrap_or_else(|| current.title.clone()),
            year: self.year.unwrap_or(current.year),
            watched: self.watched.unwrap_or(current.watched),
        }
    }

    fn check(&self) -> Result<(), InvalidInput> {
        let mut invalid = InvalidInput::new();
        if self.is_empty() {
            invalid.push("update", "At least one field must be provided for update");
        }
        invalid.into_result(())
    }
}

fn default_title_max_len() -> usize {
    100
}

fn default_min_year() -> i32 {
    1888
}

fn default_max_years_ahead() -> i32 {
    5
}

/// Field rules for `MovieEntry`, loaded from the `[validation]` config
/// section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieRules {
    /// Maximum title length in characters, after trimming.
    #[serde(default = "default_title_max_len")]
    pub title_max_len: usize,
    /// Earliest accepted release year.
    #[serde(default = "default_min_year")]
    pub min_year: i32,
    /// How far past the current UTC year a release may be announced.
    #[serde(default = "default_max_years_ahead")]
    pub max_years_ahead: i32,
}

impl Default for MovieRules {
    fn default() -> Self {
        Self {
            title_max_len: default_title_max_len(),
            min_year: default_min_year(),
            max_years_ahead: default_max_years_ahead(),
        }
    }
}

impl MovieRules {
    pub fn max_year(&self) -> i32 {
        chrono::Utc::now().year().saturating_add(self.max_years_ahead)
    }
}

impl Validator<MovieEntry> for MovieRules {
    fn validate(&self, candidate: MovieEntry) -> Result<MovieEntry, InvalidInput> {
        let mut invalid = InvalidInput::new();

        let title = candidate.title.trim().to_string();
        if title.is_empty() {
            invalid.push("title", "Movie title is required");
        } else if title.chars().count() > self.title_max_len {
            invalid.push(
                "title",
                format!("Title cannot exceed {} characters", self.title_max_len),
            );
        }

        if candidate.year < self.min_year {
            invalid.push("year", format!("Year must be at least {}", self.min_year));
        } else {
            let max_year = self.max_year();
            if candidate.year > max_year {
                invalid.push("year", format!("Year cannot be later than {max_year}"));
            }
        }

        invalid.into_result(MovieEntry {
            title,
            year: candidate.year,
            watched: candidate.watched,
        })
    }
}
