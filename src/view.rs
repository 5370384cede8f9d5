use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogApi, CatalogError, MovieSummary};

const POSTER_BASE: &str = "https://image.tmdb.org/t/p/w500";

/// Where the view is in its fetch lifecycle. The committed movie list is
/// held next to the phase rather than inside `Loaded`, so a failed refresh
/// reports itself without clobbering the last good list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchPhase {
    NotStarted,
    Loading,
    Loaded,
    Failed(String),
}

/// Identity of one issued fetch. Only the most recently issued token may
/// commit its resolution; anything older resolves into a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchToken(u64);

pub struct MovieListView {
    catalog: Arc<dyn CatalogApi>,
    movies: Vec<MovieSummary>,
    phase: FetchPhase,
    fetched_at: Option<DateTime<Utc>>,
    last_issued: u64,
    current: Option<u64>,
}

impl MovieListView {
    pub fn new(catalog: Arc<dyn CatalogApi>) -> Self {
        Self {
            catalog,
            movies: Vec::new(),
            phase: FetchPhase::NotStarted,
            fetched_at: None,
            last_issued: 0,
            current: None,
        }
    }

    /// One activation = exactly one fetch, begun and applied here.
    pub async fn activate(&mut self) {
        let token = self.begin_fetch();
        let outcome = self.catalog.fetch_popular().await;
        self.apply(token, outcome);
    }

    pub fn begin_fetch(&mut self) -> FetchToken {
        self.last_issued += 1;
        self.current = Some(self.last_issued);
        self.phase = FetchPhase::Loading;
        FetchToken(self.last_issued)
    }

    /// Commits a fetch resolution. Returns false when the token has been
    /// superseded (a newer fetch was issued, the token was already applied,
    /// or the view was deactivated) and the resolution was dropped.
    pub fn apply(
        &mut self,
        token: FetchToken,
        outcome: Result<Vec<MovieSummary>, CatalogError>,
    ) -> bool {
        if self.current != Some(token.0) {
            debug!("Dropping resolution for superseded fetch (token {})", token.0);
            return false;
        }
        self.current = None;
        match outcome {
            Ok(movies) => {
                info!("Loaded {} popular movies", movies.len());
                self.movies = movies;
                self.phase = FetchPhase::Loaded;
                self.fetched_at = Some(Utc::now());
            }
            Err(err) => {
                warn!("Failed to load popular movies: {err}");
                self.phase = FetchPhase::Failed(err.to_string());
            }
        }
        true
    }

    pub fn deactivate(&mut self) {
        self.current = None;
        self.movies.clear();
        self.phase = FetchPhase::NotStarted;
        self.fetched_at = None;
    }

    pub fn phase(&self) -> &FetchPhase {
        &self.phase
    }

    pub fn movies(&self) -> &[MovieSummary] {
        &self.movies
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    pub fn cards(&self) -> Vec<Card> {
        self.movies.iter().map(Card::from_summary).collect()
    }
}

/// Render projection of one movie, in list order, keyed by catalog id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card {
    pub key: i32,
    pub title: String,
    pub poster_url: Option<String>,
    pub release_date: String,
    pub rating: String,
}

impl Card {
    fn from_summary(movie: &MovieSummary) -> Self {
        Self {
            key: movie.id,
            title: movie.title.clone(),
            poster_url: movie
                .poster_path
                .as_ref()
                .map(|p| format!("{POSTER_BASE}{p}")),
            release_date: movie.release_date.clone(),
            rating: format_rating(movie.vote_average),
        }
    }
}

pub fn format_rating(vote_average: f32) -> String {
    format!("{vote_average}/10")
}
