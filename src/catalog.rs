use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::env;
use thiserror::Error;

pub const TMDB_BASE: &str = "https://api.themoviedb.org/3";

#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn fetch_popular(&self) -> Result<Vec<MovieSummary>, CatalogError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovieSummary {
    pub id: i32,
    pub title: String,
    pub poster_path: Option<String>,
    pub release_date: String,
    pub vote_average: f32,
}

// Error messages carry the endpoint path, never the full URL: the request
// URL includes the api_key query parameter and must stay out of logs.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("request to {endpoint} failed: {source}")]
    Network {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned HTTP {status}")]
    Upstream { endpoint: &'static str, status: u16 },
    #[error("{endpoint} returned an unusable body: {reason}")]
    Malformed {
        endpoint: &'static str,
        reason: String,
    },
}

impl CatalogClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_key = env::var("TMDB_API_KEY").context("TMDB_API_KEY not set")?;
        let base_url = env::var("CATALOG_BASE_URL").unwrap_or_else(|_| TMDB_BASE.to_string());
        Ok(Self::new(base_url, api_key))
    }
}

#[async_trait]
impl CatalogApi for CatalogClient {
    async fn fetch_popular(&self) -> Result<Vec<MovieSummary>, CatalogError> {
        let endpoint = "movie/popular";
        let url = format!(
            "{}/{endpoint}?api_key={}",
            self.base_url,
            urlencoding::encode(&self.api_key)
        );
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CatalogError::Network {
                endpoint,
                // reqwest embeds the full URL in its errors
                source: e.without_url(),
            })?;
        let status = res.status();
        if !status.is_success() {
            return Err(CatalogError::Upstream {
                endpoint,
                status: status.as_u16(),
            });
        }
        let text = res.text().await.map_err(|e| CatalogError::Network {
            endpoint,
            source: e.without_url(),
        })?;
        parse_popular(&text).map_err(|e| CatalogError::Malformed {
            endpoint,
            reason: e.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct PopularResponse {
    results: Vec<PopularEntry>,
}

#[derive(Debug, Deserialize)]
struct PopularEntry {
    id: i32,
    title: String,
    poster_path: Option<String>,
    #[serde(default)]
    release_date: String,
    #[serde(default)]
    vote_average: f32,
}

fn parse_popular(body: &str) -> Result<Vec<MovieSummary>, serde_json::Error> {
    let parsed: PopularResponse = serde_json::from_str(body)?;
    Ok(parsed
        .results
        .into_iter()
        .map(|e| MovieSummary {
            id: e.id,
            title: e.title,
            poster_path: e.poster_path,
            release_date: e.release_date,
            vote_average: e.vote_average,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_entry() {
        let body = r#"{"results":[{"id":1,"title":"Alpha","poster_path":"/a.jpg","release_date":"2020-01-01","vote_average":8.1}]}"#;
        let movies = parse_popular(body).unwrap();
        assert_eq!(
            movies,
            vec![MovieSummary {
                id: 1,
                title: "Alpha".to_string(),
                poster_path: Some("/a.jpg".to_string()),
                release_date: "2020-01-01".to_string(),
                vote_average: 8.1,
            }]
        );
    }

    #[test]
    fn parses_empty_results() {
        let movies = parse_popular(r#"{"results":[]}"#).unwrap();
        assert!(movies.is_empty());
    }

    #[test]
    fn keeps_absent_poster_as_none() {
        let body = r#"{"results":[{"id":2,"title":"Beta","poster_path":null,"release_date":"","vote_average":0}]}"#;
        let movies = parse_popular(body).unwrap();
        assert_eq!(movies[0].poster_path, None);
        assert_eq!(movies[0].vote_average, 0.0);
    }

    #[test]
    fn ignores_extra_top_level_fields() {
        let body = r#"{"page":1,"total_pages":500,"results":[{"id":3,"title":"Gamma","poster_path":null}],"total_results":10000}"#;
        let movies = parse_popular(body).unwrap();
        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].release_date, "");
    }

    #[test]
    fn missing_results_is_an_error() {
        assert!(parse_popular("{}").is_err());
        assert!(parse_popular(r#"{"results":42}"#).is_err());
        assert!(parse_popular("not json").is_err());
    }
}
