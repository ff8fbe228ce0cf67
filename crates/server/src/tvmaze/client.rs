//! Reqwest-backed TVMaze client.
//!
//! Owns transport details only: URL building, request timeout, status mapping
//! and JSON decoding.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument};
use tvguide_core::ShowId;
use url::Url;

use super::{SearchResult, ScheduleItem, Show, ShowCatalog, TvMazeError};
use crate::config::TvMazeConfig;

const USER_AGENT: &str = concat!("tvguide-server/", env!("CARGO_PKG_VERSION"));

/// TVMaze REST API client.
#[derive(Debug, Clone)]
pub struct TvMazeClient {
    client: Client,
    base_url: Url,
}

impl TvMazeClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &TvMazeConfig) -> Result<Self, TvMazeError> {
        Self::with_base_url(config.base_url.clone(), config.timeout)
    }

    /// Create a client against an explicit base URL.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build or the URL cannot
    /// carry a path.
    pub fn with_base_url(base_url: Url, timeout: Duration) -> Result<Self, TvMazeError> {
        if base_url.cannot_be_a_base() {
            return Err(TvMazeError::InvalidBaseUrl(base_url.to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Append path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, TvMazeError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| TvMazeError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET a JSON resource. A 404 yields `Ok(None)`.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>, TvMazeError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(TvMazeError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "TVMaze returned non-success status"
            );
            return Err(TvMazeError::Api {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|e| TvMazeError::Parse(e.to_string()))
    }
}

#[async_trait]
impl ShowCatalog for TvMazeClient {
    #[instrument(skip(self))]
    async fn search_shows(&self, query: &str) -> Result<Vec<SearchResult>, TvMazeError> {
        let mut url = self.endpoint(&["search", "shows"])?;
        url.query_pairs_mut().append_pair("q", query);

        let results: Vec<SearchResult> = self.get_json(url).await?.unwrap_or_default();
        debug!(count = results.len(), "Search completed");
        Ok(results)
    }

    #[instrument(skip(self), fields(show_id = %id))]
    async fn show_details(&self, id: ShowId) -> Result<Option<Show>, TvMazeError> {
        let url = self.endpoint(&["shows", &id.to_string()])?;
        let show = self.get_json(url).await?;
        if show.is_none() {
            debug!("Show not found");
        }
        Ok(show)
    }

    #[instrument(skip(self))]
    async fn shows_by_page(&self, page: u32) -> Result<Vec<Show>, TvMazeError> {
        let mut url = self.endpoint(&["shows"])?;
        url.query_pairs_mut().append_pair("page", &page.to_string());

        // TVMaze answers 404 past the last page
        Ok(self.get_json(url).await?.unwrap_or_default())
    }

    #[instrument(skip(self))]
    async fn web_schedule(
        &self,
        date: NaiveDate,
        country: &str,
    ) -> Result<Vec<ScheduleItem>, TvMazeError> {
        let mut url = self.endpoint(&["schedule", "web"])?;
        url.query_pairs_mut()
            .append_pair("date", &date.format("%Y-%m-%d").to_string())
            .append_pair("country", country);

        Ok(self.get_json(url).await?.unwrap_or_default())
    }

    #[instrument(skip(self), fields(show_id = %id))]
    async fn show_with_episodes_and_cast(&self, id: ShowId) -> Result<Option<Show>, TvMazeError> {
        let mut url = self.endpoint(&["shows", &id.to_string()])?;
        url.query_pairs_mut()
            .append_pair("embed[]", "episodes")
            .append_pair("embed[]", "cast");

        self.get_json(url).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::HashMap;

    use axum::{
        Json, Router,
        extract::{Path, Query},
        http::StatusCode as AxumStatus,
        response::IntoResponse,
        routing::get,
    };
    use serde_json::json;

    use super::*;

    async fn fake_show(Path(id): Path<i64>, Query(params): Query<Vec<(String, String)>>) -> axum::response::Response {
        match id {
            404 => AxumStatus::NOT_FOUND.into_response(),
            500 => (AxumStatus::INTERNAL_SERVER_ERROR, "upstream exploded").into_response(),
            429 => AxumStatus::TOO_MANY_REQUESTS.into_response(),
            _ => {
                let embeds: Vec<String> = params
                    .into_iter()
                    .filter(|(k, _)| k == "embed[]")
                    .map(|(_, v)| v)
                    .collect();
                let mut show = json!({ "id": id, "name": format!("Show {id}") });
                if !embeds.is_empty() {
                    show["_embedded"] = json!({ "episodes": [], "cast": [] });
                }
                Json(show).into_response()
            }
        }
    }

    async fn fake_search(Query(params): Query<HashMap<String, String>>) -> Json<serde_json::Value> {
        let q = params.get("q").cloned().unwrap_or_default();
        Json(json!([{ "score": 0.9, "show": { "id": 1, "name": q } }]))
    }

    async fn fake_index(Query(params): Query<HashMap<String, String>>) -> axum::response::Response {
        match params.get("page").map(String::as_str) {
            Some("0") => Json(json!([{ "id": 1, "name": "A" }, { "id": 2, "name": "B" }])).into_response(),
            _ => AxumStatus::NOT_FOUND.into_response(),
        }
    }

    async fn fake_schedule(Query(params): Query<HashMap<String, String>>) -> Json<serde_json::Value> {
        Json(json!([{
            "id": 10,
            "name": format!("{} {}", params["date"], params["country"]),
            "season": 1,
            "number": 1,
            "_embedded": { "show": { "id": 5, "name": "Streamed" } }
        }]))
    }

    async fn spawn_fake_tvmaze() -> TvMazeClient {
        let app = Router::new()
            .route("/api/shows", get(fake_index))
            .route("/api/shows/{id}", get(fake_show))
            .route("/api/search/shows", get(fake_search))
            .route("/api/schedule/web", get(fake_schedule));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let base = Url::parse(&format!("http://{addr}/api")).unwrap();
        TvMazeClient::with_base_url(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = TvMazeClient::with_base_url(
            Url::parse("https://api.tvmaze.com/").unwrap(),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            client.endpoint(&["shows", "169"]).unwrap().as_str(),
            "https://api.tvmaze.com/shows/169"
        );

        let nested = TvMazeClient::with_base_url(
            Url::parse("http://localhost:8080/proxy/tvmaze").unwrap(),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            nested.endpoint(&["search", "shows"]).unwrap().as_str(),
            "http://localhost:8080/proxy/tvmaze/search/shows"
        );
    }

    #[test]
    fn test_rejects_non_base_url() {
        let result = TvMazeClient::with_base_url(
            Url::parse("mailto:someone@example.org").unwrap(),
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(TvMazeError::InvalidBaseUrl(_))));
    }

    #[tokio::test]
    async fn test_show_details_found_and_not_found() {
        let client = spawn_fake_tvmaze().await;

        let show = client.show_details(ShowId::new(169)).await.unwrap().unwrap();
        assert_eq!(show.name, "Show 169");
        assert!(show.embedded.is_none());

        assert!(client.show_details(ShowId::new(404)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upstream_errors_are_not_not_found() {
        let client = spawn_fake_tvmaze().await;

        assert!(matches!(
            client.show_details(ShowId::new(500)).await,
            Err(TvMazeError::Api { status: 500, .. })
        ));
        assert!(matches!(
            client.show_details(ShowId::new(429)).await,
            Err(TvMazeError::RateLimited)
        ));
    }

    #[tokio::test]
    async fn test_search_encodes_query() {
        let client = spawn_fake_tvmaze().await;
        let results = client.search_shows("the office & friends").await.unwrap();
        assert_eq!(results[0].show.name, "the office & friends");
    }

    #[tokio::test]
    async fn test_shows_by_page_end_of_data() {
        let client = spawn_fake_tvmaze().await;
        assert_eq!(client.shows_by_page(0).await.unwrap().len(), 2);
        assert!(client.shows_by_page(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_web_schedule_passes_date_and_country() {
        let client = spawn_fake_tvmaze().await;
        let date = NaiveDate::from_ymd_opt(2024, 4, 5).unwrap();
        let items = client.web_schedule(date, "US").await.unwrap();
        assert_eq!(items[0].episode.name, "2024-04-05 US");
        assert_eq!(items[0].embedded.show.id, ShowId::new(5));
    }

    #[tokio::test]
    async fn test_show_with_episodes_and_cast_requests_embeds() {
        let client = spawn_fake_tvmaze().await;
        let show = client
            .show_with_episodes_and_cast(ShowId::new(7))
            .await
            .unwrap()
            .unwrap();
        let embedded = show.embedded.unwrap();
        assert!(embedded.episodes.is_some());
        assert!(embedded.cast.is_some());

        assert!(
            client
                .show_with_episodes_and_cast(ShowId::new(404))
                .await
                .unwrap()
                .is_none()
        );
    }
}
