//! TIDAL REST API client implementation.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, StatusCode};
use thiserror::Error;

use super::auth::{AuthError, OAuthClient, Session, TokenSet};
use super::models::*;

/// Base URL of the v1 API.
const API_V1_URL: &str = "https://api.tidal.com/v1";

/// Base URL of the v2 API (only needed for mix favourites).
const API_V2_URL: &str = "https://api.tidal.com/v2";

/// API client errors.
#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Server returned {status}: {message}")]
    ServerError { status: u16, message: String },

    #[error("Session is not authorized")]
    Unauthorized,

    #[error("Not logged in")]
    NotLoggedIn,
}

impl ApiClientError {
    /// Whether the error means the saved credentials are no longer usable.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::NotLoggedIn | Self::Auth(_))
    }
}

/// TIDAL API client.
///
/// Clones share the same session, so a token refresh or quality change is
/// seen by every clone (the audio thread holds one).
#[derive(Debug, Clone)]
pub struct TidalClient {
    /// HTTP client
    client: Client,

    /// OAuth client used for login and token refresh
    oauth: OAuthClient,

    /// Credentials, country and quality preference
    session: Arc<RwLock<Session>>,
}

impl TidalClient {
    /// Create a new API client.
    pub fn new(client_id: impl Into<String>, client_secret: Option<String>) -> Self {
        let client = Client::new();
        Self {
            oauth: OAuthClient::new(client.clone(), client_id, client_secret),
            client,
            session: Arc::new(RwLock::new(Session::default())),
        }
    }

    fn session(&self) -> RwLockReadGuard<'_, Session> {
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn session_mut(&self) -> RwLockWriteGuard<'_, Session> {
        self.session.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// OAuth client for interactive login.
    pub fn oauth(&self) -> &OAuthClient {
        &self.oauth
    }

    /// Snapshot of the current session (for persisting tokens).
    pub fn session_snapshot(&self) -> Session {
        self.session().clone()
    }

    /// Replace the whole session (used when restoring saved settings).
    pub fn set_session(&self, session: Session) {
        *self.session_mut() = session;
    }

    /// Apply a freshly issued token.
    pub fn apply_tokens(&self, tokens: &TokenSet) {
        self.session_mut().apply_tokens(tokens, Utc::now());
    }

    /// Forget all credentials.
    pub fn logout(&self) {
        self.session_mut().clear();
    }

    pub fn is_logged_in(&self) -> bool {
        self.session().has_token()
    }

    pub fn quality(&self) -> Quality {
        self.session().quality
    }

    pub fn set_quality(&self, quality: Quality) {
        self.session_mut().quality = quality;
    }

    /// Restore the saved session.
    ///
    /// Returns `Ok(false)` when no token is stored. An expired access token is
    /// refreshed first; the session is then validated against the server,
    /// which also tells us the user id and country.
    pub async fn restore_session(&self) -> Result<bool, ApiClientError> {
        let (has_token, expired, refresh_token) = {
            let session = self.session();
            (
                session.has_token(),
                session.is_expired(Utc::now()),
                session.refresh_token.clone(),
            )
        };

        if !has_token {
            return Ok(false);
        }

        if expired {
            if refresh_token.is_empty() {
                return Err(ApiClientError::Unauthorized);
            }
            tracing::info!("Access token expired, refreshing");
            let tokens = self.oauth.refresh(&refresh_token).await?;
            self.apply_tokens(&tokens);
        }

        let info: SessionInfo = self.get(API_V1_URL, "sessions", &[]).await?;
        {
            let mut session = self.session_mut();
            session.user_id = Some(info.user_id);
            session.country_code = info.country_code;
        }

        Ok(true)
    }

    /// Build the URL for an API endpoint with query parameters.
    fn build_url(&self, base: &str, endpoint: &str, params: &[(&str, &str)]) -> String {
        let country = {
            let session = self.session();
            if session.country_code.is_empty() {
                String::from("US")
            } else {
                session.country_code.clone()
            }
        };

        let mut query_parts: Vec<String> = vec![format!("countryCode={}", country)];

        for (key, value) in params {
            query_parts.push(format!("{}={}", key, urlencoding::encode(value)));
        }

        format!("{}/{}?{}", base, endpoint, query_parts.join("&"))
    }

    /// Make an authorized GET request to an API endpoint.
    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        base: &str,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ApiClientError> {
        self.request(Method::GET, base, endpoint, params, &[]).await
    }

    /// Make an authorized request, sending `form` as the body when not empty.
    async fn request<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        base: &str,
        endpoint: &str,
        params: &[(&str, &str)],
        form: &[(&str, &str)],
    ) -> Result<T, ApiClientError> {
        let authorization = {
            let session = self.session();
            if !session.has_token() {
                return Err(ApiClientError::NotLoggedIn);
            }
            session.authorization()
        };
        let url = self.build_url(base, endpoint, params);

        tracing::debug!("{} {}", method, endpoint);
        let mut request = self
            .client
            .request(method, &url)
            .header(AUTHORIZATION, authorization);
        if !form.is_empty() {
            request = request.form(form);
        }
        let response = request.send().await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiClientError::Unauthorized);
        }

        let text = response.text().await?;
        if !status.is_success() {
            return Err(ApiClientError::ServerError {
                status: status.as_u16(),
                message: text.chars().take(200).collect(),
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            ApiClientError::InvalidResponse(format!(
                "Failed to parse response: {}. Body: {}",
                e,
                text.chars().take(500).collect::<String>()
            ))
        })
    }

    fn user_id(&self) -> Result<String, ApiClientError> {
        self.session()
            .user_id
            .clone()
            .ok_or(ApiClientError::NotLoggedIn)
    }

    // =========================================================================
    // Editorial pages
    // =========================================================================

    /// Get an editorial page (`home`, `explore`) as display modules.
    pub async fn get_page(&self, name: &str) -> Result<Vec<PageModule>, ApiClientError> {
        let page: EditorialPage = self
            .get(
                API_V1_URL,
                &format!("pages/{name}"),
                &[("deviceType", "BROWSER"), ("locale", "en_US")],
            )
            .await?;
        Ok(page.into_modules())
    }

    // =========================================================================
    // Tracks
    // =========================================================================

    /// Get a track by ID.
    pub async fn get_track(&self, id: &str) -> Result<Track, ApiClientError> {
        self.get(API_V1_URL, &format!("tracks/{id}"), &[]).await
    }

    /// Get a radio seeded by a track.
    pub async fn get_track_radio(&self, id: &str) -> Result<Vec<Track>, ApiClientError> {
        let response: Paged<Track> = self
            .get(API_V1_URL, &format!("tracks/{id}/radio"), &[("limit", "100")])
            .await?;
        Ok(response.items)
    }

    /// Get lyrics for a track.
    pub async fn get_lyrics(&self, id: &str) -> Result<Lyrics, ApiClientError> {
        self.get(API_V1_URL, &format!("tracks/{id}/lyrics"), &[])
            .await
    }

    /// Resolve the streaming URL for a track at the session's quality.
    pub async fn stream_url(&self, id: &str) -> Result<String, ApiClientError> {
        let quality = self.quality();
        let response: StreamUrls = self
            .get(
                API_V1_URL,
                &format!("tracks/{id}/urlpostpaywall"),
                &[
                    ("urlusagemode", "STREAM"),
                    ("audioquality", quality.api_name()),
                    ("assetpresentation", "FULL"),
                ],
            )
            .await?;

        response
            .urls
            .into_iter()
            .next()
            .ok_or_else(|| ApiClientError::InvalidResponse(format!("No stream URL for track {id}")))
    }

    // =========================================================================
    // Albums
    // =========================================================================

    /// Get the tracks of an album.
    pub async fn get_album_tracks(&self, id: &str) -> Result<Vec<Track>, ApiClientError> {
        let response: Paged<Track> = self
            .get(API_V1_URL, &format!("albums/{id}/tracks"), &[("limit", "100")])
            .await?;
        Ok(response.items)
    }

    // =========================================================================
    // Artists
    // =========================================================================

    /// Get the most popular tracks of an artist.
    pub async fn get_artist_top_tracks(
        &self,
        id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<Track>, ApiClientError> {
        let limit_str = limit.unwrap_or(10).to_string();
        let response: Paged<Track> = self
            .get(
                API_V1_URL,
                &format!("artists/{id}/toptracks"),
                &[("limit", &limit_str)],
            )
            .await?;
        Ok(response.items)
    }

    /// Get the albums of an artist.
    pub async fn get_artist_albums(&self, id: &str) -> Result<Vec<Album>, ApiClientError> {
        let response: Paged<Album> = self
            .get(API_V1_URL, &format!("artists/{id}/albums"), &[("limit", "50")])
            .await?;
        Ok(response.items)
    }

    /// Get artists similar to an artist.
    pub async fn get_similar_artists(&self, id: &str) -> Result<Vec<Artist>, ApiClientError> {
        let response: Paged<Artist> = self
            .get(API_V1_URL, &format!("artists/{id}/similar"), &[("limit", "20")])
            .await?;
        Ok(response.items)
    }

    /// Get the biography of an artist.
    pub async fn get_artist_bio(&self, id: &str) -> Result<String, ApiClientError> {
        let bio: ArtistBio = self
            .get(API_V1_URL, &format!("artists/{id}/bio"), &[])
            .await?;
        Ok(bio.plain_text())
    }

    /// Get a radio seeded by an artist.
    pub async fn get_artist_radio(&self, id: &str) -> Result<Vec<Track>, ApiClientError> {
        let response: Paged<Track> = self
            .get(API_V1_URL, &format!("artists/{id}/radio"), &[("limit", "100")])
            .await?;
        Ok(response.items)
    }

    // =========================================================================
    // Playlists and mixes
    // =========================================================================

    /// Get the tracks of a playlist.
    pub async fn get_playlist_tracks(&self, id: &str) -> Result<Vec<Track>, ApiClientError> {
        let response: Paged<Track> = self
            .get(API_V1_URL, &format!("playlists/{id}/tracks"), &[("limit", "100")])
            .await?;
        Ok(response.items)
    }

    /// Create an empty playlist owned by the logged in user.
    pub async fn create_playlist(
        &self,
        title: &str,
        description: &str,
    ) -> Result<Playlist, ApiClientError> {
        let user_id = self.user_id()?;
        tracing::info!("Creating playlist {:?}", title);
        self.request(
            Method::POST,
            API_V1_URL,
            &format!("users/{user_id}/playlists"),
            &[],
            &[("title", title), ("description", description)],
        )
        .await
    }

    /// Get the tracks of a mix (videos are skipped).
    pub async fn get_mix_tracks(&self, id: &str) -> Result<Vec<Track>, ApiClientError> {
        let response: Paged<TypedItem> = self
            .get(API_V1_URL, &format!("mixes/{id}/items"), &[("limit", "100")])
            .await?;

        Ok(response
            .items
            .into_iter()
            .filter(|entry| entry.item_type == "track")
            .filter_map(|entry| serde_json::from_value(entry.item).ok())
            .collect())
    }

    // =========================================================================
    // Favourites
    // =========================================================================

    async fn get_favorites<T: serde::de::DeserializeOwned>(
        &self,
        kind: &str,
    ) -> Result<Vec<T>, ApiClientError> {
        let user_id = self.user_id()?;
        let response: Paged<FavoriteItem<T>> = self
            .get(
                API_V1_URL,
                &format!("users/{user_id}/favorites/{kind}"),
                &[
                    ("limit", "100"),
                    ("order", "DATE"),
                    ("orderDirection", "DESC"),
                ],
            )
            .await?;
        Ok(response.items.into_iter().map(|fav| fav.item).collect())
    }

    pub async fn get_favorite_tracks(&self) -> Result<Vec<Track>, ApiClientError> {
        self.get_favorites("tracks").await
    }

    pub async fn get_favorite_albums(&self) -> Result<Vec<Album>, ApiClientError> {
        self.get_favorites("albums").await
    }

    pub async fn get_favorite_artists(&self) -> Result<Vec<Artist>, ApiClientError> {
        self.get_favorites("artists").await
    }

    pub async fn get_favorite_playlists(&self) -> Result<Vec<Playlist>, ApiClientError> {
        self.get_favorites("playlists").await
    }

    pub async fn get_favorite_mixes(&self) -> Result<Vec<Mix>, ApiClientError> {
        let response: Paged<Mix> = self
            .get(API_V2_URL, "favorites/mixes", &[("limit", "50")])
            .await?;
        Ok(response.items)
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Search for artists, albums, tracks and playlists.
    pub async fn search(
        &self,
        query: &str,
        limit: Option<u32>,
    ) -> Result<SearchResults, ApiClientError> {
        let limit_str = limit.unwrap_or(20).to_string();
        let response: SearchResponse = self
            .get(
                API_V1_URL,
                "search",
                &[
                    ("query", query),
                    ("types", "ARTISTS,ALBUMS,TRACKS,PLAYLISTS"),
                    ("limit", &limit_str),
                ],
            )
            .await?;
        Ok(response.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_encodes_params_and_country() {
        let client = TidalClient::new("id", None);
        client.set_session(Session {
            country_code: String::from("NO"),
            ..Session::default()
        });

        let url = client.build_url(API_V1_URL, "search", &[("query", "daft punk")]);
        assert_eq!(
            url,
            "https://api.tidal.com/v1/search?countryCode=NO&query=daft%20punk"
        );
    }

    #[tokio::test]
    async fn test_requests_without_token_fail_fast() {
        let client = TidalClient::new("id", None);
        let result = client.get_track("1").await;
        assert!(matches!(result, Err(ApiClientError::NotLoggedIn)));
        assert!(result.unwrap_err().is_auth_failure());
    }

    #[tokio::test]
    async fn test_restore_without_token_reports_not_logged_in() {
        let client = TidalClient::new("id", None);
        assert!(!client.restore_session().await.unwrap());
    }

    #[tokio::test]
    async fn test_create_playlist_needs_a_user() {
        let client = TidalClient::new("id", None);
        let result = client.create_playlist("Road trip", "").await;
        assert!(matches!(result, Err(ApiClientError::NotLoggedIn)));
    }

    #[test]
    fn test_clones_share_quality() {
        let client = TidalClient::new("id", None);
        let clone = client.clone();
        clone.set_quality(Quality::HiRes);
        assert_eq!(client.quality(), Quality::HiRes);
    }
}
