//! The catalog seam used by pages, downloads and the audio thread.

use futures::future::BoxFuture;
use futures::FutureExt;

use super::api::{ApiClientError, TidalClient};
use super::models::*;

pub type ApiResult<T> = Result<T, ApiClientError>;

/// Access to the streaming catalog and the user's collection.
///
/// Object safe so pages can load against `&dyn Catalog`; tests provide an
/// in-memory implementation.
pub trait Catalog: Send + Sync {
    fn home(&self) -> BoxFuture<'_, ApiResult<Vec<PageModule>>>;
    fn explore(&self) -> BoxFuture<'_, ApiResult<Vec<PageModule>>>;
    fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, ApiResult<SearchResults>>;

    fn track<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ApiResult<Track>>;
    fn track_radio<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ApiResult<Vec<Track>>>;
    fn lyrics<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ApiResult<Lyrics>>;
    fn stream_url<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ApiResult<String>>;

    fn album_tracks<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ApiResult<Vec<Track>>>;

    fn artist_top_tracks<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ApiResult<Vec<Track>>>;
    fn artist_albums<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ApiResult<Vec<Album>>>;
    fn similar_artists<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ApiResult<Vec<Artist>>>;
    fn artist_bio<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ApiResult<String>>;
    fn artist_radio<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ApiResult<Vec<Track>>>;

    fn playlist_tracks<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ApiResult<Vec<Track>>>;
    fn mix_tracks<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ApiResult<Vec<Track>>>;
    fn create_playlist<'a>(
        &'a self,
        title: &'a str,
        description: &'a str,
    ) -> BoxFuture<'a, ApiResult<Playlist>>;

    fn favorite_tracks(&self) -> BoxFuture<'_, ApiResult<Vec<Track>>>;
    fn favorite_albums(&self) -> BoxFuture<'_, ApiResult<Vec<Album>>>;
    fn favorite_artists(&self) -> BoxFuture<'_, ApiResult<Vec<Artist>>>;
    fn favorite_playlists(&self) -> BoxFuture<'_, ApiResult<Vec<Playlist>>>;
    fn favorite_mixes(&self) -> BoxFuture<'_, ApiResult<Vec<Mix>>>;
}

impl Catalog for TidalClient {
    fn home(&self) -> BoxFuture<'_, ApiResult<Vec<PageModule>>> {
        self.get_page("home").boxed()
    }

    fn explore(&self) -> BoxFuture<'_, ApiResult<Vec<PageModule>>> {
        self.get_page("explore").boxed()
    }

    fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, ApiResult<SearchResults>> {
        TidalClient::search(self, query, None).boxed()
    }

    fn track<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ApiResult<Track>> {
        self.get_track(id).boxed()
    }

    fn track_radio<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ApiResult<Vec<Track>>> {
        self.get_track_radio(id).boxed()
    }

    fn lyrics<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ApiResult<Lyrics>> {
        self.get_lyrics(id).boxed()
    }

    fn stream_url<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ApiResult<String>> {
        TidalClient::stream_url(self, id).boxed()
    }

    fn album_tracks<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ApiResult<Vec<Track>>> {
        self.get_album_tracks(id).boxed()
    }

    fn artist_top_tracks<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ApiResult<Vec<Track>>> {
        self.get_artist_top_tracks(id, Some(10)).boxed()
    }

    fn artist_albums<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ApiResult<Vec<Album>>> {
        self.get_artist_albums(id).boxed()
    }

    fn similar_artists<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ApiResult<Vec<Artist>>> {
        self.get_similar_artists(id).boxed()
    }

    fn artist_bio<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ApiResult<String>> {
        self.get_artist_bio(id).boxed()
    }

    fn artist_radio<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ApiResult<Vec<Track>>> {
        self.get_artist_radio(id).boxed()
    }

    fn playlist_tracks<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ApiResult<Vec<Track>>> {
        self.get_playlist_tracks(id).boxed()
    }

    fn mix_tracks<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ApiResult<Vec<Track>>> {
        self.get_mix_tracks(id).boxed()
    }

    fn create_playlist<'a>(
        &'a self,
        title: &'a str,
        description: &'a str,
    ) -> BoxFuture<'a, ApiResult<Playlist>> {
        TidalClient::create_playlist(self, title, description).boxed()
    }

    fn favorite_tracks(&self) -> BoxFuture<'_, ApiResult<Vec<Track>>> {
        self.get_favorite_tracks().boxed()
    }

    fn favorite_albums(&self) -> BoxFuture<'_, ApiResult<Vec<Album>>> {
        self.get_favorite_albums().boxed()
    }

    fn favorite_artists(&self) -> BoxFuture<'_, ApiResult<Vec<Artist>>> {
        self.get_favorite_artists().boxed()
    }

    fn favorite_playlists(&self) -> BoxFuture<'_, ApiResult<Vec<Playlist>>> {
        self.get_favorite_playlists().boxed()
    }

    fn favorite_mixes(&self) -> BoxFuture<'_, ApiResult<Vec<Mix>>> {
        self.get_favorite_mixes().boxed()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use futures::future;

    use super::*;

    /// In-memory catalog. Calls named in `failing` return a server error.
    #[derive(Default)]
    pub(crate) struct FakeCatalog {
        pub tracks: Vec<Track>,
        pub albums: Vec<Album>,
        pub artists: Vec<Artist>,
        pub playlists: Vec<Playlist>,
        pub mixes: Vec<Mix>,
        pub modules: Vec<PageModule>,
        pub bio: String,
        pub lyrics: Option<Lyrics>,
        /// Prefix of the stream URL handed out for every track
        pub stream_base: String,
        pub failing: Vec<&'static str>,
    }

    impl FakeCatalog {
        fn reply<T: Send + 'static>(&self, call: &'static str, value: T) -> BoxFuture<'_, ApiResult<T>> {
            let result = if self.failing.contains(&call) {
                Err(ApiClientError::ServerError {
                    status: 500,
                    message: format!("{call} failed"),
                })
            } else {
                Ok(value)
            };
            future::ready(result).boxed()
        }
    }

    pub(crate) fn album(id: &str) -> Album {
        Album {
            id: id.to_string(),
            title: format!("Album {id}"),
            duration: 2400,
            number_of_tracks: Some(10),
            release_date: Some(String::from("2011-03-04")),
            cover: Some(String::from("aa-bb")),
            artist: None,
        }
    }

    pub(crate) fn artist(id: &str) -> Artist {
        Artist {
            id: id.to_string(),
            name: format!("Artist {id}"),
            picture: None,
        }
    }

    pub(crate) fn playlist(id: &str) -> Playlist {
        Playlist {
            id: id.to_string(),
            title: format!("Playlist {id}"),
            description: None,
            number_of_tracks: Some(3),
            duration: 540,
            square_image: None,
            image: None,
        }
    }

    pub(crate) fn mix(id: &str) -> Mix {
        Mix {
            id: id.to_string(),
            title: format!("Mix {id}"),
            sub_title: None,
            images: HashMap::new(),
        }
    }

    impl Catalog for FakeCatalog {
        fn home(&self) -> BoxFuture<'_, ApiResult<Vec<PageModule>>> {
            self.reply("home", self.modules.clone())
        }

        fn explore(&self) -> BoxFuture<'_, ApiResult<Vec<PageModule>>> {
            self.reply("explore", self.modules.clone())
        }

        fn search<'a>(&'a self, _query: &'a str) -> BoxFuture<'a, ApiResult<SearchResults>> {
            self.reply(
                "search",
                SearchResults {
                    artists: self.artists.clone(),
                    albums: self.albums.clone(),
                    tracks: self.tracks.clone(),
                    playlists: self.playlists.clone(),
                },
            )
        }

        fn track<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ApiResult<Track>> {
            let found = self.tracks.iter().find(|t| t.id == id).cloned();
            match found {
                Some(track) => self.reply("track", track),
                None => future::ready(Err(ApiClientError::ServerError {
                    status: 404,
                    message: format!("track {id} not found"),
                }))
                .boxed(),
            }
        }

        fn track_radio<'a>(&'a self, _id: &'a str) -> BoxFuture<'a, ApiResult<Vec<Track>>> {
            self.reply("track_radio", self.tracks.clone())
        }

        fn lyrics<'a>(&'a self, _id: &'a str) -> BoxFuture<'a, ApiResult<Lyrics>> {
            match self.lyrics.clone() {
                Some(lyrics) => self.reply("lyrics", lyrics),
                None => future::ready(Err(ApiClientError::ServerError {
                    status: 404,
                    message: String::from("no lyrics"),
                }))
                .boxed(),
            }
        }

        fn stream_url<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ApiResult<String>> {
            self.reply("stream_url", format!("{}/{id}", self.stream_base))
        }

        fn album_tracks<'a>(&'a self, _id: &'a str) -> BoxFuture<'a, ApiResult<Vec<Track>>> {
            self.reply("album_tracks", self.tracks.clone())
        }

        fn artist_top_tracks<'a>(&'a self, _id: &'a str) -> BoxFuture<'a, ApiResult<Vec<Track>>> {
            self.reply("artist_top_tracks", self.tracks.clone())
        }

        fn artist_albums<'a>(&'a self, _id: &'a str) -> BoxFuture<'a, ApiResult<Vec<Album>>> {
            self.reply("artist_albums", self.albums.clone())
        }

        fn similar_artists<'a>(&'a self, _id: &'a str) -> BoxFuture<'a, ApiResult<Vec<Artist>>> {
            self.reply("similar_artists", self.artists.clone())
        }

        fn artist_bio<'a>(&'a self, _id: &'a str) -> BoxFuture<'a, ApiResult<String>> {
            self.reply("artist_bio", self.bio.clone())
        }

        fn artist_radio<'a>(&'a self, _id: &'a str) -> BoxFuture<'a, ApiResult<Vec<Track>>> {
            self.reply("artist_radio", self.tracks.clone())
        }

        fn playlist_tracks<'a>(&'a self, _id: &'a str) -> BoxFuture<'a, ApiResult<Vec<Track>>> {
            self.reply("playlist_tracks", self.tracks.clone())
        }

        fn mix_tracks<'a>(&'a self, _id: &'a str) -> BoxFuture<'a, ApiResult<Vec<Track>>> {
            self.reply("mix_tracks", self.tracks.clone())
        }

        fn create_playlist<'a>(
            &'a self,
            title: &'a str,
            description: &'a str,
        ) -> BoxFuture<'a, ApiResult<Playlist>> {
            let created = Playlist {
                title: title.to_string(),
                description: (!description.is_empty()).then(|| description.to_string()),
                number_of_tracks: Some(0),
                duration: 0,
                ..playlist("new")
            };
            self.reply("create_playlist", created)
        }

        fn favorite_tracks(&self) -> BoxFuture<'_, ApiResult<Vec<Track>>> {
            self.reply("favorite_tracks", self.tracks.clone())
        }

        fn favorite_albums(&self) -> BoxFuture<'_, ApiResult<Vec<Album>>> {
            self.reply("favorite_albums", self.albums.clone())
        }

        fn favorite_artists(&self) -> BoxFuture<'_, ApiResult<Vec<Artist>>> {
            self.reply("favorite_artists", self.artists.clone())
        }

        fn favorite_playlists(&self) -> BoxFuture<'_, ApiResult<Vec<Playlist>>> {
            self.reply("favorite_playlists", self.playlists.clone())
        }

        fn favorite_mixes(&self) -> BoxFuture<'_, ApiResult<Vec<Mix>>> {
            self.reply("favorite_mixes", self.mixes.clone())
        }
    }
}
