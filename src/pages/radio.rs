//! Radio pages seeded by a track or an artist.

use futures::future::BoxFuture;
use futures::FutureExt;

use super::{section, Page, PageContent, PageHeader, SectionItems};
use crate::client::models::{Artist, Track};
use crate::client::Catalog;
use crate::player::ContextSource;

#[derive(Debug, Clone, PartialEq)]
pub enum RadioSeed {
    Track(Track),
    Artist(Artist),
}

pub struct RadioPage {
    pub seed: RadioSeed,
}

impl RadioPage {
    pub fn new(seed: RadioSeed) -> Self {
        Self { seed }
    }
}

impl Page for RadioPage {
    fn title(&self) -> String {
        match &self.seed {
            RadioSeed::Track(track) => format!("Radio: {}", track.title),
            RadioSeed::Artist(artist) => format!("Radio: {}", artist.name),
        }
    }

    fn load<'a>(&'a self, api: &'a dyn Catalog) -> BoxFuture<'a, PageContent> {
        async move {
            let (tracks, source, header) = match &self.seed {
                RadioSeed::Track(track) => (
                    api.track_radio(&track.id).await,
                    ContextSource::TrackRadio(track.id.clone()),
                    PageHeader {
                        title: self.title(),
                        subtitle: Some(track.artist.name.clone()),
                        image: track.cover(),
                    },
                ),
                RadioSeed::Artist(artist) => (
                    api.artist_radio(&artist.id).await,
                    ContextSource::ArtistRadio(artist.id.clone()),
                    PageHeader {
                        title: self.title(),
                        subtitle: None,
                        image: artist.image(),
                    },
                ),
            };

            PageContent {
                header: Some(header),
                sections: section("Tracks", source, tracks, SectionItems::Tracks)
                    .into_iter()
                    .collect(),
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::catalog::tests::{artist, FakeCatalog};
    use crate::player::context::tests::{track, tracks};

    #[tokio::test]
    async fn test_track_radio_context() {
        let catalog = FakeCatalog {
            tracks: tracks(&["2", "3"]),
            ..FakeCatalog::default()
        };
        let page = RadioPage::new(RadioSeed::Track(track("1")));
        let content = page.load(&catalog).await;

        assert_eq!(page.title(), "Radio: Track 1");
        assert_eq!(
            content.first_track_context().unwrap().source(),
            &ContextSource::TrackRadio(String::from("1"))
        );
    }

    #[tokio::test]
    async fn test_artist_radio_context() {
        let catalog = FakeCatalog {
            tracks: tracks(&["2"]),
            ..FakeCatalog::default()
        };
        let content = RadioPage::new(RadioSeed::Artist(artist("7")))
            .load(&catalog)
            .await;
        assert_eq!(
            content.sections[0].source,
            ContextSource::ArtistRadio(String::from("7"))
        );
    }
}
