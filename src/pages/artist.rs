//! Artist page.

use futures::future::BoxFuture;
use futures::FutureExt;

use super::{section, Page, PageContent, PageHeader, RadioSeed, SectionItems};
use crate::client::models::Artist;
use crate::client::Catalog;
use crate::player::ContextSource;

/// Top tracks, albums, similar artists and the bio of an artist.
///
/// The four requests run concurrently and fail independently.
pub struct ArtistPage {
    pub artist: Artist,
}

impl ArtistPage {
    pub fn new(artist: Artist) -> Self {
        Self { artist }
    }
}

impl Page for ArtistPage {
    fn title(&self) -> String {
        self.artist.name.clone()
    }

    fn radio_seed(&self) -> Option<RadioSeed> {
        Some(RadioSeed::Artist(self.artist.clone()))
    }

    fn load<'a>(&'a self, api: &'a dyn Catalog) -> BoxFuture<'a, PageContent> {
        async move {
            let id = self.artist.id.as_str();
            let (top_tracks, albums, similar, bio) = futures::join!(
                api.artist_top_tracks(id),
                api.artist_albums(id),
                api.similar_artists(id),
                api.artist_bio(id),
            );

            let sections = [
                section(
                    "Top Tracks",
                    ContextSource::Artist(id.to_string()),
                    top_tracks,
                    SectionItems::Tracks,
                ),
                section("Albums", ContextSource::Adhoc, albums, SectionItems::Albums),
                section(
                    "Fans Also Like",
                    ContextSource::Adhoc,
                    similar,
                    SectionItems::Artists,
                ),
                section("About", ContextSource::Adhoc, bio, |text| {
                    SectionItems::Text(text.trim().to_string())
                }),
            ]
            .into_iter()
            .flatten()
            .collect();

            PageContent {
                header: Some(PageHeader {
                    title: self.artist.name.clone(),
                    subtitle: None,
                    image: self.artist.image(),
                }),
                sections,
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::catalog::tests::{album, artist, FakeCatalog};
    use crate::player::context::tests::tracks;

    fn catalog(failing: Vec<&'static str>) -> FakeCatalog {
        FakeCatalog {
            tracks: tracks(&["1", "2", "3"]),
            albums: vec![album("10")],
            artists: vec![artist("20")],
            bio: String::from("Formed in Paris.\nStill touring."),
            failing,
            ..FakeCatalog::default()
        }
    }

    #[tokio::test]
    async fn test_all_sections_load() {
        let page = ArtistPage::new(artist("5"));
        let content = page.load(&catalog(vec![])).await;

        let titles: Vec<_> = content.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Top Tracks", "Albums", "Fans Also Like", "About"]);
        assert_eq!(
            content.sections[0].source,
            ContextSource::Artist(String::from("5"))
        );
        assert_eq!(content.sections[3].items.len(), 2);
        assert_eq!(content.header.unwrap().title, "Artist 5");
    }

    #[tokio::test]
    async fn test_failing_similar_artists_keeps_other_sections() {
        let page = ArtistPage::new(artist("5"));
        let content = page.load(&catalog(vec!["similar_artists"])).await;

        let titles: Vec<_> = content.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Top Tracks", "Albums", "About"]);
    }

    #[tokio::test]
    async fn test_everything_failing_leaves_header_only() {
        let page = ArtistPage::new(artist("5"));
        let content = page
            .load(&catalog(vec![
                "artist_top_tracks",
                "artist_albums",
                "similar_artists",
                "artist_bio",
            ]))
            .await;
        assert!(content.sections.is_empty());
        assert!(content.header.is_some());
    }

    #[test]
    fn test_artist_page_seeds_artist_radio() {
        let page = ArtistPage::new(artist("5"));
        assert_eq!(page.radio_seed(), Some(RadioSeed::Artist(artist("5"))));
        assert_eq!(crate::pages::HomePage.radio_seed(), None);
    }
}
