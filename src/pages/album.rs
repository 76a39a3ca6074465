//! Album page.

use futures::future::BoxFuture;
use futures::FutureExt;

use super::{section, Page, PageContent, PageHeader, SectionItems};
use crate::client::models::{pretty_duration, Album};
use crate::client::Catalog;
use crate::player::ContextSource;

pub struct AlbumPage {
    pub album: Album,
}

impl AlbumPage {
    pub fn new(album: Album) -> Self {
        Self { album }
    }

    fn subtitle(&self) -> String {
        let mut parts = vec![self.album.artist_name().to_string()];
        if let Some(year) = self.album.year() {
            parts.push(year.to_string());
        }
        if let Some(count) = self.album.number_of_tracks {
            parts.push(format!("{count} tracks"));
        }
        if self.album.duration > 0 {
            parts.push(pretty_duration(self.album.duration));
        }
        parts.join(" · ")
    }
}

impl Page for AlbumPage {
    fn title(&self) -> String {
        self.album.title.clone()
    }

    fn load<'a>(&'a self, api: &'a dyn Catalog) -> BoxFuture<'a, PageContent> {
        async move {
            let tracks = api.album_tracks(&self.album.id).await;
            PageContent {
                header: Some(PageHeader {
                    title: self.album.title.clone(),
                    subtitle: Some(self.subtitle()),
                    image: self.album.image(),
                }),
                sections: section(
                    "Tracks",
                    ContextSource::Album(self.album.id.clone()),
                    tracks,
                    SectionItems::Tracks,
                )
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
    use crate::client::catalog::tests::{album, FakeCatalog};
    use crate::client::models::ArtistRef;
    use crate::player::context::tests::tracks;

    #[tokio::test]
    async fn test_album_tracks_play_as_album_context() {
        let catalog = FakeCatalog {
            tracks: tracks(&["1", "2"]),
            ..FakeCatalog::default()
        };
        let content = AlbumPage::new(album("9")).load(&catalog).await;

        assert_eq!(content.sections.len(), 1);
        let ctx = content.first_track_context().unwrap();
        assert_eq!(ctx.source(), &ContextSource::Album(String::from("9")));
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn test_subtitle_lists_known_facts() {
        let mut album = album("9");
        album.artist = Some(ArtistRef {
            id: String::from("1"),
            name: String::from("Daft Punk"),
            picture: None,
        });
        assert_eq!(
            AlbumPage::new(album).subtitle(),
            "Daft Punk · 2011 · 10 tracks · 40:00"
        );
    }
}
