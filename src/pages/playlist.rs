//! Playlist and mix pages.

use futures::future::BoxFuture;
use futures::FutureExt;

use super::{section, Page, PageContent, PageHeader, SectionItems};
use crate::client::models::{pretty_duration, Mix, Playlist};
use crate::client::Catalog;
use crate::player::ContextSource;

pub struct PlaylistPage {
    pub playlist: Playlist,
}

impl PlaylistPage {
    pub fn new(playlist: Playlist) -> Self {
        Self { playlist }
    }
}

impl Page for PlaylistPage {
    fn title(&self) -> String {
        self.playlist.title.clone()
    }

    fn load<'a>(&'a self, api: &'a dyn Catalog) -> BoxFuture<'a, PageContent> {
        async move {
            let tracks = api.playlist_tracks(&self.playlist.id).await;

            let mut subtitle = Vec::new();
            if let Some(count) = self.playlist.number_of_tracks {
                subtitle.push(format!("{count} tracks"));
            }
            if self.playlist.duration > 0 {
                subtitle.push(pretty_duration(self.playlist.duration));
            }
            if let Some(description) = self.playlist.description.as_deref() {
                subtitle.push(description.trim().to_string());
            }

            PageContent {
                header: Some(PageHeader {
                    title: self.playlist.title.clone(),
                    subtitle: (!subtitle.is_empty()).then(|| subtitle.join(" · ")),
                    image: self.playlist.image(),
                }),
                sections: section(
                    "Tracks",
                    ContextSource::Playlist(self.playlist.id.clone()),
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

pub struct MixPage {
    pub mix: Mix,
}

impl MixPage {
    pub fn new(mix: Mix) -> Self {
        Self { mix }
    }
}

impl Page for MixPage {
    fn title(&self) -> String {
        self.mix.title.clone()
    }

    fn load<'a>(&'a self, api: &'a dyn Catalog) -> BoxFuture<'a, PageContent> {
        async move {
            let tracks = api.mix_tracks(&self.mix.id).await;
            PageContent {
                header: Some(PageHeader {
                    title: self.mix.title.clone(),
                    subtitle: self.mix.sub_title.clone(),
                    image: self.mix.image(),
                }),
                sections: section(
                    "Tracks",
                    ContextSource::Mix(self.mix.id.clone()),
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
    use crate::client::catalog::tests::{mix, playlist, FakeCatalog};
    use crate::player::context::tests::tracks;

    #[tokio::test]
    async fn test_playlist_header_and_context() {
        let catalog = FakeCatalog {
            tracks: tracks(&["1", "2", "3"]),
            ..FakeCatalog::default()
        };
        let content = PlaylistPage::new(playlist("uuid-1")).load(&catalog).await;

        assert_eq!(
            content.header.as_ref().unwrap().subtitle.as_deref(),
            Some("3 tracks · 09:00")
        );
        assert_eq!(
            content.first_track_context().unwrap().source(),
            &ContextSource::Playlist(String::from("uuid-1"))
        );
    }

    #[tokio::test]
    async fn test_failed_mix_has_no_sections() {
        let catalog = FakeCatalog {
            failing: vec!["mix_tracks"],
            ..FakeCatalog::default()
        };
        let content = MixPage::new(mix("001")).load(&catalog).await;
        assert!(content.sections.is_empty());
        assert_eq!(content.header.unwrap().title, "Mix 001");
    }
}
