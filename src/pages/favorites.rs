//! The user's favourites.

use futures::future::BoxFuture;
use futures::FutureExt;

use super::{section, Page, PageContent, SectionItems};
use crate::client::models::FavoriteKind;
use crate::client::Catalog;
use crate::player::ContextSource;

pub struct FavoritesPage {
    pub kind: FavoriteKind,
}

impl FavoritesPage {
    pub fn new(kind: FavoriteKind) -> Self {
        Self { kind }
    }
}

impl Page for FavoritesPage {
    fn title(&self) -> String {
        self.kind.to_string()
    }

    fn load<'a>(&'a self, api: &'a dyn Catalog) -> BoxFuture<'a, PageContent> {
        async move {
            let title = self.kind.to_string();
            let source = ContextSource::Adhoc;
            let loaded = match self.kind {
                FavoriteKind::Tracks => {
                    section(&title, source, api.favorite_tracks().await, SectionItems::Tracks)
                }
                FavoriteKind::Mixes => {
                    section(&title, source, api.favorite_mixes().await, SectionItems::Mixes)
                }
                FavoriteKind::Artists => section(
                    &title,
                    source,
                    api.favorite_artists().await,
                    SectionItems::Artists,
                ),
                FavoriteKind::Playlists => section(
                    &title,
                    source,
                    api.favorite_playlists().await,
                    SectionItems::Playlists,
                ),
                FavoriteKind::Albums => {
                    section(&title, source, api.favorite_albums().await, SectionItems::Albums)
                }
            };

            PageContent {
                header: None,
                sections: loaded.into_iter().collect(),
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::catalog::tests::{playlist, FakeCatalog};

    #[tokio::test]
    async fn test_loads_requested_kind() {
        let catalog = FakeCatalog {
            playlists: vec![playlist("a"), playlist("b")],
            ..FakeCatalog::default()
        };
        let page = FavoritesPage::new(FavoriteKind::Playlists);
        let content = page.load(&catalog).await;

        assert_eq!(page.title(), "Favourite Playlists");
        assert_eq!(content.sections.len(), 1);
        assert_eq!(content.sections[0].items.len(), 2);
    }

    #[tokio::test]
    async fn test_failure_leaves_page_empty() {
        let catalog = FakeCatalog {
            failing: vec!["favorite_tracks"],
            ..FakeCatalog::default()
        };
        let content = FavoritesPage::new(FavoriteKind::Tracks)
            .load(&catalog)
            .await;
        assert!(content.sections.is_empty());
    }
}
