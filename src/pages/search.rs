//! Search results page.

use futures::future::BoxFuture;
use futures::FutureExt;

use super::{Page, PageContent, Section, SectionItems};
use crate::client::Catalog;
use crate::player::ContextSource;

pub struct SearchPage {
    pub query: String,
}

impl SearchPage {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }
}

impl Page for SearchPage {
    fn title(&self) -> String {
        format!("Search: {}", self.query)
    }

    fn load<'a>(&'a self, api: &'a dyn Catalog) -> BoxFuture<'a, PageContent> {
        async move {
            let results = match api.search(&self.query).await {
                Ok(results) => results,
                Err(e) => {
                    tracing::warn!("Section unavailable (search '{}'): {}", self.query, e);
                    return PageContent::default();
                }
            };

            let sections = [
                ("Artists", SectionItems::Artists(results.artists)),
                ("Albums", SectionItems::Albums(results.albums)),
                ("Tracks", SectionItems::Tracks(results.tracks)),
                ("Playlists", SectionItems::Playlists(results.playlists)),
            ]
            .into_iter()
            .filter(|(_, items)| !items.is_empty())
            .map(|(title, items)| Section {
                title: title.to_string(),
                items,
                source: ContextSource::Adhoc,
            })
            .collect();

            PageContent {
                header: None,
                sections,
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::catalog::tests::{album, FakeCatalog};
    use crate::player::context::tests::tracks;

    #[tokio::test]
    async fn test_empty_result_kinds_are_skipped() {
        let catalog = FakeCatalog {
            albums: vec![album("1")],
            tracks: tracks(&["a"]),
            ..FakeCatalog::default()
        };
        let page = SearchPage::new("nightcall");
        let content = page.load(&catalog).await;

        let titles: Vec<_> = content.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Albums", "Tracks"]);
        assert_eq!(page.title(), "Search: nightcall");
    }
}
