//! Editorial pages: home and explore.

use futures::future::BoxFuture;
use futures::FutureExt;

use super::{Page, PageContent, Section, SectionItems};
use crate::client::models::{ModuleItems, PageModule};
use crate::client::{ApiResult, Catalog};
use crate::player::ContextSource;

/// Tag of the root page.
pub const HOME_TAG: &str = "home";

pub struct HomePage;

impl Page for HomePage {
    fn title(&self) -> String {
        String::from("Home")
    }

    fn tag(&self) -> Option<&'static str> {
        Some(HOME_TAG)
    }

    fn load<'a>(&'a self, api: &'a dyn Catalog) -> BoxFuture<'a, PageContent> {
        async move { editorial_content("home", api.home().await) }.boxed()
    }
}

pub struct ExplorePage;

impl Page for ExplorePage {
    fn title(&self) -> String {
        String::from("Explore")
    }

    fn load<'a>(&'a self, api: &'a dyn Catalog) -> BoxFuture<'a, PageContent> {
        async move { editorial_content("explore", api.explore().await) }.boxed()
    }
}

fn editorial_content(page: &str, modules: ApiResult<Vec<PageModule>>) -> PageContent {
    let modules = match modules {
        Ok(modules) => modules,
        Err(e) => {
            tracing::warn!("Section unavailable ({} modules): {}", page, e);
            Vec::new()
        }
    };

    let sections = modules
        .into_iter()
        .map(|module| Section {
            title: module.title,
            items: match module.items {
                ModuleItems::Tracks(v) => SectionItems::Tracks(v),
                ModuleItems::Albums(v) => SectionItems::Albums(v),
                ModuleItems::Artists(v) => SectionItems::Artists(v),
                ModuleItems::Playlists(v) => SectionItems::Playlists(v),
                ModuleItems::Mixes(v) => SectionItems::Mixes(v),
            },
            source: ContextSource::Adhoc,
        })
        .filter(|section| !section.items.is_empty())
        .collect();

    PageContent {
        header: None,
        sections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::catalog::tests::{mix, FakeCatalog};
    use crate::player::context::tests::tracks;

    #[tokio::test]
    async fn test_modules_become_sections() {
        let catalog = FakeCatalog {
            modules: vec![
                PageModule {
                    title: String::from("Suggested new tracks"),
                    items: ModuleItems::Tracks(tracks(&["1", "2"])),
                },
                PageModule {
                    title: String::from("Empty"),
                    items: ModuleItems::Albums(vec![]),
                },
                PageModule {
                    title: String::from("Your mixes"),
                    items: ModuleItems::Mixes(vec![mix("m")]),
                },
            ],
            ..FakeCatalog::default()
        };

        let content = HomePage.load(&catalog).await;
        let titles: Vec<_> = content.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Suggested new tracks", "Your mixes"]);
        assert_eq!(HomePage.tag(), Some("home"));
        assert_eq!(ExplorePage.tag(), None);
    }

    #[tokio::test]
    async fn test_failed_home_is_empty() {
        let catalog = FakeCatalog {
            failing: vec!["explore"],
            ..FakeCatalog::default()
        };
        assert!(ExplorePage.load(&catalog).await.sections.is_empty());
    }
}
