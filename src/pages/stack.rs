//! The stack of open pages.

use std::sync::Arc;

use ratatui::widgets::ListState;
use ratatui_image::protocol::StatefulProtocol;
use tokio_util::sync::CancellationToken;

use super::{Page, PageContent};

/// Load state of a stack entry.
#[derive(Debug, Clone, PartialEq)]
pub enum PageState {
    Loading,
    Loaded(PageContent),
}

/// An open page plus its view state.
pub struct PageEntry {
    pub id: u64,
    pub page: Arc<dyn Page>,
    pub title: String,
    pub tag: Option<&'static str>,
    pub state: PageState,
    /// Cancelled when the entry leaves the stack
    pub cancel: CancellationToken,
    pub list_state: ListState,
    /// Header art, once downloaded
    pub art: Option<StatefulProtocol>,
}

impl PageEntry {
    pub fn content(&self) -> Option<&PageContent> {
        match &self.state {
            PageState::Loaded(content) => Some(content),
            PageState::Loading => None,
        }
    }

    /// Selected row, if the page is loaded and has rows.
    pub fn selected(&self) -> Option<usize> {
        let count = self.content()?.row_count();
        self.list_state.selected().filter(|row| *row < count)
    }

    pub fn select_next(&mut self) {
        let count = self.content().map(|c| c.row_count()).unwrap_or(0);
        if count == 0 {
            return;
        }
        let next = match self.list_state.selected() {
            Some(i) if i + 1 < count => i + 1,
            Some(i) => i,
            None => 0,
        };
        self.list_state.select(Some(next));
    }

    pub fn select_previous(&mut self) {
        let prev = self.list_state.selected().unwrap_or(0).saturating_sub(1);
        if self.content().is_some_and(|c| c.row_count() > 0) {
            self.list_state.select(Some(prev));
        }
    }

    pub fn select_first(&mut self) {
        if self.content().is_some_and(|c| c.row_count() > 0) {
            self.list_state.select(Some(0));
        }
    }

    pub fn select_last(&mut self) {
        if let Some(count) = self.content().map(|c| c.row_count()).filter(|c| *c > 0) {
            self.list_state.select(Some(count - 1));
        }
    }
}

/// Pages in navigation order. The first entry is the root and is never popped.
#[derive(Default)]
pub struct NavigationStack {
    entries: Vec<PageEntry>,
    next_id: u64,
}

impl NavigationStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a page. Returns the entry id and the token its loader must honour.
    pub fn push(&mut self, page: Arc<dyn Page>) -> (u64, CancellationToken) {
        self.next_id += 1;
        let id = self.next_id;
        let cancel = CancellationToken::new();
        tracing::debug!("Push page {} ({})", id, page.title());

        self.entries.push(PageEntry {
            id,
            title: page.title(),
            tag: page.tag(),
            page,
            state: PageState::Loading,
            cancel: cancel.clone(),
            list_state: ListState::default(),
            art: None,
        });
        (id, cancel)
    }

    /// Pop the top page unless it is the root.
    pub fn pop(&mut self) -> bool {
        if self.entries.len() <= 1 {
            return false;
        }
        if let Some(entry) = self.entries.pop() {
            entry.cancel.cancel();
        }
        true
    }

    /// Pop every page above the topmost page tagged `tag`.
    ///
    /// Returns false (and leaves the stack alone) when no page has the tag.
    pub fn pop_to_tag(&mut self, tag: &str) -> bool {
        let Some(index) = self.entries.iter().rposition(|e| e.tag == Some(tag)) else {
            return false;
        };
        for entry in self.entries.drain(index + 1..) {
            entry.cancel.cancel();
        }
        true
    }

    /// Replace the whole stack with a single root page.
    pub fn reset(&mut self, page: Arc<dyn Page>) -> (u64, CancellationToken) {
        for entry in self.entries.drain(..) {
            entry.cancel.cancel();
        }
        self.push(page)
    }

    /// Store loaded content. Ids no longer on the stack are ignored.
    pub fn set_loaded(&mut self, id: u64, content: PageContent) -> bool {
        match self.get_mut(id) {
            Some(entry) if !entry.cancel.is_cancelled() => {
                entry.state = PageState::Loaded(content);
                entry.list_state.select(Some(0));
                true
            }
            _ => {
                tracing::debug!("Dropping content of closed page {}", id);
                false
            }
        }
    }

    pub fn contains(&self, id: u64) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut PageEntry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    pub fn top(&self) -> Option<&PageEntry> {
        self.entries.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut PageEntry> {
        self.entries.last_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Titles from root to top.
    pub fn breadcrumb(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.title.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use futures::future::BoxFuture;
    use futures::FutureExt;

    use super::*;
    use crate::client::Catalog;
    use crate::pages::HomePage;

    struct Named(&'static str);

    impl Page for Named {
        fn title(&self) -> String {
            self.0.to_string()
        }

        fn load<'a>(&'a self, _api: &'a dyn Catalog) -> BoxFuture<'a, PageContent> {
            async { PageContent::default() }.boxed()
        }
    }

    #[test]
    fn test_pop_never_removes_root() {
        let mut stack = NavigationStack::new();
        let (_, root_token) = stack.push(Arc::new(HomePage));
        assert!(!stack.pop());
        assert_eq!(stack.len(), 1);
        assert!(!root_token.is_cancelled());

        let (_, token) = stack.push(Arc::new(Named("album")));
        assert!(stack.pop());
        assert!(token.is_cancelled());
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_pop_to_tag_cancels_discarded_pages() {
        let mut stack = NavigationStack::new();
        let (_, home) = stack.push(Arc::new(HomePage));
        let tokens: Vec<_> = ["artist", "album", "radio"]
            .into_iter()
            .map(|name| stack.push(Arc::new(Named(name))).1)
            .collect();

        assert!(stack.pop_to_tag("home"));
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.top().unwrap().tag, Some("home"));
        assert!(tokens.iter().all(|t| t.is_cancelled()));
        assert!(!home.is_cancelled());

        assert!(!stack.pop_to_tag("missing"));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_late_content_is_ignored() {
        let mut stack = NavigationStack::new();
        stack.push(Arc::new(HomePage));
        let (id, _) = stack.push(Arc::new(Named("artist")));
        stack.pop();

        assert!(!stack.set_loaded(id, PageContent::default()));
        assert!(!stack.contains(id));
        assert_eq!(stack.top().unwrap().state, PageState::Loading);
    }

    #[test]
    fn test_reset_cancels_everything() {
        let mut stack = NavigationStack::new();
        let (_, a) = stack.push(Arc::new(HomePage));
        let (_, b) = stack.push(Arc::new(Named("x")));
        let (id, c) = stack.reset(Arc::new(HomePage));

        assert!(a.is_cancelled() && b.is_cancelled());
        assert!(!c.is_cancelled());
        assert_eq!(stack.len(), 1);
        assert!(stack.set_loaded(id, PageContent::default()));
        assert_eq!(stack.breadcrumb(), vec!["Home"]);
    }

    #[test]
    fn test_selection_stays_in_bounds() {
        let mut stack = NavigationStack::new();
        let (id, _) = stack.push(Arc::new(Named("empty")));
        stack.set_loaded(id, PageContent::default());

        let entry = stack.top_mut().unwrap();
        entry.select_next();
        entry.select_last();
        assert_eq!(entry.selected(), None);
    }
}
