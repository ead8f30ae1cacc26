//! Query/sort/pagination state of one list view.
//!
//! Transitions are explicit commands ([`ViewCommand`]) so that any front end
//! (terminal, web, tests) drives the same state machine.

use crate::page::{PageError, PageState};
use crate::query::{Filter, FilterPolicy, SortSpec, ValidationError};

/// An operator command against a view's query state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewCommand {
    /// Replace the filter text; returns to page 1.
    SetFilter(String),
    /// Header click on a column; returns to page 1.
    ToggleSort(String),
    /// Jump to a page, keeping filter and sort.
    GotoPage(u32),
    /// Re-run the current query unchanged.
    Refresh,
}

/// Why a command was refused. The state is unchanged when this is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Page(#[from] PageError),
}

/// Immutable copy of the query taken when a fetch is issued.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySnapshot {
    pub filter: Filter,
    pub sort: Option<SortSpec>,
    pub page: u32,
    pub page_size: u32,
}

/// Filter, sort and page of one view.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewQuery {
    policy: FilterPolicy,
    filter: Filter,
    filter_text: String,
    sort: Option<SortSpec>,
    page: PageState,
}

impl ViewQuery {
    #[must_use]
    pub fn new(policy: FilterPolicy, page_size: u32) -> Self {
        Self {
            policy,
            filter: Filter::none_for(policy),
            filter_text: String::new(),
            sort: None,
            page: PageState::new(page_size),
        }
    }

    #[must_use]
    pub fn policy(&self) -> FilterPolicy {
        self.policy
    }

    #[must_use]
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Text last accepted by `SetFilter`.
    #[must_use]
    pub fn filter_text(&self) -> &str {
        &self.filter_text
    }

    #[must_use]
    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    #[must_use]
    pub fn page(&self) -> &PageState {
        &self.page
    }

    /// Applies one command.
    ///
    /// # Errors
    ///
    /// Refuses strict-view filter text that is not a JSON object and pages
    /// outside `1..=total_pages`; nothing changes in either case.
    pub fn apply(&mut self, command: &ViewCommand) -> Result<(), CommandError> {
        match command {
            ViewCommand::SetFilter(text) => {
                self.filter = Filter::parse(self.policy, text)?;
                self.filter_text.clone_from(text);
                self.page.reset();
            }
            ViewCommand::ToggleSort(field) => {
                self.sort = Some(SortSpec::toggled(self.sort.as_ref(), field));
                self.page.reset();
            }
            ViewCommand::GotoPage(n) => self.page.goto(*n)?,
            ViewCommand::Refresh => {}
        }
        Ok(())
    }

    /// Records the total reported by the server.
    ///
    /// Returns `true` when the page index was clamped.
    pub fn set_total(&mut self, total: u64) -> bool {
        self.page.set_total(total)
    }

    #[must_use]
    pub fn snapshot(&self) -> QuerySnapshot {
        QuerySnapshot {
            filter: self.filter.clone(),
            sort: self.sort.clone(),
            page: self.page.page(),
            page_size: self.page.page_size(),
        }
    }
}
