use core::future::Future;

use crate::config::{Credentials, Site};

pub mod activity;
pub mod auth;
pub mod progress;
pub mod puppeteer;
pub mod roster;

pub use puppeteer::Chrome;

/// A page of the site whose rendered HTML the scraper reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Page<'a> {
    Roster,
    Activity(&'a str),
    Progress(&'a str),
}

impl Page<'_> {
    pub fn url(self, site: &Site) -> String {
        match self {
            Self::Roster => site.roster(),
            Self::Activity(id) => site.activity(id),
            Self::Progress(id) => site.progress(id),
        }
    }

    /// Node whose presence means the dynamic part of the page has rendered.
    pub const fn ready_selector(self) -> &'static str {
        match self {
            Self::Roster => "div.student",
            Self::Activity(_) => "tr",
            Self::Progress(_) => "div.unit",
        }
    }
}

/// The automated browser, as seen by the harvest loop.
///
/// A session is one isolated browsing context (its own cookies and storage).
pub trait Portal {
    type Session;

    fn open(&self) -> impl Future<Output = anyhow::Result<Self::Session>>;

    /// Fills and submits the login form, returning the URL the browser settled on.
    fn submit_login(
        &self,
        session: &Self::Session,
        credentials: &Credentials,
    ) -> impl Future<Output = anyhow::Result<String>>;

    /// Navigates to `page` and returns its HTML once rendered.
    fn fetch(
        &self,
        session: &Self::Session,
        page: Page<'_>,
    ) -> impl Future<Output = anyhow::Result<String>>;

    fn close(&self, session: Self::Session) -> impl Future<Output = ()>;
}
