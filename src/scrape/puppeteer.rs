use std::{ffi::OsStr, sync::Arc, time::Duration};

use anyhow::Context as _;
use headless_chrome::{
    Browser, LaunchOptions, Tab, browser::tab::NoElementFound, protocol::cdp::Target,
};
use tokio::{
    task::spawn_blocking,
    time::{Instant, sleep},
};

use crate::{
    config::{Credentials, Site},
    scrape::{Page, Portal},
};

const USERNAME_FIELD: &str = "#usernameOrEmail";
const PASSWORD_FIELD: &str = "#password";
const LOGIN_BUTTON: &str = "#loginButton";

const PERIOD: Duration = Duration::from_millis(1832 / 4);

pub fn puppeteer(headless: bool) -> anyhow::Result<Browser> {
    Browser::new(LaunchOptions {
        args: vec![OsStr::new("--disable-blink-features=AutomationControlled")],
        headless,
        idle_browser_timeout: Duration::from_secs(300),
        ..LaunchOptions::default()
    })
}

pub async fn navigate_to(tab: &Arc<Tab>, url: String) -> anyhow::Result<()> {
    let tab = Arc::clone(tab);

    spawn_blocking(move || tab.navigate_to(&url)?.wait_until_navigated().map(|_| ())).await?
}

/// Whether `selector` currently matches anything on the page.
pub async fn present(tab: &Arc<Tab>, selector: &'static str) -> anyhow::Result<bool> {
    let tab = Arc::clone(tab);

    spawn_blocking(move || match tab.find_element(selector) {
        Ok(_) => Ok(true),
        Err(err) if err.is::<NoElementFound>() => Ok(false),
        Err(err) => Err(err),
    })
    .await?
}

/// Polls for `selector` until it shows up or `ceiling` runs out.
pub async fn wait_ready(
    tab: &Arc<Tab>,
    selector: &'static str,
    ceiling: Duration,
) -> anyhow::Result<bool> {
    let deadline = Instant::now() + ceiling;

    loop {
        if present(tab, selector).await? {
            break Ok(true);
        }
        if Instant::now() >= deadline {
            break Ok(false);
        }

        sleep(PERIOD).await;
    }
}

pub async fn content(tab: &Arc<Tab>) -> anyhow::Result<String> {
    let tab = Arc::clone(tab);

    spawn_blocking(move || tab.get_content()).await?
}

/// A Chrome instance driving the tutoring site.
pub struct Chrome {
    browser: Browser,
    site: Site,
    ready_timeout: Duration,
}

pub struct ChromeSession {
    context_id: String,
    tab: Arc<Tab>,
}

impl Chrome {
    pub fn launch(headless: bool, site: Site, ready_timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            browser: puppeteer(headless)?,
            site,
            ready_timeout,
        })
    }
}

impl Portal for Chrome {
    type Session = ChromeSession;

    async fn open(&self) -> anyhow::Result<ChromeSession> {
        let context = self.browser.new_context()?;
        let tab = context.new_tab()?;
        Ok(ChromeSession {
            context_id: context.get_id().to_owned(),
            tab,
        })
    }

    async fn submit_login(
        &self,
        session: &ChromeSession,
        credentials: &Credentials,
    ) -> anyhow::Result<String> {
        let tab = Arc::clone(&session.tab);
        let url = self.site.login();
        let Credentials { username, password } = credentials.clone();
        let timeout = self.ready_timeout;

        spawn_blocking(move || -> anyhow::Result<String> {
            tab.navigate_to(&url)?.wait_until_navigated()?;
            tracing::info!(target: "login", "navigated to login page");

            tab.wait_for_element_with_custom_timeout(USERNAME_FIELD, timeout)?
                .type_into(&username)?;
            tab.wait_for_element_with_custom_timeout(PASSWORD_FIELD, timeout)?
                .type_into(&password)?;
            tab.wait_for_element_with_custom_timeout(LOGIN_BUTTON, timeout)?
                .click()?;

            let deadline = std::time::Instant::now() + timeout;
            while tab.get_url() == url && std::time::Instant::now() < deadline {
                std::thread::sleep(PERIOD);
            }
            tab.wait_until_navigated()?;

            Ok(tab.get_url())
        })
        .await?
    }

    async fn fetch(&self, session: &ChromeSession, page: Page<'_>) -> anyhow::Result<String> {
        let url = page.url(&self.site);
        navigate_to(&session.tab, url.clone())
            .await
            .with_context(|| format!("navigating to {url}"))?;

        let selector = page.ready_selector();
        if wait_ready(&session.tab, selector, self.ready_timeout).await? {
            tracing::info!(target: "harvest", "navigated to {url}");
        } else {
            tracing::warn!(
                target: "harvest",
                "{url}: no {selector:?} after {:?}, reading the page as rendered",
                self.ready_timeout,
            );
        }

        content(&session.tab).await
    }

    async fn close(&self, session: ChromeSession) {
        if let Err(e) = session.tab.close(true) {
            tracing::warn!(target: "harvest", "closing tab: {e:?}");
        }
        let dispose = Target::DisposeBrowserContext {
            browser_context_id: session.context_id,
        };
        if let Err(e) = self.browser.call_method(dispose) {
            tracing::warn!(target: "harvest", "disposing browsing context: {e:?}");
        }
    }
}
