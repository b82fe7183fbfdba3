use crate::{config::Credentials, scrape::Portal};

/// The site bounces failed logins back to the login page.
pub fn login_succeeded(url: &str) -> bool {
    !url.contains("login")
}

pub async fn authenticate<P: Portal>(
    portal: &P,
    session: &P::Session,
    credentials: &Credentials,
) -> bool {
    match portal.submit_login(session, credentials).await {
        Ok(url) if login_succeeded(&url) => {
            tracing::info!(target: "login", "login successful");
            true
        }
        Ok(url) => {
            tracing::error!(target: "login", "\x1b[31mlogin failed\x1b[0m - still on {url}");
            false
        }
        Err(e) => {
            tracing::error!(target: "login", "\x1b[31merror during login\x1b[0m: {e:?}");
            false
        }
    }
}
