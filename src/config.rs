use core::{fmt, time::Duration};

pub const DEFAULT_BASE_URL: &str = "https://www.mathacademy.com";
pub const DEFAULT_PAUSE: Duration = Duration::from_secs(3);
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_SNAPSHOT: &str = "public/data/membean_data_latest.json";

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Falls back to a hidden terminal prompt when no password was configured.
    pub fn resolve(username: String, password: Option<String>) -> std::io::Result<Self> {
        let password = match password {
            Some(p) => p,
            None => rpassword::prompt_password(format!("Password for {username}: "))?,
        };
        Ok(Self { username, password })
    }
}

/// Connection settings for the managed snapshot table.
#[derive(Clone)]
pub struct StoreConfig {
    /// Postgres connection string.
    pub url: String,
    /// Overrides any password carried in `url`.
    pub key: Option<String>,
    pub connect_timeout: Duration,
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}

/// Page addresses on the tutoring site.
#[derive(Clone, Debug)]
pub struct Site {
    base: String,
}

impl Site {
    pub fn new(base: impl Into<String>) -> Self {
        let mut base = base.into();
        while base.ends_with('/') {
            base.pop();
        }
        Self { base }
    }

    pub fn login(&self) -> String {
        format!("{}/login", self.base)
    }

    pub fn roster(&self) -> String {
        format!("{}/students", self.base)
    }

    pub fn student(&self, id: &str) -> String {
        format!("{}/students/{id}", self.base)
    }

    pub fn activity(&self, id: &str) -> String {
        format!("{}/students/{id}/activity", self.base)
    }

    pub fn progress(&self, id: &str) -> String {
        format!("{}/students/{id}/progress", self.base)
    }
}

impl Default for Site {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[derive(Clone, Debug)]
pub struct HarvestOptions {
    /// Delay after each student.
    pub pause: Duration,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            pause: DEFAULT_PAUSE,
        }
    }
}
