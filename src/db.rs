use std::time::SystemTime;

use bb8_postgres::{PostgresConnectionManager, bb8};
use serde_json::Value;
use tokio_postgres::NoTls;

use crate::config::StoreConfig;

pub type ConnectionManager = PostgresConnectionManager<NoTls>;
pub type Pool = bb8::Pool<ConnectionManager>;
pub type DBError = tokio_postgres::Error;
pub type BB8Error = bb8::RunError<DBError>;
pub type DBResult<T> = Result<T, DBError>;

const SQL_INSERT: &str =
    "insert into membean_data (timestamp, url, data, created_at) values ($1, $2, $3, $4)";
const SQL_LATEST: &str = "select data from membean_data order by created_at desc limit 1";

/// One appended row of the snapshot table.
#[derive(Clone, Debug, PartialEq)]
pub struct SnapshotRecord {
    pub timestamp: String,
    pub url: String,
    pub data: Value,
    pub created_at: SystemTime,
}

impl SnapshotRecord {
    /// `timestamp` and `url` are lifted out of the payload itself.
    pub fn wrap(data: Value) -> Option<Self> {
        let timestamp = data.get("timestamp")?.as_str()?.to_owned();
        let url = data.get("url")?.as_str()?.to_owned();
        Some(Self {
            timestamp,
            url,
            data,
            created_at: SystemTime::now(),
        })
    }
}

/// Handle on the managed snapshot table, built once at startup.
#[derive(Clone)]
pub struct Store {
    pool: Pool,
}

impl Store {
    pub async fn connect(config: &StoreConfig) -> DBResult<Self> {
        let mut pg = config.url.parse::<tokio_postgres::Config>()?;
        if let Some(key) = &config.key {
            pg.password(key);
        }
        pg.connect_timeout(config.connect_timeout);

        let manager = PostgresConnectionManager::new(pg, NoTls);
        let pool = Pool::builder()
            .connection_timeout(config.connect_timeout)
            .build(manager)
            .await?;

        Ok(Self { pool })
    }

    async fn insert_record(&self, record: &SnapshotRecord) -> Result<u64, BB8Error> {
        let conn = self.pool.get().await?;
        let stmt = conn.prepare(SQL_INSERT).await?;
        let n = conn
            .execute(
                &stmt,
                &[
                    &record.timestamp,
                    &record.url,
                    &record.data,
                    &record.created_at,
                ],
            )
            .await?;
        Ok(n)
    }

    /// Appends `payload` as a new row. Never updates or deduplicates.
    pub async fn insert(&self, payload: Value) -> bool {
        let Some(record) = SnapshotRecord::wrap(payload) else {
            tracing::error!(target: "db", "\x1b[31mpayload has no timestamp or url\x1b[0m");
            return false;
        };

        match self.insert_record(&record).await {
            Ok(n) => {
                tracing::info!(target: "db", "\x1b[36mstored snapshot {} ({n} row)\x1b[0m", record.timestamp);
                true
            }
            Err(e) => {
                tracing::error!(target: "db", "\x1b[31merror storing snapshot: {e}\x1b[0m");
                false
            }
        }
    }

    async fn latest_record(&self) -> Result<Option<Value>, BB8Error> {
        let conn = self.pool.get().await?;
        let stmt = conn.prepare(SQL_LATEST).await?;
        let row = conn.query_opt(&stmt, &[]).await?;
        Ok(row.map(|r| r.try_get(0)).transpose()?)
    }

    /// Payload of the most recently created row.
    pub async fn latest(&self) -> Option<Value> {
        match self.latest_record().await {
            Ok(data) => data,
            Err(e) => {
                tracing::error!(target: "db", "\x1b[31merror retrieving latest snapshot: {e}\x1b[0m");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn wrap_lifts_keys() {
        let payload = json!({
            "timestamp": "2026-10-19T08:00:00+00:00",
            "url": "https://www.mathacademy.com/students",
            "students": { "1001": { "name": "Alice" } },
        });
        let record = SnapshotRecord::wrap(payload.clone()).unwrap();
        assert_eq!(record.timestamp, "2026-10-19T08:00:00+00:00");
        assert_eq!(record.url, "https://www.mathacademy.com/students");
        assert_eq!(record.data, payload);
        assert!(record.created_at <= SystemTime::now());
    }

    #[test]
    fn wrap_rejects_incomplete_payloads() {
        assert!(SnapshotRecord::wrap(json!({ "url": "x" })).is_none());
        assert!(SnapshotRecord::wrap(json!({ "timestamp": "t" })).is_none());
        assert!(SnapshotRecord::wrap(json!({ "timestamp": 1, "url": "x" })).is_none());
        assert!(SnapshotRecord::wrap(json!([])).is_none());
    }
}
