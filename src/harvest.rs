use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use serde::Serialize;
use tokio::time::sleep;

use crate::{
    config::{Credentials, HarvestOptions, Site},
    model::{DetailedInfo, StudentRecord},
    scrape::{
        Page, Portal, activity,
        auth::authenticate,
        progress,
        roster::{self, RosterEntry},
    },
    targets::Targets,
};

async fn read_roster<P: Portal>(
    portal: &P,
    session: &P::Session,
    credentials: &Credentials,
    targets: &Targets,
) -> anyhow::Result<Vec<RosterEntry>> {
    if !authenticate(portal, session, credentials).await {
        anyhow::bail!("failed to login");
    }
    tracing::info!(target: "roster", "starting to scrape teacher dashboard");
    let html = portal.fetch(session, Page::Roster).await?;
    Ok(roster::walk(roster::entries(&html), targets))
}

/// Logs in once to find which targeted students are on the roster.
pub async fn roster_pass<P: Portal>(
    portal: &P,
    credentials: &Credentials,
    targets: &Targets,
) -> anyhow::Result<Vec<RosterEntry>> {
    let session = portal.open().await?;
    let result = read_roster(portal, &session, credentials, targets).await;
    portal.close(session).await;
    result
}

/// Activity and progress pages of one student. A page that fails to load is
/// recorded on the result instead of aborting the student.
pub async fn details<P: Portal>(
    portal: &P,
    session: &P::Session,
    site: &Site,
    id: &str,
) -> DetailedInfo {
    let mut info = DetailedInfo {
        student_url: site.student(id),
        ..DetailedInfo::default()
    };

    match portal.fetch(session, Page::Activity(id)).await {
        Ok(html) => {
            let activity = activity::extract(&html);
            info.daily_activity = activity.daily_activity;
            info.estimated_completion = activity.estimated_completion;
        }
        Err(e) => {
            tracing::error!(target: "activity", "\x1b[31merror getting activity details\x1b[0m for {id}: {e:?}");
            info.activity_error = Some(format!("{e:#}"));
        }
    }

    match portal.fetch(session, Page::Progress(id)).await {
        Ok(html) => info.progress = progress::extract(&html),
        Err(e) => {
            tracing::error!(target: "progress", "\x1b[31merror getting progress details\x1b[0m for {id}: {e:?}");
            info.progress_error = Some(format!("{e:#}"));
        }
    }

    info
}

async fn collect_student<P: Portal>(
    portal: &P,
    session: &P::Session,
    site: &Site,
    credentials: &Credentials,
    name: &str,
) -> anyhow::Result<Option<StudentRecord>> {
    if !authenticate(portal, session, credentials).await {
        tracing::error!(target: "harvest", "failed to login for student: {name}");
        return Ok(None);
    }

    let html = portal.fetch(session, Page::Roster).await?;
    let Some(entry) = roster::locate(&html, name) else {
        tracing::warn!(target: "harvest", "{name} is no longer on the roster");
        return Ok(None);
    };
    let Some(id) = entry.student_id else {
        tracing::warn!(target: "harvest", "no student id on the dashboard tile of {name}");
        return Ok(None);
    };

    tracing::info!(target: "harvest", "getting detailed information for student: {name}");
    let detailed_info = details(portal, session, site, &id).await;

    Ok(Some(StudentRecord {
        name: entry.name,
        student_url: site.activity(&id),
        student_id: id,
        dashboard_info: entry.dashboard,
        detailed_info,
    }))
}

/// One student in a fresh browsing context of its own.
pub async fn student<P: Portal>(
    portal: &P,
    site: &Site,
    credentials: &Credentials,
    name: &str,
) -> anyhow::Result<Option<StudentRecord>> {
    let session = portal.open().await?;
    let result = collect_student(portal, &session, site, credentials, name).await;
    portal.close(session).await;
    result
}

/// Full scrape run: roster pass, then every targeted student in turn.
pub async fn harvest<P: Portal>(
    portal: &P,
    site: &Site,
    credentials: &Credentials,
    targets: &Targets,
    options: &HarvestOptions,
) -> Vec<StudentRecord> {
    if targets.is_empty() {
        tracing::error!(target: "harvest", "no target students, add names to the target list");
        return Vec::new();
    }

    let matched = match roster_pass(portal, credentials, targets).await {
        Ok(m) => m,
        Err(e) => {
            tracing::error!(target: "harvest", "\x1b[31mroster pass failed\x1b[0m: {e:?}");
            return Vec::new();
        }
    };

    let mut records = Vec::with_capacity(matched.len());
    for (idx, entry) in matched.iter().enumerate() {
        if idx > 0 {
            sleep(options.pause).await;
        }

        let name = &entry.name;
        tracing::info!(target: "harvest", "\x1b[33mprocessing\x1b[0m student: {name}");

        match student(portal, site, credentials, name).await {
            Ok(Some(record)) => {
                tracing::info!(target: "harvest", "\x1b[36mcollected\x1b[0m data for student: {name}");
                records.push(record);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(target: "harvest", "\x1b[31merror processing student {name}\x1b[0m: {e:?}");
            }
        }
    }

    if records.is_empty() {
        tracing::warn!(
            target: "harvest",
            "no data collected, check that the target names match the roster exactly",
        );
    }

    records
}

/// Pretty-prints `value` to `path`, creating parent directories as needed.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;

    tracing::info!(target: "harvest", "data saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;

    #[test]
    fn json_is_indented() {
        let dir = std::env::temp_dir().join(format!("pscr-harvest-{}", std::process::id()));
        let path = dir.join("nested").join("student_data.json");

        write_json(&path, &serde_json::json!([{ "name": "Alice" }])).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  {\n    \"name\": \"Alice\""));
        let back: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back[0]["name"], "Alice");

        std::fs::remove_dir_all(dir).unwrap();
    }
}
