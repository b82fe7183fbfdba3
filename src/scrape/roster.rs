use std::sync::LazyLock;

use compact_str::CompactString;
use scraper::{ElementRef, Html, Selector};

use crate::{
    model::{CourseInfo, DashboardInfo, TodayProgress},
    targets::Targets,
    util::{selector, student_id, text_in},
};

struct Selectors {
    sel_student: Selector,
    sel_name: Selector,
    sel_course_name: Selector,
    sel_course_progress: Selector,
    sel_last_activity: Selector,
    sel_todays_xp: Selector,
    sel_weekly_xp: Selector,
}

static SEL: LazyLock<Selectors> = LazyLock::new(|| Selectors {
    sel_student: selector("div.student"),
    sel_name: selector("div.studentName"),
    sel_course_name: selector("span.courseName"),
    sel_course_progress: selector("div.courseProgress"),
    sel_last_activity: selector("div.lastActivity"),
    sel_todays_xp: selector("td.todaysXP"),
    sel_weekly_xp: selector("span.thisWeeksXPValue"),
});

/// One `div.student` tile of the teacher dashboard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RosterEntry {
    pub name: String,
    pub student_id: Option<CompactString>,
    pub dashboard: DashboardInfo,
}

fn entry(tile: ElementRef<'_>) -> Option<RosterEntry> {
    let sel = &*SEL;
    let name = text_in(tile, &sel.sel_name)?;
    let student_id = tile.attr("id").and_then(student_id).map(Into::into);
    let dashboard = DashboardInfo {
        course_info: CourseInfo {
            name: text_in(tile, &sel.sel_course_name),
            percent_complete: text_in(tile, &sel.sel_course_progress).map(Into::into),
        },
        last_activity: text_in(tile, &sel.sel_last_activity),
        today_progress: TodayProgress {
            points: text_in(tile, &sel.sel_todays_xp).map(Into::into),
        },
        weekly_xp: text_in(tile, &sel.sel_weekly_xp).map(Into::into),
    };

    Some(RosterEntry {
        name,
        student_id,
        dashboard,
    })
}

/// Every named tile on the dashboard, in page order.
pub fn entries(html: &str) -> Vec<RosterEntry> {
    let document = Html::parse_document(html);
    let tiles = document.select(&SEL.sel_student).collect::<Vec<_>>();
    tracing::info!(target: "roster", "found {} student elements", tiles.len());

    tiles.into_iter().filter_map(entry).collect()
}

/// Keeps the roster entries whose names are targeted.
pub fn walk(entries: Vec<RosterEntry>, targets: &Targets) -> Vec<RosterEntry> {
    let total = entries.len();
    let matched = entries
        .into_iter()
        .filter(|e| targets.contains(&e.name))
        .collect::<Vec<_>>();

    tracing::info!(target: "roster", "found {total} total students");
    tracing::info!(target: "roster", "found {} target students", matched.len());

    let mut missing = targets
        .iter()
        .filter(|t| !matched.iter().any(|e| &e.name == *t))
        .collect::<Vec<_>>();
    missing.sort_unstable();
    for name in missing {
        tracing::warn!(target: "roster", "target student {name:?} is not on the roster");
    }

    matched
}

/// Finds a student again by name on a freshly loaded dashboard.
pub fn locate(html: &str, name: &str) -> Option<RosterEntry> {
    let document = Html::parse_document(html);
    document
        .select(&SEL.sel_student)
        .filter_map(entry)
        .find(|e| e.name == name)
}
