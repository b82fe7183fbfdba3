use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::{
    model::{Activity, DailyActivity, DayActivity, Points, TaskInfo},
    util::{parse_points, selector, text_in, text_of},
};

const COMPLETION_PHRASE: &str = "Estimated completion is";

struct Selectors {
    sel_row: Selector,
    sel_date_header: Selector,
    sel_total_xp: Selector,
    sel_type: Selector,
    sel_task_name: Selector,
    sel_completed: Selector,
    sel_points: Selector,
}

static SEL: LazyLock<Selectors> = LazyLock::new(|| Selectors {
    sel_row: selector("tr"),
    sel_date_header: selector("td.dateHeader"),
    sel_total_xp: selector("span.dateTotalXP"),
    sel_type: selector("td.taskTypeColumn"),
    sel_task_name: selector("div.taskName"),
    sel_completed: selector("td.taskCompletedColumn"),
    sel_points: selector("span.taskPoints"),
});

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

fn day(header: ElementRef<'_>) -> DayActivity {
    let xp = header.select(&SEL.sel_total_xp).next();
    let daily_xp = xp.map_or_else(|| "0 XP".to_owned(), text_of);

    let mut label = header.text().collect::<String>();
    if let Some(xp) = xp {
        let xp = xp.text().collect::<String>();
        if let Some(i) = label.find(&xp) {
            label.replace_range(i..i + xp.len(), "");
        }
    }
    let date = label.split("XP").next().unwrap_or_default().trim().to_owned();

    DayActivity {
        date,
        daily_xp,
        tasks: Vec::new(),
    }
}

fn task(row: ElementRef<'_>) -> TaskInfo {
    let sel = &*SEL;
    TaskInfo {
        id: row
            .attr("id")
            .map(|id| id.replacen("task-", "", 1).trim().into()),
        kind: text_in(row, &sel.sel_type),
        name: text_in(row, &sel.sel_task_name),
        completion_time: text_in(row, &sel.sel_completed),
        points: text_in(row, &sel.sel_points).map_or_else(Points::default, |t| parse_points(&t)),
        progress: row.attr("progress").and_then(non_empty).map(Into::into),
        initial_placement: row
            .attr("initialplacement")
            .and_then(non_empty)
            .map(Into::into),
    }
}

fn estimated_completion(document: &Html) -> Option<String> {
    let node = document
        .root_element()
        .descendants()
        .find(|n| n.value().as_text().is_some_and(|t| t.contains(COMPLETION_PHRASE)))?;

    let text = match node.parent().and_then(ElementRef::wrap) {
        Some(holder) => holder.text().collect::<String>(),
        None => node.value().as_text().map(|t| String::from(&**t))?,
    };
    let (_, after) = text.split_once(COMPLETION_PHRASE)?;
    let after = after.split_whitespace().collect::<Vec<_>>().join(" ");

    non_empty(&after).map(ToOwned::to_owned)
}

/// Walks the activity table: date header rows open a day, `task-*` rows fill it.
pub fn extract(html: &str) -> Activity {
    let document = Html::parse_document(html);
    let sel = &*SEL;

    let mut days = DailyActivity::default();
    let mut orphans = 0usize;

    for row in document.select(&sel.sel_row) {
        if let Some(header) = row.select(&sel.sel_date_header).next() {
            days.open(day(header));
            continue;
        }

        if row.attr("id").is_some_and(|id| id.starts_with("task-")) {
            if let Some(current) = days.0.last_mut() {
                current.tasks.push(task(row));
            } else {
                orphans += 1;
            }
        }
    }

    if orphans > 0 {
        tracing::debug!(target: "activity", "{orphans} task rows before any date header were dropped");
    }

    let estimated_completion = estimated_completion(&document);
    if let Some(date) = &estimated_completion {
        tracing::info!(target: "activity", "found estimated completion date: {date}");
    }

    let n_tasks = days.0.iter().map(|d| d.tasks.len()).sum::<usize>();
    tracing::info!(target: "activity", "\x1b[36mextracted {} days, {n_tasks} tasks\x1b[0m", days.len());

    Activity {
        daily_activity: days,
        estimated_completion,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Extract;

    const ACTIVITY: &str = include_str!("../../tests/fixtures/activity.html");

    #[test]
    fn days_and_tasks() {
        let activity = extract(ACTIVITY);
        let days = &activity.daily_activity;
        assert_eq!(days.len(), 2);

        let dates = days.0.iter().map(|d| d.date.as_str()).collect::<Vec<_>>();
        assert_eq!(dates, ["Thu, Oct 10", "Wed, Oct 9"]);

        let thu = days.get("Thu, Oct 10").unwrap();
        assert_eq!(thu.daily_xp, "26 XP");
        assert_eq!(thu.tasks.len(), 2);

        let lesson = &thu.tasks[0];
        assert_eq!(lesson.id.as_deref(), Some("88231"));
        assert_eq!(lesson.kind.as_deref(), Some("Lesson"));
        assert_eq!(lesson.name.as_deref(), Some("Solving Linear Equations"));
        assert_eq!(lesson.completion_time.as_deref(), Some("3:41 PM"));
        assert_eq!(lesson.points.earned, Extract::Value(16));
        assert_eq!(lesson.points.possible, Extract::Value(12));
        assert_eq!(lesson.points.raw_text.as_deref(), Some("16/12 XP"));
        assert_eq!(lesson.progress.as_deref(), Some("1.0"));
        assert_eq!(lesson.initial_placement, None);
    }

    #[test]
    fn malformed_points_are_null_but_keep_raw_text() {
        let activity = extract(ACTIVITY);
        let review = &activity.daily_activity.get("Thu, Oct 10").unwrap().tasks[1];
        assert_eq!(review.points.earned, Extract::Failed);
        assert_eq!(review.points.possible, Extract::Failed);
        assert_eq!(review.points.raw_text.as_deref(), Some("-- XP"));
        assert_eq!(review.initial_placement.as_deref(), Some("true"));
    }

    #[test]
    fn missing_nodes_are_absent() {
        let activity = extract(ACTIVITY);
        let wed = activity.daily_activity.get("Wed, Oct 9").unwrap();
        assert_eq!(wed.daily_xp, "0 XP");
        let quiz = &wed.tasks[0];
        assert_eq!(quiz.name, None);
        assert_eq!(quiz.points, Points::default());
        assert!(!quiz.points.earned.is_failed());
    }

    #[test]
    fn rows_before_first_header_are_dropped() {
        let activity = extract(ACTIVITY);
        let all = activity
            .daily_activity
            .0
            .iter()
            .flat_map(|d| d.tasks.iter())
            .filter_map(|t| t.id.as_deref())
            .collect::<Vec<_>>();
        assert!(!all.contains(&"1"));
        assert_eq!(all, ["88231", "88232", "88100"]);
    }

    #[test]
    fn estimated_completion_date() {
        let activity = extract(ACTIVITY);
        assert_eq!(activity.estimated_completion.as_deref(), Some("June 3, 2026"));
    }

    #[test]
    fn empty_page() {
        let activity = extract("<html><body><p>No activity yet</p></body></html>");
        assert!(activity.daily_activity.is_empty());
        assert_eq!(activity.estimated_completion, None);
    }
}
