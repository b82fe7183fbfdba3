use std::sync::LazyLock;

use anyhow::Context;
use scraper::{ElementRef, Html, Selector};

use crate::{
    model::{ModuleInfo, TopicInfo, UnitInfo},
    util::{parse_style, selector, style_value, text_in, text_of},
};

struct Selectors {
    sel_unit: Selector,
    sel_header: Selector,
    sel_number: Selector,
    sel_name: Selector,
    sel_num_topics: Selector,
    sel_bar_row: Selector,
    sel_cell: Selector,
    sel_module: Selector,
    sel_div: Selector,
    sel_row: Selector,
    sel_circle: Selector,
    sel_topic_number: Selector,
    sel_topic_link: Selector,
}

static SEL: LazyLock<Selectors> = LazyLock::new(|| Selectors {
    sel_unit: selector("div.unit"),
    sel_header: selector("div.unitHeader"),
    sel_number: selector("div.unitNumber"),
    sel_name: selector("span.unitName"),
    sel_num_topics: selector("div.unitNumTopics"),
    sel_bar_row: selector("table.unitProgressBar tr"),
    sel_cell: selector("td"),
    sel_module: selector("div.module"),
    sel_div: selector("div"),
    sel_row: selector("tr"),
    sel_circle: selector("div.topicCircle"),
    sel_topic_number: selector("td.topicNumber"),
    sel_topic_link: selector("td.topicName a"),
});

fn topic(row: ElementRef<'_>) -> TopicInfo {
    let sel = &*SEL;
    let link = row.select(&sel.sel_topic_link).next();
    TopicInfo {
        number: text_in(row, &sel.sel_topic_number).map(Into::into),
        name: link.map(text_of),
        status_color: row
            .select(&sel.sel_circle)
            .next()
            .and_then(|c| c.attr("style"))
            .and_then(|s| style_value(s, "background"))
            .map(Into::into),
        url: link.and_then(|a| a.attr("href")).map(ToOwned::to_owned),
    }
}

fn module(element: ElementRef<'_>) -> ModuleInfo {
    let sel = &*SEL;
    ModuleInfo {
        name: text_in(element, &sel.sel_div),
        topics: element.select(&sel.sel_row).map(topic).collect(),
    }
}

fn unit(element: ElementRef<'_>) -> anyhow::Result<UnitInfo> {
    let sel = &*SEL;
    let header = element
        .select(&sel.sel_header)
        .next()
        .context("unit header missing")?;
    let bar = element
        .select(&sel.sel_bar_row)
        .next()
        .context("unit progress bar missing")?;

    Ok(UnitInfo {
        number: text_in(header, &sel.sel_number).map(Into::into),
        name: text_in(header, &sel.sel_name),
        total_topics: text_in(header, &sel.sel_num_topics).map(Into::into),
        progress_segments: bar
            .select(&sel.sel_cell)
            .map(|cell| parse_style(cell.attr("style").unwrap_or_default()))
            .collect(),
        modules: element.select(&sel.sel_module).map(module).collect(),
    })
}

/// Walks the unit containers of a progress page. A broken unit is skipped on its own.
pub fn extract(html: &str) -> Vec<UnitInfo> {
    let document = Html::parse_document(html);
    let mut units = Vec::new();

    for (idx, element) in document.select(&SEL.sel_unit).enumerate() {
        match unit(element) {
            Ok(u) => units.push(u),
            Err(e) => {
                tracing::error!(target: "progress", "error processing unit #{idx}: {e}");
            }
        }
    }

    tracing::info!(target: "progress", "\x1b[36mextracted {} units\x1b[0m", units.len());
    units
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Extract;

    const PROGRESS: &str = include_str!("../../tests/fixtures/progress.html");

    #[test]
    fn units_and_segments() {
        let units = extract(PROGRESS);
        assert_eq!(units.len(), 2);

        let first = &units[0];
        assert_eq!(first.number.as_deref(), Some("Unit 1"));
        assert_eq!(first.name.as_deref(), Some("Linear Equations"));
        assert_eq!(first.total_topics.as_deref(), Some("12 topics"));

        let widths = first
            .progress_segments
            .iter()
            .map(|s| s.width)
            .collect::<Vec<_>>();
        assert_eq!(widths, [Extract::Value(62.5), Extract::Value(37.5)]);
        assert_eq!(first.progress_segments[0].color.as_deref(), Some("#4caf50"));
        assert_eq!(first.progress_segments[1].color.as_deref(), Some("#e0e0e0"));
    }

    #[test]
    fn modules_and_topics() {
        let units = extract(PROGRESS);
        let modules = &units[0].modules;
        assert_eq!(modules.len(), 2);
        assert_eq!(modules[0].name.as_deref(), Some("One-Step Equations"));
        assert_eq!(modules[0].topics.len(), 2);

        let t = &modules[0].topics[0];
        assert_eq!(t.number.as_deref(), Some("1.1"));
        assert_eq!(t.name.as_deref(), Some("Adding to Both Sides"));
        assert_eq!(t.status_color.as_deref(), Some("#4caf50"));
        assert_eq!(t.url.as_deref(), Some("/topics/101"));

        let bare = &modules[0].topics[1];
        assert_eq!(bare.status_color, None);
        assert_eq!(bare.url, None);
    }

    #[test]
    fn broken_unit_is_skipped() {
        let units = extract(PROGRESS);
        let names = units.iter().map(|u| u.name.as_deref()).collect::<Vec<_>>();
        assert_eq!(names, [Some("Linear Equations"), Some("Quadratics")]);
    }

    #[test]
    fn segment_without_style() {
        let units = extract(PROGRESS);
        let last = &units[1].progress_segments;
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].width, Extract::Absent);
        assert_eq!(last[0].color, None);
    }
}
