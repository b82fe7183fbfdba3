use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};

use crate::model::{Extract, Points, ProgressSegment};

static POINTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([+-]?\d+)\s*/\s*([+-]?\d+)\s*(?:XP|$)").unwrap());

/// Full text content of an element, trimmed.
pub fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_owned()
}

/// Trimmed text of the first descendant matching `selector`.
pub fn text_in(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    element.select(selector).next().map(text_of)
}

#[allow(clippy::unwrap_used)]
pub fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

/// Parses the `earned/possible XP` label of a task.
pub fn parse_points(text: &str) -> Points {
    let raw_text = Some(text.trim().to_owned());
    let parsed = POINTS.captures(text).and_then(|cap| {
        let earned = cap.get(1)?.as_str().parse().ok()?;
        let possible = cap.get(2)?.as_str().parse().ok()?;
        Some((earned, possible))
    });

    if let Some((earned, possible)) = parsed {
        Points {
            earned: Extract::Value(earned),
            possible: Extract::Value(possible),
            raw_text,
        }
    } else {
        tracing::warn!(target: "activity", "could not parse points from text: {text:?}");
        Points {
            earned: Extract::Failed,
            possible: Extract::Failed,
            raw_text,
        }
    }
}

/// Looks up one declaration of an inline `style` attribute.
pub fn style_value<'a>(style: &'a str, property: &str) -> Option<&'a str> {
    style.split(';').find_map(|decl| {
        let (name, value) = decl.split_once(':')?;
        name.trim()
            .eq_ignore_ascii_case(property)
            .then(|| value.trim())
            .filter(|v| !v.is_empty())
    })
}

/// Recovers a progress-bar cell from `width: N%; background-color: C`.
pub fn parse_style(style: &str) -> ProgressSegment {
    let width = match style_value(style, "width") {
        Some(w) => w
            .trim_end_matches('%')
            .trim()
            .parse()
            .map_or(Extract::Failed, Extract::Value),
        None => Extract::Absent,
    };
    let color = style_value(style, "background-color").map(Into::into);

    ProgressSegment { width, color }
}

/// `student-1234` -> `1234`
pub fn student_id(element_id: &str) -> Option<&str> {
    element_id.split('-').nth(1).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_well_formed() {
        let p = parse_points("6/4 XP");
        assert_eq!(p.earned, Extract::Value(6));
        assert_eq!(p.possible, Extract::Value(4));
        assert_eq!(p.raw_text.as_deref(), Some("6/4 XP"));

        let p = parse_points("  12 / 10XP ");
        assert_eq!(p.earned, Extract::Value(12));
        assert_eq!(p.possible, Extract::Value(10));
        assert_eq!(p.raw_text.as_deref(), Some("12 / 10XP"));
    }

    #[test]
    fn points_malformed() {
        for text in ["-- XP", "", "6 XP", "a/b XP"] {
            let p = parse_points(text);
            assert_eq!(p.earned, Extract::Failed, "{text:?}");
            assert_eq!(p.possible, Extract::Failed, "{text:?}");
            assert_eq!(p.earned.value(), None);
        }
    }

    #[test]
    fn style_full() {
        let seg = parse_style("width: 37.5%; background-color: #ff0000;");
        assert_eq!(seg.width, Extract::Value(37.5));
        assert_eq!(seg.color.as_deref(), Some("#ff0000"));
    }

    #[test]
    fn style_missing_attributes() {
        let seg = parse_style("background-color: rgb(1, 2, 3)");
        assert_eq!(seg.width, Extract::Absent);
        assert_eq!(seg.color.as_deref(), Some("rgb(1, 2, 3)"));

        let seg = parse_style("width:12%");
        assert_eq!(seg.width, Extract::Value(12.0));
        assert_eq!(seg.color, None);

        let seg = parse_style("width: wide");
        assert_eq!(seg.width, Extract::Failed);
    }

    #[test]
    fn background_is_not_background_color() {
        let style = "background-color: #111; background: #222";
        assert_eq!(style_value(style, "background"), Some("#222"));
        assert_eq!(style_value("background-color: #111", "background"), None);
    }

    #[test]
    fn student_ids() {
        assert_eq!(student_id("student-1234"), Some("1234"));
        assert_eq!(student_id("student"), None);
        assert_eq!(student_id("student-"), None);
    }
}
