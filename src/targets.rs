use std::{io, path::Path};

use hashbrown::HashSet;

pub type Targets = HashSet<String>;

/// One name per line; blank lines and `#` comments are skipped.
pub fn parse_targets(text: &str) -> Targets {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ToOwned::to_owned)
        .collect()
}

pub fn load_targets(path: &Path) -> io::Result<Targets> {
    let targets = parse_targets(&std::fs::read_to_string(path)?);
    if targets.is_empty() {
        tracing::warn!(target: "targets", "no target students found in {}", path.display());
    } else {
        tracing::info!(target: "targets", "loaded {} target students", targets.len());
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_and_blanks_are_skipped() {
        let text = "# roster for period 3\n\nAlice Smith\n   Bob Jones  \n  # Carol (moved)\n\t\nDan\nAlice Smith\n";
        let targets = parse_targets(text);
        let expected: Targets = ["Alice Smith", "Bob Jones", "Dan"]
            .into_iter()
            .map(ToOwned::to_owned)
            .collect();
        assert_eq!(targets, expected);
    }

    #[test]
    fn only_comments_is_empty() {
        assert!(parse_targets("# nobody\n\n#\n").is_empty());
    }

    #[test]
    fn missing_file_is_an_error() {
        let path = std::env::temp_dir().join("pscr-targets-does-not-exist.txt");
        assert!(load_targets(&path).is_err());
    }
}
