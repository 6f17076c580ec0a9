//! CSV export of the current library view.

use std::path::Path;

use anyhow::{Context, Result};

use crate::models::GameRecord;

const CSV_HEADER: &str = "Name,Playtime (Hours),Last Played,Playtime Last 2 Weeks (Hours)";

/// Render records as CSV, header first, one row per record.
///
/// Names are always quoted with embedded quotes doubled; numeric and
/// date columns are emitted bare.
pub fn to_csv(games: &[GameRecord]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for game in games {
        out.push_str(&format!(
            "{},{},{},{}\n",
            quote(&game.name),
            game.hours_forever(),
            game.last_played_label(),
            game.two_week_hours(),
        ));
    }
    out
}

/// Write the CSV rendering of `games` to `path`.
pub fn write_csv(games: &[GameRecord], path: &Path) -> Result<()> {
    std::fs::write(path, to_csv(games))
        .with_context(|| format!("writing CSV export {}", path.display()))
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn game(name: &str, minutes: u32) -> GameRecord {
        GameRecord {
            app_id: 1,
            name: name.to_string(),
            playtime_forever: minutes,
            ..GameRecord::default()
        }
    }

    #[test]
    fn header_matches_column_layout() {
        let csv = to_csv(&[]);
        assert_eq!(
            csv,
            "Name,Playtime (Hours),Last Played,Playtime Last 2 Weeks (Hours)\n"
        );
    }

    #[test]
    fn names_are_quoted_and_quotes_doubled() {
        let mut g = game("Say \"Hello\", World", 125);
        g.last_played = Some(1_700_000_000);
        g.playtime_two_weeks = Some(61);
        let csv = to_csv(&[g]);
        let row = csv.lines().nth(1).expect("one data row");
        assert_eq!(row, "\"Say \"\"Hello\"\", World\",2,2023-11-14,1");
    }

    #[test]
    fn never_played_row_reads_never() {
        let csv = to_csv(&[game("Quiet", 0)]);
        let row = csv.lines().nth(1).expect("one data row");
        assert_eq!(row, "\"Quiet\",0,Never,0");
    }

    #[test]
    fn export_writes_to_disk() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("library.csv");
        write_csv(&[game("Portal", 60)], &path).expect("write succeeds");
        let written = std::fs::read_to_string(&path).expect("read back");
        assert!(written.ends_with("\"Portal\",1,Never,0\n"));
    }
}
