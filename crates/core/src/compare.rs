//! Library comparison between two profiles.

use std::collections::HashSet;

use crate::models::GameRecord;

/// Result of comparing two libraries by title name.
#[derive(Debug, Clone, Default)]
pub struct Comparison {
    /// Titles present in both libraries, in the first library's order.
    pub common: Vec<GameRecord>,
    /// Titles only the first library has, in its order.
    pub only_a: Vec<GameRecord>,
    /// Titles only the second library has, in its order.
    pub only_b: Vec<GameRecord>,
}

impl Comparison {
    /// Partition two libraries by name membership.
    ///
    /// Duplicate names within a library count once, keeping the first
    /// occurrence.
    pub fn between(a: &[GameRecord], b: &[GameRecord]) -> Self {
        let names_a: HashSet<&str> = a.iter().map(|g| g.name.as_str()).collect();
        let names_b: HashSet<&str> = b.iter().map(|g| g.name.as_str()).collect();

        let mut comparison = Comparison::default();
        let mut seen = HashSet::new();
        for game in a {
            if !seen.insert(game.name.as_str()) {
                continue;
            }
            if names_b.contains(game.name.as_str()) {
                comparison.common.push(game.clone());
            } else {
                comparison.only_a.push(game.clone());
            }
        }
        seen.clear();
        for game in b {
            if !seen.insert(game.name.as_str()) {
                continue;
            }
            if !names_a.contains(game.name.as_str()) {
                comparison.only_b.push(game.clone());
            }
        }
        comparison
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(name: &str) -> GameRecord {
        GameRecord {
            app_id: 1,
            name: name.to_string(),
            ..GameRecord::default()
        }
    }

    fn names(games: &[GameRecord]) -> Vec<&str> {
        games.iter().map(|g| g.name.as_str()).collect()
    }

    #[test]
    fn partitions_follow_first_library_order() {
        let a = vec![game("Portal"), game("Hades"), game("Celeste")];
        let b = vec![game("Celeste"), game("Factorio"), game("Portal")];
        let cmp = Comparison::between(&a, &b);
        assert_eq!(names(&cmp.common), vec!["Portal", "Celeste"]);
        assert_eq!(names(&cmp.only_a), vec!["Hades"]);
        assert_eq!(names(&cmp.only_b), vec!["Factorio"]);
    }

    #[test]
    fn duplicates_count_once() {
        let a = vec![game("Portal"), game("Portal")];
        let b = vec![game("Portal")];
        let cmp = Comparison::between(&a, &b);
        assert_eq!(cmp.common.len(), 1);
        assert!(cmp.only_a.is_empty());
        assert!(cmp.only_b.is_empty());
    }

    #[test]
    fn empty_sides_are_handled() {
        let a = vec![game("Portal")];
        let cmp = Comparison::between(&a, &[]);
        assert!(cmp.common.is_empty());
        assert_eq!(cmp.only_a.len(), 1);
        assert!(cmp.only_b.is_empty());
    }
}
