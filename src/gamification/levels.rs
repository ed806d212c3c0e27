//! Level thresholds
//!
//! Level is a pure function of total points: the highest threshold not
//! exceeding the point total. The table is sorted ascending.

/// (minimum points, level name), sorted by points
pub const LEVELS: &[(i64, &str)] = &[
    (0, "Newcomer"),
    (50, "Helper"),
    (150, "Friend"),
    (300, "Guardian"),
    (500, "Champion"),
    (750, "Hero"),
    (1000, "Legend"),
];

/// The highest level whose threshold does not exceed `points`
pub fn calculate_level(points: i64) -> &'static str {
    let mut current = LEVELS[0].1;
    for &(min_points, name) in LEVELS {
        if points >= min_points {
            current = name;
        } else {
            break;
        }
    }
    current
}

/// Index of a level name in the table; used to detect level-ups
pub fn level_index(name: &str) -> usize {
    LEVELS
        .iter()
        .position(|&(_, level)| level == name)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_boundaries() {
        assert_eq!(calculate_level(0), "Newcomer");
        assert_eq!(calculate_level(49), "Newcomer");
        assert_eq!(calculate_level(50), "Helper");
        assert_eq!(calculate_level(149), "Helper");
        assert_eq!(calculate_level(150), "Friend");
        assert_eq!(calculate_level(300), "Guardian");
        assert_eq!(calculate_level(500), "Champion");
        assert_eq!(calculate_level(750), "Hero");
        assert_eq!(calculate_level(1000), "Legend");
        assert_eq!(calculate_level(1_000_000), "Legend");
    }

    #[test]
    fn test_level_is_non_decreasing_in_points() {
        let mut last = 0;
        for points in 0..1200 {
            let idx = level_index(calculate_level(points));
            assert!(idx >= last, "level regressed at {} points", points);
            last = idx;
        }
    }

    #[test]
    fn test_table_is_sorted() {
        for pair in LEVELS.windows(2) {
            assert!(pair[0].0 < pair[1].0);
        }
    }
}
