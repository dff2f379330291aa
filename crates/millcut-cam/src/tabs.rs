//! Splitting tool paths over holding tabs.
//!
//! The emitter raises the cutter over tabs rather than cutting through
//! them. [`separate_tabs`] cuts one tool path into alternating sub-paths:
//! even indices are outside every tab, odd indices cross one. Neighbouring
//! sub-paths share their boundary vertex, so concatenating all outputs
//! reconstructs the input with the crossing points inserted in order.

use millcut_geometry::{contains_point, segment_path_crossings, FillRule, Path, Paths, Point};

/// Splits `cutter_path` against the (already bloated) tab soup.
///
/// A segment lying exactly on a tab boundary counts as outside; tangent
/// touches do not split. When the path starts inside a tab an empty
/// sub-path is prepended so even indices always mean "outside tabs".
pub fn separate_tabs(cutter_path: &[Point], tabs: &[Path]) -> Vec<Path> {
    if tabs.is_empty() || cutter_path.is_empty() {
        return vec![cutter_path.to_vec()];
    }
    let mut result: Paths = Vec::new();
    if contains_point(tabs, cutter_path[0], FillRule::EvenOdd) {
        result.push(Vec::new());
    }
    let mut current: Path = vec![cutter_path[0]];
    for w in cutter_path.windows(2) {
        let (p, q) = (w[0], w[1]);
        for ip in segment_path_crossings(p, q, tabs) {
            if current.last() != Some(&ip) {
                current.push(ip);
            }
            result.push(std::mem::replace(&mut current, vec![ip]));
        }
        if current.last() != Some(&q) {
            current.push(q);
        }
    }
    result.push(current);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tab(x0: i64, y0: i64, w: i64, h: i64) -> Path {
        vec![
            Point::new(x0, y0),
            Point::new(x0 + w, y0),
            Point::new(x0 + w, y0 + h),
            Point::new(x0, y0 + h),
        ]
    }

    #[test]
    fn test_no_tabs_passes_through() {
        let path = vec![Point::new(0, 0), Point::new(10, 0)];
        assert_eq!(separate_tabs(&path, &[]), vec![path.clone()]);
    }

    #[test]
    fn test_straight_path_over_one_tab() {
        let path = vec![Point::new(0, 0), Point::new(10, 0)];
        let tabs = vec![tab(4, -1, 2, 2)];
        let subs = separate_tabs(&path, &tabs);
        assert_eq!(
            subs,
            vec![
                vec![Point::new(0, 0), Point::new(4, 0)],
                vec![Point::new(4, 0), Point::new(6, 0)],
                vec![Point::new(6, 0), Point::new(10, 0)],
            ]
        );
    }

    #[test]
    fn test_start_inside_tab_prepends_empty() {
        let path = vec![Point::new(5, 0), Point::new(10, 0)];
        let tabs = vec![tab(4, -1, 2, 2)];
        let subs = separate_tabs(&path, &tabs);
        assert_eq!(subs.len(), 3);
        assert!(subs[0].is_empty());
        assert_eq!(subs[1], vec![Point::new(5, 0), Point::new(6, 0)]);
        assert_eq!(subs[2], vec![Point::new(6, 0), Point::new(10, 0)]);
    }

    #[test]
    fn test_two_tabs_in_order() {
        let path = vec![Point::new(0, 0), Point::new(100, 0)];
        let tabs = vec![tab(20, -5, 10, 10), tab(60, -5, 10, 10)];
        let subs = separate_tabs(&path, &tabs);
        assert_eq!(subs.len(), 5);
        assert_eq!(subs[1], vec![Point::new(20, 0), Point::new(30, 0)]);
        assert_eq!(subs[3], vec![Point::new(60, 0), Point::new(70, 0)]);
        // Even indices are outside every tab.
        for (i, sub) in subs.iter().enumerate() {
            for w in sub.windows(2) {
                let mid = Point::new((w[0].x + w[1].x) / 2, (w[0].y + w[1].y) / 2);
                assert_eq!(
                    contains_point(&tabs, mid, FillRule::EvenOdd),
                    i % 2 == 1,
                    "sub {i} on the wrong side"
                );
            }
        }
    }

    #[test]
    fn test_segment_on_boundary_is_outside() {
        let path = vec![Point::new(0, 1), Point::new(10, 1)];
        let tabs = vec![tab(4, -1, 2, 2)];
        assert_eq!(separate_tabs(&path, &tabs), vec![path.clone()]);
    }

    #[test]
    fn test_tangent_touch_does_not_split() {
        // The path touches the tab corner without entering it.
        let path = vec![Point::new(0, 0), Point::new(4, 1), Point::new(8, 0)];
        let tabs = vec![tab(3, 1, 2, 2)];
        assert_eq!(separate_tabs(&path, &tabs), vec![path.clone()]);
    }

    #[test]
    fn test_concatenation_reconstructs_path() {
        let path = vec![
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(0, 10),
            Point::new(0, 0),
        ];
        let tabs = vec![tab(4, -2, 2, 4), tab(8, 4, 4, 2)];
        let subs = separate_tabs(&path, &tabs);
        assert!(subs.len() >= 5);
        let mut rebuilt: Path = Vec::new();
        for sub in &subs {
            for &p in sub {
                if rebuilt.last() != Some(&p) {
                    rebuilt.push(p);
                }
            }
        }
        // Removing the inserted crossing points leaves the original.
        let originals: Path = rebuilt
            .iter()
            .copied()
            .filter(|p| path.contains(p))
            .collect();
        assert_eq!(originals, path);
        // And every inserted point lies on a tab boundary.
        for p in rebuilt.iter().filter(|p| !path.contains(p)) {
            use millcut_geometry::{locate_point, PointLocation};
            assert_eq!(
                locate_point(&tabs, *p, FillRule::EvenOdd),
                PointLocation::OnBoundary
            );
        }
    }

    #[test]
    fn test_splitting_even_pieces_again_is_identity() {
        let path = vec![Point::new(0, 0), Point::new(10, 0)];
        let tabs = vec![tab(4, -1, 2, 2)];
        let subs = separate_tabs(&path, &tabs);
        for (i, sub) in subs.iter().enumerate().step_by(2) {
            assert_eq!(separate_tabs(sub, &tabs), vec![sub.clone()], "sub {i}");
        }
    }
}
