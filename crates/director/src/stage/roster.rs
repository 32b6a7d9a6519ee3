//! On-screen figure roster.
//!
//! Tracks which character models are displayed, the stable id the renderer
//! knows each one by, and where each stands. The roster is diffed against
//! the characters named in each reply paragraph.

use rand::Rng;
use serde::Serialize;
use vnchat_config::StageLayout;

/// Ids are drawn from `0..MAX_FIGURES`.
pub const MAX_FIGURES: u32 = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Renderer transform JSON for this position.
    pub fn transform_json(&self) -> String {
        format!(r#"{{"position":{{"x":{},"y":{}}}}}"#, self.x, self.y)
    }
}

/// A displayed character model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenEntity {
    pub id: u32,
    pub path: String,
    pub position: Point,
    /// Where the renderer last placed the figure
    pub last_position: Point,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Roster {
    entities: Vec<ScreenEntity>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entities(&self) -> &[ScreenEntity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn by_path(&self, path: &str) -> Option<&ScreenEntity> {
        self.entities.iter().find(|e| e.path == path)
    }

    pub fn by_path_mut(&mut self, path: &str) -> Option<&mut ScreenEntity> {
        self.entities.iter_mut().find(|e| e.path == path)
    }

    /// Remove every entity whose path is not in `keep`.
    ///
    /// Returns the removed ids in roster order.
    pub fn remove_absent(&mut self, keep: &[String]) -> Vec<u32> {
        let absent: Vec<usize> = (0..self.entities.len())
            .filter(|&index| !keep.contains(&self.entities[index].path))
            .collect();
        let removed = absent.iter().map(|&index| self.entities[index].id).collect();
        for &index in absent.iter().rev() {
            self.entities.remove(index);
        }
        removed
    }

    /// Add an entity for every path not yet on screen, each at a random slot.
    ///
    /// # Panics
    ///
    /// Panics if every id below [`MAX_FIGURES`] is taken.
    pub fn add_missing<R: Rng + ?Sized>(&mut self, paths: &[String], rng: &mut R) -> Vec<u32> {
        let mut added = Vec::new();
        for path in paths {
            if self.by_path(path).is_some() {
                continue;
            }
            let id = self.next_free_id();
            let slot = rng.random_range(0..=self.entities.len());
            self.entities.insert(
                slot,
                ScreenEntity {
                    id,
                    path: path.clone(),
                    position: Point::default(),
                    last_position: Point::default(),
                },
            );
            added.push(id);
        }
        added
    }

    /// Smallest id not in use.
    ///
    /// # Panics
    ///
    /// Panics if every id below [`MAX_FIGURES`] is taken.
    pub fn next_free_id(&self) -> u32 {
        (0..MAX_FIGURES)
            .find(|id| self.entities.iter().all(|e| e.id != *id))
            .unwrap_or_else(|| {
                panic!(
                    "screen figure ids exhausted: {} figures on stage",
                    self.entities.len()
                )
            })
    }

    /// Spread entities evenly between the borders, centred; y is always 0.
    pub fn layout(&mut self, layout: &StageLayout) {
        let count = self.entities.len();
        if count == 0 {
            return;
        }

        let width = layout.border_right - layout.border_left;
        let gap = if count > 1 {
            layout.character_gap.min(width / (count - 1) as f64)
        } else {
            0.0
        };
        let start = layout.border_left + (width - (count - 1) as f64 * gap) / 2.0;

        for (i, entity) in self.entities.iter_mut().enumerate() {
            let x = if count == 1 {
                layout.border_left + width / 2.0
            } else {
                start + i as f64 * gap
            };
            entity.position = Point { x, y: 0.0 };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn paths(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn xs(roster: &Roster) -> Vec<f64> {
        roster.entities().iter().map(|e| e.position.x).collect()
    }

    #[test]
    fn ids_are_smallest_free() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut roster = Roster::new();
        roster.add_missing(&paths(&["a", "b", "c"]), &mut rng);
        let mut ids: Vec<u32> = roster.entities().iter().map(|e| e.id).collect();
        ids.sort();
        assert_eq!(ids, vec![0, 1, 2]);

        let b_id = roster.by_path("b").unwrap().id;
        let removed = roster.remove_absent(&paths(&["a", "c"]));
        assert_eq!(removed, vec![b_id]);

        let added = roster.add_missing(&paths(&["a", "c", "d"]), &mut rng);
        assert_eq!(added, vec![b_id]);
        assert_eq!(roster.by_path("d").unwrap().id, b_id);
    }

    #[test]
    fn existing_paths_are_not_duplicated() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut roster = Roster::new();
        roster.add_missing(&paths(&["a", "a"]), &mut rng);
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn remove_reports_ids_in_roster_order() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut roster = Roster::new();
        roster.add_missing(&paths(&["a", "b", "c"]), &mut rng);
        let order: Vec<u32> = roster.entities().iter().map(|e| e.id).collect();
        assert_eq!(roster.remove_absent(&[]), order);
        assert!(roster.is_empty());
    }

    #[test]
    fn remove_keeps_survivors_in_place() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut roster = Roster::new();
        roster.add_missing(&paths(&["a", "b", "c", "d"]), &mut rng);
        let keep = paths(&["b", "d"]);
        let expected_removed: Vec<u32> = roster
            .entities()
            .iter()
            .filter(|e| !keep.contains(&e.path))
            .map(|e| e.id)
            .collect();
        let expected_left: Vec<String> = roster
            .entities()
            .iter()
            .filter(|e| keep.contains(&e.path))
            .map(|e| e.path.clone())
            .collect();

        assert_eq!(roster.remove_absent(&keep), expected_removed);
        let left: Vec<String> = roster.entities().iter().map(|e| e.path.clone()).collect();
        assert_eq!(left, expected_left);
    }

    #[test]
    fn three_figures_centered() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut roster = Roster::new();
        roster.add_missing(&paths(&["a", "b", "c"]), &mut rng);
        roster.layout(&StageLayout::default());
        assert_eq!(xs(&roster), vec![-600.0, 0.0, 600.0]);
        assert!(roster.entities().iter().all(|e| e.position.y == 0.0));
    }

    #[test]
    fn single_figure_at_midpoint() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut roster = Roster::new();
        roster.add_missing(&paths(&["a"]), &mut rng);
        roster.layout(&StageLayout {
            border_left: -1000.0,
            border_right: 600.0,
            ..StageLayout::default()
        });
        assert_eq!(xs(&roster), vec![-200.0]);
    }

    #[test]
    fn crowded_stage_shrinks_gap() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut roster = Roster::new();
        roster.add_missing(&paths(&["a", "b", "c", "d", "e", "f"]), &mut rng);
        roster.layout(&StageLayout::default());
        // 2600 / 5 = 520 < 600
        assert_eq!(
            xs(&roster),
            vec![-1300.0, -780.0, -260.0, 260.0, 780.0, 1300.0]
        );
    }

    #[test]
    fn transform_json_format() {
        assert_eq!(
            Point { x: -600.0, y: 0.0 }.transform_json(),
            r#"{"position":{"x":-600,"y":0}}"#
        );
        assert_eq!(
            Point { x: 12.5, y: 0.0 }.transform_json(),
            r#"{"position":{"x":12.5,"y":0}}"#
        );
    }

    #[test]
    #[should_panic(expected = "ids exhausted")]
    fn id_exhaustion_panics() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut roster = Roster::new();
        let all: Vec<String> = (0..MAX_FIGURES).map(|i| format!("fig{i}")).collect();
        roster.add_missing(&all, &mut rng);
        roster.add_missing(&paths(&["one too many"]), &mut rng);
    }
}
