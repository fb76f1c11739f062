//! Lattice table detection from ruling lines.
//!
//! Horizontal and vertical segments that touch are grouped into connected
//! components. A component with at least two distinct x edges and two
//! distinct y edges forms a grid; every text run is placed in the cell
//! containing its origin.
use crate::pdf::layout::{Segment, TextRun};

/// A detected grid with its cell texts, top row first.
#[derive(Debug, Clone, PartialEq)]
pub struct LatticeTable {
    /// Column edges, left to right
    pub xs: Vec<f32>,
    /// Row edges, top to bottom
    pub ys: Vec<f32>,
    pub rows: Vec<Vec<String>>,
}

impl LatticeTable {
    #[inline]
    pub fn top(&self) -> f32 {
        self.ys.first().copied().unwrap_or_default()
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.xs.first().copied().unwrap_or_default()
    }

    fn contains(&self, x: f32, y: f32, tolerance: f32) -> bool {
        let (Some(&left), Some(&right)) = (self.xs.first(), self.xs.last()) else {
            return false;
        };
        let (Some(&top), Some(&bottom)) = (self.ys.first(), self.ys.last()) else {
            return false;
        };
        x >= left - tolerance && x <= right + tolerance && y <= top + tolerance && y >= bottom - tolerance
    }

    fn cell_of(&self, x: f32, y: f32) -> (usize, usize) {
        let cols = self.xs.len() - 1;
        let rows = self.ys.len() - 1;
        let col = self.xs[1..].iter().position(|&edge| x < edge).unwrap_or(cols - 1);
        let row = self.ys[1..].iter().position(|&edge| y > edge).unwrap_or(rows - 1);
        (row, col)
    }
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    /// Constant coordinate: y for horizontal edges, x for vertical ones
    at: f32,
    from: f32,
    to: f32,
    horizontal: bool,
}

impl Edge {
    fn from_segment(segment: &Segment, tolerance: f32) -> Option<Self> {
        if segment.is_horizontal(tolerance) {
            Some(Self {
                at: (segment.y1 + segment.y2) / 2.0,
                from: segment.x1.min(segment.x2),
                to: segment.x1.max(segment.x2),
                horizontal: true,
            })
        } else if segment.is_vertical(tolerance) {
            Some(Self {
                at: (segment.x1 + segment.x2) / 2.0,
                from: segment.y1.min(segment.y2),
                to: segment.y1.max(segment.y2),
                horizontal: false,
            })
        } else {
            None
        }
    }

    fn touches(&self, other: &Edge, tolerance: f32) -> bool {
        if self.horizontal == other.horizontal {
            (self.at - other.at).abs() <= tolerance
                && self.from <= other.to + tolerance
                && other.from <= self.to + tolerance
        } else {
            other.at >= self.from - tolerance
                && other.at <= self.to + tolerance
                && self.at >= other.from - tolerance
                && self.at <= other.to + tolerance
        }
    }
}

/// Detect lattice tables, ordered top to bottom then left to right.
pub fn detect_tables(runs: &[TextRun], segments: &[Segment], tolerance: f32) -> Vec<LatticeTable> {
    let edges: Vec<Edge> = segments
        .iter()
        .filter_map(|s| Edge::from_segment(s, tolerance))
        .filter(|e| e.to - e.from > tolerance)
        .collect();

    let mut tables: Vec<LatticeTable> = components(&edges, tolerance)
        .into_iter()
        .filter_map(|members| {
            let xs = cluster(members.iter().filter(|e| !e.horizontal).map(|e| e.at), tolerance);
            let mut ys = cluster(members.iter().filter(|e| e.horizontal).map(|e| e.at), tolerance);
            ys.reverse();
            (xs.len() >= 2 && ys.len() >= 2).then(|| {
                let rows = vec![vec![String::new(); xs.len() - 1]; ys.len() - 1];
                LatticeTable { xs, ys, rows }
            })
        })
        .collect();

    for table in &mut tables {
        let mut last_y: Vec<Vec<Option<f32>>> = vec![vec![None; table.xs.len() - 1]; table.ys.len() - 1];
        for run in runs {
            let text = run.text.trim();
            if text.is_empty() || !table.contains(run.x, run.y, tolerance) {
                continue;
            }
            let (row, col) = table.cell_of(run.x, run.y);
            let cell = &mut table.rows[row][col];
            match last_y[row][col] {
                None => {},
                Some(y) if (y - run.y).abs() <= tolerance => cell.push(' '),
                Some(_) => cell.push('\n'),
            }
            cell.push_str(text);
            last_y[row][col] = Some(run.y);
        }
    }

    tables.sort_by(|a, b| b.top().total_cmp(&a.top()).then(a.left().total_cmp(&b.left())));
    tables
}

/// Connected components of touching edges.
fn components(edges: &[Edge], tolerance: f32) -> Vec<Vec<Edge>> {
    let mut parent: Vec<usize> = (0..edges.len()).collect();
    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }
    for i in 0..edges.len() {
        for j in i + 1..edges.len() {
            if edges[i].touches(&edges[j], tolerance) {
                let (a, b) = (find(&mut parent, i), find(&mut parent, j));
                if a != b {
                    parent[b] = a;
                }
            }
        }
    }
    let mut groups: Vec<(usize, Vec<Edge>)> = Vec::new();
    for (i, edge) in edges.iter().enumerate() {
        let root = find(&mut parent, i);
        match groups.iter_mut().find(|(r, _)| *r == root) {
            Some((_, members)) => members.push(*edge),
            None => groups.push((root, vec![*edge])),
        }
    }
    groups.into_iter().map(|(_, members)| members).collect()
}

/// Sorted distinct values, merging those within `tolerance` into their mean.
fn cluster(values: impl Iterator<Item = f32>, tolerance: f32) -> Vec<f32> {
    let mut values: Vec<f32> = values.collect();
    values.sort_by(f32::total_cmp);
    let mut clusters: Vec<(f32, usize)> = Vec::new();
    for v in values {
        match clusters.last_mut() {
            Some((sum, n)) if v - *sum / *n as f32 <= tolerance => {
                *sum += v;
                *n += 1;
            },
            _ => clusters.push((v, 1)),
        }
    }
    clusters.into_iter().map(|(sum, n)| sum / n as f32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str, x: f32, y: f32) -> TextRun {
        TextRun {
            text: text.to_string(),
            x,
            y,
            font: None,
            size: 10.0,
            bold: false,
            italic: false,
            text_object: 0,
            adjoins_previous: false,
        }
    }

    fn rect(x: f32, y: f32, w: f32, h: f32) -> Vec<Segment> {
        let c = [(x, y), (x + w, y), (x + w, y + h), (x, y + h)];
        (0..4)
            .map(|i| Segment {
                x1: c[i].0,
                y1: c[i].1,
                x2: c[(i + 1) % 4].0,
                y2: c[(i + 1) % 4].1,
            })
            .collect()
    }

    #[test]
    fn test_two_by_two_grid() {
        let mut segments = rect(72.0, 550.0, 100.0, 50.0);
        segments.extend(rect(172.0, 550.0, 100.0, 50.0));
        segments.extend(rect(72.0, 500.0, 100.0, 50.0));
        segments.extend(rect(172.0, 500.0, 100.0, 50.0));
        let runs = [
            run("Title", 72.0, 720.0),
            run("a", 80.0, 570.0),
            run("b", 180.0, 570.0),
            run("c", 80.0, 520.0),
            run("d", 180.0, 520.0),
            run("more", 80.0, 508.0),
        ];
        let tables = detect_tables(&runs, &segments, 2.0);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].xs, [72.0, 172.0, 272.0]);
        assert_eq!(tables[0].ys, [600.0, 550.0, 500.0]);
        assert_eq!(tables[0].rows, [["a", "b"], ["c\nmore", "d"]]);
    }

    #[test]
    fn test_single_cell_and_separate_tables() {
        let mut segments = rect(0.0, 100.0, 50.0, 20.0);
        segments.extend(rect(0.0, 400.0, 50.0, 20.0));
        let runs = [run("low", 5.0, 105.0), run("high", 5.0, 405.0)];
        let tables = detect_tables(&runs, &segments, 2.0);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].rows, [["high"]]);
        assert_eq!(tables[1].rows, [["low"]]);
    }

    #[test]
    fn test_lines_without_grid() {
        let segments = [
            Segment { x1: 0.0, y1: 10.0, x2: 100.0, y2: 10.0 },
            Segment { x1: 0.0, y1: 30.0, x2: 100.0, y2: 30.0 },
        ];
        assert!(detect_tables(&[], &segments, 2.0).is_empty());
    }
}
