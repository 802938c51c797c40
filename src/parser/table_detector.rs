//! Table detection from ruled line grids.
//!
//! Tables are found by correlating the straight line segments a page drew
//! into rectangular grids: horizontal segments cluster into row
//! boundaries, vertical segments into column boundaries, and text runs
//! whose baseline origin falls inside a cell's box are assigned to that
//! cell. Consumed runs are removed from the free-text pool.

use super::content::{LineSegment, PositionedTextRun};

/// Table detector configuration.
#[derive(Debug, Clone)]
pub struct TableDetectorConfig {
    /// Minimum number of cell rows to accept a grid as a table
    pub min_rows: usize,
    /// Minimum number of cell columns
    pub min_columns: usize,
    /// Distance within which parallel lines merge into one boundary
    pub boundary_merge_tolerance: f32,
    /// Margin for connecting segments into one grid cluster
    pub cluster_margin: f32,
    /// Minimum length for a segment to count as a grid line
    pub min_segment_length: f32,
}

impl Default for TableDetectorConfig {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
            boundary_merge_tolerance: 3.0,
            cluster_margin: 3.0,
            min_segment_length: 4.0,
        }
    }
}

/// A detected table: cell grid plus the bounding box of its rule lines.
#[derive(Debug, Clone)]
pub struct DetectedTable {
    /// Row boundaries, top to bottom (descending y)
    pub row_bounds: Vec<f32>,
    /// Column boundaries, left to right (ascending x)
    pub col_bounds: Vec<f32>,
    /// cells[row][col] owns the runs inside that cell's box
    pub cells: Vec<Vec<Vec<PositionedTextRun>>>,
}

impl DetectedTable {
    pub fn rows(&self) -> usize {
        self.row_bounds.len().saturating_sub(1)
    }

    pub fn columns(&self) -> usize {
        self.col_bounds.len().saturating_sub(1)
    }

    /// Top edge, for reading-order interleaving.
    pub fn top(&self) -> f32 {
        self.row_bounds.first().copied().unwrap_or(0.0)
    }

    pub fn left(&self) -> f32 {
        self.col_bounds.first().copied().unwrap_or(0.0)
    }

    /// Column widths from the boundary positions.
    pub fn column_widths(&self) -> Vec<f32> {
        self.col_bounds.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

/// Detects tables in a page's primitives.
pub struct TableDetector {
    config: TableDetectorConfig,
}

impl TableDetector {
    pub fn new() -> Self {
        Self {
            config: TableDetectorConfig::default(),
        }
    }

    pub fn with_config(config: TableDetectorConfig) -> Self {
        Self { config }
    }

    /// Detect tables among the given segments and assign text runs to
    /// cells. Returns detected tables plus the runs that stayed free.
    pub fn detect(
        &self,
        segments: &[LineSegment],
        runs: Vec<PositionedTextRun>,
    ) -> (Vec<DetectedTable>, Vec<PositionedTextRun>) {
        let grid_segments: Vec<&LineSegment> = segments
            .iter()
            .filter(|s| {
                let length = (s.max_x() - s.min_x()).max(s.max_y() - s.min_y());
                (s.is_horizontal() || s.is_vertical()) && length >= self.config.min_segment_length
            })
            .collect();

        if grid_segments.is_empty() {
            return (Vec::new(), runs);
        }

        let clusters = self.cluster_segments(&grid_segments);
        log::debug!(
            "table detector: {} grid segments in {} clusters",
            grid_segments.len(),
            clusters.len()
        );

        let mut tables = Vec::new();
        let mut free = runs;
        for cluster in clusters {
            let segments: Vec<&LineSegment> =
                cluster.into_iter().map(|i| grid_segments[i]).collect();
            if let Some(grid) = self.grid_from_cluster(&segments) {
                free = self.assign_runs(grid, free, &mut tables);
            }
        }

        (tables, free)
    }

    /// Union segments into clusters of touching bounding boxes.
    fn cluster_segments(&self, segments: &[&LineSegment]) -> Vec<Vec<usize>> {
        let margin = self.config.cluster_margin;
        let mut parent: Vec<usize> = (0..segments.len()).collect();

        fn find(parent: &mut Vec<usize>, i: usize) -> usize {
            let mut root = i;
            while parent[root] != root {
                root = parent[root];
            }
            let mut walk = i;
            while parent[walk] != root {
                let next = parent[walk];
                parent[walk] = root;
                walk = next;
            }
            root
        }

        for i in 0..segments.len() {
            for j in (i + 1)..segments.len() {
                let (a, b) = (segments[i], segments[j]);
                let touch = a.min_x() - margin <= b.max_x()
                    && b.min_x() - margin <= a.max_x()
                    && a.min_y() - margin <= b.max_y()
                    && b.min_y() - margin <= a.max_y();
                if touch {
                    let (ra, rb) = (find(&mut parent, i), find(&mut parent, j));
                    if ra != rb {
                        parent[ra] = rb;
                    }
                }
            }
        }

        let mut clusters: std::collections::HashMap<usize, Vec<usize>> =
            std::collections::HashMap::new();
        for i in 0..segments.len() {
            let root = find(&mut parent, i);
            clusters.entry(root).or_default().push(i);
        }
        let mut out: Vec<Vec<usize>> = clusters.into_values().collect();
        out.sort_by_key(|c| c.first().copied().unwrap_or(0));
        out
    }

    /// Derive row/column boundaries from one cluster's segments.
    fn grid_from_cluster(&self, segments: &[&LineSegment]) -> Option<(Vec<f32>, Vec<f32>)> {
        let mut row_levels: Vec<f32> = Vec::new();
        let mut col_levels: Vec<f32> = Vec::new();
        for segment in segments {
            if segment.is_horizontal() {
                merge_level(&mut row_levels, segment.y1, self.config.boundary_merge_tolerance);
            } else if segment.is_vertical() {
                merge_level(&mut col_levels, segment.x1, self.config.boundary_merge_tolerance);
            }
        }

        // N cell rows need N+1 boundaries.
        if row_levels.len() <= self.config.min_rows || col_levels.len() <= self.config.min_columns {
            return None;
        }

        row_levels.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        col_levels.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        Some((row_levels, col_levels))
    }

    /// Move the runs inside the grid's box into cells, keep the rest free.
    fn assign_runs(
        &self,
        (row_bounds, col_bounds): (Vec<f32>, Vec<f32>),
        runs: Vec<PositionedTextRun>,
        tables: &mut Vec<DetectedTable>,
    ) -> Vec<PositionedTextRun> {
        let rows = row_bounds.len() - 1;
        let cols = col_bounds.len() - 1;
        let mut cells: Vec<Vec<Vec<PositionedTextRun>>> =
            vec![vec![Vec::new(); cols]; rows];
        let mut free = Vec::with_capacity(runs.len());

        let top = row_bounds[0];
        let bottom = row_bounds[rows];
        let left = col_bounds[0];
        let right = col_bounds[cols];

        let mut consumed = 0usize;
        for run in runs {
            let inside = run.x >= left && run.x <= right && run.y >= bottom && run.y <= top;
            if !inside {
                free.push(run);
                continue;
            }
            let row = row_bounds
                .windows(2)
                .position(|w| run.y <= w[0] && run.y >= w[1])
                .unwrap_or(rows - 1);
            let col = col_bounds
                .windows(2)
                .position(|w| run.x >= w[0] && run.x <= w[1])
                .unwrap_or(cols - 1);
            cells[row][col].push(run);
            consumed += 1;
        }

        if consumed == 0 {
            // A grid with no text in it is a drawing, not a table.
            return free;
        }

        log::debug!(
            "table detector: {}x{} grid consumed {} runs",
            rows,
            cols,
            consumed
        );
        tables.push(DetectedTable {
            row_bounds,
            col_bounds,
            cells,
        });
        free
    }
}

impl Default for TableDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Insert a level unless an existing one is within `tolerance`.
fn merge_level(levels: &mut Vec<f32>, value: f32, tolerance: f32) {
    if !levels.iter().any(|&l| (l - value).abs() <= tolerance) {
        levels.push(value);
    }
}
