use glam::{I64Vec3, IVec3, Vec3};
use std::collections::HashMap;
use std::hash::Hash;

#[derive(Clone, Debug)]
/// Uniform hash grid over 3D points for radius queries.
///
/// Unlike a bounded grid, cells are allocated lazily in a hash map keyed by
/// integer cell coordinates, so any finite point can be stored. The grid
/// knows nothing about the geometry of what it stores beyond the point given
/// at insertion: radius queries prune by cell and leave the exact membership
/// test to a caller-supplied metric.
///
/// # Performance Characteristics
/// - Insert / remove / update: O(1) amortized (plus O(cell_len) on removal)
/// - Ball query: O(cells_overlapped + candidates)
///
/// # Examples
/// ```
/// use flocknet_core::proximity_grid::ProximityGrid;
/// use glam::Vec3;
///
/// let mut grid = ProximityGrid::new(100.0);
/// let points = [Vec3::new(10.0, 0.0, 0.0), Vec3::new(500.0, 0.0, 0.0)];
/// for (handle, p) in points.iter().enumerate() {
///     grid.insert_point(handle, *p);
/// }
///
/// let found = grid.find_points_in_ball(Vec3::ZERO, 50.0, |&h| points[h].distance_squared(Vec3::ZERO));
/// assert_eq!(found, vec![0]);
/// ```
pub struct ProximityGrid<H> {
    cell_size: f32,
    cells: HashMap<IVec3, Vec<H>>,
    handle_cells: HashMap<H, IVec3>,
}

impl<H: Copy + Eq + Hash> ProximityGrid<H> {
    /// Creates an empty grid with cubic cells of `cell_size` world units.
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
            handle_cells: HashMap::new(),
        }
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.handle_cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handle_cells.is_empty()
    }

    pub fn contains(&self, handle: &H) -> bool {
        self.handle_cells.contains_key(handle)
    }

    /// Computes the cell coordinate for a world point.
    ///
    /// Returns `None` for non-finite points or points whose cell coordinate
    /// would not fit in an `i32`.
    #[inline]
    pub fn cell_of(&self, point: Vec3) -> Option<IVec3> {
        if !point.is_finite() {
            return None;
        }
        let scaled = (point / self.cell_size).floor();
        let limit = i32::MAX as f32;
        if scaled.abs().max_element() >= limit {
            return None;
        }
        Some(scaled.as_ivec3())
    }

    /// Stores `handle` at `point`. A handle already present is moved.
    ///
    /// Returns `false` if the point cannot be bucketed (see [`Self::cell_of`]);
    /// in that case any previous entry for the handle is removed.
    pub fn insert_point(&mut self, handle: H, point: Vec3) -> bool {
        let Some(cell) = self.cell_of(point) else {
            self.remove_point(&handle);
            return false;
        };

        if let Some(old) = self.handle_cells.insert(handle, cell) {
            if old == cell {
                return true;
            }
            self.detach(handle, old);
        }
        self.cells.entry(cell).or_default().push(handle);
        true
    }

    /// Moves `handle` to `point`; equivalent to [`Self::insert_point`].
    pub fn update_point(&mut self, handle: H, point: Vec3) -> bool {
        self.insert_point(handle, point)
    }

    pub fn remove_point(&mut self, handle: &H) -> bool {
        match self.handle_cells.remove(handle) {
            Some(cell) => {
                self.detach(*handle, cell);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.handle_cells.clear();
    }

    /// Returns every handle whose metric is strictly below `radius²`.
    ///
    /// `distance_sq` is called only for handles in cells overlapping the
    /// ball's bounding box and must return a squared distance to `center`
    /// (or any metric comparable with `radius²`).
    pub fn find_points_in_ball<F>(&self, center: Vec3, radius: f32, distance_sq: F) -> Vec<H>
    where
        F: FnMut(&H) -> f32,
    {
        let mut result = Vec::new();
        self.find_points_in_ball_into(center, radius, distance_sq, &mut result);
        result
    }

    /// Buffer-reusing variant of [`Self::find_points_in_ball`]. Clears `result` first.
    pub fn find_points_in_ball_into<F>(
        &self,
        center: Vec3,
        radius: f32,
        mut distance_sq: F,
        result: &mut Vec<H>,
    ) where
        F: FnMut(&H) -> f32,
    {
        result.clear();
        if self.cells.is_empty() || !(radius >= 0.0) || !center.is_finite() {
            return;
        }
        let min = self.clamped_cell(center - Vec3::splat(radius));
        let max = self.clamped_cell(center + Vec3::splat(radius));

        let radius_sq = radius * radius;
        let span = max.as_i64vec3() - min.as_i64vec3() + I64Vec3::ONE;
        let cells_in_box = span.x.saturating_mul(span.y).saturating_mul(span.z);

        // Scanning occupied cells is cheaper than probing a huge empty box.
        if cells_in_box > self.cells.len() as i64 {
            for (cell, handles) in &self.cells {
                if cell.cmpge(min).all() && cell.cmple(max).all() {
                    result.extend(handles.iter().filter(|h| distance_sq(*h) < radius_sq));
                }
            }
            return;
        }

        for z in min.z..=max.z {
            for y in min.y..=max.y {
                for x in min.x..=max.x {
                    if let Some(handles) = self.cells.get(&IVec3::new(x, y, z)) {
                        result.extend(handles.iter().filter(|h| distance_sq(*h) < radius_sq));
                    }
                }
            }
        }
    }

    /// Cell coordinate of `point`, saturated to the `i32` range on each axis.
    fn clamped_cell(&self, point: Vec3) -> IVec3 {
        let limit = i32::MAX as f32;
        (point / self.cell_size)
            .floor()
            .clamp(Vec3::splat(-limit), Vec3::splat(limit))
            .as_ivec3()
    }

    fn detach(&mut self, handle: H, cell: IVec3) {
        if let Some(handles) = self.cells.get_mut(&cell) {
            if let Some(pos) = handles.iter().position(|h| *h == handle) {
                handles.swap_remove(pos);
            }
            if handles.is_empty() {
                self.cells.remove(&cell);
            }
        }
    }
}
