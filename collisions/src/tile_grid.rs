use common::direction::Direction;
use common::grid::{Cell, Passability};
use common::shapes::Rect;
use smallvec::SmallVec;

use crate::collider::Collider;

/// Precomputed static collision geometry for one map.
///
/// Built once per map load from the passability oracle: fully impassable
/// cells are coalesced into maximal solid rectangles, and every impassable
/// cardinal exit of a passable cell becomes a zero-thickness one-way border
/// on the corresponding cell edge. Per-cell candidate lists are precomputed
/// so bounding-box queries stay independent of map size.
pub struct TileCollisionGrid {
    width: i32,
    height: i32,
    colliders: Vec<Collider>,
    cells: Vec<SmallVec<[u32; 4]>>,
}

impl TileCollisionGrid {
    pub fn build<P: Passability>(map: &P) -> Self {
        let width = map.width().max(0);
        let height = map.height().max(0);
        let count = (width * height) as usize;
        let index = |x: i32, y: i32| (y * width + x) as usize;

        // passable exits per cell, neighbor validity included
        let mut exits = vec![[false; 4]; count];
        for y in 0..height {
            for x in 0..width {
                let cell = Cell::new(x, y);
                for (slot, dir) in Direction::CARDINALS.into_iter().enumerate() {
                    exits[index(x, y)][slot] =
                        map.is_valid(cell.neighbor(dir)) && map.is_passable(cell, dir);
                }
            }
        }
        let solid: Vec<bool> = exits.iter().map(|e| !e.iter().any(|&p| p)).collect();

        // greedy row-major meshing of solid cells into maximal rectangles
        let mut colliders = Vec::new();
        let mut visited = vec![false; count];
        for y in 0..height {
            for x in 0..width {
                if !solid[index(x, y)] || visited[index(x, y)] {
                    continue;
                }
                let mut x2 = x;
                while x2 + 1 < width && solid[index(x2 + 1, y)] && !visited[index(x2 + 1, y)] {
                    x2 += 1;
                }
                let mut y2 = y;
                'grow: while y2 + 1 < height {
                    for xs in x..=x2 {
                        if !solid[index(xs, y2 + 1)] || visited[index(xs, y2 + 1)] {
                            break 'grow;
                        }
                    }
                    y2 += 1;
                }
                for ys in y..=y2 {
                    for xs in x..=x2 {
                        visited[index(xs, ys)] = true;
                    }
                }
                colliders.push(Collider::fixed(Rect::new(
                    x as f32,
                    y as f32,
                    (x2 + 1) as f32,
                    (y2 + 1) as f32,
                )));
            }
        }

        // one-way borders on the impassable edges of passable cells
        for y in 0..height {
            for x in 0..width {
                if solid[index(x, y)] {
                    continue;
                }
                for (slot, dir) in Direction::CARDINALS.into_iter().enumerate() {
                    if exits[index(x, y)][slot] {
                        continue;
                    }
                    let (fx, fy) = (x as f32, y as f32);
                    let rect = match dir {
                        Direction::Down => Rect::new(fx, fy + 1.0, fx + 1.0, fy + 1.0),
                        Direction::Left => Rect::new(fx, fy, fx, fy + 1.0),
                        Direction::Right => Rect::new(fx + 1.0, fy, fx + 1.0, fy + 1.0),
                        Direction::Up => Rect::new(fx, fy, fx + 1.0, fy),
                        _ => continue,
                    };
                    colliders.push(Collider::one_way(rect, dir));
                }
            }
        }

        // per-cell candidate lists; closed overlap so zero-thickness borders
        // land in both adjacent cells
        let mut cells = vec![SmallVec::new(); count];
        for (i, collider) in colliders.iter().enumerate() {
            let rect = collider.rect;
            let x_lo = ((rect.x1 - 1.0).ceil() as i32).max(0);
            let x_hi = (rect.x2.floor() as i32).min(width - 1);
            let y_lo = ((rect.y1 - 1.0).ceil() as i32).max(0);
            let y_hi = (rect.y2.floor() as i32).min(height - 1);
            for y in y_lo..=y_hi {
                for x in x_lo..=x_hi {
                    cells[index(x, y)].push(i as u32);
                }
            }
        }

        Self {
            width,
            height,
            colliders,
            cells,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// All static colliders of the map.
    pub fn colliders(&self) -> &[Collider] {
        &self.colliders
    }

    /// Candidates overlapping one cell. Out-of-range cells are clamped to
    /// the nearest valid cell.
    pub fn colliders_at(&self, cell: Cell) -> impl Iterator<Item = &Collider> + '_ {
        let indices: &[u32] = if self.cells.is_empty() {
            &[]
        } else {
            let x = cell.x.clamp(0, self.width - 1);
            let y = cell.y.clamp(0, self.height - 1);
            &self.cells[(y * self.width + x) as usize]
        };
        indices.iter().map(|&i| &self.colliders[i as usize])
    }

    /// Union of the per-cell candidate lists over every cell the box
    /// overlaps, deduplicated.
    pub fn colliders_in_bounding_box(
        &self,
        min_x: f32,
        max_x: f32,
        min_y: f32,
        max_y: f32,
        out: &mut Vec<Collider>,
    ) {
        if self.cells.is_empty() {
            return;
        }
        let x_lo = (min_x.floor() as i32).clamp(0, self.width - 1);
        let x_hi = (max_x.floor() as i32).clamp(0, self.width - 1);
        let y_lo = (min_y.floor() as i32).clamp(0, self.height - 1);
        let y_hi = (max_y.floor() as i32).clamp(0, self.height - 1);

        let mut seen: SmallVec<[u32; 16]> = SmallVec::new();
        for y in y_lo..=y_hi {
            for x in x_lo..=x_hi {
                for &i in &self.cells[(y * self.width + x) as usize] {
                    if !seen.contains(&i) {
                        seen.push(i);
                    }
                }
            }
        }
        seen.sort_unstable();
        out.extend(seen.iter().map(|&i| self.colliders[i as usize]));
    }
}
