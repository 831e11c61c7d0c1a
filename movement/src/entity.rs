use std::collections::VecDeque;
use std::num::NonZeroU32;

use collisions::{Collider, ColliderKind, ColliderSource};
use common::direction::Direction;
use common::fixed::is_zero4;
use common::grid::Cell;
use common::shapes::Rect;
use smallvec::SmallVec;

/// Stable, non-zero identifier of a spawned entity; the spatial index key.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(NonZeroU32);

impl EntityId {
    pub(crate) fn from_raw(raw: u32) -> Self {
        EntityId(NonZeroU32::new(raw).expect("entity ids are non-zero"))
    }

    pub fn as_u32(self) -> u32 {
        self.0.get()
    }
}

/// How an entity participates in collision resolution.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntityClass {
    /// Solid: blocks others and is blocked by them.
    Blocking,
    /// Walks through everything; everything walks through it.
    Through,
    /// A sustained-overlap region that never blocks.
    Trigger,
}

/// A character, event region or vehicle moving on the map.
///
/// Position is continuous and never quantized to the grid. The hitbox is
/// derived from position and radius on every access so it can never go
/// stale: centered horizontally, anchored at the feet vertically.
#[derive(Debug, Clone)]
pub struct Entity {
    id: EntityId,
    pub(crate) x: f32,
    pub(crate) y: f32,
    direction: Direction,
    last_dir: Direction,
    pub hitbox_radius: f32,
    pub speed: f32,
    pub class: EntityClass,
    pub(crate) auto_dx: f32,
    pub(crate) auto_dy: f32,
    pub(crate) waypoints: VecDeque<Cell>,
    pub(crate) goal: Option<Cell>,
    pub(crate) triggered: SmallVec<[EntityId; 4]>,
    pub(crate) stall_ticks: u32,
    pub(crate) replan_cooldown: u32,
    pub(crate) active: bool,
}

impl Entity {
    pub(crate) fn new(
        id: EntityId,
        x: f32,
        y: f32,
        class: EntityClass,
        hitbox_radius: f32,
        speed: f32,
    ) -> Self {
        Entity {
            id,
            x,
            y,
            direction: Direction::Down,
            last_dir: Direction::Down,
            hitbox_radius,
            speed,
            class,
            auto_dx: 0.0,
            auto_dy: 0.0,
            waypoints: VecDeque::new(),
            goal: None,
            triggered: SmallVec::new(),
            stall_ticks: 0,
            replan_cooldown: 0,
            active: true,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The cell the entity currently counts as occupying.
    pub fn cell(&self) -> Cell {
        Cell::new(self.x.round() as i32, self.y.round() as i32)
    }

    pub fn hitbox(&self) -> Rect {
        Rect {
            x1: self.x + 0.5 - self.hitbox_radius,
            x2: self.x + 0.5 + self.hitbox_radius,
            y1: self.y + 1.0 - self.hitbox_radius * 2.0,
            y2: self.y + 1.0,
        }
    }

    pub fn is_moving(&self) -> bool {
        self.auto_dx != 0.0 || self.auto_dy != 0.0
    }

    pub fn has_route(&self) -> bool {
        !self.waypoints.is_empty()
    }

    /// Update facing. A diagonal command keeps a cardinal facing, picking
    /// the diagonal's component that turns away from the current facing.
    pub fn set_direction(&mut self, dir: Direction) {
        if self.last_dir != dir {
            if dir.is_diagonal() {
                self.direction = match self.direction {
                    Direction::Down | Direction::Up => {
                        if dir.has_left() {
                            Direction::Left
                        } else {
                            Direction::Right
                        }
                    }
                    Direction::Left | Direction::Right => {
                        if dir.has_up() {
                            Direction::Up
                        } else {
                            Direction::Down
                        }
                    }
                    other => other,
                };
            } else {
                self.direction = dir;
            }
        }
        self.last_dir = dir;
    }

    /// Begin (or redirect) continuous movement by the given displacement.
    pub(crate) fn auto_move(&mut self, dx: f32, dy: f32) {
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        if let Some(dir) = Direction::from_delta(dx, dy) {
            self.set_direction(dir);
        }
        self.auto_dx = dx;
        self.auto_dy = dy;
        self.stall_ticks = 0;
    }

    pub(crate) fn reset_auto(&mut self) {
        self.auto_dx = 0.0;
        self.auto_dy = 0.0;
        self.stall_ticks = 0;
    }

    pub(crate) fn clear_route(&mut self) {
        self.waypoints.clear();
        self.goal = None;
    }

    /// This tick's intended per-axis displacement: the auto-move vector
    /// scaled to `speed` by its Euclidean length, each axis clamped to the
    /// remaining distance so the entity never overshoots its target.
    pub(crate) fn frame_displacement(&self) -> (f32, f32) {
        let scalar = (self.auto_dx * self.auto_dx + self.auto_dy * self.auto_dy).sqrt();
        if scalar == 0.0 {
            return (0.0, 0.0);
        }
        let dx = self.speed * self.auto_dx / scalar;
        let dy = self.speed * self.auto_dy / scalar;
        (clamp_magnitude(dx, self.auto_dx), clamp_magnitude(dy, self.auto_dy))
    }

    /// Consume the displacement actually applied this tick. An axis zeroes
    /// out once its sign would flip or its remainder rounds to zero.
    pub(crate) fn consume_auto(&mut self, dx: f32, dy: f32) {
        if self.auto_dx != 0.0 {
            let rest = self.auto_dx - dx;
            self.auto_dx = if rest.signum() != self.auto_dx.signum() || is_zero4(rest) {
                0.0
            } else {
                rest
            };
        }
        if self.auto_dy != 0.0 {
            let rest = self.auto_dy - dy;
            self.auto_dy = if rest.signum() != self.auto_dy.signum() || is_zero4(rest) {
                0.0
            } else {
                rest
            };
        }
    }

    /// The collider this entity presents to others, synthesized fresh from
    /// the current position.
    pub fn collider(&self) -> Collider {
        let kind = match self.class {
            EntityClass::Blocking => ColliderKind::DynamicBlocking,
            EntityClass::Through => ColliderKind::DynamicThrough,
            EntityClass::Trigger => ColliderKind::Trigger,
        };
        Collider {
            rect: self.hitbox(),
            kind,
            source: ColliderSource::Entity(self.id.as_u32()),
        }
    }
}

fn clamp_magnitude(d: f32, limit: f32) -> f32 {
    if d.abs() > limit.abs() {
        limit
    } else {
        d
    }
}
