use collisions::raycast::segment_intersects_rect;
use collisions::{Collider, ColliderKind, ColliderSource, TileCollisionGrid};
use common::direction::Direction;
use common::fixed::round4;
use common::grid::{Cell, Passability};
use common::shapes::Rect;
use fxhash::FxHashMap;
use quadtree::QuadTree;
use smallvec::SmallVec;

use crate::config::MovementConfig;
use crate::entity::{Entity, EntityClass, EntityId};
use crate::resolver::{self, TouchHandler, TouchOutcome};

/// Simulation context for one active map.
///
/// Owns the passability oracle, the static collision grid built from it,
/// the spatial index over dynamic entities, and the entity table. Torn
/// down and rebuilt on map change; nothing in here is shared or global.
pub struct MapContext<P: Passability> {
    map: P,
    config: MovementConfig,
    grid: TileCollisionGrid,
    index: QuadTree,
    entities: FxHashMap<EntityId, Entity>,
    next_id: u32,
}

impl<P: Passability> MapContext<P> {
    pub fn new(map: P) -> Self {
        Self::with_config(map, MovementConfig::default())
    }

    pub fn with_config(map: P, config: MovementConfig) -> Self {
        let grid = TileCollisionGrid::build(&map);
        let bounds = Rect::new(
            0.0,
            0.0,
            map.width().max(1) as f32,
            map.height().max(1) as f32,
        );
        let index = QuadTree::new_with_config(bounds, config.index.clone());
        MapContext {
            map,
            config,
            grid,
            index,
            entities: FxHashMap::default(),
            next_id: 1,
        }
    }

    pub fn passability(&self) -> &P {
        &self.map
    }

    pub fn grid(&self) -> &TileCollisionGrid {
        &self.grid
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Mutable access for speed/radius/class adjustments. Position changes
    /// go through [`MapContext::teleport`] so the index stays in sync.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn spawn(&mut self, x: f32, y: f32, class: EntityClass) -> EntityId {
        let id = EntityId::from_raw(self.next_id);
        self.next_id += 1;
        let entity = Entity::new(
            id,
            round4(x),
            round4(y),
            class,
            self.config.default_hitbox_radius,
            self.config.default_speed,
        );
        self.index.insert(id.as_u32(), entity.x, entity.y);
        self.entities.insert(id, entity);
        id
    }

    pub fn despawn(&mut self, id: EntityId) {
        if self.entities.remove(&id).is_some() {
            self.index.remove(id.as_u32());
        }
    }

    /// Include or exclude the entity from collision queries without
    /// despawning it (hidden followers, transparent vehicles).
    pub fn set_active(&mut self, id: EntityId, active: bool) {
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        if entity.active == active {
            return;
        }
        entity.active = active;
        let (x, y) = (entity.x, entity.y);
        if active {
            self.index.insert(id.as_u32(), x, y);
        } else {
            self.index.remove(id.as_u32());
        }
    }

    /// Reposition instantly, discarding any in-flight movement or route.
    pub fn teleport(&mut self, id: EntityId, x: f32, y: f32) {
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        entity.x = round4(x);
        entity.y = round4(y);
        entity.reset_auto();
        entity.clear_route();
        let (x, y, active) = (entity.x, entity.y, entity.active);
        if active {
            self.index.update(id.as_u32(), x, y);
        }
    }

    /// Start one tick's worth of free movement toward a compass direction.
    /// Supersedes any route in progress.
    pub fn request_move(&mut self, id: EntityId, dir: Direction) {
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        entity.clear_route();
        let distance = if dir.is_diagonal() {
            round4(entity.speed * std::f32::consts::FRAC_1_SQRT_2)
        } else {
            entity.speed
        };
        entity.auto_move(dir.dx() * distance, dir.dy() * distance);
    }

    /// Start continuous movement by an arbitrary displacement. Supersedes
    /// any route in progress.
    pub fn request_move_vector(&mut self, id: EntityId, dx: f32, dy: f32) {
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        entity.clear_route();
        entity.auto_move(dx, dy);
    }

    /// Move toward a destination cell: directly when it is in line of
    /// sight, otherwise along a searched route. Invalid destinations are
    /// ignored; unreachable ones drop the request.
    pub fn move_to(&mut self, id: EntityId, cell: Cell) {
        if !self.map.is_valid(cell) {
            log::trace!("move_to target {:?} outside the map, ignoring", cell);
            return;
        }
        let Some(mut entity) = self.entities.remove(&id) else {
            return;
        };
        entity.reset_auto();
        entity.clear_route();
        self.plan_move(&mut entity, cell);
        self.entities.insert(id, entity);
    }

    /// Advance one resolver step for one entity.
    pub fn tick(&mut self, id: EntityId, handler: &mut impl TouchHandler) {
        let Some(mut entity) = self.entities.remove(&id) else {
            return;
        };
        self.tick_entity(&mut entity, handler);
        self.entities.insert(id, entity);
    }

    /// Advance every entity in stable id order, then rebalance the index.
    pub fn update(&mut self, handler: &mut impl TouchHandler) {
        let mut ids: Vec<EntityId> = self.entities.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            self.tick(id, handler);
        }
        self.index.rebalance();
    }

    /// Read-only collider dump for renderer and debug overlays.
    pub fn query_colliders(&self, min_x: f32, max_x: f32, min_y: f32, max_y: f32) -> Vec<Collider> {
        let bbox = Rect::new(min_x, min_y, max_x, max_y);
        let mut out = Vec::new();
        self.grid
            .colliders_in_bounding_box(bbox.x1, bbox.x2, bbox.y1, bbox.y2, &mut out);
        self.dynamic_colliders_in(&bbox, &mut out);
        out
    }

    fn tick_entity(&mut self, entity: &mut Entity, handler: &mut impl TouchHandler) {
        if entity.replan_cooldown > 0 {
            entity.replan_cooldown -= 1;
        }

        // dispatch the next waypoint once the previous leg is consumed
        if !entity.is_moving() {
            if let Some(next) = entity.waypoints.pop_front() {
                let dx = round4(next.x as f32 - entity.x);
                let dy = round4(next.y as f32 - entity.y);
                entity.auto_move(dx, dy);
            } else {
                entity.goal = None;
            }
        }

        if entity.is_moving() {
            self.resolve_movement(entity, handler);
        }

        self.update_triggers(entity, handler);
    }

    fn resolve_movement(&mut self, entity: &mut Entity, handler: &mut impl TouchHandler) {
        let (fdx, fdy) = entity.frame_displacement();
        if fdx == 0.0 && fdy == 0.0 {
            return;
        }

        let hitbox = entity.hitbox();
        let swept = Rect::new(
            hitbox.x1.min(hitbox.x1 + fdx),
            hitbox.y1.min(hitbox.y1 + fdy),
            hitbox.x2.max(hitbox.x2 + fdx),
            hitbox.y2.max(hitbox.y2 + fdy),
        );
        let mut candidates = Vec::new();
        self.grid
            .colliders_in_bounding_box(swept.x1, swept.x2, swept.y1, swept.y2, &mut candidates);
        self.dynamic_colliders_in(&swept, &mut candidates);

        // x axis first; its touch side effects settle before y runs
        let res_x = resolver::truncate_dx(&hitbox, fdx, &candidates);
        if res_x.d != 0.0 {
            entity.x = round4(entity.x + res_x.d);
            if entity.active {
                self.index.update(entity.id().as_u32(), entity.x, entity.y);
            }
        }
        let mut interrupted = false;
        if let Some(touched) = &res_x.touched {
            if touched.reports_touch()
                && handler.on_touch(entity.id(), touched) == TouchOutcome::Interrupt
            {
                interrupted = true;
            }
        }

        let mut applied_dy = 0.0;
        if !interrupted {
            let hitbox = entity.hitbox();
            let res_y = resolver::truncate_dy(&hitbox, fdy, &candidates);
            if res_y.d != 0.0 {
                entity.y = round4(entity.y + res_y.d);
                if entity.active {
                    self.index.update(entity.id().as_u32(), entity.x, entity.y);
                }
            }
            if let Some(touched) = &res_y.touched {
                if touched.reports_touch() {
                    let _ = handler.on_touch(entity.id(), touched);
                }
            }
            applied_dy = res_y.d;
        }

        entity.consume_auto(res_x.d, applied_dy);
        self.track_stall(entity, res_x.d, applied_dy);
    }

    /// Routed movement that makes no progress for long enough is abandoned
    /// and re-planned, at most once per cooldown window.
    fn track_stall(&self, entity: &mut Entity, applied_dx: f32, applied_dy: f32) {
        if entity.goal.is_none() {
            return;
        }
        if applied_dx != 0.0 || applied_dy != 0.0 {
            entity.stall_ticks = 0;
            return;
        }
        entity.stall_ticks += 1;
        if entity.stall_ticks < self.config.stall_ticks_before_replan {
            return;
        }
        entity.reset_auto();
        entity.waypoints.clear();
        let Some(goal) = entity.goal.take() else {
            return;
        };
        if entity.replan_cooldown == 0 {
            entity.replan_cooldown = self.config.replan_cooldown_ticks;
            log::debug!(
                "entity {} stalled, re-planning route to {:?}",
                entity.id().as_u32(),
                goal
            );
            self.plan_move(entity, goal);
        } else {
            log::debug!(
                "entity {} stalled during re-plan cooldown, dropping move to {:?}",
                entity.id().as_u32(),
                goal
            );
        }
    }

    fn plan_move(&self, entity: &mut Entity, cell: Cell) {
        if self.in_line_of_sight(entity, cell) {
            let dx = round4(cell.x as f32 - entity.x);
            let dy = round4(cell.y as f32 - entity.y);
            entity.goal = Some(cell);
            entity.auto_move(dx, dy);
            return;
        }
        match pathfinding::find_path_with_config(&self.map, entity.cell(), cell, &self.config.search)
        {
            Some(path) => {
                log::debug!(
                    "entity {} routed to {:?} in {} waypoints",
                    entity.id().as_u32(),
                    cell,
                    path.len()
                );
                entity.goal = Some(cell);
                entity.waypoints = path.into();
            }
            None => {
                log::debug!(
                    "entity {} has no route to {:?}, dropping move request",
                    entity.id().as_u32(),
                    cell
                );
            }
        }
    }

    /// Line of sight between the entity's hitbox center and where that
    /// center lands at the destination anchor, against every blocking
    /// collider strictly between them.
    fn in_line_of_sight(&self, entity: &Entity, cell: Cell) -> bool {
        let hitbox = entity.hitbox();
        let (x0, y0) = (hitbox.center_x(), hitbox.center_y());
        let x1 = cell.x as f32 + 0.5;
        let y1 = cell.y as f32 + 1.0 - entity.hitbox_radius;
        let (dx, dy) = (x1 - x0, y1 - y0);

        let bbox = Rect::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1));
        let mut candidates = Vec::new();
        self.grid
            .colliders_in_bounding_box(bbox.x1, bbox.x2, bbox.y1, bbox.y2, &mut candidates);
        self.dynamic_colliders_in(&bbox, &mut candidates);

        for c in &candidates {
            let blocks = match c.kind {
                ColliderKind::Static | ColliderKind::DynamicBlocking => true,
                // a one-way border interrupts sight only against the grain
                ColliderKind::OneWay(d) => d.dx() * dx + d.dy() * dy > 0.0,
                ColliderKind::DynamicThrough | ColliderKind::Trigger => false,
            };
            if blocks && segment_intersects_rect(x0, y0, x1, y1, &c.rect) {
                return false;
            }
        }
        true
    }

    /// Colliders synthesized from indexed entities whose hitbox touches the
    /// box. The index answers with a superset; exact AABB filtering happens
    /// here. An entity currently being ticked is held outside the table and
    /// so never collides with itself.
    fn dynamic_colliders_in(&self, bbox: &Rect, out: &mut Vec<Collider>) {
        let mut hits = Vec::new();
        self.index.query(bbox.x1, bbox.x2, bbox.y1, bbox.y2, &mut hits);
        hits.sort_unstable();
        for value in hits {
            let Some(entity) = self.entities.get(&EntityId::from_raw(value)) else {
                continue;
            };
            if !entity.active {
                continue;
            }
            let collider = entity.collider();
            if collider.rect.touches(bbox) {
                out.push(collider);
            }
        }
    }

    /// Sustained-overlap bookkeeping: fire newly entered triggers once,
    /// re-arm those whose overlap ratio has dropped back to zero.
    fn update_triggers(&self, entity: &mut Entity, handler: &mut impl TouchHandler) {
        let hitbox = entity.hitbox();
        let mut dynamics = Vec::new();
        self.dynamic_colliders_in(&hitbox, &mut dynamics);

        let mut current: SmallVec<[EntityId; 4]> = SmallVec::new();
        for c in &dynamics {
            if !c.is_trigger() || hitbox.overlap_ratio(&c.rect) == 0.0 {
                continue;
            }
            let ColliderSource::Entity(raw) = c.source else {
                continue;
            };
            let source = EntityId::from_raw(raw);
            current.push(source);
            if !entity.triggered.contains(&source) {
                entity.triggered.push(source);
                handler.on_trigger_enter(entity.id(), c);
            }
        }
        entity.triggered.retain(|source| current.contains(source));
    }
}
