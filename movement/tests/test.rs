use collisions::{ColliderKind, ColliderSource};
use common::direction::Direction;
use common::grid::{Cell, PassabilityTable};
use movement::{EntityClass, EntityId, MapContext, MovementConfig, TouchHandler, TouchOutcome};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Default)]
struct Recorder {
    touches: Vec<(EntityId, ColliderSource)>,
    triggers: Vec<(EntityId, ColliderSource)>,
    interrupt: bool,
}

impl TouchHandler for Recorder {
    fn on_touch(&mut self, entity: EntityId, collider: &collisions::Collider) -> TouchOutcome {
        self.touches.push((entity, collider.source));
        if self.interrupt {
            TouchOutcome::Interrupt
        } else {
            TouchOutcome::Continue
        }
    }

    fn on_trigger_enter(&mut self, entity: EntityId, collider: &collisions::Collider) {
        self.triggers.push((entity, collider.source));
    }
}

fn open_map(width: i32, height: i32) -> MapContext<PassabilityTable> {
    MapContext::new(PassabilityTable::new(width, height))
}

fn walker(ctx: &mut MapContext<PassabilityTable>, x: f32, y: f32) -> EntityId {
    let id = ctx.spawn(x, y, EntityClass::Blocking);
    ctx.entity_mut(id).unwrap().speed = 1.0;
    id
}

#[test]
fn test_straight_move_is_monotonic_without_overshoot() {
    let mut ctx = open_map(10, 10);
    let id = walker(&mut ctx, 2.0, 2.0);
    ctx.request_move_vector(id, 3.0, 0.0);

    let mut prev = 2.0;
    for _ in 0..6 {
        ctx.tick(id, &mut ());
        let x = ctx.entity(id).unwrap().x();
        assert!(x >= prev, "moved backwards: {} -> {}", prev, x);
        assert!(x - prev <= 1.0 + 1e-4, "more than one tick's speed");
        prev = x;
    }
    assert_eq!(ctx.entity(id).unwrap().x(), 5.0);
    assert!(!ctx.entity(id).unwrap().is_moving());
}

#[test]
fn test_collision_clamp_settles_exactly_on_edge() {
    // blocking rectangle with left edge at x = 2; the right hitbox edge
    // must settle exactly there and never cross
    let mut map = PassabilityTable::new(10, 1);
    map.block_cell(Cell::new(2, 0));
    let mut ctx = MapContext::new(map);
    let id = walker(&mut ctx, 0.0, 0.0);
    ctx.request_move_vector(id, 5.0, 0.0);

    for _ in 0..6 {
        ctx.tick(id, &mut ());
        assert!(ctx.entity(id).unwrap().hitbox().x2 <= 2.0);
    }
    let entity = ctx.entity(id).unwrap();
    assert_eq!(entity.x(), 1.0);
    assert_eq!(entity.hitbox().x2, 2.0);
}

#[test]
fn test_one_way_border_is_asymmetric() {
    // ledge out of (0, 2) heading down: north-to-south is blocked,
    // south-to-north passes
    let mut map = PassabilityTable::new(1, 5);
    map.block_exit(Cell::new(0, 2), Direction::Down);

    let mut ctx = MapContext::new(map.clone());
    let id = walker(&mut ctx, 0.0, 1.0);
    ctx.request_move_vector(id, 0.0, 5.0);
    for _ in 0..8 {
        ctx.tick(id, &mut ());
    }
    // feet stopped flush against the y = 3 border line
    assert_eq!(ctx.entity(id).unwrap().y(), 2.0);
    assert_eq!(ctx.entity(id).unwrap().hitbox().y2, 3.0);

    let mut ctx = MapContext::new(map);
    let id = walker(&mut ctx, 0.0, 3.0);
    ctx.request_move_vector(id, 0.0, -5.0);
    for _ in 0..8 {
        ctx.tick(id, &mut ());
    }
    // sailed across the ledge line and stopped at the map's top border
    assert_eq!(ctx.entity(id).unwrap().y(), 0.0);
}

#[test]
fn test_diagonal_speed_matches_cardinal() {
    let mut ctx = open_map(20, 20);
    let diagonal = walker(&mut ctx, 10.0, 10.0);
    let cardinal = walker(&mut ctx, 5.0, 5.0);
    ctx.request_move_vector(diagonal, 5.0, 5.0);
    ctx.request_move_vector(cardinal, 5.0, 0.0);

    ctx.tick(diagonal, &mut ());
    ctx.tick(cardinal, &mut ());

    let d = ctx.entity(diagonal).unwrap();
    let dist = ((d.x() - 10.0).powi(2) + (d.y() - 10.0).powi(2)).sqrt();
    assert!((dist - 1.0).abs() < 1e-3, "diagonal covered {}", dist);

    let c = ctx.entity(cardinal).unwrap();
    assert_eq!(c.x(), 6.0);
}

#[test]
fn test_touch_event_fires_for_entity_blockers() {
    let mut ctx = open_map(10, 1);
    let player = walker(&mut ctx, 0.0, 0.0);
    let npc = ctx.spawn(3.0, 0.0, EntityClass::Blocking);
    ctx.request_move_vector(player, 5.0, 0.0);

    let mut recorder = Recorder::default();
    for _ in 0..4 {
        ctx.tick(player, &mut recorder);
    }
    // clamped flush against the npc, which reported a touch
    assert_eq!(ctx.entity(player).unwrap().x(), 2.0);
    assert!(!recorder.touches.is_empty());
    assert!(recorder
        .touches
        .iter()
        .all(|(id, source)| *id == player && *source == ColliderSource::Entity(npc.as_u32())));
}

#[test]
fn test_static_geometry_does_not_raise_touch_events() {
    let mut map = PassabilityTable::new(10, 1);
    map.block_cell(Cell::new(2, 0));
    let mut ctx = MapContext::new(map);
    let id = walker(&mut ctx, 0.0, 0.0);
    ctx.request_move_vector(id, 5.0, 0.0);

    let mut recorder = Recorder::default();
    for _ in 0..6 {
        ctx.tick(id, &mut recorder);
    }
    assert!(recorder.touches.is_empty());
}

#[test]
fn test_touch_interrupt_aborts_y_step() {
    let mut ctx = open_map(10, 10);
    let player = walker(&mut ctx, 0.0, 0.0);
    let _npc = ctx.spawn(2.0, 0.0, EntityClass::Blocking);
    ctx.request_move_vector(player, 5.0, 5.0);

    let mut recorder = Recorder {
        interrupt: true,
        ..Recorder::default()
    };
    ctx.tick(player, &mut recorder);
    let y_before_touch = ctx.entity(player).unwrap().y();
    assert!(recorder.touches.is_empty());

    // the x step clamps against the npc and the touch interrupt must
    // freeze y for the rest of this tick
    ctx.tick(player, &mut recorder);
    assert_eq!(recorder.touches.len(), 1);
    assert_eq!(ctx.entity(player).unwrap().y(), y_before_touch);
}

#[test]
fn test_trigger_fires_once_and_rearms_after_separation() {
    let mut ctx = open_map(10, 1);
    let player = walker(&mut ctx, 0.0, 0.0);
    let zone = ctx.spawn(3.0, 0.0, EntityClass::Trigger);

    let mut recorder = Recorder::default();
    ctx.request_move_vector(player, 9.0, 0.0);
    for _ in 0..12 {
        ctx.update(&mut recorder);
    }
    assert_eq!(recorder.triggers.len(), 1);
    assert_eq!(
        recorder.triggers[0],
        (player, ColliderSource::Entity(zone.as_u32()))
    );

    // walking back through re-fires after overlap dropped to zero
    ctx.request_move_vector(player, -9.0, 0.0);
    for _ in 0..12 {
        ctx.update(&mut recorder);
    }
    assert_eq!(recorder.triggers.len(), 2);
}

#[test]
fn test_move_to_in_line_of_sight_goes_direct() {
    let mut ctx = open_map(10, 10);
    let id = walker(&mut ctx, 1.0, 1.0);
    ctx.move_to(id, Cell::new(5, 1));
    assert!(!ctx.entity(id).unwrap().has_route());
    assert!(ctx.entity(id).unwrap().is_moving());

    for _ in 0..8 {
        ctx.tick(id, &mut ());
    }
    assert_eq!(ctx.entity(id).unwrap().position(), (5.0, 1.0));
}

#[test]
fn test_move_to_routes_around_walls() {
    let mut map = PassabilityTable::new(10, 10);
    for y in 0..9 {
        map.block_cell(Cell::new(3, y));
    }
    let mut ctx = MapContext::new(map);
    let id = walker(&mut ctx, 1.0, 1.0);
    ctx.move_to(id, Cell::new(6, 1));
    assert!(ctx.entity(id).unwrap().has_route());

    for _ in 0..40 {
        ctx.update(&mut ());
    }
    let entity = ctx.entity(id).unwrap();
    assert_eq!(entity.position(), (6.0, 1.0));
    assert!(!entity.has_route());
    assert!(!entity.is_moving());
}

#[test]
fn test_move_to_invalid_cell_is_ignored() {
    let mut ctx = open_map(10, 10);
    let id = walker(&mut ctx, 1.0, 1.0);
    ctx.move_to(id, Cell::new(-1, 5));
    ctx.move_to(id, Cell::new(10, 5));
    let entity = ctx.entity(id).unwrap();
    assert!(!entity.is_moving());
    assert!(!entity.has_route());
}

#[test]
fn test_move_to_unreachable_goal_drops_request() {
    let mut map = PassabilityTable::new(10, 10);
    // goal walled in by a solid ring
    for (x, y) in [
        (6, 6),
        (7, 6),
        (8, 6),
        (6, 7),
        (8, 7),
        (6, 8),
        (7, 8),
        (8, 8),
    ] {
        map.block_cell(Cell::new(x, y));
    }
    let mut ctx = MapContext::new(map);
    let id = walker(&mut ctx, 1.0, 1.0);
    ctx.move_to(id, Cell::new(7, 7));
    let entity = ctx.entity(id).unwrap();
    assert!(!entity.is_moving());
    assert!(!entity.has_route());
}

#[test]
fn test_teleport_discards_route() {
    let mut map = PassabilityTable::new(10, 10);
    for y in 0..9 {
        map.block_cell(Cell::new(3, y));
    }
    let mut ctx = MapContext::new(map);
    let id = walker(&mut ctx, 1.0, 1.0);
    ctx.move_to(id, Cell::new(6, 1));
    assert!(ctx.entity(id).unwrap().has_route());

    ctx.teleport(id, 8.0, 8.0);
    let entity = ctx.entity(id).unwrap();
    assert_eq!(entity.position(), (8.0, 8.0));
    assert!(!entity.has_route());
    assert!(!entity.is_moving());
}

#[test]
fn test_direct_command_supersedes_route() {
    let mut map = PassabilityTable::new(10, 10);
    for y in 0..9 {
        map.block_cell(Cell::new(3, y));
    }
    let mut ctx = MapContext::new(map);
    let id = walker(&mut ctx, 1.0, 1.0);
    ctx.move_to(id, Cell::new(6, 1));
    assert!(ctx.entity(id).unwrap().has_route());

    ctx.request_move(id, Direction::Right);
    let entity = ctx.entity(id).unwrap();
    assert!(!entity.has_route());
    assert!(entity.is_moving());
    assert_eq!(entity.direction(), Direction::Right);
}

#[test]
fn test_blocked_route_replans_then_drops() {
    let mut ctx = open_map(10, 1);
    let player = walker(&mut ctx, 0.0, 0.0);
    let _npc = ctx.spawn(5.0, 0.0, EntityClass::Blocking);
    ctx.move_to(player, Cell::new(8, 0));

    for _ in 0..80 {
        ctx.update(&mut ());
    }
    let entity = ctx.entity(player).unwrap();
    // clamped flush against the npc, request eventually dropped
    assert_eq!(entity.x(), 4.0);
    assert!(!entity.is_moving());
    assert!(!entity.has_route());
}

#[test]
fn test_inactive_entities_do_not_collide() {
    let mut ctx = open_map(10, 1);
    let player = walker(&mut ctx, 0.0, 0.0);
    let npc = ctx.spawn(3.0, 0.0, EntityClass::Blocking);
    ctx.set_active(npc, false);

    ctx.request_move_vector(player, 6.0, 0.0);
    for _ in 0..8 {
        ctx.tick(player, &mut ());
    }
    assert_eq!(ctx.entity(player).unwrap().x(), 6.0);

    // reactivating restores the collider
    ctx.set_active(npc, true);
    ctx.request_move_vector(player, -6.0, 0.0);
    for _ in 0..8 {
        ctx.tick(player, &mut ());
    }
    assert_eq!(ctx.entity(player).unwrap().x(), 4.0);
}

#[test]
fn test_through_entities_pass_each_other() {
    let mut ctx = open_map(10, 1);
    let player = walker(&mut ctx, 0.0, 0.0);
    let ghost = ctx.spawn(3.0, 0.0, EntityClass::Through);
    let _ = ghost;

    ctx.request_move_vector(player, 6.0, 0.0);
    for _ in 0..8 {
        ctx.tick(player, &mut ());
    }
    assert_eq!(ctx.entity(player).unwrap().x(), 6.0);
}

#[test]
fn test_query_colliders_unions_static_and_dynamic() {
    let mut map = PassabilityTable::new(10, 10);
    map.block_cell(Cell::new(2, 2));
    let mut ctx = MapContext::new(map);
    let npc = ctx.spawn(5.0, 5.0, EntityClass::Blocking);

    let colliders = ctx.query_colliders(0.0, 10.0, 0.0, 10.0);
    assert!(colliders
        .iter()
        .any(|c| c.kind == ColliderKind::Static && c.source == ColliderSource::Tilemap));
    assert!(colliders
        .iter()
        .any(|c| c.source == ColliderSource::Entity(npc.as_u32())));

    ctx.despawn(npc);
    let colliders = ctx.query_colliders(0.0, 10.0, 0.0, 10.0);
    assert!(!colliders
        .iter()
        .any(|c| c.source == ColliderSource::Entity(npc.as_u32())));
}

#[test]
fn test_diagonal_command_keeps_cardinal_facing() {
    let mut ctx = open_map(10, 10);
    let id = walker(&mut ctx, 5.0, 5.0);
    // initial facing is down; a down-right command turns to the right
    ctx.request_move(id, Direction::DownRight);
    assert_eq!(ctx.entity(id).unwrap().direction(), Direction::Right);

    // facing right, an up-right command turns up
    ctx.request_move(id, Direction::UpRight);
    assert_eq!(ctx.entity(id).unwrap().direction(), Direction::Up);
}

#[test]
fn test_random_walk_soak_stays_inside_the_map() {
    let mut map = PassabilityTable::new(16, 16);
    for (x, y) in [(3, 3), (4, 3), (8, 8), (8, 9), (12, 5)] {
        map.block_cell(Cell::new(x, y));
    }
    let mut ctx = MapContext::new(map);
    let mut rng: StdRng = SeedableRng::seed_from_u64(99);

    let mut ids = Vec::new();
    for _ in 0..12 {
        let x = rng.gen_range(0.0..15.0);
        let y = rng.gen_range(0.0..15.0);
        ids.push(ctx.spawn(x, y, EntityClass::Blocking));
    }

    for tick in 0..400 {
        if tick % 10 == 0 {
            for &id in &ids {
                if rng.gen_bool(0.5) {
                    let dx = rng.gen_range(-3.0..3.0);
                    let dy = rng.gen_range(-3.0..3.0);
                    ctx.request_move_vector(id, dx, dy);
                } else {
                    let cell = Cell::new(rng.gen_range(0..16), rng.gen_range(0..16));
                    ctx.move_to(id, cell);
                }
            }
        }
        ctx.update(&mut ());

        for &id in &ids {
            let hitbox = ctx.entity(id).unwrap().hitbox();
            assert!(
                hitbox.x1 >= 0.0 && hitbox.x2 <= 16.0 && hitbox.y1 >= 0.0 && hitbox.y2 <= 16.0,
                "entity {:?} escaped the map at tick {}: {:?}",
                id,
                tick,
                hitbox
            );
        }
    }
}

#[test]
fn test_custom_config_controls_stall_window() {
    let config = MovementConfig {
        default_speed: 1.0,
        stall_ticks_before_replan: 2,
        replan_cooldown_ticks: 100,
        ..MovementConfig::default()
    };
    let mut ctx = MapContext::with_config(PassabilityTable::new(10, 1), config);
    let player = ctx.spawn(0.0, 0.0, EntityClass::Blocking);
    let _npc = ctx.spawn(5.0, 0.0, EntityClass::Blocking);
    ctx.move_to(player, Cell::new(8, 0));

    // the tighter stall window gives up after far fewer ticks than the
    // default would
    for _ in 0..20 {
        ctx.update(&mut ());
    }
    let entity = ctx.entity(player).unwrap();
    assert_eq!(entity.x(), 4.0);
    assert!(!entity.is_moving());
    assert!(!entity.has_route());
}

#[test]
fn test_spawned_ids_are_unique_and_stable() {
    let mut ctx = open_map(10, 10);
    let a = ctx.spawn(1.0, 1.0, EntityClass::Blocking);
    let b = ctx.spawn(2.0, 2.0, EntityClass::Blocking);
    ctx.despawn(a);
    let c = ctx.spawn(3.0, 3.0, EntityClass::Blocking);
    assert_ne!(a, b);
    assert_ne!(b, c);
    assert_ne!(a, c);
    assert_eq!(ctx.entity_count(), 2);
}
