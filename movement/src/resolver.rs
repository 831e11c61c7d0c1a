use collisions::Collider;
use common::direction::Direction;
use common::fixed::round4;
use common::shapes::Rect;

use crate::entity::EntityId;

/// What the surrounding game-state layer reports back from a touch event.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TouchOutcome {
    Continue,
    /// A blocking interaction started; abort the rest of this tick's
    /// movement for the entity.
    Interrupt,
}

/// Callback boundary toward the surrounding system. This core only decides
/// *that* a touch or overlap happened and passes the collider along.
pub trait TouchHandler {
    /// A directional collision clamped movement against an entity collider.
    fn on_touch(&mut self, entity: EntityId, collider: &Collider) -> TouchOutcome {
        let _ = (entity, collider);
        TouchOutcome::Continue
    }

    /// A sustained-overlap collider was newly entered.
    fn on_trigger_enter(&mut self, entity: EntityId, collider: &Collider) {
        let _ = (entity, collider);
    }
}

/// Null handler.
impl TouchHandler for () {}

pub(crate) struct AxisResult {
    /// Displacement after truncation.
    pub d: f32,
    /// The collider movement was clamped against, if any.
    pub touched: Option<Collider>,
}

/// Truncate a horizontal displacement against the nearest blocking
/// candidate that overlaps the hitbox's vertical extent and lies in the
/// direction of travel.
pub(crate) fn truncate_dx(hitbox: &Rect, dx: f32, candidates: &[Collider]) -> AxisResult {
    if dx == 0.0 {
        return AxisResult {
            d: 0.0,
            touched: None,
        };
    }
    let dir = if dx > 0.0 {
        Direction::Right
    } else {
        Direction::Left
    };

    let mut nearest: Option<&Collider> = None;
    let mut nearest_edge = 0.0f32;
    for c in candidates {
        if !c.blocks_along(dir) {
            continue;
        }
        if c.rect.y2 <= hitbox.y1 || hitbox.y2 <= c.rect.y1 {
            continue;
        }
        let (ahead, edge) = if dx > 0.0 {
            (c.rect.x1 >= hitbox.x2, c.rect.x1)
        } else {
            (c.rect.x2 <= hitbox.x1, c.rect.x2)
        };
        if !ahead {
            continue;
        }
        let closer = match nearest {
            None => true,
            Some(_) if dx > 0.0 => edge < nearest_edge,
            Some(_) => edge > nearest_edge,
        };
        if closer {
            nearest = Some(c);
            nearest_edge = edge;
        }
    }

    let Some(c) = nearest else {
        return AxisResult {
            d: dx,
            touched: None,
        };
    };
    let gap = if dx > 0.0 {
        round4(nearest_edge - hitbox.x2)
    } else {
        round4(nearest_edge - hitbox.x1)
    };
    if (dx > 0.0 && dx > gap) || (dx < 0.0 && dx < gap) {
        return AxisResult {
            d: gap,
            touched: Some(*c),
        };
    }
    AxisResult {
        d: dx,
        touched: None,
    }
}

/// Vertical counterpart of [`truncate_dx`], run against the already
/// x-resolved hitbox.
pub(crate) fn truncate_dy(hitbox: &Rect, dy: f32, candidates: &[Collider]) -> AxisResult {
    if dy == 0.0 {
        return AxisResult {
            d: 0.0,
            touched: None,
        };
    }
    let dir = if dy > 0.0 {
        Direction::Down
    } else {
        Direction::Up
    };

    let mut nearest: Option<&Collider> = None;
    let mut nearest_edge = 0.0f32;
    for c in candidates {
        if !c.blocks_along(dir) {
            continue;
        }
        if c.rect.x2 <= hitbox.x1 || hitbox.x2 <= c.rect.x1 {
            continue;
        }
        let (ahead, edge) = if dy > 0.0 {
            (c.rect.y1 >= hitbox.y2, c.rect.y1)
        } else {
            (c.rect.y2 <= hitbox.y1, c.rect.y2)
        };
        if !ahead {
            continue;
        }
        let closer = match nearest {
            None => true,
            Some(_) if dy > 0.0 => edge < nearest_edge,
            Some(_) => edge > nearest_edge,
        };
        if closer {
            nearest = Some(c);
            nearest_edge = edge;
        }
    }

    let Some(c) = nearest else {
        return AxisResult {
            d: dy,
            touched: None,
        };
    };
    let gap = if dy > 0.0 {
        round4(nearest_edge - hitbox.y2)
    } else {
        round4(nearest_edge - hitbox.y1)
    };
    if (dy > 0.0 && dy > gap) || (dy < 0.0 && dy < gap) {
        return AxisResult {
            d: gap,
            touched: Some(*c),
        };
    }
    AxisResult {
        d: dy,
        touched: None,
    }
}
