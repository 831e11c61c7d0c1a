use common::direction::Direction;
use common::shapes::Rect;

/// How a collider participates in movement resolution. Resolved once when
/// candidates are gathered, never re-derived per access.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ColliderKind {
    /// Impassable static geometry.
    Static,
    /// Zero-thickness border that blocks crossings heading in the given
    /// direction only; transparent from the permitted side.
    OneWay(Direction),
    /// A solid entity.
    DynamicBlocking,
    /// An entity others walk through (and that walks through others).
    DynamicThrough,
    /// A sustained-overlap region; never blocks.
    Trigger,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ColliderSource {
    Tilemap,
    Entity(u32),
}

/// Axis-aligned rectangle participating in collision and overlap queries.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Collider {
    pub rect: Rect,
    pub kind: ColliderKind,
    pub source: ColliderSource,
}

impl Collider {
    pub fn fixed(rect: Rect) -> Self {
        Self {
            rect,
            kind: ColliderKind::Static,
            source: ColliderSource::Tilemap,
        }
    }

    pub fn one_way(rect: Rect, blocks: Direction) -> Self {
        Self {
            rect,
            kind: ColliderKind::OneWay(blocks),
            source: ColliderSource::Tilemap,
        }
    }

    pub fn blocking(rect: Rect, entity: u32) -> Self {
        Self {
            rect,
            kind: ColliderKind::DynamicBlocking,
            source: ColliderSource::Entity(entity),
        }
    }

    pub fn through(rect: Rect, entity: u32) -> Self {
        Self {
            rect,
            kind: ColliderKind::DynamicThrough,
            source: ColliderSource::Entity(entity),
        }
    }

    pub fn trigger(rect: Rect, entity: u32) -> Self {
        Self {
            rect,
            kind: ColliderKind::Trigger,
            source: ColliderSource::Entity(entity),
        }
    }

    /// Whether this collider stops motion heading toward `dir`.
    pub fn blocks_along(&self, dir: Direction) -> bool {
        match self.kind {
            ColliderKind::Static | ColliderKind::DynamicBlocking => true,
            ColliderKind::OneWay(blocked) => blocked == dir,
            ColliderKind::DynamicThrough | ColliderKind::Trigger => false,
        }
    }

    /// Whether clamping against this collider raises a touch event.
    pub fn reports_touch(&self) -> bool {
        matches!(self.source, ColliderSource::Entity(_))
    }

    pub fn is_trigger(&self) -> bool {
        self.kind == ColliderKind::Trigger
    }
}
