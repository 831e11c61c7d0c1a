use rand::Rng;

/// Axis-aligned rectangle in fractional map-cell units.
///
/// Edges are stored directly (`x1 <= x2`, `y1 <= y2`). Zero-width or
/// zero-height rectangles are legal; one-way borders are stored as
/// zero-thickness segments.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Rect {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl Rect {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn from_center(cx: f32, cy: f32, half_width: f32, half_height: f32) -> Self {
        Self {
            x1: cx - half_width,
            y1: cy - half_height,
            x2: cx + half_width,
            y2: cy + half_height,
        }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn center_x(&self) -> f32 {
        (self.x1 + self.x2) / 2.0
    }

    pub fn center_y(&self) -> f32 {
        (self.y1 + self.y2) / 2.0
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn is_degenerate(&self) -> bool {
        self.width() == 0.0 || self.height() == 0.0
    }

    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.x1 && x <= self.x2 && y >= self.y1 && y <= self.y2
    }

    // Check that `inner` is fully contained in self
    pub fn contains_rect(&self, inner: &Rect) -> bool {
        self.x1 <= inner.x1 && self.x2 >= inner.x2 && self.y1 <= inner.y1 && self.y2 >= inner.y2
    }

    /// Open-interval overlap: shared edges do not count.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x1 < other.x2 && other.x1 < self.x2 && self.y1 < other.y2 && other.y1 < self.y2
    }

    /// Closed-interval overlap: shared edges and zero-thickness rects count.
    pub fn touches(&self, other: &Rect) -> bool {
        self.x1 <= other.x2 && other.x1 <= self.x2 && self.y1 <= other.y2 && other.y1 <= self.y2
    }

    /// Area of the intersection, 0.0 when disjoint or merely edge-touching.
    pub fn overlap_area(&self, other: &Rect) -> f32 {
        let w = self.x2.min(other.x2) - self.x1.max(other.x1);
        let h = self.y2.min(other.y2) - self.y1.max(other.y1);
        if w <= 0.0 || h <= 0.0 {
            return 0.0;
        }
        w * h
    }

    /// Fraction of `self`'s area covered by `other`. Degenerate rects have
    /// no area to cover, so the ratio is 0.
    pub fn overlap_ratio(&self, other: &Rect) -> f32 {
        let area = self.area();
        if area <= 0.0 {
            return 0.0;
        }
        self.overlap_area(other) / area
    }

    pub fn expand_to_include(&mut self, other: &Rect) {
        self.x1 = self.x1.min(other.x1);
        self.y1 = self.y1.min(other.y1);
        self.x2 = self.x2.max(other.x2);
        self.y2 = self.y2.max(other.y2);
    }

    /// Quadrants in nw, ne, sw, se order.
    pub fn quadrants(&self) -> [Rect; 4] {
        let mx = self.center_x();
        let my = self.center_y();
        [
            Rect::new(self.x1, self.y1, mx, my),
            Rect::new(mx, self.y1, self.x2, my),
            Rect::new(self.x1, my, mx, self.y2),
            Rect::new(mx, my, self.x2, self.y2),
        ]
    }

    pub fn clamp_point(&self, x: f32, y: f32) -> (f32, f32) {
        (x.clamp(self.x1, self.x2), y.clamp(self.y1, self.y2))
    }

    pub fn random_point_inside<R: Rng>(&self, rng: &mut R) -> (f32, f32) {
        (
            self.safe_rand(rng, self.x1, self.x2),
            self.safe_rand(rng, self.y1, self.y2),
        )
    }

    fn safe_rand<R: Rng>(&self, rng: &mut R, min: f32, max: f32) -> f32 {
        if min >= max {
            return min;
        }
        rng.gen_range(min..=max)
    }
}
