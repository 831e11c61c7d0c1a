use common::shapes::Rect;

/// Slab-method clip of the segment `(x0, y0) -> (x1, y1)` against a rect.
///
/// Returns true when the segment passes through the rect strictly between
/// its endpoints; contact exactly at an endpoint does not count. Handles
/// axis-parallel segments and zero-thickness rects without dividing by a
/// zero denominator.
pub fn segment_intersects_rect(x0: f32, y0: f32, x1: f32, y1: f32, rect: &Rect) -> bool {
    if x0 == x1 && y0 == y1 {
        // coincident endpoints: nothing lies strictly between them
        return false;
    }
    let mut t_min = 0.0f32;
    let mut t_max = 1.0f32;

    for (origin, delta, lo, hi) in [
        (x0, x1 - x0, rect.x1, rect.x2),
        (y0, y1 - y0, rect.y1, rect.y2),
    ] {
        if delta == 0.0 {
            if origin < lo || origin > hi {
                return false;
            }
            continue;
        }
        let mut t_lo = (lo - origin) / delta;
        let mut t_hi = (hi - origin) / delta;
        if t_lo > t_hi {
            std::mem::swap(&mut t_lo, &mut t_hi);
        }
        t_min = t_min.max(t_lo);
        t_max = t_max.min(t_hi);
        if t_min > t_max {
            return false;
        }
    }

    // strictly between the endpoints
    t_max > 0.0 && t_min < 1.0
}
