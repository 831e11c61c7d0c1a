/// One of the 8 compass directions, in screen coordinates (+y is down).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Direction {
    Down,
    Left,
    Right,
    Up,
    DownLeft,
    DownRight,
    UpLeft,
    UpRight,
}

impl Direction {
    /// The four grid directions, in the order borders and graph edges are
    /// enumerated everywhere.
    pub const CARDINALS: [Direction; 4] =
        [Direction::Down, Direction::Left, Direction::Right, Direction::Up];

    pub fn is_diagonal(self) -> bool {
        !matches!(
            self,
            Direction::Down | Direction::Left | Direction::Right | Direction::Up
        )
    }

    pub fn has_left(self) -> bool {
        matches!(
            self,
            Direction::Left | Direction::DownLeft | Direction::UpLeft
        )
    }

    pub fn has_right(self) -> bool {
        matches!(
            self,
            Direction::Right | Direction::DownRight | Direction::UpRight
        )
    }

    pub fn has_up(self) -> bool {
        matches!(self, Direction::Up | Direction::UpLeft | Direction::UpRight)
    }

    pub fn has_down(self) -> bool {
        matches!(
            self,
            Direction::Down | Direction::DownLeft | Direction::DownRight
        )
    }

    /// Unit x component (-1, 0 or 1).
    pub fn dx(self) -> f32 {
        if self.has_left() {
            -1.0
        } else if self.has_right() {
            1.0
        } else {
            0.0
        }
    }

    /// Unit y component (-1, 0 or 1).
    pub fn dy(self) -> f32 {
        if self.has_up() {
            -1.0
        } else if self.has_down() {
            1.0
        } else {
            0.0
        }
    }

    /// Grid step for cardinal directions; diagonals combine both axes.
    pub fn offset(self) -> (i32, i32) {
        (self.dx() as i32, self.dy() as i32)
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Up => Direction::Down,
            Direction::DownLeft => Direction::UpRight,
            Direction::DownRight => Direction::UpLeft,
            Direction::UpLeft => Direction::DownRight,
            Direction::UpRight => Direction::DownLeft,
        }
    }

    /// Direction of a displacement vector, None for the zero vector.
    pub fn from_delta(dx: f32, dy: f32) -> Option<Direction> {
        let horizontal = if dx < 0.0 {
            Some(Direction::Left)
        } else if dx > 0.0 {
            Some(Direction::Right)
        } else {
            None
        };
        let vertical = if dy < 0.0 {
            Some(Direction::Up)
        } else if dy > 0.0 {
            Some(Direction::Down)
        } else {
            None
        };
        match (horizontal, vertical) {
            (Some(Direction::Left), Some(Direction::Up)) => Some(Direction::UpLeft),
            (Some(Direction::Left), Some(Direction::Down)) => Some(Direction::DownLeft),
            (Some(Direction::Right), Some(Direction::Up)) => Some(Direction::UpRight),
            (Some(Direction::Right), Some(Direction::Down)) => Some(Direction::DownRight),
            (Some(h), None) => Some(h),
            (None, Some(v)) => Some(v),
            _ => None,
        }
    }
}
