#[derive(Debug, Clone)]
pub struct MovementConfig {
    /// Half-width of the square hitbox, in cells.
    pub default_hitbox_radius: f32,
    /// Distance covered per tick, in cells.
    pub default_speed: f32,
    /// Consecutive zero-progress ticks on a routed move before the route is
    /// abandoned and re-planned.
    pub stall_ticks_before_replan: u32,
    /// Minimum ticks between re-plans for one entity.
    pub replan_cooldown_ticks: u32,
    pub search: pathfinding::Config,
    pub index: quadtree::Config,
}

impl Default for MovementConfig {
    fn default() -> Self {
        MovementConfig {
            default_hitbox_radius: 0.5,
            default_speed: 0.0625,
            stall_ticks_before_replan: 8,
            replan_cooldown_ticks: 30,
            search: pathfinding::Config::default(),
            index: quadtree::Config::default(),
        }
    }
}
