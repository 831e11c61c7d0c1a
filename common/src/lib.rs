pub mod direction;
pub mod fixed;
pub mod grid;
pub mod shapes;
