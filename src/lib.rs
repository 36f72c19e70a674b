pub mod config;
pub mod graph;
pub mod grid;
pub mod models;
pub mod obstacles;
pub mod pathfinding;
pub mod persistence;
pub mod physics;
pub mod test_utils;
