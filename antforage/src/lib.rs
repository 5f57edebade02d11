pub mod config;
pub mod recruitment;
pub mod simulation;
