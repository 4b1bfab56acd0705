pub mod application;
pub mod camera;
pub mod compute;
pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod present;
pub mod renderer;
pub mod scene;
pub mod screenshot;
pub mod texture;
pub mod util;
