pub mod app;
pub mod audio;
pub mod camera3d;
pub mod camera_motion;
pub mod cli;
pub mod config;
pub mod events;
pub mod field;
pub mod gesture;
pub mod input;
pub mod layout;
pub mod minimap;
pub mod picking;
pub mod record;
pub mod registry;
pub mod scene;
pub mod search;

pub use app::{run, App};
pub use field::MemorialField;
