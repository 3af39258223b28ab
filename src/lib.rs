pub mod catalog;
pub mod config;
pub mod events;
pub mod surface;
pub mod timer;
pub mod variant;
pub mod viewport;
pub mod tasks {
    pub mod controller;
    pub mod display;
    pub mod loader;
    pub mod router;
    pub mod scheduler;
}
