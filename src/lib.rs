pub mod app;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod handlers;
pub mod models;
pub mod report;
pub mod state;
pub mod stats;
pub mod storage;
pub mod store;
pub mod tracker;
pub mod ui;

pub use app::router;
pub use config::AppConfig;
pub use state::AppState;
pub use tracker::HabitTracker;
