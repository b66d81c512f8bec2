pub mod analytics;
pub mod chart;
pub mod lot;
pub mod price;
pub mod settings;
pub mod snapshot;
