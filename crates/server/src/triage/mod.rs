//! Report intake and triage: image quality gate, damage classification,
//! photo geolocation, status workflow and analytics.

pub mod analytics;
pub mod classifier;
pub mod geolocation;
pub mod image_gate;
pub mod intake;
pub mod model;
pub mod workflow;
