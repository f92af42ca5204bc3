pub mod catalog;
pub mod config;
pub mod defaults;
pub mod model;
pub mod resolver;
pub mod services;

// Project state: events, reducer and the owning store
pub mod reducer;
pub mod state;
pub mod store;

// Editing helpers
pub mod patch;
pub mod templates;
pub mod validate;

// Terraform generation
pub mod generate;
