/// CLI Indexes: tasks
pub mod tasks;

/// CLI Indexes: models
pub mod models;
