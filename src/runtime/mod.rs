//! Runtime surface shared by scheduling threads.

pub mod directory;

pub use directory::AttemptDirectory;
