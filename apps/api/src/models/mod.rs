pub mod job;
pub mod resources;
