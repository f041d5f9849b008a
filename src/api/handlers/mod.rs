pub mod jobs;
pub mod root;
