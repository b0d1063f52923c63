pub mod board;
pub mod job;
