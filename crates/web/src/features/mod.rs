pub mod schedule;
pub mod students;
