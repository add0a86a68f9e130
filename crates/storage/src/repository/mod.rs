pub mod contest;
pub mod student;
pub mod submission;

pub use contest::ContestRepository;
pub use student::StudentRepository;
pub use submission::SubmissionRepository;
