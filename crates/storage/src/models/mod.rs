mod contest;
mod student;
mod submission;

pub use contest::{ContestParticipation, NewContestParticipation};
pub use student::Student;
pub use submission::{NewSubmission, Submission, Verdict};
