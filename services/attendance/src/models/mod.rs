//! Attendance service models

pub mod match_result;
pub mod record;
pub mod session;
pub mod student;

// Re-export for convenience
pub use match_result::{MatchOutcome, MatchResult};
pub use record::{AttendanceRecord, NewAttendanceRecord};
pub use session::{ClubSession, NewSession};
pub use student::Student;
