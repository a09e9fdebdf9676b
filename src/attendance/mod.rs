//! Attendance request workflow: the student's request machine and the
//! teacher's review of it.

mod machine;
mod review;

#[cfg(test)]
pub(crate) mod testing;

pub use machine::{AttendanceRequestMachine, RequestOutcome};
pub use review::AttendanceReview;
