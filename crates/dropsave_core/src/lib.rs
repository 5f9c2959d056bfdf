//! Dropsave core: job records, the job table and the pure rules that drive it.
mod job;
mod session;
mod settle;
mod submission;
mod table;
mod view_model;

pub use job::{JobId, JobRecord, JobStatus, StatusReport};
pub use session::{transition, PollCommand, SessionEvent, SessionState};
pub use settle::settle;
pub use submission::{validate_submission, Submission, ValidationError};
pub use table::JobTable;
pub use view_model::{JobRowView, TableView};
