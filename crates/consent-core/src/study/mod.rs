//! Study sequencing: the session state machine and the records it produces.

mod record;
mod session;

pub use record::{
    InteractionRecord, LEADING_COLUMNS, ResponseOption, table_header, time_spent_seconds,
};
pub use session::{
    Advance, Phase, SiteRequest, StudyError, StudySession, Submission, generate_participant_id,
};
