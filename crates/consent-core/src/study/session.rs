//! The study session state machine.
//!
//! ```text
//! NotStarted ──start──▶ SiteOpen ──closed──▶ AwaitingResponse ──submit──▶ SiteOpen (next)
//!                         │  ▲                                      └──▶ Completed (last)
//!                   failed│  │retry
//!                         ▼  │
//!                       OpenFailed
//! ```
//!
//! The session never performs I/O. Transitions that require the environment
//! to open a site return a [`SiteRequest`]; the caller opens the site and
//! reports back with [`StudySession::site_opened`] or
//! [`StudySession::open_failed`].

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::record::{InteractionRecord, ResponseOption, time_spent_seconds};
use crate::config::Config;

/// Session phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    /// The current site is (being) shown in its own window.
    SiteOpen,
    /// The environment refused to open the current site; retry is possible.
    OpenFailed { reason: String },
    /// The site window closed; waiting for the participant's answer.
    AwaitingResponse,
    /// Every site has a record. Terminal.
    Completed,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::NotStarted => "not started",
            Phase::SiteOpen => "site open",
            Phase::OpenFailed { .. } => "open failed",
            Phase::AwaitingResponse => "awaiting response",
            Phase::Completed => "completed",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StudyError {
    #[error("the study needs at least one site")]
    NoSites,
    #[error("the study needs at least one response option")]
    NoOptions,
    #[error("the study has already started")]
    AlreadyStarted,
    #[error("cannot {action} while {phase}")]
    InvalidPhase {
        action: &'static str,
        phase: &'static str,
    },
    #[error("event for site {index} does not match current site {current:?}")]
    StaleSite {
        index: usize,
        current: Option<usize>,
    },
    #[error("no response option selected")]
    MissingSelection,
    #[error("unknown response option: {0}")]
    UnknownOption(String),
}

/// Request for the environment to open a site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRequest {
    pub index: usize,
    pub url: String,
}

/// What follows an accepted response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Open the next site (after the configured delay).
    Next(SiteRequest),
    Completed,
}

/// Result of an accepted response.
#[derive(Debug, Clone)]
pub struct Submission {
    /// Copy of the appended record, to hand to the sink.
    pub record: InteractionRecord,
    pub advance: Advance,
}

/// Generates a participant id: `user_` followed by 128 random bits in hex.
pub fn generate_participant_id() -> String {
    format!("user_{}", Uuid::new_v4().simple())
}

/// One participant's walk over the configured site list.
#[derive(Debug, Clone)]
pub struct StudySession {
    sites: Vec<String>,
    options: Vec<ResponseOption>,
    participant_id: Option<String>,
    current_index: Option<usize>,
    phase: Phase,
    opened_at: Option<DateTime<Utc>>,
    records: Vec<InteractionRecord>,
}

impl StudySession {
    /// Creates a session over `sites`.
    ///
    /// # Errors
    /// Returns an error if either list is empty.
    pub fn new(sites: Vec<String>, options: Vec<ResponseOption>) -> Result<Self, StudyError> {
        if sites.is_empty() {
            return Err(StudyError::NoSites);
        }
        if options.is_empty() {
            return Err(StudyError::NoOptions);
        }
        Ok(Self {
            sites,
            options,
            participant_id: None,
            current_index: None,
            phase: Phase::NotStarted,
            opened_at: None,
            records: Vec::new(),
        })
    }

    /// Creates a session from the configured sites and options.
    ///
    /// # Errors
    /// Returns an error if the config has no sites or options.
    pub fn from_config(config: &Config) -> Result<Self, StudyError> {
        Self::new(config.sites.clone(), config.options.clone())
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Starts the study and requests the first site.
    ///
    /// # Errors
    /// Returns `AlreadyStarted` unless the session is `NotStarted`.
    pub fn start(&mut self) -> Result<SiteRequest, StudyError> {
        self.start_as(generate_participant_id())
    }

    /// Starts the study under a caller-provided participant id.
    ///
    /// # Errors
    /// Returns `AlreadyStarted` unless the session is `NotStarted`.
    pub fn start_as(&mut self, participant_id: String) -> Result<SiteRequest, StudyError> {
        if self.phase != Phase::NotStarted {
            return Err(StudyError::AlreadyStarted);
        }
        self.participant_id = Some(participant_id);
        self.current_index = Some(0);
        self.phase = Phase::SiteOpen;
        self.opened_at = None;
        Ok(self.site_request(0))
    }

    /// Records that the site window for `index` is now visible.
    ///
    /// # Errors
    /// Fails if the session is not in `SiteOpen` or `index` is stale.
    pub fn site_opened(&mut self, index: usize, at: DateTime<Utc>) -> Result<(), StudyError> {
        self.expect_phase(&Phase::SiteOpen, "record a site open")?;
        self.expect_current(index)?;
        self.opened_at = Some(at);
        Ok(())
    }

    /// Records that the environment refused to open the site for `index`.
    ///
    /// # Errors
    /// Fails if the session is not in `SiteOpen` or `index` is stale.
    pub fn open_failed(&mut self, index: usize, reason: String) -> Result<(), StudyError> {
        self.expect_phase(&Phase::SiteOpen, "record an open failure")?;
        self.expect_current(index)?;
        self.opened_at = None;
        self.phase = Phase::OpenFailed { reason };
        Ok(())
    }

    /// Requests the current site again after an open failure.
    ///
    /// # Errors
    /// Fails unless the session is in `OpenFailed`.
    pub fn retry_open(&mut self) -> Result<SiteRequest, StudyError> {
        if !matches!(self.phase, Phase::OpenFailed { .. }) {
            return Err(self.invalid_phase("retry opening a site"));
        }
        let index = self.current_index.unwrap_or_default();
        self.phase = Phase::SiteOpen;
        Ok(self.site_request(index))
    }

    /// Records that the site window for `index` was closed.
    ///
    /// Only the first closure per site is accepted; later ones fail with
    /// `InvalidPhase`.
    ///
    /// # Errors
    /// Fails if the session is not in `SiteOpen` or `index` is stale.
    pub fn site_closed(&mut self, index: usize) -> Result<(), StudyError> {
        self.expect_phase(&Phase::SiteOpen, "close a site")?;
        self.expect_current(index)?;
        self.phase = Phase::AwaitingResponse;
        Ok(())
    }

    /// Submits the participant's answer for the current site.
    ///
    /// `selection` is a response option id. On success the record is
    /// appended, the index advances, and the next step is returned.
    ///
    /// # Errors
    /// Fails without side effects if the session is not awaiting a response,
    /// the selection is missing, or it names an unknown option.
    pub fn submit_response(
        &mut self,
        selection: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<Submission, StudyError> {
        self.expect_phase(&Phase::AwaitingResponse, "submit a response")?;

        let selection = selection
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(StudyError::MissingSelection)?;
        let option = self
            .options
            .iter()
            .find(|o| o.id == selection)
            .ok_or_else(|| StudyError::UnknownOption(selection.to_string()))?;

        let index = self.current_index.unwrap_or_default();
        let time_spent = self
            .opened_at
            .map_or(0, |opened| time_spent_seconds(opened, at));

        let record = InteractionRecord {
            participant_id: self.participant_id.clone().unwrap_or_default(),
            timestamp: at,
            site_index: index,
            website: self.sites[index].clone(),
            selection: option.label.clone(),
            time_spent_seconds: time_spent,
        };
        self.records.push(record.clone());

        let next = index + 1;
        self.current_index = Some(next);
        self.opened_at = None;

        let advance = if next == self.sites.len() {
            self.phase = Phase::Completed;
            Advance::Completed
        } else {
            self.phase = Phase::SiteOpen;
            Advance::Next(self.site_request(next))
        };

        Ok(Submission { record, advance })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn participant_id(&self) -> Option<&str> {
        self.participant_id.as_deref()
    }

    /// Index of the current site; `None` before start, `Some(N)` once completed.
    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// Current index as a signed position: -1 before start, N once completed.
    pub fn position(&self) -> isize {
        self.current_index.map_or(-1, |i| i as isize)
    }

    /// URL of the site currently open or awaiting a response.
    pub fn current_site(&self) -> Option<&str> {
        self.current_index
            .and_then(|i| self.sites.get(i))
            .map(String::as_str)
    }

    pub fn sites(&self) -> &[String] {
        &self.sites
    }

    pub fn options(&self) -> &[ResponseOption] {
        &self.options
    }

    pub fn records(&self) -> &[InteractionRecord] {
        &self.records
    }

    pub fn opened_at(&self) -> Option<DateTime<Utc>> {
        self.opened_at
    }

    pub fn is_completed(&self) -> bool {
        self.phase == Phase::Completed
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn site_request(&self, index: usize) -> SiteRequest {
        SiteRequest {
            index,
            url: self.sites[index].clone(),
        }
    }

    fn invalid_phase(&self, action: &'static str) -> StudyError {
        StudyError::InvalidPhase {
            action,
            phase: self.phase.name(),
        }
    }

    fn expect_phase(&self, expected: &Phase, action: &'static str) -> Result<(), StudyError> {
        if &self.phase == expected {
            Ok(())
        } else {
            Err(self.invalid_phase(action))
        }
    }

    fn expect_current(&self, index: usize) -> Result<(), StudyError> {
        if self.current_index == Some(index) {
            Ok(())
        } else {
            Err(StudyError::StaleSite {
                index,
                current: self.current_index,
            })
        }
    }
}
