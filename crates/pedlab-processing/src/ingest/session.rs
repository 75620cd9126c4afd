use super::state::{ContentPhase, IngestionOutcome, IngestionStatus, StoragePhase};
use pedlab_core::models::IngestionResult;

/// Identifies one upload within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadTicket {
    generation: u64,
}

/// Upload state of one editing session.
///
/// Only one upload is current at a time: `begin` supersedes the previous
/// one, and status or outcomes reported with an older ticket are dropped.
#[derive(Debug, Default)]
pub struct UploadSession {
    generation: u64,
    status: IngestionStatus,
    outcome: Option<IngestionOutcome>,
}

impl UploadSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) -> UploadTicket {
        self.generation += 1;
        self.outcome = None;
        self.status = IngestionStatus {
            content: ContentPhase::Validating,
            storage: StoragePhase::NotStarted,
        };
        UploadTicket {
            generation: self.generation,
        }
    }

    pub fn is_current(&self, ticket: UploadTicket) -> bool {
        ticket.generation == self.generation
    }

    pub fn update_status(&mut self, ticket: UploadTicket, status: IngestionStatus) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.status = status;
        true
    }

    /// Record the outcome of `ticket`'s upload. Returns false when a newer
    /// upload has started since.
    pub fn complete(&mut self, ticket: UploadTicket, outcome: IngestionOutcome) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(
                ticket = ticket.generation,
                current = self.generation,
                file_name = %outcome.file_name,
                "Dropping superseded upload outcome"
            );
            return false;
        }
        self.status = outcome.status();
        self.outcome = Some(outcome);
        true
    }

    /// Forget the current upload; in-flight results become stale.
    pub fn clear(&mut self) {
        self.generation += 1;
        self.status = IngestionStatus::default();
        self.outcome = None;
    }

    pub fn status(&self) -> IngestionStatus {
        self.status
    }

    pub fn can_submit(&self) -> bool {
        self.status.can_submit()
    }

    pub fn outcome(&self) -> Option<&IngestionOutcome> {
        self.outcome.as_ref()
    }

    pub fn result(&self) -> Option<IngestionResult> {
        self.outcome.as_ref().and_then(IngestionOutcome::result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::state::{ContentTrack, StorageTrack};
    use pedlab_core::models::{DocumentKind, NormalizedDocument};

    fn outcome(name: &str) -> IngestionOutcome {
        IngestionOutcome {
            file_name: name.to_string(),
            file_type: Some(DocumentKind::Txt),
            content: ContentTrack::Ready(NormalizedDocument {
                html: format!("<p>{}</p>", name),
                images: Vec::new(),
            }),
            storage: StorageTrack::NotStarted,
        }
    }

    #[test]
    fn newer_upload_supersedes_older_one() {
        let mut session = UploadSession::new();
        let first = session.begin();
        let second = session.begin();

        assert!(!session.can_submit());
        assert!(!session.complete(first, outcome("first.txt")));
        assert!(session.outcome().is_none());

        assert!(session.complete(second, outcome("second.txt")));
        assert!(session.can_submit());
        assert_eq!(session.result().unwrap().html, "<p>second.txt</p>");
    }

    #[test]
    fn stale_status_updates_are_ignored() {
        let mut session = UploadSession::new();
        let ticket = session.begin();
        session.clear();

        let busy = IngestionStatus {
            content: ContentPhase::Extracting,
            storage: StoragePhase::Uploading,
        };
        assert!(!session.update_status(ticket, busy));
        assert_eq!(session.status(), IngestionStatus::default());
    }
}
