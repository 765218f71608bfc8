use super::domain::{Actor, Application, ApplicationStatus, RecruiterId};
use super::error::{Action, BoardError, ValidationError};

/// Party entitled to move an application into a given status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    OwningRecruiter,
    ApplyingSeeker,
}

impl ApplicationStatus {
    /// Parse a status requested by a caller, case-insensitively.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        raw.parse()
            .map_err(|raw| ValidationError::UnknownStatus { raw })
    }

    /// Who may request a move into `self`. Only the applicant withdraws.
    pub const fn required_authority(self) -> Authority {
        match self {
            ApplicationStatus::Withdrawn => Authority::ApplyingSeeker,
            ApplicationStatus::Pending
            | ApplicationStatus::Accepted
            | ApplicationStatus::Rejected => Authority::OwningRecruiter,
        }
    }

    /// Nothing leaves a terminal status.
    pub const fn is_terminal(self) -> bool {
        matches!(self, ApplicationStatus::Withdrawn)
    }

    /// Whether the transition table admits `self -> to`.
    pub const fn permits(self, to: ApplicationStatus) -> bool {
        use ApplicationStatus::{Accepted, Pending, Rejected, Withdrawn};

        match (self, to) {
            (Pending, Accepted) | (Pending, Rejected) | (Pending, Withdrawn) => true,
            (Accepted, Rejected) | (Rejected, Accepted) => true,
            (Pending, Pending)
            | (Accepted, Pending)
            | (Accepted, Accepted)
            | (Accepted, Withdrawn)
            | (Rejected, Pending)
            | (Rejected, Rejected)
            | (Rejected, Withdrawn) => false,
            (Withdrawn, _) => false,
        }
    }

    /// Validate `self -> to`, naming the rejected pair on failure.
    pub fn transition(self, to: ApplicationStatus) -> Result<ApplicationStatus, BoardError> {
        if self.permits(to) {
            Ok(to)
        } else {
            Err(BoardError::InvalidTransition { from: self, to })
        }
    }
}

/// Check that `actor` may move `application` into `to`.
///
/// `owner` is the recruiter of the application's job, or `None` once that job has been
/// purged, in which case no recruiter holds authority over the application anymore.
pub fn authorize(
    actor: &Actor,
    application: &Application,
    owner: Option<RecruiterId>,
    to: ApplicationStatus,
) -> Result<(), BoardError> {
    let allowed = match (to.required_authority(), actor) {
        (Authority::ApplyingSeeker, Actor::Seeker(seeker_id)) => {
            *seeker_id == application.seeker_id
        }
        (Authority::OwningRecruiter, Actor::Recruiter(recruiter_id)) => {
            owner == Some(*recruiter_id)
        }
        _ => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(BoardError::Unauthorized {
            actor: *actor,
            action: Action::TransitionApplication {
                application_id: application.id,
                to,
            },
        })
    }
}
