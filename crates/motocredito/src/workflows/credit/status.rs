use super::domain::ApplicationStatus;

/// Rejected status change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot move application from {} to {}", from.label(), to.label())]
pub struct InvalidTransition {
    pub from: ApplicationStatus,
    pub to: ApplicationStatus,
}

impl ApplicationStatus {
    /// Statuses reachable in one step from `self`.
    pub const fn allowed_transitions(self) -> &'static [ApplicationStatus] {
        use ApplicationStatus::*;
        match self {
            Pendiente => &[EnRevision, Cancelada],
            EnRevision => &[Observada, Aprobada, Condicionada, Rechazada, Cancelada],
            Observada => &[EnRevision, Cancelada],
            Condicionada => &[Aprobada, Rechazada, Cancelada],
            Aprobada => &[Entregada, Cancelada],
            Rechazada | Cancelada | Entregada => &[],
        }
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }

    pub fn can_transition_to(self, to: ApplicationStatus) -> bool {
        self.allowed_transitions().contains(&to)
    }

    pub fn transition(self, to: ApplicationStatus) -> Result<ApplicationStatus, InvalidTransition> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(InvalidTransition { from: self, to })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::credit::domain::ApplicationStatus::*;

    #[test]
    fn review_flow_reaches_delivery() {
        let status = Pendiente
            .transition(EnRevision)
            .and_then(|s| s.transition(Condicionada))
            .and_then(|s| s.transition(Aprobada))
            .and_then(|s| s.transition(Entregada))
            .expect("happy path is allowed");
        assert_eq!(status, Entregada);
        assert!(status.is_terminal());
    }

    #[test]
    fn terminal_statuses_reject_everything() {
        for terminal in [Rechazada, Cancelada, Entregada] {
            for target in [Pendiente, EnRevision, Aprobada, Cancelada] {
                assert_eq!(
                    terminal.transition(target),
                    Err(InvalidTransition {
                        from: terminal,
                        to: target
                    })
                );
            }
        }
    }

    #[test]
    fn pending_cannot_skip_review() {
        let err = Pendiente.transition(Aprobada).expect_err("must go through review");
        assert_eq!(err.to_string(), "cannot move application from pendiente to aprobada");
    }
}
