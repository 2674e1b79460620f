use thiserror::Error;

use shiptrack_core::errors::{ApplicationError, DomainError};
use shiptrack_store::{RatingLogError, RepositoryError};

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("unknown action `{0}`")]
    UnknownAction(String),
    #[error("required slot `{0}` is not set")]
    MissingSlot(&'static str),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("shipment `{0}` not found")]
    ShipmentNotFound(String),
    #[error("rating log failure: {0}")]
    RatingLog(#[from] RatingLogError),
}

impl From<RepositoryError> for ActionError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound(id) => Self::ShipmentNotFound(id),
        }
    }
}

impl From<ActionError> for ApplicationError {
    fn from(value: ActionError) -> Self {
        match value {
            ActionError::UnknownAction(name) => Self::UnknownAction(name),
            ActionError::MissingSlot(slot) => Self::MissingSlot(slot.to_string()),
            ActionError::Domain(error) => Self::Domain(error),
            ActionError::ShipmentNotFound(id) => Self::ShipmentNotFound(id),
            ActionError::RatingLog(
                error @ (RatingLogError::Io(_) | RatingLogError::Persist(_) | RatingLogError::Empty(_)),
            ) => Self::Persistence(error.to_string()),
            ActionError::RatingLog(error @ (RatingLogError::Csv(_) | RatingLogError::Task(_))) => {
                Self::Internal(error.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use shiptrack_core::errors::ApplicationError;
    use std::io;

    use shiptrack_store::{RatingLogError, RepositoryError};

    use super::ActionError;

    #[test]
    fn repository_miss_becomes_shipment_not_found() {
        let error = ActionError::from(RepositoryError::NotFound("111111111".to_string()));
        assert!(matches!(error, ActionError::ShipmentNotFound(ref id) if id == "111111111"));
        assert_eq!(
            ApplicationError::from(error),
            ApplicationError::ShipmentNotFound("111111111".to_string())
        );
    }

    #[test]
    fn rating_log_io_and_empty_log_are_persistence_failures() {
        let io_error = ActionError::from(RatingLogError::Io(io::Error::other("disk full")));
        assert!(matches!(ApplicationError::from(io_error), ApplicationError::Persistence(_)));


        let empty = ActionError::from(RatingLogError::Empty("ratings_log.csv".into()));
        assert!(matches!(ApplicationError::from(empty), ApplicationError::Persistence(_)));
    }
}
