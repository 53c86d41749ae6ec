use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tribe '{tribe_id}' not found")]
    TribeNotFound { tribe_id: String },

    #[error("Squad '{squad_id}' not found")]
    SquadNotFound { squad_id: String },

    #[error("Squad '{squad_id}' still has {people} attached people")]
    SquadNotEmpty { squad_id: String, people: usize },

    #[error("Person '{person_id}' not found")]
    PersonNotFound { person_id: String },

    #[error("Initiative '{initiative_id}' not found")]
    InitiativeNotFound { initiative_id: String },

    #[error("Estimate '{estimate_id}' not found on initiative '{initiative_id}'")]
    EstimateNotFound {
        initiative_id: String,
        estimate_id: String,
    },

    #[error("Assignment '{assignment_id}' not found on initiative '{initiative_id}'")]
    AssignmentNotFound {
        initiative_id: String,
        assignment_id: String,
    },

    #[error("Estimate '{estimate_id}' is already filled by assignment '{assignment_id}'")]
    EstimateAlreadyLinked {
        estimate_id: String,
        assignment_id: String,
    },

    #[error("Duplicate {kind} id '{id}'")]
    DuplicateId { kind: &'static str, id: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type PlannerResult<T> = Result<T, PlannerError>;
