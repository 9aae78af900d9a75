use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SteeringError {
    #[error("{behavior}: missing {input}")]
    MissingInput {
        behavior: &'static str,
        input: &'static str,
    },

    #[error("{behavior}: non-finite {what}")]
    NonFinite {
        behavior: &'static str,
        what: &'static str,
    },
}

pub type SteeringResult<T> = Result<T, SteeringError>;
