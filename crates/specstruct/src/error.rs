use specstruct_core::Precondition;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{precondition}: input file not found: {path}")]
    MissingInput {
        precondition: Precondition,
        path: String,
    },

    #[error("Invalid threshold {0}: must be a finite, non-negative number")]
    InvalidThreshold(f32),
}
