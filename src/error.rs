use thiserror::Error;

pub type BTreeResult<T, E = BTreeError> = Result<T, E>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BTreeError {
    #[error("key not found")]
    NotFound,

    #[error("invalid order {0}: a node must be able to hold at least 2 keys")]
    InvalidOrder(usize),

    #[error("structural invariant violated: {0}")]
    InvariantViolation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(BTreeError::NotFound.to_string(), "key not found");
        assert_eq!(
            BTreeError::InvalidOrder(1).to_string(),
            "invalid order 1: a node must be able to hold at least 2 keys"
        );
        assert_eq!(
            BTreeError::InvariantViolation("leaf 3 is empty".into()).to_string(),
            "structural invariant violated: leaf 3 is empty"
        );
    }
}
