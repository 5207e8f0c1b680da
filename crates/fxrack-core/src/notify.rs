use serde::{Deserialize, Serialize};

/// What about the affected rows changed. Views re-query the rows; the
/// notification carries no payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeRole {
    Structure,
    Enabled,
    Parameters,
}

/// Inclusive row range of the stack view affected by one mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowsChanged {
    pub start: usize,
    pub end: usize,
    pub roles: Vec<ChangeRole>,
}

impl RowsChanged {
    #[must_use]
    pub fn new(start: usize, end: usize, roles: &[ChangeRole]) -> Self {
        Self {
            start,
            end,
            roles: roles.to_vec(),
        }
    }
}
