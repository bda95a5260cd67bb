use thiserror::Error;

/// Everything an environment can refuse to do.
///
/// Configuration, lookup and protocol-order failures are kept apart so a
/// harness can tell a bad parameter grid from a buggy recommender.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnvError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("unknown user id {user_id} (environment has {num_users} users)")]
    UnknownUser { user_id: usize, num_users: usize },
    #[error("unknown item id {item_id} (environment has {num_items} items)")]
    UnknownItem { item_id: usize, num_items: usize },
    #[error("environment must be reset before it can step")]
    NotReset,
}

impl EnvError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        EnvError::InvalidConfig(msg.into())
    }
}
