use candid::CandidType;
use serde::{Deserialize, Serialize};

/// Vault Manager Result
pub type VaultResult<T> = Result<T, VaultError>;

/// Vault Manager Errors
#[derive(Clone, CandidType, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum VaultError {
    /// Unauthorized access
    Unauthorized,
    /// The operation would break a ledger invariant. Rejected before any mutation.
    InvariantViolation(String),
    /// The health check refused the harvest result, or could not be consulted.
    HealthCheckRejected,
    /// Realized withdrawal loss exceeded the caller's tolerance
    SlippageExceeded(String),
    /// The migration source was not fully drained. Requires manual reconciliation.
    MigrationIncomplete(String),
    /// Illegal lifecycle transition (e.g. a second emergency exit)
    InvalidTransition(String),
    /// Deposit would push total assets over the deposit limit
    DepositLimitExceeded,
    /// A settlement transfer could not be covered by the sender's balance
    InsufficientBalance(String),
    /// A requested value does not exist
    NonExistentValue,
    /// The protocol is halted
    Halted(String),
    /// Strategy is locked
    Locked,
    /// Arithmetic error
    Arithmetic(String),
    /// Decoding issue
    DecodingError(String),
    /// Unknown/Custom error
    Custom(String),
}

impl VaultError {
    /// Returns `true` if retrying, possibly with adjusted parameters, may succeed.
    /// Authorization, invariant and reconciliation failures are never retriable.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            VaultError::Locked | VaultError::SlippageExceeded(_) | VaultError::InsufficientBalance(_)
        )
    }
}

pub fn arithmetic_err<S: AsRef<str>>(s: S) -> VaultError {
    VaultError::Arithmetic(format!("{:#?}", s.as_ref()))
}

pub fn invariant_err<S: AsRef<str>>(s: S) -> VaultError {
    VaultError::InvariantViolation(s.as_ref().to_string())
}
