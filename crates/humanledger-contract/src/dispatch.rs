//! Operation table and invocation responses.
//!
//! Function names from the host resolve through a fixed table to an
//! [`Operation`]; nothing is looked up by reflection.

use std::fmt;
use std::str::FromStr;

use crate::error::{ContractError, ContractResult};

/// The contract's named operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    QueryHuman,
    InitLedger,
    CreateHuman,
    QueryAllHuman,
    ChangeHumanName,
}

/// Name → operation, as seen by invoking clients.
static OPERATIONS: [(&str, Operation); 5] = [
    ("queryHuman", Operation::QueryHuman),
    ("initLedger", Operation::InitLedger),
    ("createHuman", Operation::CreateHuman),
    ("queryAllHuman", Operation::QueryAllHuman),
    ("changeHumanName", Operation::ChangeHumanName),
];

impl Operation {
    /// Every operation, in table order.
    pub fn all() -> impl Iterator<Item = Operation> {
        OPERATIONS.iter().map(|(_, op)| *op)
    }

    /// The wire name clients invoke.
    pub fn name(self) -> &'static str {
        OPERATIONS
            .iter()
            .find(|(_, op)| *op == self)
            .map(|(name, _)| *name)
            .unwrap_or("unknown")
    }

    /// Resolve a function name, failing with `UnknownOperation`.
    pub fn resolve(name: &str) -> ContractResult<Operation> {
        OPERATIONS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, op)| *op)
            .ok_or_else(|| ContractError::UnknownOperation(name.to_string()))
    }

    /// Exact argument count, or None if arguments are ignored.
    pub fn arity(self) -> Option<usize> {
        match self {
            Operation::QueryHuman => Some(1),
            Operation::CreateHuman => Some(3),
            Operation::ChangeHumanName => Some(2),
            Operation::InitLedger | Operation::QueryAllHuman => None,
        }
    }

    /// Reject argument lists of the wrong length.
    pub fn check_arity<A: AsRef<str>>(self, args: &[A]) -> ContractResult<()> {
        match self.arity() {
            Some(expected) if args.len() != expected => Err(ContractError::InvalidArguments(format!(
                "{} expects {} argument(s), got {}",
                self.name(),
                expected,
                args.len()
            ))),
            _ => Ok(()),
        }
    }
}

impl FromStr for Operation {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::resolve(s)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome handed back to the host for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Success(Vec<u8>),
    Error(String),
}

impl Response {
    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success(_))
    }

    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Response::Success(payload) => Some(payload),
            Response::Error(_) => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Response::Success(_) => None,
            Response::Error(message) => Some(message),
        }
    }
}

impl From<ContractResult<Vec<u8>>> for Response {
    fn from(result: ContractResult<Vec<u8>>) -> Self {
        match result {
            Ok(payload) => Response::Success(payload),
            Err(err) => Response::Error(err.to_string()),
        }
    }
}
