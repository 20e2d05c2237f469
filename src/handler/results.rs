//! Handler result types.

use crate::error::ErrorStatus;
use crate::value::AsnValue;
use crate::varbind::VarBind;

/// Result of a GET on one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetResult {
    /// The instance exists.
    Value(AsnValue),
    /// The object type is not implemented.
    NoSuchObject,
    /// The object exists but this instance does not.
    NoSuchInstance,
    /// Application error, mapped to the nearest status for the request version.
    Error(ErrorStatus),
}

impl From<Option<AsnValue>> for GetResult {
    fn from(value: Option<AsnValue>) -> Self {
        value.map_or(GetResult::NoSuchInstance, GetResult::Value)
    }
}

/// Result of a GETNEXT within one leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetNextResult {
    /// The next instance after the requested OID.
    Value(VarBind),
    /// No further instance under this leaf. The engine continues with the
    /// next leaf of the tree.
    Exhausted,
    /// Application error.
    Error(ErrorStatus),
}

/// Result of a SET test or SET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetResult {
    Ok,
    NoAccess,
    NotWritable,
    WrongType,
    WrongLength,
    WrongValue,
    InconsistentValue,
    ResourceUnavailable,
    CommitFailed,
    /// Any other status.
    Error(ErrorStatus),
}

impl SetResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, SetResult::Ok)
    }

    /// The v2c status this result reports.
    pub fn to_error_status(self) -> ErrorStatus {
        match self {
            SetResult::Ok => ErrorStatus::NoError,
            SetResult::NoAccess => ErrorStatus::NoAccess,
            SetResult::NotWritable => ErrorStatus::NotWritable,
            SetResult::WrongType => ErrorStatus::WrongType,
            SetResult::WrongLength => ErrorStatus::WrongLength,
            SetResult::WrongValue => ErrorStatus::WrongValue,
            SetResult::InconsistentValue => ErrorStatus::InconsistentValue,
            SetResult::ResourceUnavailable => ErrorStatus::ResourceUnavailable,
            SetResult::CommitFailed => ErrorStatus::CommitFailed,
            SetResult::Error(status) => status,
        }
    }
}
