// Copyright 2024 Vincent Chan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//	http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use bson::ser::Error as BsonErr;
use std::fmt;
use std::sync::PoisonError;
use thiserror::Error;
use crate::driver::DriverError;
use crate::WriteErrorKind;

/// Context attached to a failed write: which operation, on what, and what
/// the driver said about it.
#[derive(Debug)]
pub struct WriteFailure {
    pub operation: &'static str,
    pub target: String,
    pub message: String,
    /// Classified when the failure was raised, from the driver's code if it
    /// gave one.
    pub kind: WriteErrorKind,
}

impl WriteFailure {

    pub(crate) fn new(
        kind: WriteErrorKind,
        operation: &'static str,
        target: impl Into<String>,
        message: impl Into<String>,
    ) -> WriteFailure {
        WriteFailure {
            operation,
            target: target.into(),
            message: message.into(),
            kind,
        }
    }

}

impl fmt::Display for WriteFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "failed to {} {}: {}", self.operation, self.target, self.message)
    }
}

#[derive(Debug)]
pub struct DuplicateKeyError {
    pub code: Option<i32>,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid index specification: {0}")]
    InvalidSpec(String),
    #[error("index '{0}' not found")]
    IndexNotFound(String),
    #[error("duplicate key error: {}", .0.message)]
    DuplicateKey(Box<DuplicateKeyError>),
    #[error("operation failure, {0}")]
    OperationFailure(Box<WriteFailure>),
    #[error("database error, {0}")]
    Database(Box<WriteFailure>),
    #[error("invalid write concern: {0}")]
    InvalidWriteConcern(String),
    #[error("bson error: {0}")]
    BsonErr(Box<BsonErr>),
    #[error("bson de error: {0}")]
    BsonDeErr(Box<bson::de::Error>),
    #[error("the mutex is poisoned")]
    LockError,
    #[error("the database is closed")]
    DbIsClosed,
}

impl Error {

    pub(crate) fn operation_failure(
        kind: WriteErrorKind,
        operation: &'static str,
        target: impl Into<String>,
        message: impl Into<String>,
    ) -> Error {
        Error::OperationFailure(Box::new(WriteFailure::new(kind, operation, target, message)))
    }

    pub(crate) fn database(operation: &'static str, target: impl Into<String>, message: impl Into<String>) -> Error {
        Error::Database(Box::new(WriteFailure::new(WriteErrorKind::Other, operation, target, message)))
    }

    /// Duplicate key conflicts become [`Error::OperationFailure`], anything
    /// else [`Error::Database`].
    pub(crate) fn from_driver(operation: &'static str, target: impl Into<String>, err: DriverError) -> Error {
        let kind = err.kind();
        let failure = Box::new(WriteFailure::new(kind, operation, target, err.message));
        if kind.is_duplicate_key() {
            Error::OperationFailure(failure)
        } else {
            Error::Database(failure)
        }
    }

    /// True for any error that originates from a uniqueness conflict,
    /// whether it was raised bare or wrapped with operation context.
    pub fn is_duplicate_key(&self) -> bool {
        match self {
            Error::DuplicateKey(_) => true,
            Error::OperationFailure(failure) | Error::Database(failure) => failure.kind.is_duplicate_key(),
            _ => false,
        }
    }

}

impl From<DriverError> for DuplicateKeyError {
    fn from(value: DriverError) -> Self {
        DuplicateKeyError {
            code: value.code,
            message: value.message,
        }
    }
}

impl From<DuplicateKeyError> for Error {
    fn from(value: DuplicateKeyError) -> Self {
        Error::DuplicateKey(Box::new(value))
    }
}

impl From<bson::de::Error> for Error {
    fn from(error: bson::de::Error) -> Self {
        Error::BsonDeErr(Box::new(error))
    }
}

impl From<BsonErr> for Error {
    fn from(error: BsonErr) -> Self {
        Error::BsonErr(Box::new(error))
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(_: PoisonError<T>) -> Self {
        Error::LockError
    }
}

pub type Result<T> = std::result::Result<T, Error>;
