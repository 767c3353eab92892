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

//! Translation of driver failures into a closed set of write error kinds.

use bson::{Bson, Document};

pub(crate) const DUPLICATE_KEY_CODE: i32 = 11000;
pub(crate) const DUPLICATE_KEY_ON_UPDATE_CODE: i32 = 11001;

const DUPLICATE_KEY_PATTERN: &str = "E11000";
const DUPLICATE_KEY_ON_UPDATE_PATTERN: &str = "E11001";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WriteErrorKind {
    /// Uniqueness conflict raised by an insert (or save).
    DuplicateInsert,
    /// Uniqueness conflict raised by an update.
    DuplicateUpdate,
    Other,
}

impl WriteErrorKind {

    #[inline]
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, WriteErrorKind::DuplicateInsert | WriteErrorKind::DuplicateUpdate)
    }

}

/// Maps a driver failure onto a [`WriteErrorKind`].
///
/// A structured error code wins when the driver supplies one. Matching the
/// `E11000`/`E11001` markers in the message is only a fallback for drivers
/// that report nothing but text.
pub fn classify(code: Option<i32>, message: &str) -> WriteErrorKind {
    match code {
        Some(DUPLICATE_KEY_CODE) => return WriteErrorKind::DuplicateInsert,
        Some(DUPLICATE_KEY_ON_UPDATE_CODE) => return WriteErrorKind::DuplicateUpdate,
        _ => (),
    }

    // fallback: message matching
    if message.contains(DUPLICATE_KEY_PATTERN) {
        WriteErrorKind::DuplicateInsert
    } else if message.contains(DUPLICATE_KEY_ON_UPDATE_PATTERN) {
        WriteErrorKind::DuplicateUpdate
    } else {
        WriteErrorKind::Other
    }
}

/// Classifies a decoded last-error document.
///
/// Returns `None` when the document reports no error at all.
pub fn classify_last_error(doc: &Document) -> Option<WriteErrorKind> {
    let message = match doc.get("err") {
        Some(Bson::String(msg)) => msg.as_str(),
        _ => return None,
    };
    let code = match doc.get("code") {
        Some(Bson::Int32(code)) => Some(*code),
        Some(Bson::Int64(code)) => i32::try_from(*code).ok(),
        Some(Bson::Double(code)) => Some(*code as i32),
        _ => None,
    };
    Some(classify(code, message))
}
