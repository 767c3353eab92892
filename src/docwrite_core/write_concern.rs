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

use std::time::Duration;
use bson::{doc, Bson, Document};
use crate::{Error, Result};

/// How many members must confirm a write before it counts as done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acknowledgment {
    Unacknowledged,
    Nodes(i32),
    Majority,
    Tag(String),
}

/// Acknowledgment policy handed to the driver with every write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteConcern {
    pub w: Acknowledgment,
    pub w_timeout: Option<Duration>,
    pub journal: bool,
    pub fsync: bool,
}

impl WriteConcern {

    pub fn unacknowledged() -> WriteConcern {
        WriteConcern {
            w: Acknowledgment::Unacknowledged,
            w_timeout: None,
            journal: false,
            fsync: false,
        }
    }

    pub fn acknowledged() -> WriteConcern {
        WriteConcern {
            w: Acknowledgment::Nodes(1),
            ..WriteConcern::unacknowledged()
        }
    }

    /// Whether the caller has to fetch the write result synchronously.
    pub fn requires_acknowledgment(&self) -> bool {
        let w_requires = match &self.w {
            Acknowledgment::Unacknowledged => false,
            Acknowledgment::Nodes(n) => *n > 0,
            Acknowledgment::Majority | Acknowledgment::Tag(_) => true,
        };
        w_requires || self.journal || self.fsync
    }

    /// Parses `{ w, wtimeout, j, fsync }`.
    pub fn from_document(doc: &Document) -> Result<WriteConcern> {
        let mut result = WriteConcern::acknowledged();

        for (key, value) in doc {
            match key.as_str() {
                "w" => {
                    result.w = match value {
                        Bson::Int32(n) => Acknowledgment::Nodes(*n),
                        Bson::Int64(n) => Acknowledgment::Nodes(i32::try_from(*n).map_err(|_| {
                            Error::InvalidWriteConcern(format!("w is out of range: {}", n))
                        })?),
                        Bson::String(s) if s == "majority" => Acknowledgment::Majority,
                        Bson::String(s) => Acknowledgment::Tag(s.clone()),
                        other => return Err(Error::InvalidWriteConcern(format!("unexpected value for w: {}", other))),
                    };
                    if result.w == Acknowledgment::Nodes(0) {
                        result.w = Acknowledgment::Unacknowledged;
                    }
                }
                "wtimeout" | "wtimeoutMS" => {
                    let millis = match value {
                        Bson::Int32(n) if *n >= 0 => *n as u64,
                        Bson::Int64(n) if *n >= 0 => *n as u64,
                        other => return Err(Error::InvalidWriteConcern(format!("unexpected value for wtimeout: {}", other))),
                    };
                    result.w_timeout = Some(Duration::from_millis(millis));
                }
                "j" => {
                    result.journal = value.as_bool().ok_or_else(|| {
                        Error::InvalidWriteConcern(format!("unexpected value for j: {}", value))
                    })?;
                }
                "fsync" => {
                    result.fsync = value.as_bool().ok_or_else(|| {
                        Error::InvalidWriteConcern(format!("unexpected value for fsync: {}", value))
                    })?;
                }
                _ => return Err(Error::InvalidWriteConcern(format!("unknown option '{}'", key))),
            }
        }

        Ok(result)
    }

    pub fn to_document(&self) -> Document {
        let mut result = doc! {};
        let w: Bson = match &self.w {
            Acknowledgment::Unacknowledged => Bson::Int32(0),
            Acknowledgment::Nodes(n) => Bson::Int32(*n),
            Acknowledgment::Majority => Bson::String("majority".into()),
            Acknowledgment::Tag(tag) => Bson::String(tag.clone()),
        };
        result.insert("w", w);
        if let Some(timeout) = self.w_timeout {
            result.insert("wtimeout", timeout.as_millis() as i64);
        }
        if self.journal {
            result.insert("j", true);
        }
        if self.fsync {
            result.insert("fsync", true);
        }
        result
    }

}

impl Default for WriteConcern {
    fn default() -> Self {
        WriteConcern::acknowledged()
    }
}

/// The per-call safety argument, before it is resolved against the
/// database default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Safety {
    Inherit,
    Unsafe,
    Safe,
    Custom(WriteConcern),
}

impl Default for Safety {
    fn default() -> Self {
        Safety::Inherit
    }
}

impl From<bool> for Safety {
    fn from(value: bool) -> Self {
        if value { Safety::Safe } else { Safety::Unsafe }
    }
}

impl From<Option<bool>> for Safety {
    fn from(value: Option<bool>) -> Self {
        value.map_or(Safety::Inherit, Safety::from)
    }
}

impl From<WriteConcern> for Safety {
    fn from(value: WriteConcern) -> Self {
        Safety::Custom(value)
    }
}

#[derive(Debug, Clone)]
pub struct WriteConcernResolver {
    default_concern: WriteConcern,
}

impl WriteConcernResolver {

    pub fn new(default_concern: WriteConcern) -> WriteConcernResolver {
        WriteConcernResolver { default_concern }
    }

    pub fn resolve(&self, safety: impl Into<Safety>) -> WriteConcern {
        match safety.into() {
            Safety::Inherit => self.default_concern.clone(),
            Safety::Unsafe => WriteConcern::unacknowledged(),
            Safety::Safe => WriteConcern::acknowledged(),
            Safety::Custom(concern) => concern,
        }
    }

    #[inline]
    pub fn default_concern(&self) -> &WriteConcern {
        &self.default_concern
    }

}

#[cfg(test)]
mod tests {
    use std::time::Duration;
    use bson::doc;
    use super::*;

    #[test]
    fn test_resolve() {
        let resolver = WriteConcernResolver::new(WriteConcern::unacknowledged());

        assert!(!resolver.resolve(Safety::Inherit).requires_acknowledgment());
        assert!(!resolver.resolve(false).requires_acknowledgment());
        assert!(resolver.resolve(true).requires_acknowledgment());
        assert!(!resolver.resolve(None).requires_acknowledgment());

        let custom = WriteConcern {
            w: Acknowledgment::Majority,
            ..WriteConcern::unacknowledged()
        };
        assert_eq!(resolver.resolve(custom.clone()), custom);
    }

    #[test]
    fn test_journal_alone_requires_acknowledgment() {
        let concern = WriteConcern {
            journal: true,
            ..WriteConcern::unacknowledged()
        };
        assert!(concern.requires_acknowledgment());
    }

    #[test]
    fn test_from_document() {
        let concern = WriteConcern::from_document(&doc! {
            "w": 2,
            "wtimeout": 500,
            "j": true,
        }).unwrap();
        assert_eq!(concern.w, Acknowledgment::Nodes(2));
        assert_eq!(concern.w_timeout, Some(Duration::from_millis(500)));
        assert!(concern.journal);
        assert!(!concern.fsync);

        let concern = WriteConcern::from_document(&doc! { "w": 0 }).unwrap();
        assert!(!concern.requires_acknowledgment());

        let concern = WriteConcern::from_document(&doc! { "w": "majority" }).unwrap();
        assert_eq!(concern.w, Acknowledgment::Majority);
        assert_eq!(concern.to_document(), doc! { "w": "majority" });
    }

    #[test]
    fn test_from_document_rejects_garbage() {
        let err = WriteConcern::from_document(&doc! { "w": true }).unwrap_err();
        assert!(matches!(err, Error::InvalidWriteConcern(_)));

        let err = WriteConcern::from_document(&doc! { "wait": 1 }).unwrap_err();
        assert!(err.to_string().contains("unknown option 'wait'"));
    }

}
