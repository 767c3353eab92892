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

use std::fmt;
use bson::{Bson, Document};
use indexmap::IndexMap;
use crate::{Error, Result};

pub const GEO2D: &str = "2d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexDirection {
    Ascending,
    Descending,
    Geo2d,
}

impl IndexDirection {

    pub fn from_bson(value: &Bson) -> Option<IndexDirection> {
        match value {
            Bson::Int32(1) | Bson::Int64(1) => Some(IndexDirection::Ascending),
            Bson::Int32(-1) | Bson::Int64(-1) => Some(IndexDirection::Descending),
            Bson::Double(d) if *d == 1.0 => Some(IndexDirection::Ascending),
            Bson::Double(d) if *d == -1.0 => Some(IndexDirection::Descending),
            Bson::String(s) if s == GEO2D => Some(IndexDirection::Geo2d),
            _ => None,
        }
    }

    pub fn to_bson(self) -> Bson {
        match self {
            IndexDirection::Ascending => Bson::Int32(1),
            IndexDirection::Descending => Bson::Int32(-1),
            IndexDirection::Geo2d => Bson::String(GEO2D.to_string()),
        }
    }

}

// Rendered with the literal value the server uses, never a label.
impl fmt::Display for IndexDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexDirection::Ascending => f.write_str("1"),
            IndexDirection::Descending => f.write_str("-1"),
            IndexDirection::Geo2d => f.write_str(GEO2D),
        }
    }
}

impl From<IndexDirection> for Bson {
    fn from(value: IndexDirection) -> Self {
        value.to_bson()
    }
}

/// An index description as the caller wrote it.
///
/// Directions are still raw values here; they are checked by [`parse_index_spec`].
#[derive(Debug, Clone, PartialEq)]
pub enum IndexSpec {
    Named(String),
    FieldList(Vec<(String, Bson)>),
}

impl IndexSpec {

    /// Accepts a string or symbol, an array of `[field, direction]` pairs or
    /// an ordered key document.
    pub fn from_bson(value: Bson) -> Result<IndexSpec> {
        match value {
            Bson::String(name) | Bson::Symbol(name) => Ok(IndexSpec::Named(name)),
            Bson::Array(items) => {
                let mut pairs = Vec::with_capacity(items.len());
                for item in items {
                    let pair = match item {
                        Bson::Array(pair) if pair.len() == 2 => pair,
                        other => {
                            return Err(Error::InvalidSpec(format!(
                                "{}; should be either a string, symbol, or an array of arrays",
                                other,
                            )))
                        }
                    };
                    let mut iter = pair.into_iter();
                    let (field, direction) = match (iter.next(), iter.next()) {
                        (Some(Bson::String(field)), Some(direction)) |
                        (Some(Bson::Symbol(field)), Some(direction)) => (field, direction),
                        (field, _) => {
                            return Err(Error::InvalidSpec(format!(
                                "field name must be a string, got {:?}",
                                field,
                            )))
                        }
                    };
                    pairs.push((field, direction));
                }
                Ok(IndexSpec::FieldList(pairs))
            }
            Bson::Document(doc) => Ok(IndexSpec::from(doc)),
            other => Err(Error::InvalidSpec(format!(
                "{}; should be either a string, symbol, or an array of arrays",
                other,
            ))),
        }
    }

    #[inline]
    pub fn is_named(&self) -> bool {
        matches!(self, IndexSpec::Named(_))
    }

}

impl From<&str> for IndexSpec {
    fn from(value: &str) -> Self {
        IndexSpec::Named(value.to_string())
    }
}

impl From<String> for IndexSpec {
    fn from(value: String) -> Self {
        IndexSpec::Named(value)
    }
}

impl From<Document> for IndexSpec {
    fn from(value: Document) -> Self {
        IndexSpec::FieldList(value.into_iter().collect())
    }
}

impl<S, D> From<Vec<(S, D)>> for IndexSpec
where
    S: Into<String>,
    D: Into<Bson>,
{
    fn from(value: Vec<(S, D)>) -> Self {
        IndexSpec::FieldList(
            value
                .into_iter()
                .map(|(field, direction)| (field.into(), direction.into()))
                .collect(),
        )
    }
}

/// Validated field/direction list. Insertion order is the order of the index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexKeys(IndexMap<String, IndexDirection>);

impl IndexKeys {

    #[inline]
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, IndexDirection> {
        self.0.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_document(&self) -> Document {
        let mut result = Document::new();
        for (field, direction) in &self.0 {
            result.insert(field.clone(), direction.to_bson());
        }
        result
    }

}

impl fmt::Display for IndexKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_document(), f)
    }
}

/// Normalizes an [`IndexSpec`] into [`IndexKeys`].
///
/// A bare name becomes a single ascending field. A repeated field keeps its
/// first position and takes the last direction given for it.
pub fn parse_index_spec(spec: &IndexSpec) -> Result<IndexKeys> {
    let mut keys = IndexMap::new();
    match spec {
        IndexSpec::Named(name) => {
            keys.insert(name.clone(), IndexDirection::Ascending);
        }
        IndexSpec::FieldList(pairs) => {
            if pairs.is_empty() {
                return Err(Error::InvalidSpec("the field list is empty".to_string()));
            }
            for (field, direction) in pairs {
                let parsed = IndexDirection::from_bson(direction).ok_or_else(|| {
                    Error::InvalidSpec(format!(
                        "invalid index field [{:?}, {}]; should be one of ascending (1), descending (-1) or geo2d ('2d')",
                        field, direction,
                    ))
                })?;
                keys.insert(field.clone(), parsed);
            }
        }
    }
    Ok(IndexKeys(keys))
}
