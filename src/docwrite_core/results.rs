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

use std::collections::HashMap;
use bson::{Bson, Document};
use serde::{Deserialize, Serialize, Serializer};
use serde::ser::SerializeMap;

/// Decoded write result, as reported by the driver after an acknowledged write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastError {
    #[serde(default)]
    pub ok: f64,

    /// Number of documents the write touched.
    #[serde(default)]
    pub n: i64,

    #[serde(default)]
    pub err: Option<String>,

    #[serde(default)]
    pub code: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_existing: Option<bool>,

    /// `_id` of the document an upsert inserted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upserted: Option<Bson>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    Acknowledged(LastError),
    /// The write was handed to the driver and nothing more is known about it.
    Unacknowledged,
}

impl WriteOutcome {

    #[inline]
    pub fn is_acknowledged(&self) -> bool {
        matches!(self, WriteOutcome::Acknowledged(_))
    }

    pub fn last_error(&self) -> Option<&LastError> {
        match self {
            WriteOutcome::Acknowledged(last_error) => Some(last_error),
            WriteOutcome::Unacknowledged => None,
        }
    }

    /// An unacknowledged write always counts as a success.
    pub fn succeeded(&self) -> bool {
        self.last_error().map_or(true, |last_error| last_error.err.is_none())
    }

}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertManyResult {
    /// The `_id` field of the documents inserted, keyed by their position
    /// in the submitted batch.
    #[serde(serialize_with = "map_serialize")]
    pub inserted_ids: HashMap<usize, Bson>,

    /// The documents that were persisted, primary key included.
    #[serde(skip)]
    pub documents: Vec<Document>,
}

impl InsertManyResult {

    pub(crate) fn push(&mut self, position: usize, id: Bson, doc: Document) {
        self.inserted_ids.insert(position, id);
        self.documents.push(doc);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

}

fn map_serialize<S>(data: &HashMap<usize, Bson>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
{
    let mut map = serializer.serialize_map(Some(data.len()))?;

    for (size, value) in data {
        let size_str = size.to_string();
        map.serialize_entry(&size_str, value)?;
    }

    map.end()
}
