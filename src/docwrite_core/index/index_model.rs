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

use bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use crate::{Error, Result};

const NAME_KEY: &str = "name";
const UNIQUE_KEY: &str = "unique";
const BACKGROUND_KEY: &str = "background";
const DROP_DUPS_KEY: &str = "dropDups";
const LEGACY_DROP_DUPS_KEY: &str = "drop_dups";

/// Options of an index build.
///
/// The known options are pulled out into fields; everything else lands in
/// `extra` and reaches the driver untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IndexOptions {
    /// Specifies a name outside the default generated name.
    pub name: Option<String>,

    /// Forces the index to be unique so the collection will not accept documents where the index
    /// key value matches an existing value in the index. The default value is false.
    pub unique: Option<bool>,

    pub background: Option<bool>,

    /// When building a unique index, drop the documents that conflict
    /// instead of failing.
    pub drop_dups: Option<bool>,

    // only filled through `set_option`, so it never holds a known key
    extra: Document,
}

impl IndexOptions {

    pub fn builder() -> IndexOptionsBuilder {
        IndexOptionsBuilder::default()
    }

    /// Splits a raw option document. `drop_dups` is read as `dropDups`.
    pub fn from_document(doc: Document) -> Result<IndexOptions> {
        let mut result = IndexOptions::default();
        for (key, value) in doc {
            result.set_option(key, value)?;
        }
        Ok(result)
    }

    fn set_option(&mut self, key: String, value: Bson) -> Result<()> {
        match key.as_str() {
            NAME_KEY => {
                self.name = match value {
                    Bson::String(name) | Bson::Symbol(name) => Some(name),
                    Bson::Null => None,
                    other => return Err(Error::InvalidSpec(format!("index name must be a string, got {}", other))),
                };
            }
            UNIQUE_KEY => self.unique = Some(expect_bool(&key, &value)?),
            BACKGROUND_KEY => self.background = Some(expect_bool(&key, &value)?),
            DROP_DUPS_KEY => self.drop_dups = Some(expect_bool(&key, &value)?),
            LEGACY_DROP_DUPS_KEY => {
                if expect_bool(&key, &value)? {
                    self.drop_dups = Some(true);
                }
            }
            _ => {
                self.extra.insert(key, value);
            }
        }
        Ok(())
    }

    /// Driver specific options forwarded as they are.
    #[inline]
    pub fn extra(&self) -> &Document {
        &self.extra
    }

    #[inline]
    pub fn is_drop_dups(&self) -> bool {
        self.drop_dups.unwrap_or(false)
    }

    #[inline]
    pub fn is_unique(&self) -> bool {
        self.unique.unwrap_or(false)
    }

    /// The option document handed to the driver, carrying `name` exactly once.
    pub(crate) fn to_document(&self, name: &str) -> Document {
        let mut result = Document::new();
        result.insert(NAME_KEY, name);
        if let Some(unique) = self.unique {
            result.insert(UNIQUE_KEY, unique);
        }
        if let Some(background) = self.background {
            result.insert(BACKGROUND_KEY, background);
        }
        if let Some(drop_dups) = self.drop_dups {
            result.insert(DROP_DUPS_KEY, drop_dups);
        }
        for (key, value) in &self.extra {
            result.insert(key.clone(), value.clone());
        }
        result
    }

}

#[derive(Default)]
pub struct IndexOptionsBuilder {
    inner: IndexOptions,
}

impl IndexOptionsBuilder {

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.inner.name = Some(name.into());
        self
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.inner.unique = Some(unique);
        self
    }

    pub fn background(mut self, background: bool) -> Self {
        self.inner.background = Some(background);
        self
    }

    pub fn drop_dups(mut self, drop_dups: bool) -> Self {
        self.inner.drop_dups = Some(drop_dups);
        self
    }

    /// Any other driver specific option, such as `sparse` or `expireAfterSeconds`.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<Bson>) -> Result<Self> {
        self.inner.set_option(key.into(), value.into())?;
        Ok(self)
    }

    pub fn build(self) -> IndexOptions {
        self.inner
    }

}

fn expect_bool(key: &str, value: &Bson) -> Result<bool> {
    match value {
        Bson::Boolean(b) => Ok(*b),
        Bson::Int32(n) => Ok(*n != 0),
        Bson::Int64(n) => Ok(*n != 0),
        other => Err(Error::InvalidSpec(format!("option '{}' must be a boolean, got {}", key, other))),
    }
}

/// An index as reported by the driver's index listing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexInfo {
    pub name: String,

    #[serde(rename = "key")]
    pub keys: Document,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v: Option<i32>,
}

impl IndexInfo {

    #[inline]
    pub fn is_unique(&self) -> bool {
        self.unique.unwrap_or(false)
    }

}

#[cfg(test)]
mod tests {
    use bson::doc;
    use crate::Error;
    use super::{IndexInfo, IndexOptions};

    #[test]
    fn test_from_document_extracts_known_keys() {
        let options = IndexOptions::from_document(doc! {
            "name": "by_age",
            "unique": true,
            "sparse": true,
            "drop_dups": true,
        }).unwrap();

        assert_eq!(options.name.as_deref(), Some("by_age"));
        assert!(options.is_unique());
        assert!(options.is_drop_dups());
        assert_eq!(options.extra(), &doc! { "sparse": true });

        let forwarded = options.to_document("age_1");
        assert_eq!(forwarded, doc! {
            "name": "age_1",
            "unique": true,
            "dropDups": true,
            "sparse": true,
        });
    }

    #[test]
    fn test_builder_routes_known_options() {
        let options = IndexOptions::builder()
            .background(true)
            .option("name", "custom").unwrap()
            .option("expireAfterSeconds", 60).unwrap()
            .build();

        assert_eq!(options.name.as_deref(), Some("custom"));
        assert!(options.extra().get("name").is_none());
        assert_eq!(options.background, Some(true));
    }

    #[test]
    fn test_known_keys_never_reach_extra() {
        let options = IndexOptions::builder()
            .name("first")
            .option("name", "other").unwrap()
            .option("unique", true).unwrap()
            .option("dropDups", true).unwrap()
            .build();

        assert!(options.extra().is_empty());
        assert_eq!(options.to_document("other"), doc! {
            "name": "other",
            "unique": true,
            "dropDups": true,
        });
    }

    #[test]
    fn test_false_legacy_drop_dups_is_ignored() {
        let options = IndexOptions::from_document(doc! { "drop_dups": false }).unwrap();
        assert_eq!(options.drop_dups, None);
        assert_eq!(options.to_document("a_1"), doc! { "name": "a_1" });

        let options = IndexOptions::from_document(doc! { "dropDups": true, "drop_dups": false }).unwrap();
        assert!(options.is_drop_dups());
    }

    #[test]
    fn test_bad_option_type() {
        let err = IndexOptions::from_document(doc! { "unique": "yes" }).unwrap_err();
        assert!(matches!(err, Error::InvalidSpec(_)));
    }

    #[test]
    fn test_decode_index_info() {
        let info: IndexInfo = bson::from_document(doc! {
            "v": 2,
            "key": { "name": 1 },
            "name": "name_1",
            "ns": "test.people",
            "unique": true,
        }).unwrap();
        assert_eq!(info.name, "name_1");
        assert!(info.is_unique());
        assert_eq!(info.keys, doc! { "name": 1 });
    }

}
