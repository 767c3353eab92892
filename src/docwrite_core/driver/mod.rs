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

//! The contract of the session that performs the actual I/O.
//!
//! Everything in this crate talks to the store through [`Driver`]; the
//! crate ships [`MemoryDriver`] as an in-process implementation.

mod memory;

use bson::{doc, Bson, Document};
use indexmap::IndexMap;
use thiserror::Error;
use crate::primary_key::DEFAULT_PK_FIELD;
use crate::WriteConcern;

pub use memory::MemoryDriver;

/// A failure reported by the driver.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct DriverError {
    pub code: Option<i32>,
    pub message: String,
}

impl DriverError {

    pub fn new(message: impl Into<String>) -> DriverError {
        DriverError {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: i32, message: impl Into<String>) -> DriverError {
        DriverError {
            code: Some(code),
            message: message.into(),
        }
    }

    #[inline]
    pub fn kind(&self) -> crate::WriteErrorKind {
        crate::classify(self.code, &self.message)
    }

}

pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Handle returned by a write, from which the write result is fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteReceipt {
    last_error: Document,
}

impl WriteReceipt {

    pub fn new(last_error: Document) -> WriteReceipt {
        WriteReceipt { last_error }
    }

    pub fn ok(n: i64) -> WriteReceipt {
        WriteReceipt::new(doc! {
            "ok": 1,
            "n": n,
            "err": Bson::Null,
        })
    }

    pub fn failed(err: &DriverError) -> WriteReceipt {
        let mut last_error = doc! {
            "ok": 1,
            "n": 0_i64,
            "err": err.message.clone(),
        };
        if let Some(code) = err.code {
            last_error.insert("code", code);
        }
        WriteReceipt::new(last_error)
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Bson>) -> WriteReceipt {
        self.last_error.insert(key, value.into());
        self
    }

    #[inline]
    pub fn last_error(&self) -> &Document {
        &self.last_error
    }

    #[inline]
    pub fn into_last_error(self) -> Document {
        self.last_error
    }

}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub skip: u64,
    /// `0` means no limit.
    pub limit: i64,
    /// A negative size asks for a single batch, after which the cursor closes.
    pub batch_size: i32,
    pub projection: Option<Document>,
    pub sort: Option<Document>,
}

/// Arguments of a find-and-modify command, in driver form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindAndModifyArgs {
    pub query: Document,
    pub fields: Option<Document>,
    pub sort: Option<Document>,
    pub remove: bool,
    pub update: Option<Document>,
    pub return_new: bool,
    pub upsert: bool,
}

pub type DriverCursor = Box<dyn Iterator<Item = DriverResult<Document>> + Send>;

pub trait Driver: Send + Sync {

    /// The field documents are keyed on by the store.
    fn primary_key_field(&self) -> &str {
        DEFAULT_PK_FIELD
    }

    fn insert(&self, collection: &str, docs: &[Document], concern: &WriteConcern) -> DriverResult<WriteReceipt>;

    fn update(
        &self,
        collection: &str,
        selector: &Document,
        update: &Document,
        upsert: bool,
        multi: bool,
        concern: &WriteConcern,
    ) -> DriverResult<WriteReceipt>;

    fn remove(&self, collection: &str, selector: &Document, concern: &WriteConcern) -> DriverResult<WriteReceipt>;

    /// Inserts `doc`, or replaces the stored document with the same primary key.
    fn save(&self, collection: &str, doc: &Document, concern: &WriteConcern) -> DriverResult<WriteReceipt>;

    fn find_and_modify(&self, collection: &str, args: &FindAndModifyArgs) -> DriverResult<Option<Document>>;

    fn find(&self, collection: &str, filter: &Document, options: &FindOptions) -> DriverResult<DriverCursor>;

    fn create_index(&self, collection: &str, keys: &Document, options: &Document) -> DriverResult<()>;

    fn drop_index(&self, collection: &str, name: &str) -> DriverResult<()>;

    /// Stored index metadata keyed by index name. Each entry carries at
    /// least `name` and `key`.
    fn list_indexes(&self, collection: &str) -> DriverResult<IndexMap<String, Document>>;

    fn get_last_error(&self, receipt: WriteReceipt, _concern: &WriteConcern) -> DriverResult<Document> {
        Ok(receipt.into_last_error())
    }

}
