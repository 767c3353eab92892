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

#![cfg_attr(docsrs, feature(doc_cfg))]

//! The write path of a document database client.
//!
//! This crate sits between an application and a driver session. It
//! normalizes index specifications and derives the index names the server
//! uses, and it runs inserts, updates, removes, saves and find-and-modify
//! commands with the acknowledgment the caller asked for. Duplicate key
//! conflicts are always told apart from other failures.
//!
//! The network side is behind the [`Driver`] trait; [`MemoryDriver`] keeps
//! everything in process.
//!
//! # Usage
//!
//! ```rust
//! use docwrite_core::{Database, IndexOptions, InsertManyOptions};
//! use docwrite_core::bson::{doc, Document};
//!
//! let db = Database::open_memory();
//! let people = db.collection::<Document>("people");
//!
//! let name = people.create_index(
//!     vec![("name", 1), ("age", -1)],
//!     IndexOptions::builder().unique(true).build(),
//! ).unwrap();
//! assert_eq!(name, "name_1_age_-1");
//!
//! people.insert_many(vec![
//!     doc! { "name": "Vincent", "age": 32 },
//!     doc! { "name": "Dick", "age": 23 },
//! ], InsertManyOptions::default(), true).unwrap();
//! ```

mod classify;
mod codec;
mod coll;
mod config;
mod db;
pub mod driver;
mod errors;
pub mod index;
pub mod options;
mod primary_key;
pub mod results;
mod utils;
mod write_concern;

pub use bson;

pub use classify::{classify, classify_last_error, WriteErrorKind};
pub use codec::{decode, encode};
pub use coll::collection::Collection;
pub use config::{Config, ConfigBuilder, KeyGeneratorKind};
pub use db::db::Database;
pub use driver::{Driver, DriverError, MemoryDriver};
pub use errors::{DuplicateKeyError, Error, Result, WriteFailure};
pub use index::{IndexDirection, IndexInfo, IndexOptions, IndexSpec};
pub use options::{FindAndModifyOptions, FindOneOptions, InsertManyOptions, UpdateOptions};
pub use primary_key::{KeyGenerator, ObjectIdGenerator, PrimaryKeyFactory, UuidGenerator};
pub use results::{InsertManyResult, LastError, WriteOutcome};
pub use write_concern::{Acknowledgment, Safety, WriteConcern, WriteConcernResolver};
