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

use std::sync::Arc;
use crate::db::db_inner::DatabaseInner;
use crate::driver::{Driver, MemoryDriver};
use crate::{Collection, Config};

/// Entry point of the client: owns the driver and hands out collections.
///
/// ```rust
/// use docwrite_core::{Database, Safety};
/// use docwrite_core::bson::{doc, Document};
///
/// let db = Database::open_memory();
/// let people = db.collection::<Document>("people");
///
/// people.insert(doc! { "name": "Vincent" }, Safety::Safe).unwrap();
/// let found = people.find_one(doc! { "name": "Vincent" }).unwrap();
/// assert!(found.is_some());
/// ```
pub struct Database<D: Driver> {
    inner: Arc<DatabaseInner<D>>,
}

impl Database<MemoryDriver> {

    pub fn open_memory() -> Database<MemoryDriver> {
        Database::new(MemoryDriver::new())
    }

}

impl<D: Driver> Database<D> {

    pub fn new(driver: D) -> Database<D> {
        Database::with_config(driver, Config::default())
    }

    pub fn with_config(driver: D, config: Config) -> Database<D> {
        Database {
            inner: Arc::new(DatabaseInner::new(driver, config)),
        }
    }

    /// Return a handle of a collection. The collection does not have to exist.
    pub fn collection<T>(&self, name: &str) -> Collection<T, D> {
        Collection::new(Arc::downgrade(&self.inner), name)
    }

    #[inline]
    pub fn driver(&self) -> &D {
        self.inner.driver()
    }

    #[inline]
    pub fn config(&self) -> &Config {
        self.inner.config()
    }

}
