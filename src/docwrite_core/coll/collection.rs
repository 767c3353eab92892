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

use std::borrow::Borrow;
use std::sync::{Arc, Weak};
use bson::{Bson, Document};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use crate::codec::{decode, encode};
use crate::db::db_inner::DatabaseInner;
use crate::driver::Driver;
use crate::index::{IndexInfo, IndexManager, IndexOptions, IndexSpec};
use crate::options::{FindAndModifyOptions, FindOneOptions, InsertManyOptions, UpdateOptions};
use crate::results::{InsertManyResult, WriteOutcome};
use crate::{Error, Result, Safety};

/// A wrapper of collection in struct.
///
/// All CURD methods can be done through this structure. Every write takes a
/// safety argument (`true`, `false`, `None`, a [`WriteConcern`](crate::WriteConcern)
/// or a [`Safety`]) that is resolved against the database default.
pub struct Collection<T, D: Driver> {
    db: Weak<DatabaseInner<D>>,
    name: String,
    _phantom: std::marker::PhantomData<T>,
}

impl<T, D: Driver> Collection<T, D> {

    pub(crate) fn new(db: Weak<DatabaseInner<D>>, name: &str) -> Collection<T, D> {
        Collection {
            db,
            name: name.into(),
            _phantom: std::default::Default::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    fn db(&self) -> Result<Arc<DatabaseInner<D>>> {
        self.db.upgrade().ok_or(Error::DbIsClosed)
    }

    /// Removes every document matching `selector`.
    ///
    /// With an unacknowledged concern this returns
    /// [`WriteOutcome::Unacknowledged`] without looking at the result.
    pub fn remove(&self, selector: Document, safety: impl Into<Safety>) -> Result<WriteOutcome> {
        let db = self.db()?;
        let concern = db.resolve_concern(safety.into());
        db.remove(&self.name, &selector, &concern)
    }

    /// Updates the documents matching `selector`, see [`UpdateOptions`] for
    /// upsert and multi-document updates.
    pub fn update(
        &self,
        selector: Document,
        update: Document,
        options: UpdateOptions,
        safety: impl Into<Safety>,
    ) -> Result<WriteOutcome> {
        let db = self.db()?;
        let concern = db.resolve_concern(safety.into());
        db.update(
            &self.name,
            &selector,
            &update,
            options.is_upsert(),
            options.is_multi(),
            &concern,
        )
    }

    /// Creates an index and returns its name.
    pub fn create_index(&self, spec: impl Into<IndexSpec>, options: IndexOptions) -> Result<String> {
        let db = self.db()?;
        IndexManager::new(db.driver(), &self.name).create_index(&spec.into(), options)
    }

    /// Drops the index described by `spec`, either its name or the fields
    /// it was created with.
    pub fn drop_index(&self, spec: impl Into<IndexSpec>) -> Result<()> {
        let db = self.db()?;
        IndexManager::new(db.driver(), &self.name).drop_index(&spec.into())
    }

    pub fn drop_indexes(&self) -> Result<()> {
        let db = self.db()?;
        IndexManager::new(db.driver(), &self.name).drop_indexes()
    }

    pub fn index_information(&self) -> Result<IndexMap<String, IndexInfo>> {
        let db = self.db()?;
        IndexManager::new(db.driver(), &self.name).index_information()
    }

}

impl<T, D> Collection<T, D>
where
    T: Serialize,
    D: Driver,
{
    /// Inserts `doc` into the collection and returns its primary key.
    pub fn insert(&self, doc: impl Borrow<T>, safety: impl Into<Safety>) -> Result<Bson> {
        let mut result = self.insert_many([doc], InsertManyOptions::default(), safety)?;
        Ok(result.inserted_ids.remove(&0).unwrap_or(Bson::Null))
    }

    /// Inserts the data in `docs` into the collection.
    ///
    /// Without `continue_on_error` the batch goes to the driver in one call
    /// and fails as a whole. With it, documents are inserted one by one and
    /// the ones that hit a duplicate key are skipped; if any were skipped the
    /// call fails with [`Error::OperationFailure`] although the others
    /// stay inserted.
    pub fn insert_many(
        &self,
        docs: impl IntoIterator<Item = impl Borrow<T>>,
        options: InsertManyOptions,
        safety: impl Into<Safety>,
    ) -> Result<InsertManyResult> {
        let db = self.db()?;
        let concern = db.resolve_concern(safety.into());
        let docs = docs
            .into_iter()
            .map(|doc| encode::<T>(doc.borrow()))
            .collect::<Result<Vec<Document>>>()?;
        db.insert_many(&self.name, docs, &concern, options.is_continue_on_error())
    }
}

impl<T, D> Collection<T, D>
where
    T: Serialize + DeserializeOwned,
    D: Driver,
{
    /// Inserts or replaces `doc` by primary key and returns the key.
    ///
    /// A key is assigned first when `doc` has none, and written back into
    /// `doc`; calling `save` again keeps that key.
    pub fn save(&self, doc: &mut T, safety: impl Into<Safety>) -> Result<Bson> {
        let db = self.db()?;
        let concern = db.resolve_concern(safety.into());
        let mut encoded = encode(&*doc)?;
        let key = db.save(&self.name, &mut encoded, &concern)?;
        *doc = decode(encoded)?;
        Ok(key)
    }
}

impl<T, D> Collection<T, D>
where
    T: DeserializeOwned,
    D: Driver,
{
    /// Finds a single document in the collection matching `filter`.
    pub fn find_one(&self, filter: impl Into<Option<Document>>) -> Result<Option<T>> {
        self.find_one_with_options(filter, FindOneOptions::default())
    }

    pub fn find_one_with_options(
        &self,
        filter: impl Into<Option<Document>>,
        options: FindOneOptions,
    ) -> Result<Option<T>> {
        let db = self.db()?;
        let filter = filter.into().unwrap_or_default();
        db.find_one(&self.name, &filter, options)?
            .map(decode)
            .transpose()
    }

    /// Atomically finds one document matching `query` and removes or
    /// updates it, see [`FindAndModifyOptions`].
    pub fn find_and_modify(&self, query: Document, options: FindAndModifyOptions) -> Result<Option<T>> {
        let db = self.db()?;
        db.find_and_modify(&self.name, query, options)?
            .map(decode)
            .transpose()
    }
}
