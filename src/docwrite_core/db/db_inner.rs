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
use log::{debug, warn};
use crate::classify::classify_last_error;
use crate::driver::{Driver, FindAndModifyArgs, FindOptions, WriteReceipt};
use crate::errors::DuplicateKeyError;
use crate::options::{FindAndModifyOptions, FindOneOptions};
use crate::results::{InsertManyResult, WriteOutcome};
use crate::{Config, Error, PrimaryKeyFactory, Result, Safety, WriteConcern, WriteConcernResolver, WriteErrorKind};

/// Runs the mutating operations against the driver, applying the write
/// concern and turning driver failures into [`Error`]s.
pub(crate) struct DatabaseInner<D: Driver> {
    driver: D,
    config: Config,
    pk_factory: PrimaryKeyFactory,
    concern_resolver: WriteConcernResolver,
}

impl<D: Driver> DatabaseInner<D> {

    pub fn new(driver: D, config: Config) -> DatabaseInner<D> {
        let pk_factory = config.pk_factory(driver.primary_key_field());
        let concern_resolver = WriteConcernResolver::new(config.default_write_concern.clone());
        DatabaseInner {
            driver,
            config,
            pk_factory,
            concern_resolver,
        }
    }

    #[inline]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn pk_factory(&self) -> &PrimaryKeyFactory {
        &self.pk_factory
    }

    #[inline]
    pub fn resolve_concern(&self, safety: Safety) -> WriteConcern {
        self.concern_resolver.resolve(safety)
    }

    pub fn remove(&self, col_name: &str, selector: &Document, concern: &WriteConcern) -> Result<WriteOutcome> {
        debug!("remove from '{}': {}", col_name, selector);
        let receipt = self.driver
            .remove(col_name, selector, concern)
            .map_err(|err| Error::from_driver("remove", format!("selector {}", selector), err))?;
        self.acknowledge(receipt, concern)
    }

    pub fn insert_many(
        &self,
        col_name: &str,
        mut docs: Vec<Document>,
        concern: &WriteConcern,
        continue_on_error: bool,
    ) -> Result<InsertManyResult> {
        let mut ids = Vec::with_capacity(docs.len());
        for doc in docs.iter_mut() {
            ids.push(self.pk_factory.ensure_key(doc));
        }

        if continue_on_error {
            return self.insert_one_by_one(col_name, docs, ids, concern);
        }

        debug!("insert {} documents into '{}'", docs.len(), col_name);
        if let Err(err) = self.driver.insert(col_name, &docs, concern) {
            return Err(Error::from_driver("insert", describe_batch(&docs), err));
        }

        let mut result = InsertManyResult::default();
        for (position, (doc, id)) in docs.into_iter().zip(ids).enumerate() {
            result.push(position, id, doc);
        }
        Ok(result)
    }

    // One round trip per document, so that a conflict only costs the
    // document that caused it. Whatever got in stays in, even when the
    // shortfall is reported as an error afterwards.
    fn insert_one_by_one(
        &self,
        col_name: &str,
        docs: Vec<Document>,
        ids: Vec<Bson>,
        concern: &WriteConcern,
    ) -> Result<InsertManyResult> {
        let attempted = docs.len();
        let mut result = InsertManyResult::default();
        let mut last_conflict: Option<(WriteErrorKind, String)> = None;

        for (position, (doc, id)) in docs.into_iter().zip(ids).enumerate() {
            let failure = match self.driver.insert(col_name, std::slice::from_ref(&doc), concern) {
                Ok(receipt) => {
                    let last_error = self.driver
                        .get_last_error(receipt, concern)
                        .map_err(|err| Error::database("insert", format!("document {}", doc), err.message))?;
                    classify_last_error(&last_error).map(|kind| {
                        let message = last_error.get_str("err").unwrap_or_default().to_string();
                        (kind, message)
                    })
                }
                Err(err) => Some((err.kind(), err.message)),
            };

            match failure {
                None => result.push(position, id, doc),
                Some((kind, message)) if kind.is_duplicate_key() => {
                    debug!("skip document {} of '{}': {}", position, col_name, message);
                    last_conflict = Some((kind, message));
                }
                Some((_, message)) => {
                    return Err(Error::database("insert", format!("document {}", doc), message));
                }
            }
        }

        if result.len() < attempted {
            let skipped = attempted - result.len();
            warn!("{} of {} documents were not inserted into '{}'", skipped, attempted, col_name);
            let (kind, message) = last_conflict
                .unwrap_or_else(|| (WriteErrorKind::DuplicateInsert, "duplicate key".to_string()));
            return Err(Error::operation_failure(
                kind,
                "insert",
                format!("{} of {} documents", skipped, attempted),
                message,
            ));
        }

        Ok(result)
    }

    pub fn update(
        &self,
        col_name: &str,
        selector: &Document,
        update: &Document,
        upsert: bool,
        multi: bool,
        concern: &WriteConcern,
    ) -> Result<WriteOutcome> {
        debug!("update '{}': {} with {}, upsert: {}, multi: {}", col_name, selector, update, upsert, multi);
        let receipt = self.driver
            .update(col_name, selector, update, upsert, multi, concern)
            .map_err(|err| Error::from_driver("update", format!("document {}", update), err))?;
        self.acknowledge(receipt, concern)
    }

    /// Returns the primary key of `doc`, assigning one first if needed.
    pub fn save(&self, col_name: &str, doc: &mut Document, concern: &WriteConcern) -> Result<Bson> {
        let key = self.pk_factory.ensure_key(doc);
        debug!("save into '{}': {}", col_name, key);
        self.driver
            .save(col_name, doc, concern)
            .map_err(|err| Error::from_driver("save", format!("document {}", doc), err))?;
        Ok(key)
    }

    pub fn find_and_modify(
        &self,
        col_name: &str,
        query: Document,
        options: FindAndModifyOptions,
    ) -> Result<Option<Document>> {
        let args = FindAndModifyArgs {
            query,
            fields: options.fields,
            sort: options.sort,
            remove: options.remove,
            update: options.update,
            return_new: options.new,
            upsert: options.upsert,
        };
        self.driver
            .find_and_modify(col_name, &args)
            .map_err(|err| {
                if err.kind().is_duplicate_key() {
                    Error::from(DuplicateKeyError::from(err))
                } else {
                    Error::database("find and modify", format!("query {}", args.query), err.message)
                }
            })
    }

    /// Reads the first document matching `filter` in a single batch.
    pub fn find_one(&self, col_name: &str, filter: &Document, options: FindOneOptions) -> Result<Option<Document>> {
        let find_options = FindOptions {
            skip: 0,
            limit: 0,
            batch_size: -1,
            projection: options.projection,
            sort: options.sort,
        };
        let mut cursor = self.driver
            .find(col_name, filter, &find_options)
            .map_err(|err| Error::database("find", format!("query {}", filter), err.message))?;

        cursor
            .next()
            .transpose()
            .map_err(|err| Error::database("find", format!("query {}", filter), err.message))
    }

    fn acknowledge(&self, receipt: WriteReceipt, concern: &WriteConcern) -> Result<WriteOutcome> {
        if !concern.requires_acknowledgment() {
            return Ok(WriteOutcome::Unacknowledged);
        }
        let last_error = self.driver
            .get_last_error(receipt, concern)
            .map_err(|err| Error::database("get last error", concern.to_document().to_string(), err.message))?;
        Ok(WriteOutcome::Acknowledged(bson::from_document(last_error)?))
    }

}

fn describe_batch(docs: &[Document]) -> String {
    let items = docs
        .iter()
        .map(|doc| doc.to_string())
        .collect::<Vec<String>>();
    format!("documents [{}]", items.join(", "))
}
