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

use indexmap::IndexMap;
use log::{debug, warn};
use crate::driver::Driver;
use crate::index::{index_name, name_from_stored_keys, parse_index_spec, IndexInfo, IndexOptions, IndexSpec};
use crate::{Error, Result};

const ID_INDEX_NAME: &str = "_id_";

/// Creates and drops the indexes of one collection.
pub(crate) struct IndexManager<'a, D: Driver + ?Sized> {
    driver: &'a D,
    collection: &'a str,
}

impl<'a, D: Driver + ?Sized> IndexManager<'a, D> {

    #[inline]
    pub fn new(driver: &'a D, collection: &'a str) -> IndexManager<'a, D> {
        IndexManager {
            driver,
            collection,
        }
    }

    /// Returns the name the index was created under.
    ///
    /// A duplicate key failure is not an error when `dropDups` was asked
    /// for: the server drops the conflicting documents and keeps going.
    pub fn create_index(&self, spec: &IndexSpec, options: IndexOptions) -> Result<String> {
        let keys = parse_index_spec(spec)?;
        let name = match &options.name {
            Some(name) => name.clone(),
            None => index_name(spec, &keys),
        };
        let driver_options = options.to_document(&name);

        debug!("create index '{}' on '{}': {}", name, self.collection, driver_options);

        match self.driver.create_index(self.collection, &keys.to_document(), &driver_options) {
            Ok(()) => Ok(name),
            Err(err) if options.is_drop_dups() && err.kind().is_duplicate_key() => {
                warn!("index '{}' on '{}' dropped duplicates: {}", name, self.collection, err);
                Ok(name)
            }
            Err(err) => Err(Error::operation_failure(err.kind(), "create index", keys.to_string(), err.message)),
        }
    }

    /// Drops the stored index matching `spec`.
    ///
    /// A stored index matches when its name equals the resolved name, or
    /// when the name derived from its key document does. The stored name is
    /// the one that gets dropped.
    pub fn drop_index(&self, spec: &IndexSpec) -> Result<()> {
        let keys = parse_index_spec(spec)?;
        let name = index_name(spec, &keys);

        let stored = self.index_information()?;
        let matched = stored
            .values()
            .find(|info| info.name == name || name_from_stored_keys(&info.keys) == name)
            .map(|info| info.name.clone())
            .ok_or(Error::IndexNotFound(name))?;

        debug!("drop index '{}' on '{}'", matched, self.collection);

        self.driver
            .drop_index(self.collection, &matched)
            .map_err(|err| Error::database("drop index", matched, err.message))
    }

    /// Drops every index but the primary key one.
    pub fn drop_indexes(&self) -> Result<()> {
        let stored = self.index_information()?;
        for name in stored.keys().filter(|name| name.as_str() != ID_INDEX_NAME) {
            debug!("drop index '{}' on '{}'", name, self.collection);
            self.driver
                .drop_index(self.collection, name)
                .map_err(|err| Error::database("drop index", name.clone(), err.message))?;
        }
        Ok(())
    }

    pub fn index_information(&self) -> Result<IndexMap<String, IndexInfo>> {
        let raw = self.driver
            .list_indexes(self.collection)
            .map_err(|err| Error::database("list indexes", self.collection, err.message))?;

        let mut result = IndexMap::with_capacity(raw.len());
        for (name, entry) in raw {
            let info = bson::from_document::<IndexInfo>(entry)?;
            result.insert(name, info);
        }
        Ok(result)
    }

}
