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

use std::sync::Mutex;
use docwrite_core::driver::{DriverCursor, DriverResult, FindAndModifyArgs, FindOptions, WriteReceipt};
use docwrite_core::{Config, Database, Driver, DriverError, MemoryDriver, WriteConcern};
use docwrite_core::bson::Document;
use docwrite_core::index::IndexInfo;

#[allow(dead_code)]
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[allow(dead_code)]
pub fn prepare_db() -> Database<MemoryDriver> {
    init_logger();
    Database::open_memory()
}

#[allow(dead_code)]
pub fn prepare_scripted_db() -> Database<ScriptedDriver> {
    init_logger();
    Database::new(ScriptedDriver::new())
}

#[allow(dead_code)]
pub fn prepare_scripted_db_with_config(config: Config) -> Database<ScriptedDriver> {
    init_logger();
    Database::with_config(ScriptedDriver::new(), config)
}

struct Failure {
    op: &'static str,
    skip: usize,
    err: DriverError,
}

/// A [`MemoryDriver`] that records every call and can be told to fail.
pub struct ScriptedDriver {
    pub inner: MemoryDriver,
    calls: Mutex<Vec<String>>,
    index_options: Mutex<Vec<Document>>,
    failures: Mutex<Vec<Failure>>,
}

#[allow(dead_code)]
impl ScriptedDriver {

    pub fn new() -> ScriptedDriver {
        ScriptedDriver {
            inner: MemoryDriver::new(),
            calls: Mutex::new(Vec::new()),
            index_options: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Fails the next call of `op`.
    pub fn fail_next(&self, op: &'static str, err: DriverError) {
        self.fail_after(op, 0, err);
    }

    /// Lets `skip` calls of `op` through, then fails one.
    pub fn fail_after(&self, op: &'static str, skip: usize, err: DriverError) {
        self.failures.lock().unwrap().push(Failure { op, skip, err });
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|call| call.as_str() == op).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Option documents received by `create_index`, in call order.
    pub fn index_options(&self) -> Vec<Document> {
        self.index_options.lock().unwrap().clone()
    }

    pub fn dropped(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| call.strip_prefix("drop_index:").map(str::to_string))
            .collect()
    }

    fn record(&self, op: &'static str) -> DriverResult<()> {
        self.calls.lock().unwrap().push(op.to_string());
        let mut failures = self.failures.lock().unwrap();
        let pos = match failures.iter().position(|failure| failure.op == op) {
            Some(pos) => pos,
            None => return Ok(()),
        };
        if failures[pos].skip > 0 {
            failures[pos].skip -= 1;
            return Ok(());
        }
        Err(failures.remove(pos).err)
    }

}

impl Driver for ScriptedDriver {

    fn primary_key_field(&self) -> &str {
        self.inner.primary_key_field()
    }

    fn insert(&self, collection: &str, docs: &[Document], concern: &WriteConcern) -> DriverResult<WriteReceipt> {
        self.record("insert")?;
        self.inner.insert(collection, docs, concern)
    }

    fn update(
        &self,
        collection: &str,
        selector: &Document,
        update: &Document,
        upsert: bool,
        multi: bool,
        concern: &WriteConcern,
    ) -> DriverResult<WriteReceipt> {
        self.record("update")?;
        self.inner.update(collection, selector, update, upsert, multi, concern)
    }

    fn remove(&self, collection: &str, selector: &Document, concern: &WriteConcern) -> DriverResult<WriteReceipt> {
        self.record("remove")?;
        self.inner.remove(collection, selector, concern)
    }

    fn save(&self, collection: &str, doc: &Document, concern: &WriteConcern) -> DriverResult<WriteReceipt> {
        self.record("save")?;
        self.inner.save(collection, doc, concern)
    }

    fn find_and_modify(&self, collection: &str, args: &FindAndModifyArgs) -> DriverResult<Option<Document>> {
        self.record("find_and_modify")?;
        self.inner.find_and_modify(collection, args)
    }

    fn find(&self, collection: &str, filter: &Document, options: &FindOptions) -> DriverResult<DriverCursor> {
        self.record("find")?;
        self.inner.find(collection, filter, options)
    }

    fn create_index(&self, collection: &str, keys: &Document, options: &Document) -> DriverResult<()> {
        self.index_options.lock().unwrap().push(options.clone());
        self.record("create_index")?;
        self.inner.create_index(collection, keys, options)
    }

    fn drop_index(&self, collection: &str, name: &str) -> DriverResult<()> {
        self.record("drop_index")?;
        self.calls.lock().unwrap().push(format!("drop_index:{}", name));
        self.inner.drop_index(collection, name)
    }

    fn list_indexes(&self, collection: &str) -> DriverResult<indexmap::IndexMap<String, Document>> {
        self.record("list_indexes")?;
        self.inner.list_indexes(collection)
    }

    fn get_last_error(&self, receipt: WriteReceipt, concern: &WriteConcern) -> DriverResult<Document> {
        self.record("get_last_error")?;
        self.inner.get_last_error(receipt, concern)
    }

}

#[allow(dead_code)]
pub fn index_names(infos: &indexmap::IndexMap<String, IndexInfo>) -> Vec<String> {
    infos.keys().cloned().collect()
}
