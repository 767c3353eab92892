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

use std::cmp::Ordering;
use std::sync::{Mutex, MutexGuard};
use bson::{doc, Bson, Document};
use bson::oid::ObjectId;
use hashbrown::HashMap;
use indexmap::IndexMap;
use log::debug;
use crate::classify::{DUPLICATE_KEY_CODE, DUPLICATE_KEY_ON_UPDATE_CODE};
use crate::driver::{
    Driver,
    DriverCursor,
    DriverError,
    DriverResult,
    FindAndModifyArgs,
    FindOptions,
    WriteReceipt,
};
use crate::index::name_from_stored_keys;
use crate::utils::bson::{
    remove_document_value,
    set_document_value,
    try_get_document_value,
    value_cmp,
    value_eq,
};
use crate::WriteConcern;

const ID_FIELD: &str = "_id";
const ID_INDEX_NAME: &str = "_id_";

const BAD_VALUE_CODE: i32 = 2;
const FAILED_TO_PARSE_CODE: i32 = 9;
const NAMESPACE_NOT_FOUND_CODE: i32 = 26;
const INDEX_NOT_FOUND_CODE: i32 = 27;
const INVALID_OPTIONS_CODE: i32 = 72;
const INDEX_OPTIONS_CONFLICT_CODE: i32 = 85;
const IMMUTABLE_FIELD_CODE: i32 = 66;

#[derive(Debug, Clone)]
struct StoredIndex {
    keys: Document,
    unique: bool,
    options: Document,
}

impl StoredIndex {

    fn id_index() -> StoredIndex {
        StoredIndex {
            keys: doc! { ID_FIELD: 1 },
            unique: true,
            options: Document::new(),
        }
    }

    fn key_of(&self, doc: &Document) -> Vec<Bson> {
        self.keys
            .keys()
            .map(|field| try_get_document_value(doc, field).unwrap_or(Bson::Null))
            .collect()
    }

}

/// Which kind of write ran into a unique index, for the error it reports.
#[derive(Copy, Clone)]
enum Conflict {
    Insert,
    Update,
}

#[derive(Debug)]
struct MemoryCollection {
    docs: Vec<Document>,
    indexes: IndexMap<String, StoredIndex>,
}

impl MemoryCollection {

    fn new() -> MemoryCollection {
        let mut indexes = IndexMap::new();
        indexes.insert(ID_INDEX_NAME.to_string(), StoredIndex::id_index());
        MemoryCollection {
            docs: Vec::new(),
            indexes,
        }
    }

    fn position_of_id(&self, id: &Bson) -> Option<usize> {
        self.docs
            .iter()
            .position(|doc| doc.get(ID_FIELD).map_or(false, |stored| value_eq(stored, id)))
    }

    /// Checks `doc` against every unique index, ignoring the stored document
    /// at `skip` and also comparing against the not yet stored `pending` ones.
    fn check_unique(
        &self,
        ns: &str,
        doc: &Document,
        skip: Option<usize>,
        pending: &[Document],
        conflict: Conflict,
    ) -> DriverResult<()> {
        for (name, index) in self.indexes.iter().filter(|(_, index)| index.unique) {
            let key = index.key_of(doc);
            let stored = self.docs
                .iter()
                .enumerate()
                .filter(|(pos, _)| Some(*pos) != skip)
                .map(|(_, other)| other);
            let mut others = stored.chain(pending.iter());
            let clash = others.any(|other| {
                let other_key = index.key_of(other);
                other_key.iter().zip(key.iter()).all(|(a, b)| value_eq(a, b))
            });
            if clash {
                return Err(duplicate_key_error(conflict, ns, name, &index.keys, &key));
            }
        }
        Ok(())
    }

    fn matching_positions(&self, filter: &Document) -> DriverResult<Vec<usize>> {
        let mut result = Vec::new();
        for (pos, doc) in self.docs.iter().enumerate() {
            if matches_filter(doc, filter)? {
                result.push(pos);
            }
        }
        Ok(result)
    }

    /// Builds the document an upsert inserts: the equality part of the
    /// selector with the update applied on top.
    fn upsert_document(&self, selector: &Document, update: &Document) -> DriverResult<Document> {
        let mut base = Document::new();
        for (key, value) in selector {
            if key.starts_with('$') || is_operator_document(value) {
                continue;
            }
            set_document_value(&mut base, key, value.clone()).map_err(path_conflict_error)?;
        }
        let mut result = apply_update(&base, update)?;
        if !result.contains_key(ID_FIELD) {
            result = with_id_first(result, Bson::ObjectId(ObjectId::new()));
        }
        Ok(result)
    }

    fn replace_at(&mut self, ns: &str, pos: usize, doc: Document, conflict: Conflict) -> DriverResult<()> {
        self.check_unique(ns, &doc, Some(pos), &[], conflict)?;
        self.docs[pos] = doc;
        Ok(())
    }

}

/// Single-process [`Driver`] that keeps every collection in memory.
///
/// Good enough to stand in for a server in tests and tools: it enforces
/// unique indexes, reports conflicts the way a server does (`E11000`,
/// `E11001`) and honors unacknowledged write concerns by recording failures
/// in the receipt instead of raising them.
pub struct MemoryDriver {
    db_name: String,
    collections: Mutex<HashMap<String, MemoryCollection>>,
}

impl MemoryDriver {

    pub fn new() -> MemoryDriver {
        MemoryDriver::with_db_name("memory")
    }

    pub fn with_db_name(db_name: impl Into<String>) -> MemoryDriver {
        MemoryDriver {
            db_name: db_name.into(),
            collections: Mutex::new(HashMap::new()),
        }
    }

    /// Number of stored documents, `0` for unknown collections.
    pub fn count(&self, collection: &str) -> DriverResult<usize> {
        let collections = self.lock()?;
        Ok(collections.get(collection).map_or(0, |col| col.docs.len()))
    }

    fn ns(&self, collection: &str) -> String {
        format!("{}.{}", self.db_name, collection)
    }

    fn lock(&self) -> DriverResult<MutexGuard<'_, HashMap<String, MemoryCollection>>> {
        self.collections
            .lock()
            .map_err(|_| DriverError::new("the memory store is poisoned"))
    }

    fn write<F>(&self, collection: &str, concern: &WriteConcern, f: F) -> DriverResult<WriteReceipt>
    where
        F: FnOnce(&mut MemoryCollection, &str) -> DriverResult<WriteReceipt>,
    {
        let ns = self.ns(collection);
        let result = {
            let mut collections = self.lock()?;
            let col = collections
                .entry(collection.to_string())
                .or_insert_with(MemoryCollection::new);
            f(col, ns.as_str())
        };
        match result {
            Err(err) if !concern.requires_acknowledgment() => {
                debug!("unacknowledged write on {} failed: {}", ns, err);
                Ok(WriteReceipt::failed(&err))
            }
            other => other,
        }
    }

}

impl Default for MemoryDriver {
    fn default() -> Self {
        MemoryDriver::new()
    }
}

impl Driver for MemoryDriver {

    fn insert(&self, collection: &str, docs: &[Document], concern: &WriteConcern) -> DriverResult<WriteReceipt> {
        self.write(collection, concern, |col, ns| {
            let mut pending: Vec<Document> = Vec::with_capacity(docs.len());
            for doc in docs {
                let doc = match doc.get(ID_FIELD) {
                    Some(_) => doc.clone(),
                    None => with_id_first(doc.clone(), Bson::ObjectId(ObjectId::new())),
                };
                col.check_unique(ns, &doc, None, &pending, Conflict::Insert)?;
                pending.push(doc);
            }
            let n = pending.len() as i64;
            col.docs.extend(pending);
            Ok(WriteReceipt::ok(n))
        })
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
        if multi && !is_operator_update(update) {
            return Err(DriverError::with_code(
                FAILED_TO_PARSE_CODE,
                "multi update only works with $ operators",
            ));
        }
        self.write(collection, concern, |col, ns| {
            let mut positions = col.matching_positions(selector)?;
            if positions.is_empty() {
                if !upsert {
                    return Ok(WriteReceipt::ok(0).with_field("updatedExisting", false));
                }
                let doc = col.upsert_document(selector, update)?;
                col.check_unique(ns, &doc, None, &[], Conflict::Update)?;
                let id = doc.get(ID_FIELD).cloned().unwrap_or(Bson::Null);
                col.docs.push(doc);
                return Ok(WriteReceipt::ok(1)
                    .with_field("updatedExisting", false)
                    .with_field("upserted", id));
            }

            if !multi {
                positions.truncate(1);
            }
            for pos in positions.iter().copied() {
                let updated = apply_update(&col.docs[pos], update)?;
                col.replace_at(ns, pos, updated, Conflict::Update)?;
            }
            Ok(WriteReceipt::ok(positions.len() as i64).with_field("updatedExisting", true))
        })
    }

    fn remove(&self, collection: &str, selector: &Document, concern: &WriteConcern) -> DriverResult<WriteReceipt> {
        self.write(collection, concern, |col, _ns| {
            let positions = col.matching_positions(selector)?;
            let mut pos_iter = positions.iter().peekable();
            let mut index = 0;
            col.docs.retain(|_| {
                let keep = pos_iter.peek().map_or(true, |pos| **pos != index);
                if !keep {
                    pos_iter.next();
                }
                index += 1;
                keep
            });
            Ok(WriteReceipt::ok(positions.len() as i64))
        })
    }

    fn save(&self, collection: &str, doc: &Document, concern: &WriteConcern) -> DriverResult<WriteReceipt> {
        self.write(collection, concern, |col, ns| {
            let existing = doc.get(ID_FIELD).and_then(|id| col.position_of_id(id));
            match existing {
                Some(pos) => {
                    col.replace_at(ns, pos, doc.clone(), Conflict::Insert)?;
                    Ok(WriteReceipt::ok(1).with_field("updatedExisting", true))
                }
                None => {
                    let doc = match doc.get(ID_FIELD) {
                        Some(_) => doc.clone(),
                        None => with_id_first(doc.clone(), Bson::ObjectId(ObjectId::new())),
                    };
                    col.check_unique(ns, &doc, None, &[], Conflict::Insert)?;
                    col.docs.push(doc);
                    Ok(WriteReceipt::ok(1))
                }
            }
        })
    }

    fn find_and_modify(&self, collection: &str, args: &FindAndModifyArgs) -> DriverResult<Option<Document>> {
        if args.remove == args.update.is_some() {
            return Err(DriverError::with_code(
                FAILED_TO_PARSE_CODE,
                "exactly one of remove or update must be specified",
            ));
        }
        let ns = self.ns(collection);
        let mut collections = self.lock()?;
        let col = collections
            .entry(collection.to_string())
            .or_insert_with(MemoryCollection::new);

        let mut positions = col.matching_positions(&args.query)?;
        if let Some(sort) = &args.sort {
            positions.sort_by(|a, b| compare_by_sort(&col.docs[*a], &col.docs[*b], sort));
        }

        let found = match positions.first() {
            Some(pos) => *pos,
            None => {
                let update = match (&args.update, args.upsert) {
                    (Some(update), true) => update,
                    _ => return Ok(None),
                };
                let doc = col.upsert_document(&args.query, update)?;
                col.check_unique(&ns, &doc, None, &[], Conflict::Insert)?;
                col.docs.push(doc.clone());
                if !args.return_new {
                    return Ok(None);
                }
                return Ok(Some(project(doc, args.fields.as_ref())));
            }
        };

        if args.remove {
            let old = col.docs.remove(found);
            return Ok(Some(project(old, args.fields.as_ref())));
        }

        let update = args.update.as_ref().ok_or_else(|| DriverError::new("update is missing"))?;
        let old = col.docs[found].clone();
        let updated = apply_update(&old, update)?;
        col.replace_at(&ns, found, updated.clone(), Conflict::Insert)?;

        let result = if args.return_new { updated } else { old };
        Ok(Some(project(result, args.fields.as_ref())))
    }

    fn find(&self, collection: &str, filter: &Document, options: &FindOptions) -> DriverResult<DriverCursor> {
        let collections = self.lock()?;
        let col = match collections.get(collection) {
            Some(col) => col,
            None => return Ok(Box::new(std::iter::empty())),
        };

        let mut found = Vec::new();
        for doc in &col.docs {
            if matches_filter(doc, filter)? {
                found.push(doc.clone());
            }
        }
        if let Some(sort) = &options.sort {
            found.sort_by(|a, b| compare_by_sort(a, b, sort));
        }

        let mut cap = match options.limit {
            0 => usize::MAX,
            limit => limit.unsigned_abs() as usize,
        };
        if options.batch_size < 0 {
            cap = cap.min(options.batch_size.unsigned_abs() as usize);
        }

        let projection = options.projection.clone();
        let docs = found
            .into_iter()
            .skip(options.skip as usize)
            .take(cap)
            .map(move |doc| Ok(project(doc, projection.as_ref())))
            .collect::<Vec<DriverResult<Document>>>();

        Ok(Box::new(docs.into_iter()))
    }

    fn create_index(&self, collection: &str, keys: &Document, options: &Document) -> DriverResult<()> {
        if keys.is_empty() {
            return Err(DriverError::with_code(BAD_VALUE_CODE, "index keys cannot be empty"));
        }
        let name = match options.get("name") {
            Some(Bson::String(name)) => name.clone(),
            _ => name_from_stored_keys(keys),
        };
        let unique = matches!(options.get("unique"), Some(Bson::Boolean(true)));
        let drop_dups = matches!(options.get("dropDups"), Some(Bson::Boolean(true)));

        let ns = self.ns(collection);
        let mut collections = self.lock()?;
        let col = collections
            .entry(collection.to_string())
            .or_insert_with(MemoryCollection::new);

        if let Some(existing) = col.indexes.get(&name) {
            if existing.keys == *keys && existing.unique == unique {
                return Ok(());
            }
            return Err(DriverError::with_code(
                INDEX_OPTIONS_CONFLICT_CODE,
                format!("Index with name: {} already exists with different options", name),
            ));
        }
        if let Some((other, _)) = col.indexes.iter().find(|(_, index)| index.keys == *keys) {
            return Err(DriverError::with_code(
                INDEX_OPTIONS_CONFLICT_CODE,
                format!("Index with keys: {} already exists with a different name: {}", keys, other),
            ));
        }

        let index = StoredIndex {
            keys: keys.clone(),
            unique,
            options: options.clone(),
        };

        if unique {
            let mut seen: Vec<Vec<Bson>> = Vec::new();
            let mut doomed: Vec<usize> = Vec::new();
            for (pos, doc) in col.docs.iter().enumerate() {
                let key = index.key_of(doc);
                let clash = seen
                    .iter()
                    .any(|other| other.iter().zip(key.iter()).all(|(a, b)| value_eq(a, b)));
                if !clash {
                    seen.push(key);
                    continue;
                }
                if !drop_dups {
                    return Err(duplicate_key_error(Conflict::Insert, &ns, &name, keys, &key));
                }
                doomed.push(pos);
            }
            for pos in doomed.into_iter().rev() {
                col.docs.remove(pos);
            }
        }

        col.indexes.insert(name, index);
        Ok(())
    }

    fn drop_index(&self, collection: &str, name: &str) -> DriverResult<()> {
        let mut collections = self.lock()?;
        let col = collections.get_mut(collection).ok_or_else(|| {
            DriverError::with_code(NAMESPACE_NOT_FOUND_CODE, format!("ns not found {}", self.ns(collection)))
        })?;
        if name == ID_INDEX_NAME {
            return Err(DriverError::with_code(INVALID_OPTIONS_CODE, "cannot drop _id index"));
        }
        match col.indexes.shift_remove(name) {
            Some(_) => Ok(()),
            None => Err(DriverError::with_code(
                INDEX_NOT_FOUND_CODE,
                format!("index not found with name [{}]", name),
            )),
        }
    }

    fn list_indexes(&self, collection: &str) -> DriverResult<IndexMap<String, Document>> {
        let collections = self.lock()?;
        let col = match collections.get(collection) {
            Some(col) => col,
            None => return Ok(IndexMap::new()),
        };
        let ns = self.ns(collection);
        let mut result = IndexMap::new();
        for (name, index) in &col.indexes {
            let mut entry = doc! {
                "v": 2,
                "key": index.keys.clone(),
                "name": name.clone(),
                "ns": ns.clone(),
            };
            for (key, value) in &index.options {
                if !entry.contains_key(key) {
                    entry.insert(key.clone(), value.clone());
                }
            }
            if index.unique && name != ID_INDEX_NAME {
                entry.insert("unique", true);
            }
            result.insert(name.clone(), entry);
        }
        Ok(result)
    }

}

fn duplicate_key_error(conflict: Conflict, ns: &str, index_name: &str, keys: &Document, key: &[Bson]) -> DriverError {
    let mut dup_key = Document::new();
    for (field, value) in keys.keys().zip(key.iter()) {
        dup_key.insert(field.clone(), value.clone());
    }
    match conflict {
        Conflict::Insert => DriverError::with_code(
            DUPLICATE_KEY_CODE,
            format!("E11000 duplicate key error collection: {} index: {} dup key: {}", ns, index_name, dup_key),
        ),
        Conflict::Update => DriverError::with_code(
            DUPLICATE_KEY_ON_UPDATE_CODE,
            format!("E11001 duplicate key on update collection: {} index: {} dup key: {}", ns, index_name, dup_key),
        ),
    }
}

fn path_conflict_error(segment: String) -> DriverError {
    DriverError::with_code(BAD_VALUE_CODE, format!("cannot create field in element '{}'", segment))
}

fn with_id_first(doc: Document, id: Bson) -> Document {
    let mut result = doc! { ID_FIELD: id };
    for (key, value) in doc {
        if key != ID_FIELD {
            result.insert(key, value);
        }
    }
    result
}

fn is_operator_document(value: &Bson) -> bool {
    match value {
        Bson::Document(doc) => doc.keys().next().map_or(false, |key| key.starts_with('$')),
        _ => false,
    }
}

fn is_operator_update(update: &Document) -> bool {
    update.keys().next().map_or(false, |key| key.starts_with('$'))
}

fn matches_filter(doc: &Document, filter: &Document) -> DriverResult<bool> {
    for (key, condition) in filter {
        let value = try_get_document_value(doc, key);
        let matched = match condition {
            Bson::Document(ops) if is_operator_document(condition) => {
                let mut all = true;
                for (op, operand) in ops {
                    if !matches_operator(value.as_ref(), op, operand)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            expected => value_eq(value.as_ref().unwrap_or(&Bson::Null), expected),
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn matches_operator(value: Option<&Bson>, op: &str, operand: &Bson) -> DriverResult<bool> {
    let actual = value.unwrap_or(&Bson::Null);
    let result = match op {
        "$eq" => value_eq(actual, operand),
        "$ne" => !value_eq(actual, operand),
        "$gt" => value.is_some() && value_cmp(actual, operand) == Ordering::Greater,
        "$gte" => value.is_some() && value_cmp(actual, operand) != Ordering::Less,
        "$lt" => value.is_some() && value_cmp(actual, operand) == Ordering::Less,
        "$lte" => value.is_some() && value_cmp(actual, operand) != Ordering::Greater,
        "$in" | "$nin" => {
            let candidates = operand.as_array().ok_or_else(|| {
                DriverError::with_code(BAD_VALUE_CODE, format!("{} needs an array", op))
            })?;
            let found = candidates.iter().any(|candidate| value_eq(actual, candidate));
            if op == "$in" { found } else { !found }
        }
        "$exists" => {
            let wanted = operand.as_bool().unwrap_or(true);
            value.is_some() == wanted
        }
        _ => {
            return Err(DriverError::with_code(BAD_VALUE_CODE, format!("unknown operator: {}", op)));
        }
    };
    Ok(result)
}

fn apply_update(original: &Document, update: &Document) -> DriverResult<Document> {
    if !is_operator_update(update) {
        // whole document replacement, the primary key survives
        let mut result = Document::new();
        if let Some(id) = original.get(ID_FIELD) {
            if let Some(new_id) = update.get(ID_FIELD) {
                if !value_eq(id, new_id) {
                    return Err(DriverError::with_code(IMMUTABLE_FIELD_CODE, "the _id field cannot be changed"));
                }
            }
            result.insert(ID_FIELD, id.clone());
        }
        for (key, value) in update {
            if key.starts_with('$') {
                return Err(DriverError::with_code(
                    BAD_VALUE_CODE,
                    format!("cannot mix operators and fields in an update: {}", key),
                ));
            }
            result.insert(key.clone(), value.clone());
        }
        return Ok(result);
    }

    let mut result = original.clone();
    for (op, fields) in update {
        let fields = match fields {
            Bson::Document(fields) => fields,
            other => {
                return Err(DriverError::with_code(
                    FAILED_TO_PARSE_CODE,
                    format!("modifier {} expects a document, got {}", op, other),
                ));
            }
        };
        for (field, value) in fields {
            if field == ID_FIELD && op != "$set" {
                return Err(DriverError::with_code(IMMUTABLE_FIELD_CODE, "the _id field cannot be changed"));
            }
            match op.as_str() {
                "$set" => {
                    if field == ID_FIELD && original.get(ID_FIELD).map_or(false, |id| !value_eq(id, value)) {
                        return Err(DriverError::with_code(IMMUTABLE_FIELD_CODE, "the _id field cannot be changed"));
                    }
                    set_document_value(&mut result, field, value.clone()).map_err(path_conflict_error)?;
                }
                "$unset" => {
                    remove_document_value(&mut result, field);
                }
                "$inc" => {
                    let current = try_get_document_value(&result, field).unwrap_or(Bson::Int32(0));
                    let next = add_numbers(field, &current, value)?;
                    set_document_value(&mut result, field, next).map_err(path_conflict_error)?;
                }
                _ => {
                    return Err(DriverError::with_code(
                        FAILED_TO_PARSE_CODE,
                        format!("unknown modifier: {}", op),
                    ));
                }
            }
        }
    }
    Ok(result)
}

fn add_numbers(field: &str, a: &Bson, b: &Bson) -> DriverResult<Bson> {
    let overflow = || DriverError::with_code(
        BAD_VALUE_CODE,
        format!("$inc would overflow the value of {}", field),
    );
    let result = match (a, b) {
        (Bson::Int32(x), Bson::Int32(y)) => match x.checked_add(*y) {
            Some(sum) => Bson::Int32(sum),
            // two i32 always fit an i64
            None => Bson::Int64(*x as i64 + *y as i64),
        },
        (Bson::Int32(x), Bson::Int64(y)) => Bson::Int64((*x as i64).checked_add(*y).ok_or_else(overflow)?),
        (Bson::Int64(x), Bson::Int32(y)) => Bson::Int64(x.checked_add(*y as i64).ok_or_else(overflow)?),
        (Bson::Int64(x), Bson::Int64(y)) => Bson::Int64(x.checked_add(*y).ok_or_else(overflow)?),
        (Bson::Double(x), other) | (other, Bson::Double(x)) => match as_f64(other) {
            Some(y) => Bson::Double(x + y),
            None => return Err(non_numeric_error(field)),
        },
        _ => return Err(non_numeric_error(field)),
    };
    Ok(result)
}

fn non_numeric_error(field: &str) -> DriverError {
    DriverError::with_code(
        BAD_VALUE_CODE,
        format!("cannot apply $inc to a value of non-numeric type: {}", field),
    )
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(*n as f64),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(d) => Some(*d),
        _ => None,
    }
}

fn compare_by_sort(a: &Document, b: &Document, sort: &Document) -> Ordering {
    for (field, direction) in sort {
        let left = try_get_document_value(a, field).unwrap_or(Bson::Null);
        let right = try_get_document_value(b, field).unwrap_or(Bson::Null);
        let ord = value_cmp(&left, &right);
        let descending = as_f64(direction).map_or(false, |d| d < 0.0);
        let ord = if descending { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn project(doc: Document, projection: Option<&Document>) -> Document {
    let projection = match projection {
        Some(projection) if !projection.is_empty() => projection,
        _ => return doc,
    };
    let truthy = |value: &Bson| match value {
        Bson::Boolean(b) => *b,
        other => as_f64(other).map_or(true, |n| n != 0.0),
    };
    let inclusive = projection.iter().any(|(field, value)| field != ID_FIELD && truthy(value))
        || projection.iter().all(|(field, value)| field == ID_FIELD && truthy(value));

    if !inclusive {
        let mut result = doc;
        for (field, _) in projection.iter().filter(|(_, value)| !truthy(value)) {
            remove_document_value(&mut result, field);
        }
        return result;
    }

    let mut result = Document::new();
    let keep_id = projection.get(ID_FIELD).map_or(true, |value| truthy(value));
    if keep_id {
        if let Some(id) = doc.get(ID_FIELD) {
            result.insert(ID_FIELD, id.clone());
        }
    }
    for (field, value) in projection {
        if field == ID_FIELD || !truthy(value) {
            continue;
        }
        if let Some(found) = try_get_document_value(&doc, field) {
            // paths were validated against `doc`, they cannot collide here
            let _ = set_document_value(&mut result, field, found);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use bson::{doc, Bson, Document};
    use crate::driver::{Driver, FindAndModifyArgs, FindOptions};
    use crate::{classify, WriteConcern, WriteErrorKind};
    use super::MemoryDriver;

    fn all(driver: &MemoryDriver, col: &str, filter: Document) -> Vec<Document> {
        driver
            .find(col, &filter, &FindOptions::default())
            .unwrap()
            .collect::<Result<Vec<Document>, _>>()
            .unwrap()
    }

    #[test]
    fn test_batch_insert_is_atomic() {
        let driver = MemoryDriver::new();
        let concern = WriteConcern::acknowledged();
        driver.insert("test", &[doc! { "_id": 1 }], &concern).unwrap();

        let err = driver
            .insert("test", &[doc! { "_id": 2 }, doc! { "_id": 1 }], &concern)
            .unwrap_err();
        assert_eq!(err.kind(), WriteErrorKind::DuplicateInsert);
        assert!(err.message.starts_with("E11000"));
        assert_eq!(driver.count("test").unwrap(), 1);
    }

    #[test]
    fn test_unacknowledged_failure_goes_to_receipt() {
        let driver = MemoryDriver::new();
        let concern = WriteConcern::unacknowledged();
        driver.insert("test", &[doc! { "_id": 1 }], &concern).unwrap();
        let receipt = driver.insert("test", &[doc! { "_id": 1 }], &concern).unwrap();
        let last_error = driver.get_last_error(receipt, &concern).unwrap();
        assert_eq!(classify::classify_last_error(&last_error), Some(WriteErrorKind::DuplicateInsert));
    }

    #[test]
    fn test_update_operators_and_upsert() {
        let driver = MemoryDriver::new();
        let concern = WriteConcern::acknowledged();
        driver.insert("test", &[doc! { "_id": 1, "n": 1, "tag": "a" }], &concern).unwrap();

        driver.update("test", &doc! { "_id": 1 }, &doc! {
            "$inc": { "n": 2 },
            "$set": { "meta.seen": true },
            "$unset": { "tag": "" },
        }, false, false, &concern).unwrap();
        assert_eq!(all(&driver, "test", doc! {}), vec![doc! { "_id": 1, "n": 3, "meta": { "seen": true } }]);

        let receipt = driver.update("test", &doc! { "name": "new" }, &doc! {
            "$set": { "n": 10 },
        }, true, false, &concern).unwrap();
        assert_eq!(receipt.last_error().get_bool("updatedExisting").unwrap(), false);
        let found = all(&driver, "test", doc! { "name": "new" });
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get_i32("n").unwrap(), 10);
    }

    #[test]
    fn test_inc_overflow() {
        let driver = MemoryDriver::new();
        let concern = WriteConcern::acknowledged();
        driver.insert("test", &[doc! { "_id": 1, "big": i64::MAX, "small": i32::MAX }], &concern).unwrap();

        let err = driver.update("test", &doc! { "_id": 1 }, &doc! {
            "$inc": { "big": 1 },
        }, false, false, &concern).unwrap_err();
        assert_eq!(err.code, Some(2));
        assert_eq!(err.kind(), WriteErrorKind::Other);

        driver.update("test", &doc! { "_id": 1 }, &doc! {
            "$inc": { "small": 1 },
        }, false, false, &concern).unwrap();
        let stored = all(&driver, "test", doc! {});
        assert_eq!(stored[0].get_i64("small").unwrap(), i32::MAX as i64 + 1);
        assert_eq!(stored[0].get_i64("big").unwrap(), i64::MAX);
    }

    #[test]
    fn test_update_conflict_reports_update_family() {
        let driver = MemoryDriver::new();
        let concern = WriteConcern::acknowledged();
        driver.create_index("test", &doc! { "email": 1 }, &doc! { "name": "email_1", "unique": true }).unwrap();
        driver.insert("test", &[
            doc! { "_id": 1, "email": "a@x" },
            doc! { "_id": 2, "email": "b@x" },
        ], &concern).unwrap();

        let err = driver.update("test", &doc! { "_id": 2 }, &doc! {
            "$set": { "email": "a@x" },
        }, false, false, &concern).unwrap_err();
        assert_eq!(err.kind(), WriteErrorKind::DuplicateUpdate);
    }

    #[test]
    fn test_unique_index_build_with_drop_dups() {
        let driver = MemoryDriver::new();
        let concern = WriteConcern::acknowledged();
        driver.insert("test", &[
            doc! { "_id": 1, "name": "a" },
            doc! { "_id": 2, "name": "a" },
            doc! { "_id": 3, "name": "b" },
        ], &concern).unwrap();

        let err = driver
            .create_index("test", &doc! { "name": 1 }, &doc! { "name": "name_1", "unique": true })
            .unwrap_err();
        assert_eq!(err.kind(), WriteErrorKind::DuplicateInsert);

        driver.create_index("test", &doc! { "name": 1 }, &doc! {
            "name": "name_1",
            "unique": true,
            "dropDups": true,
        }).unwrap();
        assert_eq!(driver.count("test").unwrap(), 2);
        assert!(driver.list_indexes("test").unwrap().contains_key("name_1"));
    }

    #[test]
    fn test_find_options() {
        let driver = MemoryDriver::new();
        let concern = WriteConcern::acknowledged();
        let docs = (0..5).map(|i| doc! { "_id": i, "n": i % 2 }).collect::<Vec<Document>>();
        driver.insert("test", &docs, &concern).unwrap();

        let options = FindOptions {
            sort: Some(doc! { "_id": -1 }),
            skip: 1,
            limit: 2,
            projection: Some(doc! { "n": 0 }),
            ..Default::default()
        };
        let found = driver
            .find("test", &doc! { "_id": { "$gte": 1 } }, &options)
            .unwrap()
            .collect::<Result<Vec<Document>, _>>()
            .unwrap();
        assert_eq!(found, vec![doc! { "_id": 3 }, doc! { "_id": 2 }]);

        let options = FindOptions {
            batch_size: -1,
            ..Default::default()
        };
        assert_eq!(driver.find("test", &doc! {}, &options).unwrap().count(), 1);
    }

    #[test]
    fn test_find_and_modify() {
        let driver = MemoryDriver::new();
        let concern = WriteConcern::acknowledged();
        driver.insert("test", &[doc! { "_id": 1, "n": 1 }, doc! { "_id": 2, "n": 5 }], &concern).unwrap();

        let old = driver.find_and_modify("test", &FindAndModifyArgs {
            query: doc! {},
            sort: Some(doc! { "n": -1 }),
            update: Some(doc! { "$inc": { "n": 1 } }),
            ..Default::default()
        }).unwrap().unwrap();
        assert_eq!(old, doc! { "_id": 2, "n": 5 });

        let removed = driver.find_and_modify("test", &FindAndModifyArgs {
            query: doc! { "_id": 1 },
            remove: true,
            fields: Some(doc! { "_id": 1 }),
            ..Default::default()
        }).unwrap().unwrap();
        assert_eq!(removed, doc! { "_id": 1 });
        assert_eq!(driver.count("test").unwrap(), 1);

        let err = driver.find_and_modify("test", &FindAndModifyArgs::default()).unwrap_err();
        assert_eq!(err.code, Some(9));
    }

    #[test]
    fn test_drop_index_guards() {
        let driver = MemoryDriver::new();
        driver.create_index("test", &doc! { "a": 1 }, &doc! { "name": "a_1" }).unwrap();
        assert!(driver.drop_index("test", "_id_").is_err());
        assert_eq!(driver.drop_index("test", "nope").unwrap_err().code, Some(27));
        driver.drop_index("test", "a_1").unwrap();
        assert_eq!(driver.list_indexes("test").unwrap().len(), 1);
        assert!(matches!(driver.list_indexes("test").unwrap()["_id_"].get("key"), Some(Bson::Document(_))));
    }

}
