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
use std::cmp::Ordering;

/// Total order over BSON values: numbers compare across widths, values of
/// different kinds order by element type.
pub fn value_cmp(a: &Bson, b: &Bson) -> Ordering {
    match (a, b) {
        (Bson::Null, Bson::Null) => Ordering::Equal,
        (Bson::Undefined, Bson::Undefined) => Ordering::Equal,
        (Bson::DateTime(d1), Bson::DateTime(d2)) => d1.cmp(d2),
        (Bson::Boolean(b1), Bson::Boolean(b2)) => b1.cmp(b2),
        (Bson::Int64(i1), Bson::Int64(i2)) => i1.cmp(i2),
        (Bson::Int32(i1), Bson::Int32(i2)) => i1.cmp(i2),
        (Bson::Int64(i1), Bson::Int32(i2)) => i1.cmp(&(*i2 as i64)),
        (Bson::Int32(i1), Bson::Int64(i2)) => (*i1 as i64).cmp(i2),
        (Bson::Double(d1), Bson::Double(d2)) => d1.total_cmp(d2),
        (Bson::Double(d1), Bson::Int32(i2)) => d1.total_cmp(&(*i2 as f64)),
        (Bson::Double(d1), Bson::Int64(i2)) => d1.total_cmp(&(*i2 as f64)),
        (Bson::Int32(i1), Bson::Double(d2)) => (*i1 as f64).total_cmp(d2),
        (Bson::Int64(i1), Bson::Double(d2)) => (*i1 as f64).total_cmp(d2),
        (Bson::Binary(b1), Bson::Binary(b2)) => b1.bytes.cmp(&b2.bytes),
        (Bson::String(str1), Bson::String(str2)) => str1.cmp(str2),
        (Bson::ObjectId(oid1), Bson::ObjectId(oid2)) => oid1.cmp(oid2),
        _ => {
            let a_type = a.element_type() as u8;
            let b_type = b.element_type() as u8;
            if a_type != b_type {
                return a_type.cmp(&b_type);
            }

            // documents, arrays and the rarer types: structural order is enough here
            a.to_string().cmp(&b.to_string())
        }
    }
}

#[inline]
pub fn value_eq(a: &Bson, b: &Bson) -> bool {
    value_cmp(a, b) == Ordering::Equal
}

/// Reads a dotted path such as `author.age`.
pub fn try_get_document_value(doc: &Document, key: &str) -> Option<Bson> {
    let keys = key.split('.').collect::<Vec<&str>>();
    try_get_document_by_slices(doc, keys.as_slice())
}

fn try_get_document_by_slices(doc: &Document, keys: &[&str]) -> Option<Bson> {
    let (first, remains) = keys.split_first()?;
    match doc.get(*first) {
        Some(Bson::Document(sub)) if !remains.is_empty() => try_get_document_by_slices(sub, remains),
        Some(v) if remains.is_empty() => Some(v.clone()),
        _ => None,
    }
}

/// Writes a dotted path, creating the intermediate documents. Fails with the
/// offending segment when a non-document value is in the way.
pub fn set_document_value(doc: &mut Document, key: &str, value: Bson) -> Result<(), String> {
    match key.split_once('.') {
        None => {
            doc.insert(key, value);
            Ok(())
        }
        Some((first, rest)) => {
            if !doc.contains_key(first) {
                doc.insert(first, Document::new());
            }
            match doc.get_mut(first) {
                Some(Bson::Document(sub)) => set_document_value(sub, rest, value),
                _ => Err(first.to_string()),
            }
        }
    }
}

pub fn remove_document_value(doc: &mut Document, key: &str) -> Option<Bson> {
    match key.split_once('.') {
        None => doc.remove(key),
        Some((first, rest)) => match doc.get_mut(first) {
            Some(Bson::Document(sub)) => remove_document_value(sub, rest),
            _ => None,
        },
    }
}
