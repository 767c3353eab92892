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
use crate::index::{IndexKeys, IndexSpec};

/// The name an index gets when the caller does not give one.
///
/// A bare name is returned unchanged. A field list becomes
/// `field1_dir1_field2_dir2...` in field order.
pub fn index_name(spec: &IndexSpec, keys: &IndexKeys) -> String {
    match spec {
        IndexSpec::Named(name) => name.clone(),
        IndexSpec::FieldList(_) => name_from_keys(keys),
    }
}

pub fn name_from_keys(keys: &IndexKeys) -> String {
    join_segments(keys.iter().map(|(field, direction)| (field.as_str(), direction.to_string())))
}

/// Derives a name from the `key` document of an index reported by the server.
///
/// Stored directions are not restricted to the ones this crate creates
/// (`"text"`, `"hashed"`...), so the raw value is rendered as is.
pub fn name_from_stored_keys(keys: &Document) -> String {
    join_segments(keys.iter().map(|(field, direction)| (field.as_str(), render_direction(direction))))
}

fn render_direction(value: &Bson) -> String {
    match value {
        Bson::Int32(n) => n.to_string(),
        Bson::Int64(n) => n.to_string(),
        Bson::Double(d) if d.fract() == 0.0 && d.is_finite() => (*d as i64).to_string(),
        Bson::Double(d) => d.to_string(),
        Bson::String(s) | Bson::Symbol(s) => s.clone(),
        other => other.to_string(),
    }
}

fn join_segments<'a>(segments: impl Iterator<Item = (&'a str, String)>) -> String {
    segments
        .map(|(field, direction)| format!("{}_{}", field, direction))
        .collect::<Vec<String>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use bson::{doc, Bson};
    use crate::index::{parse_index_spec, IndexSpec};
    use super::{index_name, name_from_stored_keys};

    fn name_of(spec: IndexSpec) -> String {
        let keys = parse_index_spec(&spec).unwrap();
        index_name(&spec, &keys)
    }

    #[test]
    fn test_field_list_name() {
        let spec = IndexSpec::from(vec![("a", 1), ("b", -1)]);
        assert_eq!(name_of(spec), "a_1_b_-1");
    }

    #[test]
    fn test_geo_name() {
        let spec = IndexSpec::from(vec![("loc", Bson::String("2d".into())), ("type", Bson::Int32(1))]);
        assert_eq!(name_of(spec), "loc_2d_type_1");
    }

    #[test]
    fn test_bare_name_unchanged() {
        assert_eq!(name_of(IndexSpec::from("name")), "name");
        assert_eq!(name_of(IndexSpec::from_bson(Bson::Symbol("age".into())).unwrap()), "age");
    }

    #[test]
    fn test_stored_keys_agree_with_derivation() {
        let spec = IndexSpec::from(vec![("author.age", 1), ("title", -1)]);
        let stored = doc! { "author.age": 1.0, "title": -1_i64 };
        assert_eq!(name_of(spec), name_from_stored_keys(&stored));

        assert_eq!(name_from_stored_keys(&doc! { "body": "text" }), "body_text");
    }

}
