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

use std::fmt;
use std::sync::Arc;
use bson::{Binary, Bson, Document};
use bson::oid::ObjectId;
use bson::spec::BinarySubtype;
use uuid::Uuid;

pub const DEFAULT_PK_FIELD: &str = "_id";

/// Source of fresh primary key values. Implementations are shared between
/// threads and must not hand out the same value twice.
pub trait KeyGenerator: Send + Sync {
    fn generate(&self) -> Bson;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ObjectIdGenerator;

impl KeyGenerator for ObjectIdGenerator {
    fn generate(&self) -> Bson {
        Bson::ObjectId(ObjectId::new())
    }
}

/// Generates random v4 UUIDs stored as BSON binary subtype 4.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl KeyGenerator for UuidGenerator {
    fn generate(&self) -> Bson {
        let uuid = Uuid::new_v4();
        Bson::Binary(Binary {
            subtype: BinarySubtype::Uuid,
            bytes: uuid.as_bytes().to_vec(),
        })
    }
}

#[derive(Clone)]
pub struct PrimaryKeyFactory {
    field: String,
    aliases: Vec<String>,
    generator: Arc<dyn KeyGenerator>,
}

impl PrimaryKeyFactory {

    pub fn new(field: impl Into<String>, aliases: Vec<String>, generator: Arc<dyn KeyGenerator>) -> PrimaryKeyFactory {
        PrimaryKeyFactory {
            field: field.into(),
            aliases,
            generator,
        }
    }

    #[inline]
    pub fn field(&self) -> &str {
        self.field.as_str()
    }

    /// Returns the non-null key the document already carries, looking at
    /// the primary field first and then at each alias.
    pub fn existing_key<'a>(&self, doc: &'a Document) -> Option<&'a Bson> {
        std::iter::once(&self.field)
            .chain(self.aliases.iter())
            .filter_map(|key| doc.get(key))
            .find(|value| !matches!(value, Bson::Null))
    }

    /// Makes sure `doc` has a primary key under the primary field and
    /// returns it.
    ///
    /// Never replaces an existing non-null key. A key found under an alias is
    /// copied to the primary field, a generated one is stored there. Either
    /// way the primary field becomes the first field of the document.
    pub fn ensure_key(&self, doc: &mut Document) -> Bson {
        if let Some(existing) = doc.get(&self.field).filter(|value| !matches!(value, Bson::Null)) {
            return existing.clone();
        }

        let key = match self.existing_key(doc) {
            Some(aliased) => aliased.clone(),
            None => self.generator.generate(),
        };
        let mut keyed = Document::new();
        keyed.insert(self.field.clone(), key.clone());
        for (name, value) in std::mem::take(doc) {
            if name != self.field {
                keyed.insert(name, value);
            }
        }
        *doc = keyed;

        key
    }

}

impl Default for PrimaryKeyFactory {
    fn default() -> Self {
        PrimaryKeyFactory::new(DEFAULT_PK_FIELD, Vec::new(), Arc::new(ObjectIdGenerator))
    }
}

impl fmt::Debug for PrimaryKeyFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrimaryKeyFactory")
            .field("field", &self.field)
            .field("aliases", &self.aliases)
            .finish()
    }
}
