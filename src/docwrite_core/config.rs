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
use crate::primary_key::{KeyGenerator, ObjectIdGenerator, UuidGenerator, DEFAULT_PK_FIELD};
use crate::{PrimaryKeyFactory, WriteConcern};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyGeneratorKind {
    ObjectId,
    Uuid,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Used when a write passes no explicit safety argument.
    pub default_write_concern: WriteConcern,
    /// Field the application keeps its primary key in. When the driver keys
    /// documents on a different field, this one is read as an alias and its
    /// value is copied to the driver's field.
    pub pk_field: String,
    /// Other fields accepted as an already assigned primary key.
    pub pk_aliases: Vec<String>,
    pub key_generator: KeyGeneratorKind,
}

impl Config {

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// The key factory for a driver that stores primary keys under
    /// `driver_field`.
    pub(crate) fn pk_factory(&self, driver_field: &str) -> PrimaryKeyFactory {
        let generator: Arc<dyn KeyGenerator> = match self.key_generator {
            KeyGeneratorKind::ObjectId => Arc::new(ObjectIdGenerator),
            KeyGeneratorKind::Uuid => Arc::new(UuidGenerator),
        };
        let mut aliases = Vec::with_capacity(self.pk_aliases.len() + 1);
        if self.pk_field != driver_field {
            aliases.push(self.pk_field.clone());
        }
        aliases.extend(self.pk_aliases.iter().filter(|alias| alias.as_str() != driver_field).cloned());
        PrimaryKeyFactory::new(driver_field, aliases, generator)
    }

}

impl Default for Config {

    fn default() -> Self {
        Config {
            default_write_concern: WriteConcern::acknowledged(),
            pk_field: DEFAULT_PK_FIELD.to_string(),
            pk_aliases: Vec::new(),
            key_generator: KeyGeneratorKind::ObjectId,
        }
    }

}

#[derive(Default)]
pub struct ConfigBuilder {
    inner: Config,
}

impl ConfigBuilder {

    pub fn default_write_concern(mut self, concern: WriteConcern) -> Self {
        self.inner.default_write_concern = concern;
        self
    }

    pub fn pk_field(mut self, field: impl Into<String>) -> Self {
        self.inner.pk_field = field.into();
        self
    }

    pub fn pk_alias(mut self, alias: impl Into<String>) -> Self {
        self.inner.pk_aliases.push(alias.into());
        self
    }

    pub fn key_generator(mut self, kind: KeyGeneratorKind) -> Self {
        self.inner.key_generator = kind;
        self
    }

    pub fn build(self) -> Config {
        self.inner
    }

}

#[cfg(test)]
mod tests {
    use bson::{doc, Bson};
    use super::{Config, KeyGeneratorKind};
    use crate::WriteConcern;

    #[test]
    fn test_builder() {
        let config = Config::builder()
            .default_write_concern(WriteConcern::unacknowledged())
            .pk_alias("id")
            .key_generator(KeyGeneratorKind::Uuid)
            .build();

        assert!(!config.default_write_concern.requires_acknowledgment());
        assert_eq!(config.pk_field, "_id");

        let factory = config.pk_factory("_id");
        let mut doc = doc! { "name": "Vincent" };
        assert!(matches!(factory.ensure_key(&mut doc), Bson::Binary(_)));
    }

    #[test]
    fn test_custom_pk_field_reaches_driver_field() {
        let config = Config::builder().pk_field("uid").build();
        let factory = config.pk_factory("_id");
        assert_eq!(factory.field(), "_id");

        let mut doc = doc! { "uid": 7, "name": "Vincent" };
        assert_eq!(factory.ensure_key(&mut doc), Bson::Int32(7));
        assert_eq!(doc.get("_id"), Some(&Bson::Int32(7)));
    }

}
