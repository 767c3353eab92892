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

use bson::Document;

#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    pub upsert: Option<bool>,
    pub multi: Option<bool>,
}

impl UpdateOptions {

    pub fn builder() -> UpdateOptionsBuilder {
        UpdateOptionsBuilder::default()
    }

    pub(crate) fn is_upsert(&self) -> bool {
        self.upsert.unwrap_or(false)
    }

    pub(crate) fn is_multi(&self) -> bool {
        self.multi.unwrap_or(false)
    }

}

#[derive(Default)]
pub struct UpdateOptionsBuilder {
    upsert: Option<bool>,
    multi: Option<bool>,
}

impl UpdateOptionsBuilder {

    pub fn upsert(mut self, upsert: bool) -> Self {
        self.upsert = Some(upsert);
        self
    }

    pub fn multi(mut self, multi: bool) -> Self {
        self.multi = Some(multi);
        self
    }

    pub fn build(self) -> UpdateOptions {
        UpdateOptions {
            upsert: self.upsert,
            multi: self.multi,
        }
    }

}

#[derive(Debug, Clone, Default)]
pub struct InsertManyOptions {
    /// Insert the documents one at a time and skip the ones that hit a
    /// duplicate key, instead of failing the whole batch.
    pub continue_on_error: Option<bool>,
}

impl InsertManyOptions {

    pub fn continue_on_error() -> InsertManyOptions {
        InsertManyOptions {
            continue_on_error: Some(true),
        }
    }

    pub(crate) fn is_continue_on_error(&self) -> bool {
        self.continue_on_error.unwrap_or(false)
    }

}

#[derive(Debug, Clone, Default)]
pub struct FindOneOptions {
    pub projection: Option<Document>,
    pub sort: Option<Document>,
}

#[derive(Debug, Clone, Default)]
pub struct FindAndModifyOptions {
    pub fields: Option<Document>,
    pub sort: Option<Document>,
    pub remove: bool,
    pub update: Option<Document>,
    /// Return the document after the modification instead of before it.
    pub new: bool,
    pub upsert: bool,
}

impl FindAndModifyOptions {

    pub fn builder() -> FindAndModifyOptionsBuilder {
        FindAndModifyOptionsBuilder::default()
    }

}

#[derive(Default)]
pub struct FindAndModifyOptionsBuilder {
    inner: FindAndModifyOptions,
}

impl FindAndModifyOptionsBuilder {

    pub fn fields(mut self, fields: Document) -> Self {
        self.inner.fields = Some(fields);
        self
    }

    pub fn sort(mut self, sort: Document) -> Self {
        self.inner.sort = Some(sort);
        self
    }

    pub fn remove(mut self, remove: bool) -> Self {
        self.inner.remove = remove;
        self
    }

    pub fn update(mut self, update: Document) -> Self {
        self.inner.update = Some(update);
        self
    }

    pub fn return_new(mut self, new: bool) -> Self {
        self.inner.new = new;
        self
    }

    pub fn upsert(mut self, upsert: bool) -> Self {
        self.inner.upsert = upsert;
        self
    }

    pub fn build(self) -> FindAndModifyOptions {
        self.inner
    }

}
