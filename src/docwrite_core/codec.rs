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

//! Conversion between application values and driver documents.

use bson::Document;
use serde::de::DeserializeOwned;
use serde::Serialize;
use crate::Result;

#[inline]
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Document> {
    Ok(bson::to_document(value)?)
}

#[inline]
pub fn decode<T: DeserializeOwned>(doc: Document) -> Result<T> {
    Ok(bson::from_document(doc)?)
}
