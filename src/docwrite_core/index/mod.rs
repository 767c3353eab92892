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

mod index_spec;
mod index_name;
mod index_model;
mod index_manager;

pub use index_spec::{parse_index_spec, IndexDirection, IndexKeys, IndexSpec, GEO2D};
pub use index_name::{index_name, name_from_keys, name_from_stored_keys};
pub use index_model::{IndexInfo, IndexOptions, IndexOptionsBuilder};
pub(crate) use index_manager::IndexManager;
