// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod local;
pub mod memory;

pub use local::LocalJsonStorage;
pub use memory::InMemoryStorage;

use crate::config::settings::StorageSettings;
use crate::domain::repositories::racing_repository::RacingStorage;
use crate::utils::errors::StorageError;
use std::sync::Arc;

/// 存储工厂函数
pub fn create_storage(settings: &StorageSettings) -> Result<Arc<dyn RacingStorage>, StorageError> {
    match settings.storage_type.as_str() {
        "memory" => Ok(Arc::new(InMemoryStorage::new())),
        "local" => Ok(Arc::new(LocalJsonStorage::new(settings.local_path.clone()))),
        other => Err(StorageError::Unavailable(format!(
            "Unsupported storage type: {}",
            other
        ))),
    }
}
