// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod block_detection;
pub mod browser_engine;
pub mod fetcher;
pub mod host_throttle;
pub mod reqwest_engine;
pub mod token_capture;
pub mod traits;

pub use fetcher::{FetchOptions, Fetcher};
pub use traits::{FetchRequest, PageEngine, RawPage};
