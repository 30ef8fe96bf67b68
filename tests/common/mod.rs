//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod sim_helpers;

use linewatch::config::StoreConfig;
use linewatch::store::Store;
use std::path::Path;

/// Reopen a store file written by an earlier run
pub fn reopen_store(path: &Path) -> Store {
    Store::open(&StoreConfig {
        path: path.to_path_buf(),
        ..Default::default()
    })
    .expect("store should reopen")
}
