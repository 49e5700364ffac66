//! In-memory Storage
//!
//! Uploaded datasets and generated files, keyed by id. Nothing survives a
//! restart.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use analyst_core::Dataset;

/// An uploaded dataset and the name it arrived under
#[derive(Clone, Debug)]
pub struct StoredDataset {
    pub filename: String,
    pub dataset: Dataset,
}

/// A downloadable file
#[derive(Clone, Debug)]
pub struct StoredFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct Storage {
    datasets: RwLock<HashMap<String, StoredDataset>>,
    files: RwLock<HashMap<String, StoredFile>>,
}

impl Storage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_dataset(&self, id: &str, filename: &str, dataset: Dataset) {
        let entry = StoredDataset {
            filename: filename.to_string(),
            dataset,
        };
        self.datasets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), entry);
    }

    /// Clone of the stored dataset; callers work on their own copy
    pub fn dataset(&self, id: &str) -> Option<StoredDataset> {
        self.datasets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn put_file(&self, id: &str, filename: &str, bytes: Vec<u8>) {
        let entry = StoredFile {
            filename: filename.to_string(),
            bytes,
        };
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), entry);
    }

    pub fn file(&self, id: &str) -> Option<StoredFile> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }
}
