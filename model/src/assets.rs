//! Model asset discovery.
//!
//! A model directory holds three files, each optionally zstd-compressed
//! with a `.zst` suffix appended:
//!
//! ```text
//! fingerprint-network.json[.zst]   the serialized DAG
//! values.json[.zst]                the value dictionary index
//! values.dat[.zst]                 the concatenated value payloads
//! ```
//!
//! Fetching these files from a release store is a collaborator concern;
//! this crate only resolves and loads what is already on disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ModelError;
use crate::network::Network;
use crate::values::ValueStore;

/// File name of the serialized network.
pub const NETWORK_FILE: &str = "fingerprint-network.json";
/// File name of the value dictionary index.
pub const VALUES_INDEX_FILE: &str = "values.json";
/// File name of the value payload file.
pub const VALUES_DATA_FILE: &str = "values.dat";

/// A loaded network together with its value dictionary.
#[derive(Debug)]
pub struct Model {
    network: Network,
    values: ValueStore,
}

impl Model {
    /// Load all model assets from a directory.
    ///
    /// # Errors
    ///
    /// Fails with [`ModelError::MissingAsset`] naming the first file that
    /// exists in neither plain nor `.zst` form, or with the underlying
    /// parse/validation error.
    pub fn open(dir: &Path) -> Result<Self, ModelError> {
        let network = Network::load(&dir.join(NETWORK_FILE))?;
        let values = ValueStore::open(&dir.join(VALUES_INDEX_FILE), &dir.join(VALUES_DATA_FILE))?;
        Ok(Self { network, values })
    }

    /// Build a model from already-loaded parts.
    #[must_use]
    pub fn from_parts(network: Network, values: ValueStore) -> Self {
        Self { network, values }
    }

    /// The network.
    #[must_use]
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// The value dictionary.
    #[must_use]
    pub fn values(&self) -> &ValueStore {
        &self.values
    }
}

/// Read a file that may exist as-is or with a `.zst` suffix appended.
///
/// The plain file wins when both exist (a decompressed model shadows the
/// compressed one it was extracted from).
pub(crate) fn read_maybe_zst(path: &Path) -> Result<Vec<u8>, ModelError> {
    if path.exists() {
        return Ok(fs::read(path)?);
    }
    let zst = {
        let mut name = path.as_os_str().to_os_string();
        name.push(".zst");
        PathBuf::from(name)
    };
    if zst.exists() {
        let file = fs::File::open(zst)?;
        return Ok(zstd::decode_all(file)?);
    }
    Err(ModelError::MissingAsset {
        path: path.to_path_buf(),
    })
}
