//! Random-access value dictionary.
//!
//! Two artifacts back the store:
//!
//! - `values.json` — a JSON object whose *iteration order* defines the
//!   integer index: entry *i* is `token: [offset_hex, length]`.
//! - `values.dat` — a concatenation of raw UTF-8 JSON fragments, addressed
//!   by `(offset, length)` of the decompressed stream. A `values.dat.zst`
//!   variant is accepted in place of the plain file.
//!
//! The plain data file is opened per lookup batch and closed before the
//! batch returns. The compressed variant has no seekable collaborator in
//! this stack, so it is decompressed once on first use and sliced from
//! memory afterwards; offsets and lengths mean the same thing either way.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use indexmap::IndexMap;

use crate::assets::read_maybe_zst;
use crate::error::ModelError;
use crate::token;

/// One dictionary entry: byte range of the value in the data stream.
#[derive(Debug, Clone, Copy)]
struct Entry {
    offset: u64,
    len: usize,
}

/// Where the raw value bytes live.
#[derive(Debug)]
enum DataFile {
    /// Plain `values.dat`: seekable, opened per batch.
    Plain(PathBuf),
    /// `values.dat.zst`: decompressed once, then sliced from memory.
    Zstd {
        path: PathBuf,
        cache: OnceLock<Vec<u8>>,
    },
}

/// Random-access dictionary: value-index token → UTF-8 JSON value string.
#[derive(Debug)]
pub struct ValueStore {
    entries: Vec<Entry>,
    data: DataFile,
}

impl ValueStore {
    /// Open the store from the index file and the data file.
    ///
    /// Either path may exist as-is or with a `.zst` suffix appended.
    ///
    /// # Errors
    ///
    /// Fails if either file is missing in both forms, the index is not a
    /// JSON object of `[offset_hex, length]` pairs, or an offset is not hex.
    pub fn open(index_path: &Path, data_path: &Path) -> Result<Self, ModelError> {
        let raw = read_maybe_zst(index_path)?;
        let pairs: IndexMap<String, (String, usize)> = serde_json::from_slice(&raw)?;

        let mut entries = Vec::with_capacity(pairs.len());
        for (_, (offset_hex, len)) in pairs {
            let offset =
                u64::from_str_radix(&offset_hex, 16).map_err(|_| ModelError::BadOffset {
                    offset: offset_hex.clone(),
                })?;
            entries.push(Entry { offset, len });
        }

        let zst_path = zst_variant(data_path);
        let data = if data_path.exists() {
            DataFile::Plain(data_path.to_path_buf())
        } else if zst_path.exists() {
            DataFile::Zstd {
                path: zst_path,
                cache: OnceLock::new(),
            }
        } else {
            return Err(ModelError::MissingAsset {
                path: data_path.to_path_buf(),
            });
        };

        log::debug!("value store opened: {} entries", entries.len());
        Ok(Self { entries, data })
    }

    /// Number of dictionary entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the dictionary is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dereference a single token.
    ///
    /// # Errors
    ///
    /// Fails on a malformed token, an out-of-range index, or a data file
    /// that is shorter than the entry claims.
    pub fn lookup(&self, token: &str) -> Result<String, ModelError> {
        Ok(self.lookup_many(&[token])?.pop().unwrap_or_default())
    }

    /// Dereference a batch of tokens.
    ///
    /// Reads are issued in increasing offset order (one forward pass over
    /// the data file); results come back in the caller's original order.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`ValueStore::lookup`]; the data file is still
    /// closed on every exit path.
    pub fn lookup_many<S: AsRef<str>>(&self, tokens: &[S]) -> Result<Vec<String>, ModelError> {
        let mut order: Vec<(u64, usize)> = Vec::with_capacity(tokens.len());
        for (position, tok) in tokens.iter().enumerate() {
            order.push((token::decode(tok.as_ref())?, position));
        }
        order.sort_unstable();

        let mut out = vec![String::new(); tokens.len()];
        match &self.data {
            DataFile::Plain(path) => {
                let mut file = File::open(path)?;
                for (index, position) in order {
                    let entry = self.entry(index)?;
                    out[position] = read_entry(&mut file, entry)?;
                }
                // `file` drops here, releasing the handle before return.
            }
            DataFile::Zstd { path, cache } => {
                let bytes = self.cached_stream(path, cache)?;
                for (index, position) in order {
                    let entry = self.entry(index)?;
                    out[position] = slice_entry(bytes, entry)?;
                }
            }
        }
        Ok(out)
    }

    fn entry(&self, index: u64) -> Result<Entry, ModelError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.entries.get(i))
            .copied()
            .ok_or(ModelError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            })
    }

    fn cached_stream<'s>(
        &self,
        path: &Path,
        cache: &'s OnceLock<Vec<u8>>,
    ) -> Result<&'s Vec<u8>, ModelError> {
        if let Some(bytes) = cache.get() {
            return Ok(bytes);
        }
        let file = File::open(path)?;
        let decoded = zstd::decode_all(file)?;
        // A racing initializer may win; either copy of the stream is identical.
        Ok(cache.get_or_init(|| decoded))
    }
}

/// The `.zst` sibling of a path (`values.dat` → `values.dat.zst`).
fn zst_variant(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".zst");
    PathBuf::from(name)
}

fn read_entry(file: &mut File, entry: Entry) -> Result<String, ModelError> {
    file.seek(SeekFrom::Start(entry.offset))?;
    let mut buf = vec![0_u8; entry.len];
    file.read_exact(&mut buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ModelError::ShortRead {
                offset: entry.offset,
                len: entry.len,
            }
        } else {
            ModelError::Io(e)
        }
    })?;
    String::from_utf8(buf).map_err(|_| ModelError::NotUtf8 {
        offset: entry.offset,
    })
}

fn slice_entry(bytes: &[u8], entry: Entry) -> Result<String, ModelError> {
    let start = usize::try_from(entry.offset).map_err(|_| ModelError::ShortRead {
        offset: entry.offset,
        len: entry.len,
    })?;
    let end = start.checked_add(entry.len).filter(|&e| e <= bytes.len());
    let Some(end) = end else {
        return Err(ModelError::ShortRead {
            offset: entry.offset,
            len: entry.len,
        });
    };
    std::str::from_utf8(&bytes[start..end])
        .map(str::to_owned)
        .map_err(|_| ModelError::NotUtf8 {
            offset: entry.offset,
        })
}
