//! adveil ad-pattern management
//!
//! Keeps the ad-signature pattern set current without restarting the host.
//!
//! Flow:
//! 1. Construction loads the last-cached set synchronously (bundled
//!    default if the cache is missing or corrupt)
//! 2. `force_refresh` fetches the remote manifest; concurrent calls
//!    coalesce onto the one in-flight fetch
//! 3. A strictly newer, well-formed payload is swapped in atomically and
//!    persisted; anything else leaves the current set untouched
//!
//! Readers only ever see whole pattern sets; the swap is a single `Arc`
//! replacement behind a read lock.

mod error;
mod set;
mod source;
mod store;
mod updater;

pub use error::{PatternFetchError, StoreError};
pub use set::{AdPatternSet, AdSignature, RemoteManifest};
pub use source::{HttpPatternSource, PatternSource};
pub use store::{JsonFileStore, MemoryStore, PatternStore};
pub use updater::{PatternUpdater, UpdaterState, UpdaterStats};
