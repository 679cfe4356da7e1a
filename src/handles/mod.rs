//! Resource handle management.
//!
//! A published handle makes a byte payload retrievable by id (for preview or
//! download) until it is revoked. [`HandleRegistry`] tracks live handles and
//! download leases; [`HandleSlot`] holds the single live handle for one
//! logical resource and revokes the previous handle whenever it is replaced.
//!
//! A revoke issued while a [`HandleLease`] is open takes effect when the last
//! lease is dropped.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use gf_core::events::{EventBus, EventPayload};
use gf_core::{Error, HandleId, Result};

/// A published resource: id plus payload metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceHandle {
    id: HandleId,
    mime: String,
    size: u64,
}

impl ResourceHandle {
    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

struct Entry {
    bytes: Bytes,
    mime: String,
    leases: usize,
    revoke_pending: bool,
}

pub struct HandleRegistry {
    entries: Mutex<HashMap<HandleId, Entry>>,
    events: Arc<EventBus>,
}

impl HandleRegistry {
    pub fn new(events: Arc<EventBus>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            events,
        }
    }

    /// Publish `bytes` under a fresh handle.
    pub fn publish(&self, bytes: Bytes, mime: &str) -> ResourceHandle {
        let handle = ResourceHandle {
            id: HandleId::new(),
            mime: mime.to_string(),
            size: bytes.len() as u64,
        };
        self.entries.lock().insert(
            handle.id,
            Entry {
                bytes,
                mime: handle.mime.clone(),
                leases: 0,
                revoke_pending: false,
            },
        );
        tracing::debug!(handle = %handle.id, mime, size = handle.size, "Published handle");
        self.events.broadcast(EventPayload::HandlePublished {
            handle_id: handle.id,
            mime: handle.mime.clone(),
        });
        handle
    }

    /// Revoke `id`.
    ///
    /// Returns `false` if the handle is unknown or already revoked. When a
    /// download lease is open the release is deferred until it closes.
    pub fn revoke(&self, id: HandleId) -> bool {
        let released = {
            let mut entries = self.entries.lock();
            let Some(entry) = entries.get_mut(&id) else {
                return false;
            };
            if entry.revoke_pending {
                return false;
            }
            if entry.leases > 0 {
                entry.revoke_pending = true;
                tracing::debug!(handle = %id, leases = entry.leases, "Revoke deferred until download ends");
                false
            } else {
                entries.remove(&id);
                true
            }
        };

        if released {
            self.announce_revoked(id);
        }
        true
    }

    /// Open a download lease on `id`.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the handle is unknown or has been revoked.
    pub fn open(self: &Arc<Self>, id: HandleId) -> Result<HandleLease> {
        let mut entries = self.entries.lock();
        let entry = entries
            .get_mut(&id)
            .filter(|e| !e.revoke_pending)
            .ok_or_else(|| Error::not_found("handle", id))?;
        entry.leases += 1;
        Ok(HandleLease {
            registry: Arc::clone(self),
            id,
            bytes: entry.bytes.clone(),
            mime: entry.mime.clone(),
        })
    }

    /// `true` if `id` is published and not revoked.
    pub fn is_live(&self, id: HandleId) -> bool {
        self.entries
            .lock()
            .get(&id)
            .is_some_and(|e| !e.revoke_pending)
    }

    /// Number of published, un-revoked handles.
    pub fn live_count(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|e| !e.revoke_pending)
            .count()
    }

    /// Number of live handles published with `mime`.
    pub fn live_count_of(&self, mime: &str) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|e| !e.revoke_pending && e.mime == mime)
            .count()
    }

    /// Number of payloads still held, including revoked ones waiting on a
    /// lease.
    pub fn resident_count(&self) -> usize {
        self.entries.lock().len()
    }

    fn release(&self, id: HandleId) {
        let released = {
            let mut entries = self.entries.lock();
            match entries.get_mut(&id) {
                Some(entry) => {
                    entry.leases = entry.leases.saturating_sub(1);
                    if entry.leases == 0 && entry.revoke_pending {
                        entries.remove(&id);
                        true
                    } else {
                        false
                    }
                }
                None => false,
            }
        };

        if released {
            self.announce_revoked(id);
        }
    }

    fn announce_revoked(&self, id: HandleId) {
        tracing::debug!(handle = %id, "Revoked handle");
        self.events
            .broadcast(EventPayload::HandleRevoked { handle_id: id });
    }
}

/// An open download on a handle. Dropping it ends the download.
pub struct HandleLease {
    registry: Arc<HandleRegistry>,
    id: HandleId,
    bytes: Bytes,
    mime: String,
}

impl HandleLease {
    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Write the payload to `path`, creating parent directories.
    pub async fn save_to(&self, path: &Path) -> Result<PathBuf> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, &self.bytes).await?;
        tracing::info!(handle = %self.id, path = %path.display(), bytes = self.bytes.len(), "Saved resource");
        Ok(path.to_path_buf())
    }
}

impl Drop for HandleLease {
    fn drop(&mut self) {
        self.registry.release(self.id);
    }
}

/// Holder of the single live handle for one logical resource.
///
/// Replacing or clearing the slot revokes the previous handle, and dropping
/// the slot revokes whatever it still holds.
pub struct HandleSlot {
    name: &'static str,
    registry: Arc<HandleRegistry>,
    current: Mutex<Option<ResourceHandle>>,
}

impl HandleSlot {
    pub fn new(name: &'static str, registry: Arc<HandleRegistry>) -> Self {
        Self {
            name,
            registry,
            current: Mutex::new(None),
        }
    }

    /// Publish `bytes` into the slot, revoking the handle it replaces.
    pub fn replace(&self, bytes: Bytes, mime: &str) -> ResourceHandle {
        let handle = self.registry.publish(bytes, mime);
        let previous = self.current.lock().replace(handle.clone());
        if let Some(prev) = previous {
            tracing::trace!(slot = self.name, handle = %prev.id, "Replacing handle");
            self.registry.revoke(prev.id);
        }
        handle
    }

    /// Revoke the current handle, if any. Returns whether one was held.
    pub fn clear(&self) -> bool {
        let previous = self.current.lock().take();
        match previous {
            Some(prev) => {
                tracing::trace!(slot = self.name, handle = %prev.id, "Clearing handle");
                self.registry.revoke(prev.id);
                true
            }
            None => false,
        }
    }

    pub fn current(&self) -> Option<ResourceHandle> {
        self.current.lock().clone()
    }
}

impl Drop for HandleSlot {
    fn drop(&mut self) {
        self.clear();
    }
}
