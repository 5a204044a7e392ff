//! The active conversation and the archive it is saved into.

use atena_model::{
    Archive, Conversation, ConversationId, ConversationSummary, Message,
};
use tokio::sync::broadcast;

use crate::event::Event;
use crate::storage::Storage;

/// The storage key holding the serialized archive.
pub const ARCHIVE_KEY: &str = "atena-chats";

/// The storage key an unreadable archive record is copied to before the
/// store starts writing over it.
pub const CORRUPT_ARCHIVE_KEY: &str = "atena-chats-corrupt";

const EVENT_CAPACITY: usize = 64;

/// The error type for [`SessionStore`] operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No conversation with this id exists.
    #[error("conversation {0} not found")]
    NotFound(ConversationId),
}

/// Owns the active conversation and the archive.
///
/// There is always exactly one active conversation; a fresh one is empty
/// and lives only in memory until its first message arrives. Every
/// mutation is written through to storage immediately. Storage failures
/// are logged and otherwise ignored: the in-memory state stays
/// authoritative.
pub struct SessionStore {
    active: Conversation,
    archive: Archive,
    storage: Box<dyn Storage>,
    events: broadcast::Sender<Event>,
}

impl SessionStore {
    /// Opens the store, reading the archive from `storage`.
    ///
    /// A missing record starts an empty archive. An unreadable record is
    /// first copied to [`CORRUPT_ARCHIVE_KEY`], then every conversation
    /// that still parses is kept.
    pub fn open<S: Storage>(mut storage: S) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let archive = match storage.get(ARCHIVE_KEY) {
            Ok(Some(record)) => read_archive(&mut storage, &record),
            Ok(None) => Archive::default(),
            Err(err) => {
                warn!("failed to read the archive: {err}");
                Archive::default()
            }
        };
        debug!("opened archive with {} conversations", archive.len());
        Self {
            active: Conversation::new(),
            archive,
            storage: Box::new(storage),
            events,
        }
    }

    /// Subscribes to change notifications.
    #[inline]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    #[inline]
    pub(crate) fn notify(&self, event: Event) {
        // Having no observers is fine.
        self.events.send(event).ok();
    }

    #[inline]
    pub(crate) fn events(&self) -> &broadcast::Sender<Event> {
        &self.events
    }

    /// Returns the active conversation.
    #[inline]
    pub fn active(&self) -> &Conversation {
        &self.active
    }

    /// Returns the archive.
    #[inline]
    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    /// Lists archived conversations, most recent first.
    pub fn summaries(&self) -> Vec<ConversationSummary> {
        self.archive.iter().map(Conversation::summary).collect()
    }

    /// Looks up a conversation, whether active or archived.
    pub fn conversation(&self, id: &ConversationId) -> Option<&Conversation> {
        if self.active.id() == id {
            Some(&self.active)
        } else {
            self.archive.get(id)
        }
    }

    /// Saves the active conversation and starts a new empty one.
    ///
    /// An active conversation without messages is discarded rather than
    /// saved.
    pub fn create_session(&mut self) -> &ConversationId {
        self.flush();
        self.active = Conversation::new();
        debug!("created conversation {}", self.active.id());
        self.notify(Event::ActiveChanged(self.active.id().clone()));
        self.active.id()
    }

    /// Saves the active conversation and makes an archived one active.
    pub fn load_session(&mut self, id: &ConversationId) -> Result<(), StoreError> {
        if self.active.id() == id {
            return Ok(());
        }
        if self.archive.get(id).is_none() {
            return Err(StoreError::NotFound(id.clone()));
        }
        self.flush();
        let Some(conversation) = self.archive.get(id) else {
            return Err(StoreError::NotFound(id.clone()));
        };
        self.active = conversation.clone();
        debug!("loaded conversation {id}");
        self.notify(Event::ActiveChanged(id.clone()));
        Ok(())
    }

    /// Deletes a conversation. Deleting the active conversation replaces
    /// it with a new empty one.
    ///
    /// Returns `false` if nothing had this id.
    pub fn delete_session(&mut self, id: &ConversationId) -> bool {
        let archived = self.archive.remove(id).is_some();
        if archived {
            self.persist();
            self.notify(Event::ArchiveChanged);
        }
        let active = self.active.id() == id;
        if active {
            self.active = Conversation::new();
            self.notify(Event::ActiveChanged(self.active.id().clone()));
        }
        debug!("deleted conversation {id} (archived: {archived}, active: {active})");
        archived || active
    }

    /// Deletes every conversation and starts a new empty one.
    ///
    /// This cannot be undone; callers confirm with the user first.
    pub fn clear_archive(&mut self) {
        self.archive.clear();
        self.persist();
        self.active = Conversation::new();
        info!("cleared the archive");
        self.notify(Event::ArchiveChanged);
        self.notify(Event::ActiveChanged(self.active.id().clone()));
    }

    /// Saves the active conversation into the archive.
    ///
    /// Does nothing for an empty conversation. Otherwise refreshes the
    /// archived copy in place, or inserts it at the head the first time.
    /// Repeated flushes without changes produce the same record.
    pub fn flush(&mut self) {
        if !self.archive.upsert(&self.active) {
            return;
        }
        self.persist();
        self.notify(Event::ArchiveChanged);
    }

    /// Records the display message of a user turn in the active
    /// conversation, and returns that conversation's id so the outcome
    /// can be recorded in the same place later.
    pub fn begin_turn(&mut self, display: Message) -> ConversationId {
        let id = self.active.id().clone();
        self.active.push_display(display);
        self.flush();
        self.notify(Event::ConversationUpdated(id.clone()));
        id
    }

    /// Returns the backend-facing history of a conversation.
    pub fn history(&self, id: &ConversationId) -> Option<&[Message]> {
        self.conversation(id).map(Conversation::history_messages)
    }

    /// Records the outcome of a turn started with [`Self::begin_turn`].
    ///
    /// `reply` is always displayed. The sanitized `user` message and the
    /// reply join the history only when `to_history` is set, so a failed
    /// turn never reaches the backend again. The turn goes to the
    /// conversation it came from, even if another one is active now.
    ///
    /// Returns `false` if that conversation no longer exists, in which
    /// case the turn is dropped.
    pub fn append_turn(
        &mut self,
        id: &ConversationId,
        mut user: Message,
        reply: Message,
        to_history: bool,
    ) -> bool {
        let is_active = self.active.id() == id;
        let conversation = if is_active {
            &mut self.active
        } else if let Some(conversation) = self.archive.get_mut(id) {
            conversation
        } else {
            warn!("conversation {id} is gone, dropping its turn");
            return false;
        };

        if to_history {
            user.image_previews = None;
            conversation.push_history_pair(user, reply.clone());
        }
        conversation.push_display(reply);

        if is_active {
            self.flush();
        } else {
            self.persist();
            self.notify(Event::ArchiveChanged);
        }
        self.notify(Event::ConversationUpdated(id.clone()));
        true
    }

    fn persist(&mut self) {
        let record = match serde_json::to_string(&self.archive) {
            Ok(record) => record,
            Err(err) => {
                error!("failed to serialize the archive: {err}");
                return;
            }
        };
        if let Err(err) = self.storage.set(ARCHIVE_KEY, &record) {
            warn!("failed to persist the archive: {err}");
        }
    }
}

fn read_archive<S: Storage>(storage: &mut S, record: &str) -> Archive {
    let err = match serde_json::from_str(record) {
        Ok(archive) => return archive,
        Err(err) => err,
    };
    warn!("archive record is corrupted: {err}");
    if let Err(err) = storage.set(CORRUPT_ARCHIVE_KEY, record) {
        error!("failed to back up the corrupted archive: {err}");
    }

    let Ok(entries) = serde_json::from_str::<Vec<serde_json::Value>>(record)
    else {
        return Archive::default();
    };
    let total = entries.len();
    let archive: Archive = entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect();
    warn!("recovered {} of {total} conversations", archive.len());
    archive
}
