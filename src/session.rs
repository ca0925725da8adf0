//! Per-chat session state
//!
//! Commands that operate on "the last image" need somewhere to find it.
//! This store keeps, per chat: the last image seen, the last image the
//! system generated, and the current album (images collected from one
//! grouped upload). Entries are last-write-wins per chat and bounded in
//! size; chats never see each other's state.

use std::collections::HashMap;
use std::sync::Mutex;

/// Maximum images retained in one chat's album.
pub const MAX_ALBUM_IMAGES: usize = 10;

#[derive(Default)]
struct ChatSession {
    last_image: Option<Vec<u8>>,
    last_generated: Option<Vec<u8>>,
    album: Vec<Vec<u8>>,
}

/// Keyed store of chat sessions, shared by handle.
#[derive(Default)]
pub struct SessionStore {
    inner: Mutex<HashMap<i64, ChatSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember an incoming chat image: becomes the chat's last image and
    /// joins the album. `new_album` starts a fresh group first.
    pub fn remember_image(&self, chat_id: i64, bytes: Vec<u8>, new_album: bool) {
        let mut inner = self.inner.lock().unwrap();
        let session = inner.entry(chat_id).or_default();
        if new_album {
            session.album.clear();
        }
        if session.album.len() < MAX_ALBUM_IMAGES {
            session.album.push(bytes.clone());
        }
        session.last_image = Some(bytes);
    }

    /// Remember an image the system generated for this chat.
    pub fn remember_generated(&self, chat_id: i64, bytes: Vec<u8>) {
        let mut inner = self.inner.lock().unwrap();
        inner.entry(chat_id).or_default().last_generated = Some(bytes);
    }

    pub fn last_image(&self, chat_id: i64) -> Option<Vec<u8>> {
        let inner = self.inner.lock().unwrap();
        inner.get(&chat_id).and_then(|s| s.last_image.clone())
    }

    pub fn last_generated(&self, chat_id: i64) -> Option<Vec<u8>> {
        let inner = self.inner.lock().unwrap();
        inner.get(&chat_id).and_then(|s| s.last_generated.clone())
    }

    /// The chat's current album, oldest first.
    pub fn album(&self, chat_id: i64) -> Vec<Vec<u8>> {
        let inner = self.inner.lock().unwrap();
        inner.get(&chat_id).map(|s| s.album.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_image_is_last_write() {
        let store = SessionStore::new();
        store.remember_image(1, vec![1], false);
        store.remember_image(1, vec![2], false);
        assert_eq!(store.last_image(1), Some(vec![2]));
    }

    #[test]
    fn test_chats_are_isolated() {
        let store = SessionStore::new();
        store.remember_image(1, vec![1], false);
        store.remember_image(2, vec![2], false);
        assert_eq!(store.last_image(1), Some(vec![1]));
        assert_eq!(store.last_image(2), Some(vec![2]));
        assert_eq!(store.last_image(3), None);
    }

    #[test]
    fn test_generated_cache_is_separate() {
        let store = SessionStore::new();
        store.remember_image(1, vec![1], false);
        store.remember_generated(1, vec![9]);
        assert_eq!(store.last_image(1), Some(vec![1]));
        assert_eq!(store.last_generated(1), Some(vec![9]));
    }

    #[test]
    fn test_album_accumulates_and_resets() {
        let store = SessionStore::new();
        store.remember_image(1, vec![1], true);
        store.remember_image(1, vec![2], false);
        assert_eq!(store.album(1), vec![vec![1], vec![2]]);

        store.remember_image(1, vec![3], true);
        assert_eq!(store.album(1), vec![vec![3]]);
    }

    #[test]
    fn test_album_is_bounded() {
        let store = SessionStore::new();
        for i in 0..(MAX_ALBUM_IMAGES as u8 + 5) {
            store.remember_image(1, vec![i], false);
        }
        assert_eq!(store.album(1).len(), MAX_ALBUM_IMAGES);
        // The newest image still wins the single-image cache.
        assert_eq!(store.last_image(1), Some(vec![MAX_ALBUM_IMAGES as u8 + 4]));
    }
}
