use crate::models::UserId;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub(crate) const ACCESS_TOKEN_KEY: &str = "access_token";
pub(crate) const NICKNAME_KEY: &str = "nickname";
pub(crate) const USER_ID_KEY: &str = "user_id";

/// String key/value persistence that survives page loads.
pub(crate) trait KeyValueStore {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str);
    fn remove_item(&self, key: &str);
}

/// `window.localStorage`. Every call is a no-op outside a browser.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct BrowserStorage;

impl BrowserStorage {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window().and_then(|w| w.local_storage().ok().flatten())
    }
}

impl KeyValueStore for BrowserStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        Self::storage().and_then(|s| s.get_item(key).ok().flatten())
    }

    fn set_item(&self, key: &str, value: &str) {
        if let Some(storage) = Self::storage() {
            if storage.set_item(key, value).is_err() {
                log::warn!("localStorage rejected write for {key}");
            }
        }
    }

    fn remove_item(&self, key: &str) {
        if let Some(storage) = Self::storage() {
            let _ = storage.remove_item(key);
        }
    }
}

/// In-process store for tests and non-browser hosts.
#[allow(dead_code)]
#[derive(Clone, Debug, Default)]
pub(crate) struct MemoryStorage(Rc<RefCell<HashMap<String, String>>>);

impl KeyValueStore for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.0.borrow().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) {
        self.0.borrow_mut().insert(key.to_string(), value.to_string());
    }

    fn remove_item(&self, key: &str) {
        self.0.borrow_mut().remove(key);
    }
}

/// Identity of the logged-in user, as issued by `POST /api/auth/login`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Session {
    pub access_token: String,
    pub nickname: String,
    pub user_id: UserId,
}

/// Reads and writes the session under three flat keys so other tabs (and the
/// older JS client) see the same values.
#[derive(Clone, Debug, Default)]
pub(crate) struct SessionStore<S: KeyValueStore = BrowserStorage> {
    storage: S,
}

impl SessionStore<BrowserStorage> {
    pub fn browser() -> Self {
        Self {
            storage: BrowserStorage,
        }
    }
}

impl<S: KeyValueStore> SessionStore<S> {
    #[allow(dead_code)]
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// A missing or blank `user_id` means nobody is logged in.
    pub fn load(&self) -> Option<Session> {
        let user_id = self
            .storage
            .get_item(USER_ID_KEY)
            .and_then(|raw| raw.parse::<UserId>().ok())?;

        Some(Session {
            access_token: self.storage.get_item(ACCESS_TOKEN_KEY).unwrap_or_default(),
            nickname: self.storage.get_item(NICKNAME_KEY).unwrap_or_default(),
            user_id,
        })
    }

    pub fn save(&self, session: &Session) {
        self.storage.set_item(ACCESS_TOKEN_KEY, &session.access_token);
        self.storage.set_item(NICKNAME_KEY, &session.nickname);
        self.storage.set_item(USER_ID_KEY, &session.user_id.to_string());
    }

    pub fn clear(&self) {
        self.storage.remove_item(ACCESS_TOKEN_KEY);
        self.storage.remove_item(NICKNAME_KEY);
        self.storage.remove_item(USER_ID_KEY);
    }
}
