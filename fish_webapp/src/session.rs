use axum::http::{header, header::InvalidHeaderValue, HeaderMap, HeaderValue};
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "fish_session";
pub const SESSION_TTL: Duration = Duration::from_secs(60 * 60);
pub const MAX_SESSIONS: usize = 10_000;

#[derive(Debug)]
struct SessionEntry {
    filename: String,
    touched: Instant,
    order: u64,
}

#[derive(Debug, Default)]
struct Sessions {
    entries: HashMap<Uuid, SessionEntry>,
    next_order: u64,
}

/// Server-side sessions remembering the last uploaded file per browser.
///
/// Entries expire after `ttl`; past `capacity` the least recently written
/// session is evicted.
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<Sessions>,
    ttl: Duration,
    capacity: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limits(SESSION_TTL, MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(ttl: Duration, capacity: usize) -> Self {
        Self {
            sessions: Mutex::new(Sessions::default()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Stores `filename` under the existing session or a new one; returns the id.
    pub fn remember_upload(&self, session: Option<Uuid>, filename: String) -> Uuid {
        let id = session.unwrap_or_else(Uuid::new_v4);
        let mut sessions = self.sessions.lock();

        let ttl = self.ttl;
        sessions
            .entries
            .retain(|_, entry| entry.touched.elapsed() < ttl);
        while sessions.entries.len() >= self.capacity && !sessions.entries.contains_key(&id) {
            let oldest = sessions
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.order)
                .map(|(id, _)| *id);
            match oldest {
                Some(oldest) => {
                    sessions.entries.remove(&oldest);
                }
                None => break,
            }
        }

        let order = sessions.next_order;
        sessions.next_order += 1;
        sessions.entries.insert(
            id,
            SessionEntry {
                filename,
                touched: Instant::now(),
                order,
            },
        );
        id
    }

    pub fn upload_for(&self, session: Uuid) -> Option<String> {
        self.sessions
            .lock()
            .entries
            .get(&session)
            .filter(|entry| entry.touched.elapsed() < self.ttl)
            .map(|entry| entry.filename.clone())
    }

    pub(crate) fn len(&self) -> usize {
        self.sessions.lock().entries.len()
    }
}

pub fn session_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value).ok())
}

pub fn session_cookie(id: Uuid) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        id,
        SESSION_TTL.as_secs()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remember_and_replace_upload() {
        let store = SessionStore::new();
        let id = store.remember_upload(None, "img_1.png".into());
        assert_eq!(store.upload_for(id), Some("img_1.png".into()));

        let same = store.remember_upload(Some(id), "img_2.png".into());
        assert_eq!(same, id);
        assert_eq!(store.upload_for(id), Some("img_2.png".into()));

        assert_eq!(store.upload_for(Uuid::new_v4()), None);
    }

    #[test]
    fn test_expired_sessions_are_forgotten() {
        let store = SessionStore::with_limits(Duration::ZERO, 10);
        let id = store.remember_upload(None, "img_1.png".into());
        assert_eq!(store.upload_for(id), None);

        store.remember_upload(None, "img_2.png".into());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_oldest_session_is_evicted_at_capacity() {
        let store = SessionStore::with_limits(SESSION_TTL, 2);
        let first = store.remember_upload(None, "img_1.png".into());
        let second = store.remember_upload(None, "img_2.png".into());
        let third = store.remember_upload(None, "img_3.png".into());

        assert_eq!(store.len(), 2);
        assert_eq!(store.upload_for(first), None);
        assert_eq!(store.upload_for(second), Some("img_2.png".into()));
        assert_eq!(store.upload_for(third), Some("img_3.png".into()));

        store.remember_upload(Some(second), "img_4.png".into());
        assert_eq!(store.len(), 2);
        assert_eq!(store.upload_for(third), Some("img_3.png".into()));
        assert_eq!(store.upload_for(second), Some("img_4.png".into()));
    }

    #[test]
    fn test_session_id_from_cookie_header() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {}={}; other=1", SESSION_COOKIE, id))
                .unwrap(),
        );
        assert_eq!(session_id(&headers), Some(id));

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("fish_session=not-a-uuid"),
        );
        assert_eq!(session_id(&headers), None);
        assert_eq!(session_id(&HeaderMap::new()), None);
    }

    #[test]
    fn test_session_cookie_round_trips() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        let cookie = session_cookie(id).unwrap();
        assert!(cookie.to_str().unwrap().contains("HttpOnly"));

        let pair = cookie.to_str().unwrap().split(';').next().unwrap().to_string();
        headers.insert(header::COOKIE, HeaderValue::from_str(&pair).unwrap());
        assert_eq!(session_id(&headers), Some(id));
    }
}
