//! Shared test fixtures: an in-memory stub network and store seeding.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use offcache_client::{FetchResponse, Network};
use offcache_core::{CacheDb, CacheEntry, Error, Request};

/// In-memory network with scripted responses and an offline switch.
pub(crate) struct StubNetwork {
    responses: Mutex<HashMap<String, (u16, Vec<u8>)>>,
    queued: Mutex<HashMap<String, VecDeque<(u16, Vec<u8>)>>>,
    offline: AtomicBool,
    fetches: Mutex<Vec<String>>,
}

impl StubNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(HashMap::new()),
            queued: Mutex::new(HashMap::new()),
            offline: AtomicBool::new(false),
            fetches: Mutex::new(Vec::new()),
        })
    }

    pub fn insert(&self, url: &str, status: u16, body: &[u8]) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), (status, body.to_vec()));
    }

    /// Queue a one-shot response; queued responses are consumed in order
    /// before any fixed response for the same URL.
    pub fn push_response(&self, url: &str, status: u16, body: &[u8]) {
        self.queued
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back((status, body.to_vec()));
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// How many times a URL has been fetched.
    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetches.lock().unwrap().iter().filter(|u| u.as_str() == url).count()
    }

    pub fn total_fetches(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &Request) -> Result<FetchResponse, Error> {
        self.fetches.lock().unwrap().push(request.url.to_string());

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network("offline".into()));
        }

        if let Some((status, body)) = self
            .queued
            .lock()
            .unwrap()
            .get_mut(request.url.as_str())
            .and_then(VecDeque::pop_front)
        {
            return Ok(FetchResponse {
                url: request.url.clone(),
                status,
                headers: Vec::new(),
                body: Bytes::from(body),
                fetch_ms: 1,
            });
        }

        let responses = self.responses.lock().unwrap();
        match responses.get(request.url.as_str()) {
            Some((status, body)) => Ok(FetchResponse {
                url: request.url.clone(),
                status: *status,
                headers: Vec::new(),
                body: Bytes::from(body.clone()),
                fetch_ms: 1,
            }),
            None => Err(Error::Network(format!("unreachable: {}", request.url))),
        }
    }
}

/// Create a generation, seed it with (url, body) pairs, and promote it.
pub(crate) async fn install_generation(store: &CacheDb, version: &str, entries: &[(&str, &[u8])]) {
    store.create_generation(version).await.unwrap();
    for (url, body) in entries {
        let entry = CacheEntry::new(version, "GET", url, 200, None, body.to_vec());
        store.put_entry(&entry).await.unwrap();
    }
    store.promote_generation(version).await.unwrap();
}
