// Fri Feb 20 2026 - Alex

use crate::driver::correlation::wire::{Payload, Response, ResponseKey};
use ahash::AHashMap;
use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Responses published by the receiver thread, waited on by readers.
#[derive(Default)]
pub struct ResponseTable {
    entries: Mutex<AHashMap<ResponseKey, Payload>>,
    arrived: Condvar,
}

impl ResponseTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, response: Response) {
        let key = response.key();
        self.entries.lock().insert(key, response.payload);
        self.arrived.notify_all();
    }

    /// Drop a stale answer before re-issuing the same request.
    pub fn forget(&self, key: &ResponseKey) {
        let mut entries = self.entries.lock();
        entries.remove(key);
        entries.remove(&ResponseKey::new(&key.command, key.address, None));
    }

    /// Wait until a response matching `key` (or an error reply for the same
    /// command and address) arrives, or `timeout` elapses.
    pub fn wait(&self, key: &ResponseKey, timeout: Duration) -> Option<Payload> {
        let deadline = Instant::now() + timeout;
        let error_key = ResponseKey::new(&key.command, key.address, None);
        let mut entries = self.entries.lock();

        loop {
            if let Some(payload) = entries.remove(key) {
                return Some(payload);
            }
            if let Some(payload) = entries.remove(&error_key) {
                return Some(payload);
            }
            if self.arrived.wait_until(&mut entries, deadline).timed_out() {
                return entries.remove(key).or_else(|| entries.remove(&error_key));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::correlation::wire::READ_COMMAND;
    use crate::memory::Address;
    use std::sync::Arc;
    use std::thread;

    fn response(address: u32, payload: Payload) -> Response {
        Response {
            command: READ_COMMAND.to_string(),
            address: Address::new(address),
            payload,
        }
    }

    #[test]
    fn test_wait_times_out() {
        let table = ResponseTable::new();
        let key = ResponseKey::new(READ_COMMAND, Address::new(0x10), Some(2));
        let started = Instant::now();
        assert!(table.wait(&key, Duration::from_millis(30)).is_none());
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_wait_sees_published_response() {
        let table = Arc::new(ResponseTable::new());
        let key = ResponseKey::new(READ_COMMAND, Address::new(0x10), Some(2));

        let publisher = Arc::clone(&table);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            publisher.publish(response(0x10, Payload::Bytes(vec![1, 2])));
        });

        let payload = table.wait(&key, Duration::from_secs(2));
        handle.join().unwrap();
        assert_eq!(payload, Some(Payload::Bytes(vec![1, 2])));
        assert!(table.is_empty());
    }

    #[test]
    fn test_error_reply_matches_any_length() {
        let table = ResponseTable::new();
        table.publish(response(0x20, Payload::Error("no memory".to_string())));
        let key = ResponseKey::new(READ_COMMAND, Address::new(0x20), Some(8));
        assert_eq!(
            table.wait(&key, Duration::from_millis(10)),
            Some(Payload::Error("no memory".to_string()))
        );
    }

    #[test]
    fn test_keys_do_not_cross() {
        let table = ResponseTable::new();
        table.publish(response(0x30, Payload::Bytes(vec![1])));
        let other = ResponseKey::new(READ_COMMAND, Address::new(0x30), Some(2));
        assert!(table.wait(&other, Duration::from_millis(10)).is_none());
        assert_eq!(table.len(), 1);
    }
}
