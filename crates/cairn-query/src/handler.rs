//! Command implementations.

use std::sync::Arc;

use cairn_store::{CounterStore, StoreError};
use cairn_types::parse_i64;

use crate::reply::Reply;

/// Executes counter commands against the store.
///
/// Mutations go through the store's merge/put primitives, so they are
/// atomic with respect to concurrent ingestion; reads may race an
/// in-flight merge and return a value that does not yet reflect it. The
/// race costs staleness only, since merge commutativity means every delta
/// is still reflected exactly once.
#[derive(Clone)]
pub struct CommandHandler {
    store: Arc<CounterStore>,
}

impl CommandHandler {
    pub fn new(store: Arc<CounterStore>) -> Self {
        Self { store }
    }

    /// Dispatches a parsed command line. Unknown names and wrong arity are
    /// user-visible errors, matching what a wire dispatcher would emit.
    pub fn handle(&self, args: &[&str]) -> Reply {
        match args {
            ["get", key] => self.get(key.as_bytes()),
            ["set", key, value] => self.set(key.as_bytes(), value),
            ["incrby", key, delta] => self.incrby(key.as_bytes(), delta),
            ["ensure", key, value] => self.ensure(key.as_bytes(), value),
            [name, ..] => Reply::Error(format!("wrong number of arguments or unknown command '{name}'")),
            [] => Reply::Error("empty command".to_string()),
        }
    }

    /// `GET key`: the stored value, or null when absent.
    pub fn get(&self, key: &[u8]) -> Reply {
        match self.store.get(key) {
            Ok(Some(value)) => Reply::Integer(value),
            Ok(None) => Reply::Null,
            Err(err) => storage_error(&err),
        }
    }

    /// `SET key value`: unconditional overwrite.
    pub fn set(&self, key: &[u8], value: &str) -> Reply {
        let Ok(value) = parse_i64(value) else {
            return Reply::invalid_integer();
        };
        match self.store.put(key, value) {
            Ok(()) => Reply::Ok,
            Err(err) => storage_error(&err),
        }
    }

    /// `INCRBY key delta`: merges the delta and returns a best-effort
    /// `previous + delta`. The read back races concurrent writers; the
    /// returned value is one of the legitimate interleavings, and the
    /// stored value is exact regardless.
    pub fn incrby(&self, key: &[u8], delta: &str) -> Reply {
        let Ok(delta) = parse_i64(delta) else {
            return Reply::invalid_integer();
        };
        if let Err(err) = self.store.merge(key, delta) {
            return storage_error(&err);
        }
        match self.store.get(key) {
            Ok(Some(current)) => Reply::Integer(current),
            Ok(None) => Reply::Integer(delta),
            Err(err) => storage_error(&err),
        }
    }

    /// `ENSURE key value`: OK when the stored value equals `value`,
    /// distinct errors for mismatch and absence.
    pub fn ensure(&self, key: &[u8], value: &str) -> Reply {
        let Ok(expected) = parse_i64(value) else {
            return Reply::invalid_integer();
        };
        match self.store.get(key) {
            Ok(Some(stored)) if stored == expected => Reply::Ok,
            Ok(Some(_)) => Reply::Error("ENSURE value different".to_string()),
            Ok(None) => Reply::Error("ENSURE key not found".to_string()),
            Err(err) => storage_error(&err),
        }
    }
}

fn storage_error(err: &StoreError) -> Reply {
    tracing::error!(error = %err, "storage error serving command");
    Reply::Error(format!("storage error: {err}"))
}

#[cfg(test)]
mod tests {
    use cairn_store::StoreOptions;
    use tempfile::TempDir;
    use test_case::test_case;

    use super::*;

    fn handler() -> (TempDir, CommandHandler) {
        let dir = TempDir::new().unwrap();
        let store = CounterStore::open(dir.path(), &StoreOptions::default()).unwrap();
        (dir, CommandHandler::new(Arc::new(store)))
    }

    #[test]
    fn set_then_get() {
        let (_dir, handler) = handler();
        assert_eq!(handler.set(b"k", "10"), Reply::Ok);
        assert_eq!(handler.get(b"k"), Reply::Integer(10));
    }

    #[test]
    fn get_missing_is_null() {
        let (_dir, handler) = handler();
        assert_eq!(handler.get(b"missing"), Reply::Null);
    }

    #[test]
    fn incrby_returns_new_value_and_stores_it() {
        let (_dir, handler) = handler();
        handler.set(b"k", "10");
        assert_eq!(handler.incrby(b"k", "5"), Reply::Integer(15));
        assert_eq!(handler.get(b"k"), Reply::Integer(15));
    }

    #[test]
    fn incrby_on_missing_key_starts_from_zero() {
        let (_dir, handler) = handler();
        assert_eq!(handler.incrby(b"k", "-5"), Reply::Integer(-5));
        assert_eq!(handler.get(b"k"), Reply::Integer(-5));
    }

    #[test]
    fn ensure_matches_mismatches_and_missing() {
        let (_dir, handler) = handler();
        handler.set(b"k", "15");

        assert_eq!(handler.ensure(b"k", "15"), Reply::Ok);
        assert_eq!(
            handler.ensure(b"k", "99"),
            Reply::Error("ENSURE value different".to_string())
        );
        assert_eq!(
            handler.ensure(b"missing", "1"),
            Reply::Error("ENSURE key not found".to_string())
        );
    }

    #[test_case("set")]
    #[test_case("incrby")]
    #[test_case("ensure")]
    fn non_integer_input_is_rejected(command: &str) {
        let (_dir, handler) = handler();
        assert_eq!(handler.handle(&[command, "k", "a"]), Reply::invalid_integer());
    }

    #[test]
    fn handle_dispatches() {
        let (_dir, handler) = handler();
        assert_eq!(handler.handle(&["set", "k", "3"]), Reply::Ok);
        assert_eq!(handler.handle(&["incrby", "k", "4"]), Reply::Integer(7));
        assert_eq!(handler.handle(&["get", "k"]), Reply::Integer(7));
        assert_eq!(handler.handle(&["ensure", "k", "7"]), Reply::Ok);
    }

    #[test]
    fn handle_rejects_unknown_and_malformed() {
        let (_dir, handler) = handler();
        assert!(matches!(handler.handle(&["flush"]), Reply::Error(_)));
        assert!(matches!(handler.handle(&["get"]), Reply::Error(_)));
        assert!(matches!(handler.handle(&[]), Reply::Error(_)));
    }

    #[test]
    fn reply_display_forms() {
        assert_eq!(Reply::Integer(7).to_string(), "7");
        assert_eq!(Reply::Ok.to_string(), "OK");
        assert_eq!(Reply::Null.to_string(), "(nil)");
        assert_eq!(Reply::Error("boom".into()).to_string(), "ERR boom");
    }
}
