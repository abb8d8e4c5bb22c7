//! Correlation-id generation and scoped propagation.
//!
//! # Responsibilities
//! - Mint one correlation id per inbound unit of work
//! - Hold the id in task-local (async) or thread-local (sync) storage
//! - Guarantee the id never leaks into sibling units of work
//!
//! # Design Decisions
//! - Date-prefixed ids (`YYYYMMDD#<uuid>`) for cheap log filtering by day
//! - Explicit scopes instead of a process-wide mutable variable
//! - Task-locals are not inherited across `tokio::spawn`; spawned work
//!   must be wrapped in its own [`scope`] call

use std::cell::RefCell;
use std::fmt;
use std::future::Future;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

tokio::task_local! {
    static TASK_CORRELATION: CorrelationId;
}

thread_local! {
    static THREAD_CORRELATION: RefCell<Option<CorrelationId>> = const { RefCell::new(None) };
}

/// Opaque token identifying one logical unit of work end-to-end in logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generate a fresh id of the form `YYYYMMDD#<uuid-v4>` (UTC date).
    pub fn generate() -> Self {
        Self(format!("{}#{}", Utc::now().format("%Y%m%d"), Uuid::new_v4()))
    }

    /// Adopt a caller-supplied id, e.g. one carried in a path segment or
    /// an inbound header.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The id set by the nearest enclosing scope, if any.
///
/// Task-local scopes take precedence over thread-local ones, so sync code
/// invoked from within an async scope observes the task's id.
pub fn current() -> Option<CorrelationId> {
    TASK_CORRELATION
        .try_with(|id| id.clone())
        .ok()
        .or_else(|| THREAD_CORRELATION.with(|cell| cell.borrow().clone()))
}

/// Run `fut` with `id` as the ambient correlation id.
///
/// The binding survives every await point inside `fut` and is dropped when
/// the future completes. Tasks spawned from inside the scope do not inherit
/// the id.
pub async fn scope<F>(id: CorrelationId, fut: F) -> F::Output
where
    F: Future,
{
    TASK_CORRELATION.scope(id, fut).await
}

/// Run `f` with `id` as the ambient correlation id on the current thread.
///
/// The previous binding is restored when `f` returns, including on unwind.
pub fn scope_sync<T>(id: CorrelationId, f: impl FnOnce() -> T) -> T {
    struct Restore(Option<CorrelationId>);

    impl Drop for Restore {
        fn drop(&mut self) {
            let previous = self.0.take();
            THREAD_CORRELATION.with(|cell| *cell.borrow_mut() = previous);
        }
    }

    let previous = THREAD_CORRELATION.with(|cell| cell.borrow_mut().replace(id));
    let _restore = Restore(previous);
    f()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};

    use super::*;

    #[test]
    fn generated_id_has_date_prefix_and_uuid_suffix() {
        let id = CorrelationId::generate();
        let (date, token) = id.as_str().split_once('#').expect("separator present");

        assert_eq!(date.len(), 8);
        assert!(date.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(token.len(), 36);
        assert!(Uuid::parse_str(token).is_ok());
    }

    #[test]
    fn generated_ids_are_distinct() {
        let first = CorrelationId::generate();
        let second = CorrelationId::generate();
        assert_ne!(first, second);
    }

    #[test]
    fn no_id_outside_any_scope() {
        assert_eq!(current(), None);
    }

    #[test]
    fn sync_scope_restores_previous_binding() {
        let outer = CorrelationId::from_string("20250101#outer");
        let inner = CorrelationId::from_string("20250101#inner");

        scope_sync(outer.clone(), || {
            assert_eq!(current(), Some(outer.clone()));
            scope_sync(inner.clone(), || {
                assert_eq!(current(), Some(inner.clone()));
            });
            assert_eq!(current(), Some(outer.clone()));
        });
        assert_eq!(current(), None);
    }

    #[test]
    fn concurrent_threads_never_observe_each_others_id() {
        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = (0..2)
            .map(|i| {
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    let id = CorrelationId::from_string(format!("20250101#thread-{i}"));
                    scope_sync(id.clone(), || {
                        barrier.wait();
                        assert_eq!(current(), Some(id.clone()));
                        barrier.wait();
                        assert_eq!(current(), Some(id));
                    });
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("thread panicked");
        }
    }

    #[tokio::test]
    async fn task_scope_survives_await_points() {
        let id = CorrelationId::generate();
        scope(id.clone(), async {
            assert_eq!(current(), Some(id.clone()));
            tokio::task::yield_now().await;
            assert_eq!(current(), Some(id.clone()));
        })
        .await;
        assert_eq!(current(), None);
    }

    #[tokio::test]
    async fn sibling_tasks_never_observe_each_others_id() {
        let make_task = |i: usize| {
            let id = CorrelationId::from_string(format!("20250101#task-{i}"));
            scope(id.clone(), async move {
                for _ in 0..10 {
                    tokio::task::yield_now().await;
                    assert_eq!(current(), Some(id.clone()));
                }
            })
        };

        let (a, b) = tokio::join!(
            tokio::spawn(make_task(0)),
            tokio::spawn(make_task(1))
        );
        a.expect("task a panicked");
        b.expect("task b panicked");
    }

    #[tokio::test]
    async fn spawned_tasks_do_not_inherit_the_scope() {
        let id = CorrelationId::generate();
        let observed = scope(id, async {
            tokio::spawn(async { current() })
                .await
                .expect("task panicked")
        })
        .await;
        assert_eq!(observed, None);
    }
}
