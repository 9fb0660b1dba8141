use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

type SyncCallback<T> = Arc<dyn Fn(T) + Send + Sync>;
type AsyncCallback<T> = Arc<dyn Fn(T) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

#[derive(Clone)]
enum Callback<T> {
    Sync(SyncCallback<T>),
    Async(AsyncCallback<T>),
}

struct Listener<T> {
    id: u64,
    callback: Callback<T>,
}

/// Listener registry for one event kind. Sync listeners run inline on the
/// emitting call; async listeners are spawned onto the runtime.
///
/// Listeners must not call back into whatever structure owns the event,
/// emission happens while the owner may still hold its own lock.
pub struct Event<T>
where
    T: Clone + Send + 'static,
{
    listeners: Mutex<Vec<Listener<T>>>,
    next_id: AtomicU64,
}

impl<T: Clone + Send + 'static> Default for Event<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> Event<T> {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn subscribe<F>(&self, callback: F) -> u64
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.push(Callback::Sync(Arc::new(callback)))
    }

    pub fn subscribe_async<F, Fut>(&self, callback: F) -> u64
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.push(Callback::Async(Arc::new(move |value| {
            Box::pin(callback(value))
        })))
    }

    fn push(&self, callback: Callback<T>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut listeners = self.listeners.lock().unwrap();
        listeners.push(Listener { id, callback });
        id
    }

    pub fn unsubscribe(&self, id: u64) -> bool {
        let mut listeners = self.listeners.lock().unwrap();
        match listeners.iter().position(|l| l.id == id) {
            Some(pos) => {
                listeners.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn emit(&self, value: T) {
        let snapshot: Vec<Callback<T>> = {
            let listeners = self.listeners.lock().unwrap();
            listeners.iter().map(|l| l.callback.clone()).collect()
        };
        for callback in snapshot {
            match callback {
                Callback::Sync(cb) => cb(value.clone()),
                Callback::Async(cb) => {
                    tokio::spawn(cb(value.clone()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn sync_listeners_run_inline() {
        let event = Event::<u32>::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        event.subscribe(move |value| {
            assert_eq!(value, 42);
            counter_clone.fetch_add(1, Ordering::Relaxed);
        });

        event.emit(42);
        assert_eq!(counter.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn async_listeners_are_spawned() {
        let event = Event::<String>::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        event.subscribe_async(move |value: String| {
            let counter = Arc::clone(&counter_clone);
            async move {
                assert_eq!(value, "hello");
                counter.fetch_add(1, Ordering::Relaxed);
            }
        });

        event.emit("hello".to_string());
        tokio::task::yield_now().await;
        assert_eq!(counter.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn unsubscribed_listeners_do_not_fire() {
        let event = Event::<u32>::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let id = event.subscribe(move |_| {
            counter_clone.fetch_add(1, Ordering::Relaxed);
        });

        assert!(event.unsubscribe(id));
        assert!(!event.unsubscribe(id));
        event.emit(7);
        assert_eq!(counter.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn multiple_listeners_all_fire() {
        let event = Event::<u32>::new();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let counter_clone = Arc::clone(&counter);
            event.subscribe(move |_| {
                counter_clone.fetch_add(1, Ordering::Relaxed);
            });
        }

        event.emit(1);
        assert_eq!(counter.load(Ordering::Relaxed), 5);
    }
}
