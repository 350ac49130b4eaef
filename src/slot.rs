use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;

/// Most-recent-value cell shared between one producer task and its readers.
///
/// Readers and the writer take the same mutex, so a reader never observes a
/// partially updated value. Every publish bumps a generation counter, letting
/// a consumer tell a fresh value from one it has already handled.
pub struct Slot<M: RawMutex, T> {
    inner: Mutex<M, Entry<T>>,
}

struct Entry<T> {
    value: T,
    generation: u32,
}

impl<M: RawMutex, T> Slot<M, T> {
    /// Create a slot holding `initial` at generation zero.
    pub const fn new(initial: T) -> Self {
        Self {
            inner: Mutex::new(Entry {
                value: initial,
                generation: 0,
            }),
        }
    }

    /// Replace the stored value, returning the new generation.
    pub async fn publish(&self, value: T) -> u32 {
        let mut entry = self.inner.lock().await;
        entry.value = value;
        entry.generation = entry.generation.wrapping_add(1);
        entry.generation
    }

    /// Copy out the stored value together with its generation.
    pub async fn latest(&self) -> (T, u32)
    where
        T: Clone,
    {
        let entry = self.inner.lock().await;
        (entry.value.clone(), entry.generation)
    }

    /// Generation of the most recent publish; zero if none has happened yet.
    pub async fn generation(&self) -> u32 {
        self.inner.lock().await.generation
    }
}
