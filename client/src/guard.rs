use std::sync::OnceLock;

/// Holds at most one value for the lifetime of the guard. Once initialised,
/// every caller gets the same value and the initialiser never runs again.
#[derive(Debug)]
pub struct PageGuard<T> {
    cell: OnceLock<T>,
}

impl<T> PageGuard<T> {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    pub fn get_or_init<F: FnOnce() -> T>(&self, init: F) -> &T {
        self.cell.get_or_init(init)
    }

    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T> Default for PageGuard<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn initialiser_runs_once() {
        let guard: PageGuard<usize> = PageGuard::new();
        let calls = AtomicUsize::new(0);

        let a = *guard.get_or_init(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            1
        });
        let b = *guard.get_or_init(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            2
        });

        assert_eq!((a, b), (1, 1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn racing_initialisers_share_one_value() {
        let guard: Arc<PageGuard<usize>> = Arc::new(PageGuard::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let threads: Vec<_> = (0..8)
            .map(|i| {
                let guard = Arc::clone(&guard);
                let calls = Arc::clone(&calls);
                std::thread::spawn(move || {
                    *guard.get_or_init(|| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        i
                    })
                })
            })
            .collect();

        let values: Vec<usize> = threads.into_iter().map(|t| t.join().unwrap()).collect();
        assert!(values.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
