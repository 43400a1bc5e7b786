use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// One mutex per project id. Holding a project's lock serializes the
/// "read rolling spend, decide, insert" sequence for that project only.
#[derive(Clone, Default)]
pub struct ProjectLocks {
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_for(&self, project_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(project_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Runs `f` while holding the project's lock.
    pub fn with_lock<T>(&self, project_id: &str, f: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(project_id);
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        self.release(project_id, lock);
        result
    }

    /// Forgets the project's entry once the map holds the only other handle.
    /// `lock_for` clones under the map mutex, so a waiter always shows up in
    /// the count.
    fn release(&self, project_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let idle = locks
            .get(project_id)
            .is_some_and(|entry| Arc::ptr_eq(entry, &lock) && Arc::strong_count(entry) == 2);
        if idle {
            locks.remove(project_id);
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn same_project_shares_one_lock() {
        let locks = ProjectLocks::new();
        let a = locks.lock_for("alpha");
        let b = locks.lock_for("alpha");
        let c = locks.lock_for("beta");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn critical_sections_do_not_interleave() {
        let locks = ProjectLocks::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let overlaps = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = locks.clone();
                let inside = inside.clone();
                let overlaps = overlaps.clone();
                thread::spawn(move || {
                    for _ in 0..50 {
                        locks.with_lock("alpha", || {
                            if inside.fetch_add(1, Ordering::SeqCst) != 0 {
                                overlaps.fetch_add(1, Ordering::SeqCst);
                            }
                            inside.fetch_sub(1, Ordering::SeqCst);
                        });
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("thread");
        }
        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
        assert_eq!(locks.tracked(), 0);
    }

    #[test]
    fn idle_projects_are_forgotten() {
        let locks = ProjectLocks::new();
        for project in ["alpha", "beta", "gamma"] {
            assert_eq!(locks.with_lock(project, || project.len()), project.len());
        }
        assert_eq!(locks.tracked(), 0);

        let held = locks.lock_for("alpha");
        locks.with_lock("alpha", || ());
        assert_eq!(locks.tracked(), 1);
        drop(held);
        locks.with_lock("alpha", || ());
        assert_eq!(locks.tracked(), 0);
    }
}
