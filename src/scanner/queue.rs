use std::collections::VecDeque;
use std::path::PathBuf;

use parking_lot::Mutex;

/// Per-worker deque of directories waiting to be enumerated.
///
/// The owner pushes and pops at the tail, so its own work stays depth-first;
/// thieves take from the head, where the shallower and usually larger
/// subtrees sit.
#[derive(Debug, Default)]
pub struct WorkQueue {
    dirs: Mutex<VecDeque<PathBuf>>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_own(&self, dir: PathBuf) {
        self.dirs.lock().push_back(dir);
    }

    pub fn pop_own(&self) -> Option<PathBuf> {
        self.dirs.lock().pop_back()
    }

    pub fn steal(&self) -> Option<PathBuf> {
        self.dirs.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.dirs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::thread;

    use super::*;

    #[test]
    fn owner_pops_lifo_thief_steals_fifo() {
        let queue = WorkQueue::new();
        queue.push_own(PathBuf::from("/a"));
        queue.push_own(PathBuf::from("/a/b"));
        queue.push_own(PathBuf::from("/a/b/c"));

        assert_eq!(queue.pop_own(), Some(PathBuf::from("/a/b/c")));
        assert_eq!(queue.steal(), Some(PathBuf::from("/a")));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop_own(), Some(PathBuf::from("/a/b")));
        assert_eq!(queue.pop_own(), None);
        assert_eq!(queue.steal(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn concurrent_consumers_claim_each_item_once() {
        let queue = WorkQueue::new();
        for index in 0..2_000 {
            queue.push_own(PathBuf::from(format!("/dir/{index}")));
        }

        let claimed: Vec<PathBuf> = thread::scope(|scope| {
            let owner = scope.spawn(|| {
                let mut got = Vec::new();
                while let Some(dir) = queue.pop_own() {
                    got.push(dir);
                }
                got
            });
            let thieves: Vec<_> = (0..3)
                .map(|_| {
                    scope.spawn(|| {
                        let mut got = Vec::new();
                        while let Some(dir) = queue.steal() {
                            got.push(dir);
                        }
                        got
                    })
                })
                .collect();

            let mut all = owner.join().expect("owner thread");
            for thief in thieves {
                all.extend(thief.join().expect("thief thread"));
            }
            all
        });

        let unique: HashSet<_> = claimed.iter().collect();
        assert_eq!(claimed.len(), 2_000);
        assert_eq!(unique.len(), 2_000);
    }
}
