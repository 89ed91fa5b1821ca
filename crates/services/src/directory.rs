use crate::policy::PostPolicy;
use domains::Board;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A configured board with its compiled validation rules.
#[derive(Debug)]
pub struct ConfiguredBoard {
    pub board: Board,
    pub policy: PostPolicy,
}

/// The live board set. A reload swaps the whole set at once.
#[derive(Debug, Default)]
pub struct BoardDirectory {
    boards: RwLock<Arc<HashMap<String, Arc<ConfiguredBoard>>>>,
}

impl BoardDirectory {
    pub fn new(boards: Vec<Board>) -> Self {
        let directory = Self::default();
        directory.replace(boards);
        directory
    }

    pub fn replace(&self, boards: Vec<Board>) {
        let set: HashMap<_, _> = boards
            .into_iter()
            .map(|board| {
                let policy = PostPolicy::new(&board);
                (board.name.clone(), Arc::new(ConfiguredBoard { board, policy }))
            })
            .collect();
        let count = set.len();
        match self.boards.write() {
            Ok(mut guard) => *guard = Arc::new(set),
            Err(poisoned) => *poisoned.into_inner() = Arc::new(set),
        }
        tracing::info!(boards = count, "board set replaced");
    }

    fn snapshot(&self) -> Arc<HashMap<String, Arc<ConfiguredBoard>>> {
        match self.boards.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<ConfiguredBoard>> {
        self.snapshot().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.snapshot().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}
