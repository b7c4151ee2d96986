use parking_lot::RwLock;
use tracing::info;

use super::dto::Cat;
use crate::app::Lifecycle;

/// In-memory, append-only list of cats. Lives as long as the process.
#[derive(Debug, Default)]
pub struct CatsService {
    cats: RwLock<Vec<Cat>>,
}

impl CatsService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `cat` and returns it with its zero-based position.
    pub fn create(&self, cat: Cat) -> (usize, Cat) {
        let mut cats = self.cats.write();
        cats.push(cat.clone());
        (cats.len() - 1, cat)
    }

    /// Snapshot of every cat, in insertion order.
    pub fn find_all(&self) -> Vec<Cat> {
        self.cats.read().clone()
    }

    pub fn find_one(&self, index: usize) -> Option<Cat> {
        self.cats.read().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.cats.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cats.read().is_empty()
    }
}

impl Lifecycle for CatsService {
    fn on_init(&self) {
        info!("CatsService initialized");
    }

    fn on_destroy(&self) {
        info!(cats = self.len(), "CatsService destroyed");
    }
}
