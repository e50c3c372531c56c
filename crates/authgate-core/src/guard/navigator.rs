use parking_lot::RwLock;
use tracing::debug;

/// Where the UI currently is, and how to move it.
pub trait Navigator: Send + Sync {
    fn current(&self) -> String;
    fn redirect(&self, path: &str);
}

/// In-memory location history.
pub struct NavigationHistory {
    entries: RwLock<Vec<String>>,
}

impl NavigationHistory {
    pub fn new(start: &str) -> Self {
        Self {
            entries: RwLock::new(vec![start.to_string()]),
        }
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.read().clone()
    }
}

impl Navigator for NavigationHistory {
    fn current(&self) -> String {
        self.entries.read().last().cloned().unwrap_or_else(|| "/".to_string())
    }

    fn redirect(&self, path: &str) {
        let mut entries = self.entries.write();
        if entries.last().map(String::as_str) != Some(path) {
            debug!(to = path, "Navigating");
            entries.push(path.to_string());
        }
    }
}
