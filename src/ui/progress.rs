use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Named progress bars sharing one `MultiProgress` draw target
pub struct ProgressManager {
    mp: MultiProgress,
    bars: Arc<Mutex<HashMap<String, ProgressBar>>>,
}

impl ProgressManager {
    pub fn new() -> Self {
        Self {
            mp: MultiProgress::new(),
            bars: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Registers a bar under `id`, replacing any bar with the same id.
    /// An unparsable `template` falls back to the default bar style.
    pub fn create_bar(&self, id: &str, total: u64, template: &str, message: &str) {
        let style = ProgressStyle::default_bar()
            .template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏ ");
        let pb = self.mp.add(ProgressBar::new(total));
        pb.set_style(style);
        pb.set_message(message.to_string());

        if let Ok(mut bars) = self.bars.lock() {
            if let Some(old) = bars.insert(id.to_string(), pb) {
                old.finish_and_clear();
            }
        }
    }

    fn with_bar(&self, id: &str, f: impl FnOnce(&ProgressBar)) -> bool {
        match self.bars.lock() {
            Ok(bars) => bars.get(id).map(f).is_some(),
            Err(_) => false,
        }
    }

    pub fn inc(&self, id: &str, value: u64) -> bool {
        self.with_bar(id, |pb| pb.inc(value))
    }

    pub fn set_message(&self, id: &str, message: &str) -> bool {
        self.with_bar(id, |pb| pb.set_message(message.to_string()))
    }

    pub fn position(&self, id: &str) -> Option<u64> {
        let bars = self.bars.lock().ok()?;
        bars.get(id).map(ProgressBar::position)
    }

    /// Finishes the bar and keeps it on screen with `message`
    pub fn finish(&self, id: &str, message: &str) -> bool {
        let pb = match self.bars.lock() {
            Ok(mut bars) => bars.remove(id),
            Err(_) => None,
        };
        match pb {
            Some(pb) => {
                pb.finish_with_message(message.to_string());
                true
            }
            None => false,
        }
    }

    pub fn exists(&self, id: &str) -> bool {
        self.bars
            .lock()
            .map(|bars| bars.contains_key(id))
            .unwrap_or(false)
    }
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}

pub mod templates {
    pub const BATCH: &str =
        "{spinner} BATCH [{bar:30.cyan}] {pos}/{len} jobs {msg}";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_lifecycle() {
        let pm = ProgressManager::new();
        pm.create_bar("jobs", 4, templates::BATCH, "start");
        assert!(pm.exists("jobs"));
        assert!(pm.inc("jobs", 3));
        assert_eq!(pm.position("jobs"), Some(3));
        assert!(pm.set_message("jobs", "busy"));
        assert!(pm.finish("jobs", "done"));
        assert!(!pm.exists("jobs"));
        assert!(!pm.inc("jobs", 1));
    }

    #[test]
    fn test_bad_template_falls_back() {
        let pm = ProgressManager::default();
        pm.create_bar("x", 1, "{bar:notacolor.", "");
        assert!(pm.exists("x"));
        assert!(pm.finish("x", ""));
        assert!(!pm.exists("x"));
    }
}
