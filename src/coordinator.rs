use std::collections::HashSet;
use std::sync::Mutex;

/// Process-wide set of agency ids that have sent END.
///
/// `mark` and `all_received` share a plain blocking `std::sync::Mutex`: the
/// critical section is a single hash-set insert or length check with no
/// `.await` inside it, so there is no reason to pay for an async mutex here
/// (unlike the store lock, which wraps file I/O).
pub struct NotificationSet {
    required: u32,
    notified: Mutex<HashSet<u32>>,
}

impl NotificationSet {
    pub fn new(required: u32) -> Self {
        Self {
            required,
            notified: Mutex::new(HashSet::new()),
        }
    }

    /// Idempotent insert. Returns once the insertion is visible to all
    /// future readers (it is, trivially, as soon as the lock is dropped).
    pub fn mark(&self, agency_id: u32) {
        let mut notified = self.notified.lock().expect("notification set lock poisoned");
        notified.insert(agency_id);
    }

    /// True iff the set contains exactly `required` distinct ids.
    pub fn all_received(&self) -> bool {
        let notified = self.notified.lock().expect("notification set lock poisoned");
        notified.len() as u32 == self.required
    }

    #[cfg(test)]
    fn notified_count(&self) -> usize {
        self.notified.lock().unwrap().len()
    }
}
