use crate::types::{Notice, NoticeLevel};
use std::cell::RefCell;
use std::collections::VecDeque;

/// User-visible notices waiting for the presentation layer to show them.
#[derive(Default)]
pub struct Notifications {
    queue: RefCell<VecDeque<Notice>>,
}

impl Notifications {
    pub fn success(&self, message: impl Into<String>) {
        self.push(NoticeLevel::Success, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(NoticeLevel::Error, message.into());
    }

    /// Takes every pending notice, oldest first.
    pub fn drain(&self) -> Vec<Notice> {
        self.queue.borrow_mut().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    fn push(&self, level: NoticeLevel, message: String) {
        self.queue.borrow_mut().push_back(Notice { level, message });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_returns_in_order_and_empties() {
        let notices = Notifications::default();
        notices.success("one");
        notices.error("two");
        assert_eq!(notices.len(), 2);

        let drained = notices.drain();
        assert_eq!(drained[0].level, NoticeLevel::Success);
        assert_eq!(drained[1].message, "two");
        assert!(notices.is_empty());
    }
}
