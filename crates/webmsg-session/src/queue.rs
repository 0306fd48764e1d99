use std::collections::VecDeque;

use serde_json::Value;

/// FIFO of application messages waiting for a data request.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    pending: VecDeque<Value>,
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Value) {
        self.pending.push_back(message);
    }

    pub fn extend(&mut self, messages: impl IntoIterator<Item = Value>) {
        self.pending.extend(messages);
    }

    /// Put messages ahead of everything already queued, keeping their order.
    pub fn prepend(&mut self, messages: Vec<Value>) {
        for message in messages.into_iter().rev() {
            self.pending.push_front(message);
        }
    }

    /// Drop every queued message for which `keep` returns false.
    pub fn retain(&mut self, keep: impl FnMut(&Value) -> bool) -> usize {
        let before = self.pending.len();
        self.pending.retain(keep);
        before - self.pending.len()
    }

    /// Package the whole queue into one batch, leaving it empty.
    pub fn take(&mut self) -> Vec<Value> {
        self.pending.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn take_preserves_order_and_clears() {
        let mut queue = OutboundQueue::new();
        queue.push(json!("a"));
        queue.extend([json!("b"), json!("c")]);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.take(), vec![json!("a"), json!("b"), json!("c")]);
        assert!(queue.is_empty());
        assert!(queue.take().is_empty());
    }

    #[test]
    fn prepend_goes_first() {
        let mut queue = OutboundQueue::new();
        queue.push(json!("late"));
        queue.prepend(vec![json!(1), json!(2)]);
        assert_eq!(queue.take(), vec![json!(1), json!(2), json!("late")]);
    }

    #[test]
    fn retain_keeps_order_and_counts_removed() {
        let mut queue = OutboundQueue::new();
        queue.extend([json!(1), json!("x"), json!(2), json!("y")]);
        assert_eq!(queue.retain(Value::is_number), 2);
        assert_eq!(queue.take(), vec![json!(1), json!(2)]);
    }
}
