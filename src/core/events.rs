/// Handle returned by [`FrameEventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Callback invoked after each rendered frame
pub type FrameHandler<C> = Box<dyn FnMut(u32, &mut C)>;

/// Observer list for "frame rendered" notifications
///
/// Handlers receive the frame index and a mutable reference to the context
/// they animate (the tracer's scene state). Publishing borrows the bus
/// mutably, so a handler can never reach the bus to unsubscribe others while
/// a publish is in progress.
pub struct FrameEventBus<C> {
    handlers: Vec<(SubscriptionId, FrameHandler<C>)>,
    next_id: u64,
}

impl<C> FrameEventBus<C> {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            next_id: 0,
        }
    }

    pub fn subscribe<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(u32, &mut C) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Remove a handler; returns false if it was not subscribed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(handler_id, _)| *handler_id != id);
        self.handlers.len() != before
    }

    /// Invoke every handler in subscription order
    pub fn publish(&mut self, frame: u32, context: &mut C) {
        for (_, handler) in self.handlers.iter_mut() {
            handler(frame, context);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}

impl<C> Default for FrameEventBus<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_runs_handlers_in_subscription_order() {
        let mut bus: FrameEventBus<Vec<String>> = FrameEventBus::new();
        bus.subscribe(|frame, log| log.push(format!("a{}", frame)));
        bus.subscribe(|frame, log| log.push(format!("b{}", frame)));

        let mut log = Vec::new();
        bus.publish(0, &mut log);
        bus.publish(1, &mut log);

        assert_eq!(log, vec!["a0", "b0", "a1", "b1"]);
    }

    #[test]
    fn unsubscribe_removes_only_that_handler() {
        let mut bus: FrameEventBus<Vec<u32>> = FrameEventBus::new();
        let first = bus.subscribe(|frame, log| log.push(frame));
        bus.subscribe(|frame, log| log.push(frame + 100));

        assert!(bus.unsubscribe(first));
        assert!(!bus.unsubscribe(first));

        let mut log = Vec::new();
        bus.publish(3, &mut log);
        assert_eq!(log, vec![103]);
        assert_eq!(bus.len(), 1);
    }

    #[test]
    fn handlers_keep_their_own_state() {
        let mut bus: FrameEventBus<u32> = FrameEventBus::new();
        let mut calls = 0;
        bus.subscribe(move |_, total| {
            calls += 1;
            *total = calls;
        });

        let mut total = 0;
        for frame in 0..5 {
            bus.publish(frame, &mut total);
        }
        assert_eq!(total, 5);
    }

    #[test]
    fn publish_with_no_handlers_is_noop() {
        let mut bus: FrameEventBus<u32> = FrameEventBus::default();
        let mut value = 7;
        bus.publish(0, &mut value);
        assert_eq!(value, 7);
        assert!(bus.is_empty());
    }
}
