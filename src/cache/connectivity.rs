use tokio::sync::watch;

/// Result of feeding a platform signal into the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    WentOffline,
    WentOnline,
}

/// Online/offline flag shared with anything that renders a connectivity banner.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    tx: watch::Sender<bool>,
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ConnectivityMonitor {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx }
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Record the platform's connectivity. Subscribers are only woken on a change.
    pub fn set_online(&self, online: bool) -> Transition {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            *current = online;
            true
        });

        match (changed, online) {
            (false, _) => Transition::Unchanged,
            (true, true) => Transition::WentOnline,
            (true, false) => Transition::WentOffline,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        let monitor = ConnectivityMonitor::default();
        assert!(monitor.is_online());
        assert_eq!(monitor.set_online(true), Transition::Unchanged);
        assert_eq!(monitor.set_online(false), Transition::WentOffline);
        assert!(!monitor.is_online());
        assert_eq!(monitor.set_online(false), Transition::Unchanged);
        assert_eq!(monitor.set_online(true), Transition::WentOnline);
    }

    #[tokio::test]
    async fn test_subscriber_sees_changes_only() {
        let monitor = ConnectivityMonitor::new(true);
        let mut rx = monitor.subscribe();

        monitor.set_online(true);
        assert!(!rx.has_changed().unwrap());

        monitor.set_online(false);
        rx.changed().await.unwrap();
        assert!(!*rx.borrow_and_update());
    }
}
