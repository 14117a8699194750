use super::types::FeedEntity;

/// A cached entity tagged with its reconciliation status.
///
/// `Temporary` entries were synthesized locally for an optimistic create and
/// have not been acknowledged by the server. They carry a client-generated id
/// that will never match a server id, so reconciliation removes the temporary
/// entry and inserts the confirmed one rather than merging fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry<T> {
    Temporary(T),
    Confirmed(T),
}

impl<T: FeedEntity> Entry<T> {
    pub fn id(&self) -> &str {
        self.value().id()
    }

    pub fn value(&self) -> &T {
        match self {
            Entry::Temporary(v) | Entry::Confirmed(v) => v,
        }
    }

    pub fn value_mut(&mut self) -> &mut T {
        match self {
            Entry::Temporary(v) | Entry::Confirmed(v) => v,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Entry::Temporary(v) | Entry::Confirmed(v) => v,
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, Entry::Temporary(_))
    }
}
