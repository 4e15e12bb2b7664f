use crate::core::StoreError;

/// Local cache entry of one hook: the last result, whether the current
/// subscription has produced anything yet, and the last failure.
///
/// A failure keeps the previously delivered `data`. Opening a new listener
/// or receiving the next successful snapshot clears `error`.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveState<T> {
    pub data: T,
    pub loading: bool,
    pub error: Option<StoreError>,
}

impl<T: Default> LiveState<T> {
    pub fn loading() -> Self {
        Self {
            data: T::default(),
            loading: true,
            error: None,
        }
    }

    pub fn idle() -> Self {
        Self {
            data: T::default(),
            loading: false,
            error: None,
        }
    }
}

impl<T> LiveState<T> {
    pub(crate) fn resolve(&mut self, data: T) {
        self.data = data;
        self.loading = false;
        self.error = None;
    }

    pub(crate) fn reject(&mut self, error: StoreError) {
        self.loading = false;
        self.error = Some(error);
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl<T: Default> Default for LiveState<T> {
    fn default() -> Self {
        Self::loading()
    }
}
