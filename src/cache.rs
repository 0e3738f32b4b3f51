use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use futures::FutureExt;
use futures::future::{LocalBoxFuture, Shared};
use tracing::debug;

use crate::source::{DecodeError, DecodedImage, ImageSource};

type SharedLoad = Shared<LocalBoxFuture<'static, Result<Rc<DecodedImage>, DecodeError>>>;

/// Decorator that makes any [`ImageSource`] idempotent.
///
/// Successful decodes are memoized, and concurrent loads for the same
/// identifier collapse onto one shared in-flight future, so the scheduler
/// and the controller may request the same slice redundantly without paying
/// the decode twice. Failures are not memoized; a later retry hits the inner
/// source again.
///
/// Eviction is deliberately absent — the decode cache lives for the life of
/// the source, which in practice is one viewing session.
pub struct CachedSource<S> {
    inner: Rc<S>,
    state: Rc<RefCell<CacheState>>,
}

#[derive(Default)]
struct CacheState {
    loaded: HashMap<String, Rc<DecodedImage>>,
    in_flight: HashMap<String, SharedLoad>,
}

impl<S> Clone for CachedSource<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            state: Rc::clone(&self.state),
        }
    }
}

impl<S> CachedSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner: Rc::new(inner),
            state: Rc::new(RefCell::new(CacheState::default())),
        }
    }

    /// True when the identifier has already been decoded.
    pub fn is_cached(&self, id: &str) -> bool {
        self.state.borrow().loaded.contains_key(id)
    }

    pub fn cached_count(&self) -> usize {
        self.state.borrow().loaded.len()
    }
}

impl<S: ImageSource + 'static> ImageSource for CachedSource<S> {
    async fn load_image(&self, id: &str) -> Result<Rc<DecodedImage>, DecodeError> {
        if let Some(image) = self.state.borrow().loaded.get(id) {
            return Ok(Rc::clone(image));
        }

        let load = {
            let mut state = self.state.borrow_mut();
            // Re-check under the borrow: another waiter may have started.
            if let Some(pending) = state.in_flight.get(id) {
                pending.clone()
            } else {
                let inner = Rc::clone(&self.inner);
                let key = id.to_string();
                let pending = async move { inner.load_image(&key).await }
                    .boxed_local()
                    .shared();
                state.in_flight.insert(id.to_string(), pending.clone());
                debug!(id, "decode started");
                pending
            }
        };

        let result = load.await;

        let mut state = self.state.borrow_mut();
        state.in_flight.remove(id);
        if let Ok(image) = &result {
            state.loaded.insert(id.to_string(), Rc::clone(image));
        }
        result
    }
}
