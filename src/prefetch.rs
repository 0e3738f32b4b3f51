use std::cell::Cell;
use std::rc::Rc;

use futures::StreamExt;
use futures::stream;
use tracing::{debug, warn};

use crate::config::PrefetchOptions;
use crate::source::ImageSource;
use crate::stack::Stack;

/// Handle tying one scheduler run to the moment it was started.
///
/// Every re-anchor bumps the shared counter; workers from an older run see
/// the mismatch and stop pulling queued work. Decodes already in flight are
/// left to finish — their results land in the source's cache either way.
#[derive(Clone)]
pub struct RunToken {
    current: Rc<Cell<u64>>,
    issued: u64,
}

impl RunToken {
    pub fn is_current(&self) -> bool {
        self.current.get() == self.issued
    }
}

/// Opportunistically warms the decode cache for slices near the current
/// index.
///
/// Best effort by design: failed prefetches are logged and swallowed (the
/// slice may never be viewed), and no eviction is performed here — cache
/// ownership stays with the [`ImageSource`].
pub struct PrefetchScheduler {
    options: PrefetchOptions,
    run: Rc<Cell<u64>>,
}

impl PrefetchScheduler {
    pub fn new(options: PrefetchOptions) -> Self {
        Self {
            options,
            run: Rc::new(Cell::new(0)),
        }
    }

    /// Invalidates the active run without starting a new one.
    pub fn cancel(&self) {
        self.run.set(self.run.get() + 1);
    }

    /// Invalidates the active run and issues a token for the next one.
    fn next_token(&self) -> RunToken {
        self.run.set(self.run.get() + 1);
        RunToken {
            current: Rc::clone(&self.run),
            issued: self.run.get(),
        }
    }

    /// Re-anchors prefetching around `index`, spawning a fresh bounded run
    /// on the current thread's `LocalSet`.
    ///
    /// The displayed slice itself is requested first; with the source's
    /// in-flight collapsing this is a no-op when the controller already
    /// loaded it.
    pub fn reanchor<S>(&self, source: &S, stack: &Stack, index: usize)
    where
        S: ImageSource + Clone + 'static,
    {
        if !self.options.enabled || stack.len() <= 1 {
            return;
        }
        let ids: Vec<String> = stack
            .neighbors(index, self.options.window)
            .into_iter()
            .filter_map(|i| stack.id(i).map(str::to_string))
            .collect();
        let token = self.next_token();
        let source = source.clone();
        let concurrency = self.options.concurrency.max(1);
        tokio::task::spawn_local(run(source, ids, concurrency, token));
    }
}

/// One scheduler run: a queue of identifiers drained by at most
/// `concurrency` workers, each pulling the next identifier as soon as its
/// previous decode finishes.
async fn run<S: ImageSource>(source: S, ids: Vec<String>, concurrency: usize, token: RunToken) {
    stream::iter(ids)
        .for_each_concurrent(concurrency, |id| {
            let source = &source;
            let token = &token;
            async move {
                if !token.is_current() {
                    return;
                }
                match source.load_image(&id).await {
                    Ok(_) => debug!(id = %id, "prefetched"),
                    Err(error) => warn!(id = %id, %error, "prefetch failed"),
                }
            }
        })
        .await;
}
