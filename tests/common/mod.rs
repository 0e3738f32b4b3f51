#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use futures::channel::oneshot;
use ndarray::Array2;

use dicom_viewport::{DecodeError, DecodedImage, ImageSource, RenderSurface, ViewportState};

/// Builds a test image whose row count encodes `tag`, so assertions can
/// tell which image reached the surface.
pub fn tagged_image(tag: usize) -> DecodedImage {
    DecodedImage {
        pixels: Array2::zeros((100 + tag, 100)),
        row_spacing: None,
        column_spacing: None,
        native_invert: false,
        bit_depth: 16,
        default_voi: None,
    }
}

pub fn image_tag(rows: u32) -> usize {
    rows as usize - 100
}

/// Test image with explicit geometry, for fit assertions.
pub fn custom_image(rows: usize, columns: usize) -> DecodedImage {
    DecodedImage {
        pixels: Array2::zeros((rows, columns)),
        row_spacing: None,
        column_spacing: None,
        native_invert: false,
        bit_depth: 16,
        default_voi: None,
    }
}

/// In-memory image source with per-identifier gating, so tests control when
/// a load resolves relative to other events.
#[derive(Clone)]
pub struct ScriptedSource {
    inner: Rc<RefCell<ScriptedInner>>,
}

#[derive(Default)]
struct ScriptedInner {
    images: HashMap<String, Rc<DecodedImage>>,
    gates: HashMap<String, oneshot::Receiver<()>>,
    load_log: Vec<String>,
    active: usize,
    max_active: usize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(ScriptedInner::default())),
        }
    }

    /// Source with images `img-0` to `img-{count - 1}`, each tagged with
    /// its index.
    pub fn with_stack(count: usize) -> Self {
        let source = Self::new();
        for i in 0..count {
            source.insert(&format!("img-{i}"), tagged_image(i));
        }
        source
    }

    pub fn insert(&self, id: &str, image: DecodedImage) {
        self.inner
            .borrow_mut()
            .images
            .insert(id.to_string(), Rc::new(image));
    }

    /// Holds the next load of `id` until the returned sender fires.
    pub fn gate(&self, id: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.inner.borrow_mut().gates.insert(id.to_string(), rx);
        tx
    }

    pub fn load_log(&self) -> Vec<String> {
        self.inner.borrow().load_log.clone()
    }

    pub fn loads_of(&self, id: &str) -> usize {
        self.inner
            .borrow()
            .load_log
            .iter()
            .filter(|logged| logged.as_str() == id)
            .count()
    }

    /// Highest number of loads that were in flight at once.
    pub fn max_concurrent_loads(&self) -> usize {
        self.inner.borrow().max_active
    }

    pub fn active_loads(&self) -> usize {
        self.inner.borrow().active
    }
}

impl ImageSource for ScriptedSource {
    async fn load_image(&self, id: &str) -> Result<Rc<DecodedImage>, DecodeError> {
        let gate = {
            let mut inner = self.inner.borrow_mut();
            inner.load_log.push(id.to_string());
            inner.active += 1;
            inner.max_active = inner.max_active.max(inner.active);
            inner.gates.remove(id)
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        let mut inner = self.inner.borrow_mut();
        inner.active -= 1;
        match inner.images.get(id) {
            Some(image) => Ok(Rc::clone(image)),
            None => Err(DecodeError::UnknownId(id.to_string())),
        }
    }
}

/// Recording render surface. Cloneable so tests keep a handle while the
/// controller owns the other.
#[derive(Clone)]
pub struct FakeSurface {
    log: Rc<RefCell<SurfaceLog>>,
}

#[derive(Default)]
pub struct SurfaceLog {
    pub enabled: bool,
    pub enable_calls: usize,
    pub disable_calls: usize,
    pub resized_calls: usize,
    pub dimensions: (u32, u32),
    /// (image rows, image columns, transform) per display call.
    pub displayed: Vec<(u32, u32, ViewportState)>,
    pub viewport: Option<ViewportState>,
}

impl FakeSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            log: Rc::new(RefCell::new(SurfaceLog {
                dimensions: (width, height),
                ..SurfaceLog::default()
            })),
        }
    }

    pub fn set_dimensions(&self, width: u32, height: u32) {
        self.log.borrow_mut().dimensions = (width, height);
    }

    pub fn enable_calls(&self) -> usize {
        self.log.borrow().enable_calls
    }

    pub fn disable_calls(&self) -> usize {
        self.log.borrow().disable_calls
    }

    pub fn display_count(&self) -> usize {
        self.log.borrow().displayed.len()
    }

    /// Tag of the most recently displayed image, per [`tagged_image`].
    pub fn displayed_tag(&self) -> Option<usize> {
        self.log
            .borrow()
            .displayed
            .last()
            .map(|(rows, _, _)| image_tag(*rows))
    }

    pub fn applied_viewport(&self) -> Option<ViewportState> {
        self.log.borrow().viewport.clone()
    }
}

impl RenderSurface for FakeSurface {
    fn enable(&mut self) {
        let mut log = self.log.borrow_mut();
        log.enabled = true;
        log.enable_calls += 1;
    }

    fn disable(&mut self) {
        let mut log = self.log.borrow_mut();
        log.enabled = false;
        log.disable_calls += 1;
    }

    fn dimensions(&self) -> (u32, u32) {
        self.log.borrow().dimensions
    }

    fn display(&mut self, image: &DecodedImage, viewport: &ViewportState) {
        let mut log = self.log.borrow_mut();
        log.displayed
            .push((image.rows(), image.columns(), viewport.clone()));
        log.viewport = Some(viewport.clone());
    }

    fn set_viewport(&mut self, viewport: &ViewportState) {
        self.log.borrow_mut().viewport = Some(viewport.clone());
    }

    fn viewport(&self) -> Option<ViewportState> {
        self.log.borrow().viewport.clone()
    }

    fn resized(&mut self) {
        self.log.borrow_mut().resized_calls += 1;
    }
}

/// Lets spawned local tasks make progress.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
