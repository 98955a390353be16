//! Order submission: print-resolution rendering of every cart line plus persistence
//! through a pluggable backend.
//!
//! Submission is header-first and without rollback: the order row is written before any
//! line renders, and a line that fails to render or persist is recorded as failed on the
//! receipt while the rest of the order proceeds. Rendering runs on a dedicated rayon
//! pool capped at four workers so concurrent print rasters bound peak memory.

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::checkout::cart::Cart;
use crate::design::document::{ImageRecord, TextRecord};
use crate::foundation::color::Color;
use crate::foundation::error::{PadforgeError, PadforgeResult};
use crate::render::fonts::FontCatalog;
use crate::render::highres::render_highres;
use crate::render::raster::PreparedImage;
use crate::store::AssetStore;

/// Render worker cap for a single submission.
const RENDER_WORKERS: usize = 4;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Delivery point picked on a map, when the customer provided one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat_lng: Option<(f64, f64)>,
}

impl CustomerInfo {
    pub fn validate(&self) -> PadforgeResult<()> {
        for (field, value) in [
            ("name", &self.name),
            ("email", &self.email),
            ("phone", &self.phone),
            ("address", &self.address),
            ("city", &self.city),
        ] {
            if value.trim().is_empty() {
                return Err(PadforgeError::validation(format!(
                    "customer {field} must be non-empty"
                )));
            }
        }
        if !self.email.contains('@') {
            return Err(PadforgeError::validation("customer email is not an address"));
        }
        Ok(())
    }
}

/// Persisted per-line order data, minus the raster itself.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderLine {
    pub index: usize,
    pub quantity: u32,
    pub size_label: String,
    pub rgb: bool,
    pub logo_removed: bool,
    pub unit_price: u64,
    pub background: Color,
    /// Raw scene snapshot, kept alongside the raster so a line can be re-rendered later.
    pub scene_json: String,
    /// Backend path of the print raster, when rendering succeeded.
    pub print_path: Option<String>,
}

/// Persistence seam for submitted orders. Implementations are remote in production; the
/// in-memory fake below backs tests.
pub trait OrderBackend: Send + Sync {
    fn insert_order(&self, customer: &CustomerInfo, total: u64) -> PadforgeResult<OrderId>;
    /// Store a print raster, returning its backend path.
    fn upload_raster(&self, order: &OrderId, line_index: usize, png: &[u8])
    -> PadforgeResult<String>;
    fn insert_line(&self, order: &OrderId, line: &OrderLine) -> PadforgeResult<()>;
    fn insert_image_row(
        &self,
        order: &OrderId,
        line_index: usize,
        record: &ImageRecord,
    ) -> PadforgeResult<()>;
    fn insert_text_row(
        &self,
        order: &OrderId,
        line_index: usize,
        record: &TextRecord,
    ) -> PadforgeResult<()>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineStatus {
    Printed {
        raster_path: String,
        width: u32,
        height: u32,
    },
    Failed {
        reason: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineOutcome {
    pub item_id: String,
    pub status: LineStatus,
}

#[derive(Clone, Debug)]
pub struct OrderReceipt {
    pub order_id: OrderId,
    pub total: u64,
    pub lines: Vec<LineOutcome>,
}

impl OrderReceipt {
    pub fn fully_printed(&self) -> bool {
        self.lines
            .iter()
            .all(|l| matches!(l.status, LineStatus::Printed { .. }))
    }
}

/// Submit a cart as one order.
///
/// The order header is inserted first; each line is then rendered at print resolution,
/// uploaded and recorded. Line failures are isolated: they surface on the receipt, not
/// as an error from this function.
#[tracing::instrument(skip_all, fields(lines = cart.items().len(), total = cart.total()))]
pub fn submit_order(
    cart: &Cart,
    customer: &CustomerInfo,
    backend: &dyn OrderBackend,
    branding: Option<&PreparedImage>,
    fonts: &FontCatalog,
    store: &dyn AssetStore,
) -> PadforgeResult<OrderReceipt> {
    if cart.is_empty() {
        return Err(PadforgeError::validation("cannot submit an empty cart"));
    }
    customer.validate()?;

    let total = cart.total();
    let order_id = backend.insert_order(customer, total)?;
    tracing::info!(order = %order_id, total, "order header created");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(RENDER_WORKERS)
        .build()
        .context("build render pool")?;

    let lines: Vec<LineOutcome> = pool.install(|| {
        use rayon::prelude::*;
        cart.items()
            .par_iter()
            .enumerate()
            .map(|(index, item)| {
                let status = submit_line(index, item, &order_id, backend, branding, fonts, store);
                let status = match status {
                    Ok(status) => status,
                    Err(e) => {
                        tracing::warn!(order = %order_id, line = index, error = %e, "order line failed");
                        LineStatus::Failed {
                            reason: e.to_string(),
                        }
                    }
                };
                LineOutcome {
                    item_id: item.id.clone(),
                    status,
                }
            })
            .collect()
    });

    Ok(OrderReceipt {
        order_id,
        total,
        lines,
    })
}

fn submit_line(
    index: usize,
    item: &crate::checkout::cart::CartItem,
    order_id: &OrderId,
    backend: &dyn OrderBackend,
    branding: Option<&PreparedImage>,
    fonts: &FontCatalog,
    store: &dyn AssetStore,
) -> PadforgeResult<LineStatus> {
    let doc = &item.document;
    let raster = render_highres(doc, branding, fonts, store)?;
    let png = raster.encode_png()?;
    let raster_path = backend.upload_raster(order_id, index, &png)?;

    backend.insert_line(
        order_id,
        &OrderLine {
            index,
            quantity: item.quantity,
            size_label: doc.size.label().to_string(),
            rgb: doc.rgb,
            logo_removed: doc.logo.removed,
            unit_price: doc.pricing.total,
            background: doc.background,
            scene_json: serde_json::to_string(&doc.scene)
                .map_err(|e| PadforgeError::serde(format!("encode line snapshot: {e}")))?,
            print_path: Some(raster_path.clone()),
        },
    )?;
    for record in &doc.images {
        backend.insert_image_row(order_id, index, record)?;
    }
    for record in &doc.texts {
        backend.insert_text_row(order_id, index, record)?;
    }

    Ok(LineStatus::Printed {
        raster_path,
        width: raster.width,
        height: raster.height,
    })
}

/// In-memory [`OrderBackend`] for tests and local dry runs.
#[derive(Default)]
pub struct MemoryOrderBackend {
    state: std::sync::Mutex<BackendState>,
}

#[derive(Default)]
struct BackendState {
    orders: Vec<(OrderId, CustomerInfo, u64)>,
    lines: Vec<(OrderId, OrderLine)>,
    image_rows: Vec<(OrderId, usize)>,
    text_rows: Vec<(OrderId, usize)>,
    rasters: std::collections::HashMap<String, Vec<u8>>,
}

impl MemoryOrderBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order_count(&self) -> usize {
        self.state.lock().expect("backend lock poisoned").orders.len()
    }

    pub fn line_count(&self) -> usize {
        self.state.lock().expect("backend lock poisoned").lines.len()
    }

    pub fn raster(&self, path: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .expect("backend lock poisoned")
            .rasters
            .get(path)
            .cloned()
    }
}

impl OrderBackend for MemoryOrderBackend {
    fn insert_order(&self, customer: &CustomerInfo, total: u64) -> PadforgeResult<OrderId> {
        let id = OrderId(format!("order_{}", uuid::Uuid::new_v4().simple()));
        let mut state = self
            .state
            .lock()
            .map_err(|_| PadforgeError::store("backend lock poisoned"))?;
        state.orders.push((id.clone(), customer.clone(), total));
        Ok(id)
    }

    fn upload_raster(
        &self,
        order: &OrderId,
        line_index: usize,
        png: &[u8],
    ) -> PadforgeResult<String> {
        let path = format!("orders/{order}/line_{line_index}.png");
        let mut state = self
            .state
            .lock()
            .map_err(|_| PadforgeError::store("backend lock poisoned"))?;
        state.rasters.insert(path.clone(), png.to_vec());
        Ok(path)
    }

    fn insert_line(&self, order: &OrderId, line: &OrderLine) -> PadforgeResult<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| PadforgeError::store("backend lock poisoned"))?;
        state.lines.push((order.clone(), line.clone()));
        Ok(())
    }

    fn insert_image_row(
        &self,
        order: &OrderId,
        line_index: usize,
        _record: &ImageRecord,
    ) -> PadforgeResult<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| PadforgeError::store("backend lock poisoned"))?;
        state.image_rows.push((order.clone(), line_index));
        Ok(())
    }

    fn insert_text_row(
        &self,
        order: &OrderId,
        line_index: usize,
        _record: &TextRecord,
    ) -> PadforgeResult<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| PadforgeError::store("backend lock poisoned"))?;
        state.text_rows.push((order.clone(), line_index));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::pricing::PriceBreakdown;
    use crate::catalog::size::PadSize;
    use crate::design::document::{DesignDocument, LogoState};
    use crate::design::snapshot::SceneSnapshot;
    use crate::foundation::color::Color;
    use crate::store::MemoryStore;

    fn customer() -> CustomerInfo {
        CustomerInfo {
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            phone: "555 0100".to_string(),
            address: "Calle 1 #2-3".to_string(),
            city: "Bogota".to_string(),
            notes: None,
            lat_lng: None,
        }
    }

    fn empty_doc() -> DesignDocument {
        DesignDocument {
            size: PadSize::W60H30,
            background: Color::rgb(20, 20, 20),
            images: vec![],
            texts: vec![],
            logo: LogoState {
                removed: true,
                ..LogoState::default()
            },
            rgb: false,
            pricing: PriceBreakdown::compute(true, false),
            preview: None,
            scene: SceneSnapshot {
                width: 960,
                height: 480,
                background: Color::rgb(20, 20, 20),
                layers: vec![],
            },
        }
    }

    #[test]
    fn customer_validation() {
        assert!(customer().validate().is_ok());
        let mut bad = customer();
        bad.email = "nope".to_string();
        assert!(bad.validate().is_err());
        bad = customer();
        bad.city = "  ".to_string();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn empty_cart_is_rejected() {
        let backend = MemoryOrderBackend::new();
        let store = MemoryStore::new();
        let fonts = FontCatalog::new();
        let err = submit_order(&Cart::new(), &customer(), &backend, None, &fonts, &store);
        assert!(err.is_err());
        assert_eq!(backend.order_count(), 0);
    }

    #[test]
    fn submit_renders_and_records_each_line() {
        let backend = MemoryOrderBackend::new();
        let store = MemoryStore::new();
        let fonts = FontCatalog::new();
        let mut cart = Cart::new();
        cart.add(empty_doc()).unwrap();

        let receipt = submit_order(&cart, &customer(), &backend, None, &fonts, &store).unwrap();
        assert!(receipt.fully_printed());
        assert_eq!(backend.order_count(), 1);
        assert_eq!(backend.line_count(), 1);
        match &receipt.lines[0].status {
            LineStatus::Printed {
                raster_path,
                width,
                height,
            } => {
                assert_eq!((*width, *height), (4800, 2400));
                assert!(backend.raster(raster_path).is_some());
            }
            other => panic!("unexpected status {other:?}"),
        }
    }

    /// Backend whose upload fails for one line index.
    struct FlakyBackend {
        inner: MemoryOrderBackend,
        fail_line: usize,
    }

    impl OrderBackend for FlakyBackend {
        fn insert_order(&self, customer: &CustomerInfo, total: u64) -> PadforgeResult<OrderId> {
            self.inner.insert_order(customer, total)
        }

        fn upload_raster(
            &self,
            order: &OrderId,
            line_index: usize,
            png: &[u8],
        ) -> PadforgeResult<String> {
            if line_index == self.fail_line {
                return Err(PadforgeError::store("upload rejected"));
            }
            self.inner.upload_raster(order, line_index, png)
        }

        fn insert_line(&self, order: &OrderId, line: &OrderLine) -> PadforgeResult<()> {
            self.inner.insert_line(order, line)
        }

        fn insert_image_row(
            &self,
            order: &OrderId,
            line_index: usize,
            record: &ImageRecord,
        ) -> PadforgeResult<()> {
            self.inner.insert_image_row(order, line_index, record)
        }

        fn insert_text_row(
            &self,
            order: &OrderId,
            line_index: usize,
            record: &TextRecord,
        ) -> PadforgeResult<()> {
            self.inner.insert_text_row(order, line_index, record)
        }
    }

    #[test]
    fn line_failure_does_not_sink_the_order() {
        let backend = FlakyBackend {
            inner: MemoryOrderBackend::new(),
            fail_line: 0,
        };
        let store = MemoryStore::new();
        let fonts = FontCatalog::new();
        let mut cart = Cart::new();
        cart.add(empty_doc()).unwrap();
        cart.add(empty_doc()).unwrap();

        let receipt = submit_order(&cart, &customer(), &backend, None, &fonts, &store).unwrap();
        assert!(!receipt.fully_printed());
        assert!(matches!(receipt.lines[0].status, LineStatus::Failed { .. }));
        assert!(matches!(receipt.lines[1].status, LineStatus::Printed { .. }));
        // Header exists, only the surviving line was recorded.
        assert_eq!(backend.inner.order_count(), 1);
        assert_eq!(backend.inner.line_count(), 1);
    }
}
