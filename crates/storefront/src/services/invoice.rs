//! Invoice generation.
//!
//! An invoice is derived on demand from an immutable order and rendered as a
//! PDF in a single forward pass: objects are emitted sequentially, byte
//! offsets are tracked as they go out, and the cross-reference table is
//! written last. No stage buffers the whole document, so the same chunks can
//! be fanned out to two sinks at once - the durable file under the invoice
//! directory and the HTTP response body. Either sink may die mid-document
//! (disk full, client gone) without stopping the other.
//!
//! Because orders never change after creation, rendering the same order
//! twice produces byte-identical documents.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use tokio::sync::mpsc;

use tangelo_core::{OrderId, UserId};

use crate::models::Order;

/// Buffered chunks between the rendering task and the HTTP body.
const CHANNEL_CAPACITY: usize = 8;

/// File name of the invoice for an order.
#[must_use]
pub fn filename(order_id: OrderId) -> String {
    format!("invoice-{order_id}.pdf")
}

/// Whether a user may read this order's invoice.
#[must_use]
pub fn owned_by(order: &Order, user_id: UserId) -> bool {
    order.user.user_id == user_id
}

/// Render an order's invoice on a blocking task.
///
/// Identical bytes go to the durable file at `path` and to the returned
/// channel. A failed file open/write degrades to streaming-only with a
/// warning; a dropped receiver (client disconnect) lets the file write run
/// to completion.
pub fn spawn_render(order: Order, path: PathBuf) -> mpsc::Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

    tokio::task::spawn_blocking(move || {
        let durable = open_durable(&path);
        let mut sink = FanoutSink::new(ChannelSink::new(tx), durable);

        match render(&order, &mut sink).and_then(|()| sink.flush()) {
            Ok(()) => tracing::debug!(order_id = %order.id, "invoice rendered"),
            Err(e) => tracing::warn!(order_id = %order.id, error = %e, "invoice rendering aborted"),
        }
    });

    rx
}

/// Open the durable sink, creating the invoice directory if needed.
fn open_durable(path: &Path) -> Option<File> {
    let result = path
        .parent()
        .map_or(Ok(()), std::fs::create_dir_all)
        .and_then(|()| File::create(path));

    match result {
        Ok(file) => Some(file),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "cannot open durable invoice sink, streaming to client only"
            );
            None
        }
    }
}

// =============================================================================
// Sinks
// =============================================================================

/// Adapts the chunk channel to `io::Write` for the rendering task.
pub struct ChannelSink {
    tx: mpsc::Sender<Vec<u8>>,
}

impl ChannelSink {
    #[must_use]
    pub const fn new(tx: mpsc::Sender<Vec<u8>>) -> Self {
        Self { tx }
    }
}

impl Write for ChannelSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.tx
            .blocking_send(buf.to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "client disconnected"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes every chunk to both sinks.
///
/// A sink that fails is logged and dropped; writing only errors once no
/// sink is left to receive bytes. Invoice delivery to the user and the
/// durable copy each survive the other's failure.
pub struct FanoutSink<C: Write, D: Write> {
    client: Option<C>,
    durable: Option<D>,
}

impl<C: Write, D: Write> FanoutSink<C, D> {
    #[must_use]
    pub const fn new(client: C, durable: Option<D>) -> Self {
        Self {
            client: Some(client),
            durable,
        }
    }
}

impl<C: Write, D: Write> Write for FanoutSink<C, D> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(client) = self.client.as_mut()
            && let Err(e) = client.write_all(buf)
        {
            tracing::warn!(error = %e, "client invoice stream closed, finishing durable copy");
            self.client = None;
        }

        if let Some(durable) = self.durable.as_mut()
            && let Err(e) = durable.write_all(buf)
        {
            tracing::warn!(error = %e, "durable invoice write failed, client stream continues");
            self.durable = None;
        }

        if self.client.is_none() && self.durable.is_none() {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "no invoice sink left",
            ));
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(client) = self.client.as_mut() {
            client.flush()?;
        }
        if let Some(durable) = self.durable.as_mut() {
            durable.flush()?;
        }
        Ok(())
    }
}

// =============================================================================
// PDF rendering
// =============================================================================

/// Render the invoice document for an order.
///
/// Single pass, no full-document buffer: every call on the writer goes
/// straight to the sink.
///
/// # Errors
///
/// Returns the sink's `io::Error` once no sink accepts bytes anymore.
pub fn render(order: &Order, sink: &mut impl Write) -> io::Result<()> {
    let mut w = PdfWriter::new(sink);

    w.emit(b"%PDF-1.4\n")?;

    // 1: document catalog
    w.begin_obj()?;
    w.emit(b"<< /Type /Catalog /Pages 2 0 R >>\nendobj\n")?;

    // 2: page tree
    w.begin_obj()?;
    w.emit(b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj\n")?;

    // 3: the single page, A4
    w.begin_obj()?;
    w.emit(
        b"<< /Type /Page /Parent 2 0 R /MediaBox [0 0 595 842] \
          /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>\nendobj\n",
    )?;

    // 4: built-in font
    w.begin_obj()?;
    w.emit(b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>\nendobj\n")?;

    // 5: content stream; length is an indirect reference so the stream can
    // be emitted before its size is known
    w.begin_obj()?;
    w.emit(b"<< /Length 6 0 R >>\nstream\n")?;

    let mut content_len: u64 = 0;
    let mut y: i32 = 790;

    w.text_line(&mut content_len, 50, y, 26, "Invoice")?;
    y -= 26;
    w.text_line(&mut content_len, 50, y, 12, &format!("Order #{}", order.id))?;
    y -= 16;
    w.text_line(
        &mut content_len,
        50,
        y,
        12,
        &format!("Date: {}", order.created_at.format("%Y-%m-%d")),
    )?;
    y -= 24;
    w.text_line(&mut content_len, 50, y, 14, "=======================")?;
    y -= 22;

    for line in &order.lines {
        let text = format!(
            "{} - {} x {:.2} EUR",
            line.product.title, line.quantity, line.product.price
        );
        w.text_line(&mut content_len, 50, y, 12, &text)?;
        y -= 18;
    }

    y -= 4;
    w.text_line(&mut content_len, 50, y, 14, "=======================")?;
    y -= 26;

    let total: Decimal = order.total();
    w.text_line(
        &mut content_len,
        50,
        y,
        20,
        &format!("Total price = {total:.2} EUR"),
    )?;

    w.emit(b"endstream\nendobj\n")?;

    // 6: content stream length
    w.begin_obj()?;
    w.emit(format!("{content_len}\nendobj\n").as_bytes())?;

    w.finish()
}

/// Sequential PDF object writer tracking byte offsets for the xref table.
struct PdfWriter<'a, W: Write> {
    sink: &'a mut W,
    offset: u64,
    object_offsets: Vec<u64>,
}

impl<'a, W: Write> PdfWriter<'a, W> {
    fn new(sink: &'a mut W) -> Self {
        Self {
            sink,
            offset: 0,
            object_offsets: Vec::new(),
        }
    }

    fn emit(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.sink.write_all(bytes)?;
        self.offset += bytes.len() as u64;
        Ok(())
    }

    /// Start the next numbered object at the current offset.
    fn begin_obj(&mut self) -> io::Result<()> {
        self.object_offsets.push(self.offset);
        let id = self.object_offsets.len();
        self.emit(format!("{id} 0 obj\n").as_bytes())
    }

    /// Emit one positioned text line into the open content stream.
    fn text_line(
        &mut self,
        content_len: &mut u64,
        x: i32,
        y: i32,
        size: u32,
        text: &str,
    ) -> io::Result<()> {
        let chunk = format!("BT /F1 {size} Tf {x} {y} Td ({}) Tj ET\n", escape_text(text));
        *content_len += chunk.len() as u64;
        self.emit(chunk.as_bytes())
    }

    /// Emit the xref table and trailer.
    fn finish(&mut self) -> io::Result<()> {
        let xref_offset = self.offset;
        let count = self.object_offsets.len() + 1;

        let mut xref = format!("xref\n0 {count}\n0000000000 65535 f \n");
        for off in &self.object_offsets {
            xref.push_str(&format!("{off:010} 00000 n \n"));
        }

        self.emit(xref.as_bytes())?;
        self.emit(
            format!("trailer\n<< /Size {count} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n")
                .as_bytes(),
        )
    }
}

/// Escape a string for a PDF literal string.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\\' => out.push_str("\\\\"),
            '\n' | '\r' => out.push(' '),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::str::FromStr;
    use tangelo_core::{Email, ProductId};

    use crate::models::{OrderLine, OrderUser, ProductSnapshot};

    fn order() -> Order {
        Order {
            id: OrderId::new(42),
            user: OrderUser {
                user_id: UserId::new(7),
                email: Email::parse("buyer@example.com").unwrap(),
            },
            lines: vec![
                OrderLine {
                    quantity: 2,
                    product: ProductSnapshot {
                        product_id: ProductId::new(1),
                        title: "Tangelo Crate".to_owned(),
                        price: Decimal::from_str("10.00").unwrap(),
                        description: "A crate of tangelos".to_owned(),
                        image_path: "crate.png".to_owned(),
                    },
                },
                OrderLine {
                    quantity: 1,
                    product: ProductSnapshot {
                        product_id: ProductId::new(2),
                        title: "Juicer (manual)".to_owned(),
                        price: Decimal::from_str("19.99").unwrap(),
                        description: "Squeeze".to_owned(),
                        image_path: "juicer.png".to_owned(),
                    },
                },
            ],
            created_at: Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap(),
        }
    }

    fn render_vec(order: &Order) -> Vec<u8> {
        let mut out = Vec::new();
        render(order, &mut out).unwrap();
        out
    }

    /// A sink that fails every write.
    struct FailingSink;

    impl Write for FailingSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_pdf_framing() {
        let bytes = render_vec(&order());
        assert!(bytes.starts_with(b"%PDF-1.4\n"));
        assert!(bytes.ends_with(b"%%EOF\n"));

        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("stream"));
        assert!(text.contains("endstream"));
        assert!(text.contains("/BaseFont /Helvetica"));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let order = order();
        assert_eq!(render_vec(&order), render_vec(&order));
    }

    #[test]
    fn test_contents_itemized_with_total() {
        let text = String::from_utf8_lossy(&render_vec(&order())).into_owned();

        assert!(text.contains("Order #42"));
        assert!(text.contains("Date: 2026-03-14"));
        assert!(text.contains("Tangelo Crate - 2 x 10.00 EUR"));
        // Parentheses in titles are escaped, not dropped.
        assert!(text.contains("Juicer \\(manual\\) - 1 x 19.99 EUR"));
        assert!(text.contains("Total price = 39.99 EUR"));
    }

    #[test]
    fn test_fanout_survives_durable_failure() {
        let order = order();
        let expected = render_vec(&order);

        let mut sink = FanoutSink::new(Vec::new(), Some(FailingSink));
        render(&order, &mut sink).unwrap();

        // Client bytes are complete and identical despite the dead durable sink.
        assert_eq!(sink.client.unwrap(), expected);
    }

    #[test]
    fn test_fanout_survives_client_loss() {
        let order = order();
        let expected = render_vec(&order);

        let mut sink = FanoutSink::new(FailingSink, Some(Vec::new()));
        render(&order, &mut sink).unwrap();

        assert_eq!(sink.durable.unwrap(), expected);
    }

    #[test]
    fn test_fanout_errors_once_both_sinks_are_gone() {
        let mut sink = FanoutSink::<FailingSink, FailingSink>::new(FailingSink, Some(FailingSink));
        let err = sink.write(b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_filename() {
        assert_eq!(filename(OrderId::new(42)), "invoice-42.pdf");
    }

    #[test]
    fn test_owned_by() {
        let order = order();
        assert!(owned_by(&order, UserId::new(7)));
        assert!(!owned_by(&order, UserId::new(8)));
    }
}
