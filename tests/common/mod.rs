// Shared helpers for building small picking-list PDFs in memory.

#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// A piece of text placed at `(x, y)` in PDF user space (origin bottom-left).
pub struct Placed<'a> {
    pub x: f32,
    pub y: f32,
    pub text: &'a str,
}

pub fn at(x: f32, y: f32, text: &str) -> Placed<'_> {
    Placed { x, y, text }
}

/// Build an A4 PDF with one page per entry of `pages`, every string set in
/// 10pt Helvetica.
pub fn build_pdf(pages: &[Vec<Placed<'_>>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for placed in pages {
        let mut operations = Vec::new();
        for p in placed {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 10.into()]));
            operations.push(Operation::new("Td", vec![p.x.into(), p.y.into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(p.text)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// One page with a `Seller SKU | Qty | Order ID` table and a printed total.
///
/// Rows are `(seller SKU, quantity, order id)`.
pub fn picking_table(rows: &[(&str, &str, &str)], printed_total: Option<u32>) -> Vec<u8> {
    let total_line = printed_total.map(|n| format!("Item quantity: {n}"));

    let mut page = vec![
        at(60.0, 800.0, "Picking List"),
        at(60.0, 760.0, "Seller SKU"),
        at(300.0, 760.0, "Qty"),
        at(360.0, 760.0, "Order ID"),
    ];
    let mut y = 740.0;
    for (sku, qty, order) in rows {
        page.push(at(60.0, y, sku));
        page.push(at(305.0, y, qty));
        page.push(at(360.0, y, order));
        y -= 20.0;
    }
    if let Some(line) = &total_line {
        page.push(at(60.0, y - 20.0, line));
    }

    build_pdf(&[page])
}
