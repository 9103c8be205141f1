//! Invoice PDF rendering.
//!
//! Pure function from invoice data to PDF bytes; callers run it on the
//! blocking pool. A4 portrait, built-in Helvetica, bottom-left origin.

use crate::error::AppError;
use crate::models::{BusinessProfile, Client, Invoice, InvoiceItem};
use crate::services::currency::currency_symbol;
use printpdf::{BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point};
use std::io::BufWriter;

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN: f32 = 18.0;

fn push_line(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    text: &str,
    font_size: f32,
    x: f32,
    y: f32,
) {
    layer.use_text(text, font_size, Mm(x), Mm(y), font);
}

fn draw_rule(layer: &PdfLayerReference, x1: f32, x2: f32, y: f32) {
    layer.set_outline_thickness(0.4);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(x1), Mm(y)), false),
            (Point::new(Mm(x2), Mm(y)), false),
        ],
        is_closed: false,
    });
}

/// Render an invoice to PDF bytes.
pub fn render_invoice(
    invoice: &Invoice,
    items: &[InvoiceItem],
    client: &Client,
    profile: &BusinessProfile,
) -> Result<Vec<u8>, AppError> {
    let title = format!("Invoice {}", invoice.invoice_number);
    let (doc, page1, layer1) = PdfDocument::new(&title, Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
    let layer = doc.get_page(page1).get_layer(layer1);

    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("PDF font error: {}", e)))?;
    let font_bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("PDF font error: {}", e)))?;

    let symbol = currency_symbol(&invoice.currency);
    let right_x = PAGE_W - MARGIN;
    let mut y = PAGE_H - MARGIN;

    // Header: issuing business on the left, invoice identity on the right.
    push_line(&layer, &font_bold, &profile.business_name, 16.0, MARGIN, y);
    push_line(&layer, &font_bold, "INVOICE", 16.0, right_x - 34.0, y);
    y -= 7.0;
    push_line(&layer, &font, &profile.business_email, 9.0, MARGIN, y);
    push_line(
        &layer,
        &font,
        &invoice.invoice_number,
        10.0,
        right_x - 34.0,
        y,
    );
    y -= 5.0;
    push_line(
        &layer,
        &font,
        &format!(
            "{} {}",
            profile.phone_country_code, profile.phone_number
        ),
        9.0,
        MARGIN,
        y,
    );
    push_line(
        &layer,
        &font,
        &format!("Status: {}", invoice.status),
        9.0,
        right_x - 34.0,
        y,
    );
    y -= 5.0;
    push_line(&layer, &font, &profile.street_address, 9.0, MARGIN, y);
    y -= 5.0;
    push_line(
        &layer,
        &font,
        &format!(
            "{}, {} {}",
            profile.city, profile.state_province, profile.zip_postal_code
        ),
        9.0,
        MARGIN,
        y,
    );
    y -= 5.0;
    push_line(&layer, &font, &profile.country, 9.0, MARGIN, y);

    y -= 10.0;
    draw_rule(&layer, MARGIN, right_x, y);
    y -= 8.0;

    // Bill-to block and dates.
    push_line(&layer, &font_bold, "Bill To:", 10.0, MARGIN, y);
    push_line(
        &layer,
        &font,
        &format!(
            "Date: {}",
            invoice.created_timestamp.format("%B %d, %Y")
        ),
        9.0,
        right_x - 60.0,
        y,
    );
    y -= 5.0;
    push_line(&layer, &font, &client.name, 10.0, MARGIN, y);
    push_line(
        &layer,
        &font,
        &format!("Due Date: {}", invoice.due_date.format("%B %d, %Y")),
        9.0,
        right_x - 60.0,
        y,
    );
    y -= 5.0;
    push_line(&layer, &font, &client.email, 9.0, MARGIN, y);
    y -= 5.0;
    if !client.street_address.is_empty() {
        push_line(&layer, &font, &client.street_address, 9.0, MARGIN, y);
        y -= 5.0;
    }
    let client_locality = format!(
        "{}, {} {}",
        client.city, client.state_province, client.zip_postal_code
    );
    if client_locality.trim() != "," {
        push_line(&layer, &font, &client_locality, 9.0, MARGIN, y);
        y -= 5.0;
    }

    y -= 8.0;

    // Items table.
    let qty_x = right_x - 76.0;
    let price_x = right_x - 52.0;
    let total_x = right_x - 26.0;

    push_line(&layer, &font_bold, "Description", 9.0, MARGIN, y);
    push_line(&layer, &font_bold, "Qty", 9.0, qty_x, y);
    push_line(&layer, &font_bold, "Unit Price", 9.0, price_x, y);
    push_line(&layer, &font_bold, "Amount", 9.0, total_x, y);
    y -= 2.0;
    draw_rule(&layer, MARGIN, right_x, y);
    y -= 6.0;

    for item in items {
        push_line(&layer, &font, &item.description, 9.0, MARGIN, y);
        push_line(&layer, &font, &item.quantity.to_string(), 9.0, qty_x, y);
        push_line(
            &layer,
            &font,
            &format!("{}{}", symbol, item.unit_price),
            9.0,
            price_x,
            y,
        );
        push_line(
            &layer,
            &font,
            &format!("{}{}", symbol, item.line_total),
            9.0,
            total_x,
            y,
        );
        y -= 6.0;
    }

    y -= 2.0;
    draw_rule(&layer, qty_x, right_x, y);
    y -= 6.0;

    // Totals column.
    push_line(&layer, &font, "Subtotal:", 9.0, price_x, y);
    push_line(
        &layer,
        &font,
        &format!("{}{}", symbol, invoice.subtotal),
        9.0,
        total_x,
        y,
    );
    y -= 5.0;
    push_line(
        &layer,
        &font,
        &format!("Tax ({}%):", invoice.tax_rate),
        9.0,
        price_x,
        y,
    );
    push_line(
        &layer,
        &font,
        &format!("{}{}", symbol, invoice.tax_amount),
        9.0,
        total_x,
        y,
    );
    y -= 5.0;
    push_line(&layer, &font, "Discount:", 9.0, price_x, y);
    push_line(
        &layer,
        &font,
        &format!("-{}{}", symbol, invoice.discount_amount),
        9.0,
        total_x,
        y,
    );
    y -= 2.0;
    draw_rule(&layer, price_x, right_x, y);
    y -= 6.0;
    push_line(&layer, &font_bold, "TOTAL:", 11.0, price_x, y);
    push_line(
        &layer,
        &font_bold,
        &format!("{}{}", symbol, invoice.total_amount),
        11.0,
        total_x,
        y,
    );

    // Notes, when present.
    if !invoice.notes.trim().is_empty() {
        y -= 14.0;
        push_line(&layer, &font_bold, "Notes:", 9.0, MARGIN, y);
        y -= 5.0;
        for line in invoice.notes.lines() {
            push_line(&layer, &font, line, 9.0, MARGIN, y);
            y -= 4.4;
        }
    }

    push_line(
        &layer,
        &font,
        "Thank you for your business!",
        8.0,
        MARGIN,
        10.0,
    );

    let mut writer = BufWriter::new(Vec::<u8>::new());
    doc.save(&mut writer)
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("PDF save error: {}", e)))?;
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("PDF buffer error: {}", e)))?;

    Ok(bytes)
}

/// Attachment filename for a rendered invoice.
pub fn pdf_filename(invoice: &Invoice) -> String {
    format!("Invoice-{}.pdf", invoice.invoice_number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InvoiceStatus;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn fixtures() -> (Invoice, Vec<InvoiceItem>, Client, BusinessProfile) {
        let user_id = Uuid::new_v4();
        let client_id = Uuid::new_v4();
        let invoice_id = Uuid::new_v4();
        let invoice = Invoice {
            invoice_id,
            user_id,
            client_id,
            invoice_number: "INV-00042".to_string(),
            status: InvoiceStatus::Sent.as_str().to_string(),
            currency: "EUR".to_string(),
            due_date: Utc::now(),
            subtotal: dec!(120.00),
            tax_rate: dec!(10),
            tax_amount: dec!(12.00),
            discount_amount: dec!(2.00),
            total_amount: dec!(130.00),
            notes: "Payment due within 30 days.\nWire transfer preferred.".to_string(),
            pdf_generated: false,
            created_timestamp: Utc::now(),
            last_modified_timestamp: Utc::now(),
        };
        let items = vec![
            InvoiceItem {
                item_id: Uuid::new_v4(),
                invoice_id,
                description: "Design work".to_string(),
                quantity: dec!(10),
                unit_price: dec!(10.00),
                line_total: dec!(100.00),
                order_position: 0,
            },
            InvoiceItem {
                item_id: Uuid::new_v4(),
                invoice_id,
                description: "Hosting".to_string(),
                quantity: dec!(1),
                unit_price: dec!(20.00),
                line_total: dec!(20.00),
                order_position: 1,
            },
        ];
        let client = Client {
            client_id,
            user_id,
            name: "Acme Corp".to_string(),
            email: "billing@acme.test".to_string(),
            phone: "5550100".to_string(),
            street_address: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            state_province: "IL".to_string(),
            zip_postal_code: "62701".to_string(),
            country: "USA".to_string(),
            created_utc: Utc::now(),
        };
        let profile = BusinessProfile {
            user_id,
            business_name: "Studio North".to_string(),
            business_email: "owner@studionorth.test".to_string(),
            phone_country_code: "+1".to_string(),
            phone_number: "5550101".to_string(),
            street_address: "9 Oak Ave".to_string(),
            city: "Portland".to_string(),
            state_province: "OR".to_string(),
            zip_postal_code: "97201".to_string(),
            country: "USA".to_string(),
            preferred_currency: "USD".to_string(),
            logo_path: None,
            created_utc: Utc::now(),
            updated_utc: Utc::now(),
        };
        (invoice, items, client, profile)
    }

    #[test]
    fn renders_nonempty_pdf() {
        let (invoice, items, client, profile) = fixtures();
        let bytes = render_invoice(&invoice, &items, &client, &profile).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500);
    }

    #[test]
    fn renders_with_no_items_or_notes() {
        let (mut invoice, _, client, profile) = fixtures();
        invoice.notes = String::new();
        let bytes = render_invoice(&invoice, &[], &client, &profile).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn filename_embeds_invoice_number() {
        let (invoice, _, _, _) = fixtures();
        assert_eq!(pdf_filename(&invoice), "Invoice-INV-00042.pdf");
    }
}
