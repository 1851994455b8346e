//! # Validation Module
//!
//! Input validation for Stockbook requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Web form                                                     │
//! │  └── Empty fields, immediate feedback                                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: stockbook-app action                                         │
//! │  ├── Deserialization                                                   │
//! │  └── THIS MODULE: field + request rules, before any storage access     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── CHECK (quantity >= 0)                                             │
//! │  ├── UNIQUE (tenant_id, invoice_number)                                │
//! │  └── Foreign keys                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stock availability is NOT checked here; that needs a fresh read and lives
//! in [`crate::stock`].

use crate::error::ValidationError;
use crate::types::{
    DeductRequest, InvoiceLine, NewCategory, NewClient, NewDestination, NewInvoice, NewProduct,
    ProductUpdate, ReplenishRequest, StockLine, TransactionKind,
};
use crate::{MAX_LINES_PER_REQUEST, MAX_PRICE_CENTS, MAX_STOCK_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 200;
const MAX_TEXT_LEN: usize = 1000;
const MAX_INVOICE_NUMBER_LEN: usize = 40;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name (product, client, destination, category).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 200 characters
///
/// ## Example
/// ```rust
/// use stockbook_core::validation::validate_name;
///
/// assert!(validate_name("name", "Paracetamol 500mg").is_ok());
/// assert!(validate_name("name", "   ").is_err());
/// ```
pub fn validate_name(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates optional free text (notes, descriptions, addresses).
pub fn validate_text(field: &str, value: &str) -> ValidationResult<()> {
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_TEXT_LEN,
        });
    }
    Ok(())
}

/// Validates a product name search query and returns it trimmed.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

/// Validates an email address.
///
/// Deliberately loose: one `@`, something on both sides, a dot in the domain.
///
/// ```rust
/// use stockbook_core::validation::validate_email;
///
/// assert!(validate_email("owner@pharmacy.example").is_ok());
/// assert!(validate_email("owner@localhost").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::required("email"));
    }

    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: reason.to_string(),
    };

    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| invalid("missing @"))?;

    if local.is_empty() || domain.contains('@') || email.contains(char::is_whitespace) {
        return Err(invalid("not an email address"));
    }

    match domain.split_once('.') {
        Some((host, tld)) if !host.is_empty() && !tld.is_empty() => Ok(()),
        _ => Err(invalid("domain must contain a dot")),
    }
}

/// Trims and lower-cases an email so one principal maps to one tenant.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validates a caller-supplied invoice number.
///
/// ## Rules
/// - Not empty, at most 40 characters
/// - Letters, digits, `-`, `_` and `/` only
pub fn validate_invoice_number(number: &str) -> ValidationResult<()> {
    let number = number.trim();

    if number.is_empty() {
        return Err(ValidationError::required("invoice_number"));
    }

    if number.len() > MAX_INVOICE_NUMBER_LEN {
        return Err(ValidationError::TooLong {
            field: "invoice_number".to_string(),
            max: MAX_INVOICE_NUMBER_LEN,
        });
    }

    if !number
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "invoice_number".to_string(),
            reason: "must contain only letters, digits, '-', '_' and '/'".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity leaving stock: strictly positive.
///
/// No upper bound; asking for more than is on hand is an
/// `InsufficientStock` refusal from the planner, not an input error.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::must_be_positive("quantity"));
    }
    Ok(())
}

/// Validates a quantity entering stock: 1..=[`MAX_STOCK_QUANTITY`].
pub fn validate_entry_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::must_be_positive("quantity"));
    }
    if qty > MAX_STOCK_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_STOCK_QUANTITY,
        });
    }
    Ok(())
}

/// Validates an opening stock quantity (zero allowed).
pub fn validate_opening_quantity(qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "opening_quantity".to_string(),
        });
    }
    if qty > MAX_STOCK_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "opening_quantity".to_string(),
            min: 0,
            max: MAX_STOCK_QUANTITY,
        });
    }
    Ok(())
}

/// Validates a price in minor units. Zero is allowed.
///
/// ```rust
/// use stockbook_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents("sale_price", 0).is_ok());
/// assert!(validate_price_cents("sale_price", -1).is_err());
/// assert!(validate_price_cents("sale_price", i64::MAX).is_err());
/// ```
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    if cents > MAX_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }
    Ok(())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }
    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string.
///
/// ```rust
/// use stockbook_core::validation::validate_uuid;
///
/// assert!(validate_uuid("product_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("product_id", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required(field));
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

fn validate_optional_uuid(field: &str, id: Option<&str>) -> ValidationResult<()> {
    match id {
        Some(id) => validate_uuid(field, id),
        None => Ok(()),
    }
}

// =============================================================================
// Request Validators
// =============================================================================

fn validate_line_count(field: &str, count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::required(field));
    }
    if count > MAX_LINES_PER_REQUEST {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_LINES_PER_REQUEST as i64,
        });
    }
    Ok(())
}

fn validate_stock_lines(lines: &[StockLine]) -> ValidationResult<()> {
    validate_line_count("items", lines.len())?;
    for line in lines {
        validate_uuid("product_id", &line.product_id)?;
        validate_quantity(line.quantity)?;
    }
    Ok(())
}

/// Validates a stock exit before the database is touched.
///
/// ## Rules
/// - 1..=200 items, each with a valid product id and quantity > 0
/// - `kind` is SALE or RETURN
/// - A destination is required (invoiced exits go through invoicing instead)
pub fn validate_deduct_request(req: &DeductRequest) -> ValidationResult<()> {
    validate_stock_lines(&req.items)?;

    if !req.kind.is_outbound() {
        return Err(ValidationError::NotAllowed {
            field: "kind".to_string(),
            allowed: vec![
                TransactionKind::Sale.to_string(),
                TransactionKind::Return.to_string(),
            ],
        });
    }

    match req.destination_id.as_deref() {
        Some(id) => validate_uuid("destination_id", id)?,
        None => return Err(ValidationError::required("destination_id")),
    }

    if let Some(note) = &req.note {
        validate_text("note", note)?;
    }

    Ok(())
}

/// Validates the lines of a read-only stock preview.
pub fn validate_preview_lines(lines: &[StockLine]) -> ValidationResult<()> {
    validate_stock_lines(lines)
}

pub fn validate_replenish_request(req: &ReplenishRequest) -> ValidationResult<()> {
    validate_uuid("product_id", &req.product_id)?;
    validate_entry_quantity(req.quantity)?;
    if let Some(cost) = req.new_unit_cost_cents {
        validate_price_cents("new_unit_cost", cost)?;
    }
    if let Some(note) = &req.note {
        validate_text("note", note)?;
    }
    Ok(())
}

fn validate_invoice_lines(lines: &[InvoiceLine]) -> ValidationResult<()> {
    validate_line_count("lines", lines.len())?;
    for line in lines {
        validate_uuid("product_id", &line.product_id)?;
        validate_quantity(line.quantity)?;
        if let Some(price) = line.unit_price_cents {
            validate_price_cents("unit_price", price)?;
        }
    }
    Ok(())
}

pub fn validate_new_invoice(req: &NewInvoice) -> ValidationResult<()> {
    validate_uuid("client_id", &req.client_id)?;
    validate_invoice_lines(&req.lines)?;
    validate_tax_rate_bps(req.tax_rate_bps)?;
    if let Some(number) = &req.invoice_number {
        validate_invoice_number(number)?;
    }
    validate_optional_uuid("destination_id", req.destination_id.as_deref())
}

pub fn validate_new_product(req: &NewProduct) -> ValidationResult<()> {
    validate_name("name", &req.name)?;
    validate_name("unit", &req.unit)?;
    validate_opening_quantity(req.opening_quantity)?;
    validate_price_cents("sale_price", req.sale_price_cents)?;
    validate_price_cents("purchase_price", req.purchase_price_cents)?;
    validate_optional_uuid("category_id", req.category_id.as_deref())?;
    if let Some(url) = &req.image_url {
        validate_image_url(url)?;
    }
    Ok(())
}

pub fn validate_product_update(req: &ProductUpdate) -> ValidationResult<()> {
    validate_name("name", &req.name)?;
    validate_name("unit", &req.unit)?;
    validate_price_cents("sale_price", req.sale_price_cents)?;
    validate_price_cents("purchase_price", req.purchase_price_cents)?;
    validate_optional_uuid("category_id", req.category_id.as_deref())
}

/// Image URLs point at object storage; only http(s) is accepted.
pub fn validate_image_url(url: &str) -> ValidationResult<()> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ValidationError::required("image_url"));
    }
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(ValidationError::InvalidFormat {
            field: "image_url".to_string(),
            reason: "must be an http(s) URL".to_string(),
        });
    }
    validate_text("image_url", url)
}

pub fn validate_new_client(req: &NewClient) -> ValidationResult<()> {
    validate_name("name", &req.name)?;

    if req.address.trim().is_empty() {
        return Err(ValidationError::required("address"));
    }
    validate_text("address", &req.address)?;

    if let Some(email) = req.email.as_deref().filter(|e| !e.trim().is_empty()) {
        validate_email(email)?;
    }
    if let Some(phone) = &req.phone {
        validate_text("phone", phone)?;
    }
    Ok(())
}

pub fn validate_new_destination(req: &NewDestination) -> ValidationResult<()> {
    validate_name("name", &req.name)?;
    if let Some(description) = &req.description {
        validate_text("description", description)?;
    }
    Ok(())
}

pub fn validate_new_category(req: &NewCategory) -> ValidationResult<()> {
    validate_name("name", &req.name)?;
    validate_optional_uuid("parent_id", req.parent_id.as_deref())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "550e8400-e29b-41d4-a716-446655440000";

    fn deduct(items: Vec<StockLine>, kind: TransactionKind) -> DeductRequest {
        DeductRequest {
            items,
            destination_id: Some(ID.to_string()),
            kind,
            note: None,
        }
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("name", "Gauze 10cm").is_ok());
        assert!(validate_name("name", "").is_err());
        assert!(validate_name("name", &"A".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("a@@b.co").is_err());
        assert!(validate_email("@b.co").is_err());
        assert_eq!(normalize_email("  Owner@Shop.COM "), "owner@shop.com");
    }

    #[test]
    fn test_validate_invoice_number() {
        assert!(validate_invoice_number("INV-000001").is_ok());
        assert!(validate_invoice_number("2026/07").is_ok());
        assert!(validate_invoice_number("").is_err());
        assert!(validate_invoice_number("INV 1").is_err());
    }

    #[test]
    fn test_numeric_validators() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(1_000_000).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        // Exits are only bounded by stock on hand
        assert!(validate_quantity(i64::MAX).is_ok());

        assert!(validate_entry_quantity(MAX_STOCK_QUANTITY).is_ok());
        assert!(matches!(
            validate_entry_quantity(i64::MAX),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(validate_opening_quantity(MAX_STOCK_QUANTITY + 1).is_err());

        assert!(validate_price_cents("unit_price", MAX_PRICE_CENTS).is_ok());
        assert!(matches!(
            validate_price_cents("unit_price", i64::MAX),
            Err(ValidationError::OutOfRange { .. })
        ));

        assert!(validate_tax_rate_bps(10000).is_ok());
        assert!(validate_tax_rate_bps(10001).is_err());
    }

    #[test]
    fn test_deduct_request_rules() {
        assert!(validate_deduct_request(&deduct(vec![StockLine::new(ID, 2)], TransactionKind::Sale)).is_ok());
        assert!(validate_deduct_request(&deduct(vec![StockLine::new(ID, 2)], TransactionKind::Return)).is_ok());

        // Empty
        assert!(matches!(
            validate_deduct_request(&deduct(vec![], TransactionKind::Sale)),
            Err(ValidationError::Required { .. })
        ));

        // Inbound kind
        assert!(matches!(
            validate_deduct_request(&deduct(vec![StockLine::new(ID, 1)], TransactionKind::Purchase)),
            Err(ValidationError::NotAllowed { .. })
        ));

        // Zero quantity
        assert!(validate_deduct_request(&deduct(vec![StockLine::new(ID, 0)], TransactionKind::Sale)).is_err());

        // Missing destination
        let mut req = deduct(vec![StockLine::new(ID, 1)], TransactionKind::Sale);
        req.destination_id = None;
        match validate_deduct_request(&req) {
            Err(ValidationError::Required { field }) => assert_eq!(field, "destination_id"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_too_many_lines() {
        let items = vec![StockLine::new(ID, 1); MAX_LINES_PER_REQUEST + 1];
        assert!(matches!(
            validate_deduct_request(&deduct(items, TransactionKind::Sale)),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_new_invoice_rules() {
        let mut req = NewInvoice {
            invoice_number: None,
            client_id: ID.to_string(),
            lines: vec![InvoiceLine::new(ID, 1)],
            tax_rate_bps: 2000,
            tax_enabled: true,
            status: Default::default(),
            destination_id: None,
        };
        assert!(validate_new_invoice(&req).is_ok());

        req.lines.clear();
        assert!(validate_new_invoice(&req).is_err());

        req.lines = vec![InvoiceLine::priced(ID, 1, -5)];
        assert!(validate_new_invoice(&req).is_err());
    }

    #[test]
    fn test_new_client_requires_address() {
        let mut req = NewClient {
            name: "Clinic".to_string(),
            email: Some(String::new()),
            phone: None,
            address: "  ".to_string(),
        };
        assert!(validate_new_client(&req).is_err());

        req.address = "12 Harbour Rd".to_string();
        assert!(validate_new_client(&req).is_ok());

        req.email = Some("bad".to_string());
        assert!(validate_new_client(&req).is_err());
    }

    #[test]
    fn test_new_product_rules() {
        let mut req = NewProduct {
            name: "Aspirin".to_string(),
            unit: "box".to_string(),
            opening_quantity: 0,
            sale_price_cents: 500,
            purchase_price_cents: 300,
            category_id: None,
            image_url: Some("https://cdn.example.com/a.png".to_string()),
        };
        assert!(validate_new_product(&req).is_ok());

        req.opening_quantity = -1;
        assert!(validate_new_product(&req).is_err());

        req.opening_quantity = 5;
        req.image_url = Some("ftp://x".to_string());
        assert!(validate_new_product(&req).is_err());
    }
}
