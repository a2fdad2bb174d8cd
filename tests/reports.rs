use chrono::{NaiveDate, NaiveDateTime};
use lopdf::content::Content;
use lopdf::{Document, Object};
use rust_decimal::Decimal;
use std::fs;
use std::io::{Cursor, Read};
use std::path::PathBuf;
use tempfile::TempDir;
use zip::ZipArchive;

use pharmacy::client::ClientInput;
use pharmacy::error::{ErrorKind, PharmacyError};
use pharmacy::money::parse_amount;
use pharmacy::pdf::{FidelityPdf, InventoryPdf};
use pharmacy::report::{
    ClientFidelityRow, ExportFormat, FidelityFilter, FidelitySort, InventoryFilter, InventorySort,
    ReportConfig, ReportOptions, ReportRenderer, ReportRequest, ReportService, SortOrder,
};
use pharmacy::store::{CatalogRepository, ClientRepository, Database, NewMedicine, SaleRepository};
use pharmacy::xlsx::FidelityXlsx;

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn amount(raw: &str) -> Decimal {
    parse_amount(raw).unwrap()
}

struct Fixture {
    dir: TempDir,
    db: Database,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let db = Database::open(dir.path().join("test.db")).unwrap();
        Self { dir, db }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn client(&self, first: &str, last: &str) -> i32 {
        ClientRepository::new(self.db.clone())
            .create(
                &ClientInput {
                    first_name: first.to_string(),
                    last_name: last.to_string(),
                    nit: None,
                    email: None,
                },
                at(2024, 1, 1, 9, 0),
            )
            .unwrap()
            .id
    }

    fn sale(&self, client: i32, total: &str, when: NaiveDateTime) {
        SaleRepository::new(self.db.clone())
            .record(client, amount(total), when)
            .unwrap();
    }

    fn medicine(&self, name: &str, category: &str, stock: i64, price: &str, active: bool) {
        CatalogRepository::new(self.db.clone())
            .add_medicine(&NewMedicine {
                name: name.to_string(),
                description: None,
                category: category.to_string(),
                presentation: "Box".to_string(),
                stock_total: stock,
                unit_price: amount(price),
                active,
            })
            .unwrap();
    }

    fn service(&self) -> ReportService {
        ReportService::with_default_renderers(self.db.clone(), ReportOptions::default())
    }
}

fn request() -> ReportRequest {
    ReportRequest::new("tester", at(2025, 1, 10, 12, 0))
}

fn year_2024() -> FidelityFilter {
    FidelityFilter::new(date(2024, 1, 1), date(2024, 12, 31))
}

/// Two-letter surnames so generated clients pass name validation.
fn surname(i: usize) -> String {
    let first = (b'A' + (i / 26) as u8) as char;
    let second = (b'a' + (i % 26) as u8) as char;
    format!("{first}{second}")
}

fn page_texts(doc: &Document) -> Vec<Vec<String>> {
    doc.get_pages()
        .values()
        .map(|page_id| {
            let content = Content::decode(&doc.get_page_content(*page_id).unwrap()).unwrap();
            content
                .operations
                .iter()
                .filter(|op| op.operator == "Tj")
                .filter_map(|op| match op.operands.first() {
                    Some(Object::String(bytes, _)) => {
                        Some(String::from_utf8_lossy(bytes).into_owned())
                    }
                    _ => None,
                })
                .collect()
        })
        .collect()
}

#[test]
fn includes_clients_with_zero_spend() {
    let fx = Fixture::new();
    let ana = fx.client("Ana", "Rojas");
    let _luis = fx.client("Luis", "Vaca");
    let eva = fx.client("Eva", "Mendez");
    fx.sale(ana, "100", at(2024, 3, 1, 10, 0));
    fx.sale(ana, "50", at(2024, 3, 2, 10, 0));
    fx.sale(eva, "75.5", at(2024, 6, 1, 10, 0));

    let mut filter = year_2024();
    filter.sort = FidelitySort::TotalSpent;
    filter.order = SortOrder::Desc;
    let rows = fx.service().fidelity_rows(&filter, &request()).unwrap();

    let totals: Vec<Decimal> = rows.iter().map(|r| r.total_spent).collect();
    assert_eq!(totals, vec![amount("150"), amount("75.5"), Decimal::ZERO]);
    assert_eq!(rows[0].sales_count, 2);
    assert_eq!(rows[0].avg_ticket, amount("75"));
    assert_eq!(rows[0].last_sale, Some(at(2024, 3, 2, 10, 0)));
    assert_eq!(rows[2].full_name, "Luis Vaca");
    assert_eq!(rows[2].sales_count, 0);
    assert_eq!(rows[2].last_sale, None);
}

#[test]
fn min_total_filters_groups() {
    let fx = Fixture::new();
    let ana = fx.client("Ana", "Rojas");
    let eva = fx.client("Eva", "Mendez");
    fx.sale(ana, "150", at(2024, 3, 1, 10, 0));
    fx.sale(eva, "75.5", at(2024, 6, 1, 10, 0));

    let mut filter = year_2024();
    filter.min_total = amount("100");
    let rows = fx.service().fidelity_rows(&filter, &request()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].client_id, ana);
}

#[test]
fn min_total_includes_exact_matches() {
    let fx = Fixture::new();
    let ana = fx.client("Ana", "Rojas");
    let eva = fx.client("Eva", "Mendez");
    fx.sale(ana, "0.7", at(2024, 3, 1, 10, 0));
    fx.sale(ana, "0.1", at(2024, 3, 2, 10, 0));
    fx.sale(eva, "0.79", at(2024, 3, 3, 10, 0));

    let mut filter = year_2024();
    filter.min_total = amount("0.80");
    let rows = fx.service().fidelity_rows(&filter, &request()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].client_id, ana);
    assert_eq!(rows[0].total_spent, amount("0.8"));
    assert_eq!(rows[0].avg_ticket, amount("0.40"));
}

#[test]
fn window_is_inclusive_and_skips_deleted_records() {
    let fx = Fixture::new();
    let ana = fx.client("Ana", "Rojas");
    let gone = fx.client("Luis", "Vaca");
    fx.sale(ana, "10", at(2024, 1, 31, 23, 30));
    fx.sale(ana, "99", at(2024, 2, 1, 0, 0));
    fx.sale(ana, "5", at(2023, 12, 31, 23, 59));
    fx.sale(gone, "500", at(2024, 1, 15, 12, 0));
    ClientRepository::new(fx.db.clone())
        .soft_delete(gone, at(2024, 2, 1, 0, 0))
        .unwrap();

    let filter = FidelityFilter::new(date(2024, 1, 1), date(2024, 1, 31));
    let rows = fx.service().fidelity_rows(&filter, &request()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].client_id, ana);
    assert_eq!(rows[0].total_spent, amount("10"));
}

#[test]
fn caps_rows_without_top_n() {
    let fx = Fixture::new();
    for i in 0..105 {
        fx.client("Ana", &surname(i));
    }

    let rows = fx.service().fidelity_rows(&year_2024(), &request()).unwrap();
    assert_eq!(rows.len(), 100);
    assert_eq!(rows[0].full_name, "Ana Aa");
}

#[test]
fn top_n_ranks_by_total_regardless_of_sort() {
    let fx = Fixture::new();
    for (i, total) in ["30", "90", "10", "60"].into_iter().enumerate() {
        let id = fx.client("Ana", &surname(i));
        fx.sale(id, total, at(2024, 5, 1, 9, 0));
    }

    let mut filter = year_2024();
    filter.top_n = Some(3);
    filter.sort = FidelitySort::FullName;
    filter.order = SortOrder::Asc;
    let rows = fx.service().fidelity_rows(&filter, &request()).unwrap();
    let totals: Vec<Decimal> = rows.iter().map(|r| r.total_spent).collect();
    assert_eq!(totals, vec![amount("90"), amount("60"), amount("30")]);
}

#[test]
fn reversed_period_is_a_validation_error() {
    let fx = Fixture::new();
    let filter = FidelityFilter::new(date(2024, 2, 1), date(2024, 1, 1));

    let err = fx
        .service()
        .generate_fidelity(&filter, &request(), ExportFormat::Pdf)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    match err {
        PharmacyError::Validation(messages) => assert!(!messages.is_empty()),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn missing_logo_renders_placeholder() {
    let fx = Fixture::new();
    fx.client("Ana", "Rojas");

    let request = request().with_logo(Some(fx.path("no-such-logo.png")));
    let report = fx
        .service()
        .generate_fidelity(&year_2024(), &request, ExportFormat::Pdf)
        .unwrap();

    assert_eq!(report.mime_type, "application/pdf");
    assert_eq!(report.file_name, "ClientFidelityReport_20250110_120000.pdf");
    let doc = Document::load_mem(&report.bytes).unwrap();
    let texts = page_texts(&doc);
    assert!(texts[0].iter().any(|t| t == "LOGO"));
    assert!(texts[0].iter().any(|t| t == "Client Fidelity Report"));
    assert!(texts[0].iter().any(|t| t == "Ana Rojas"));
}

#[test]
fn embeds_a_readable_logo_and_skips_an_oversized_one() {
    let fx = Fixture::new();
    fx.client("Ana", "Rojas");

    let logo = fx.path("logo.png");
    image::RgbImage::from_pixel(8, 8, image::Rgb([20, 120, 200]))
        .save(&logo)
        .unwrap();
    let report = fx
        .service()
        .generate_fidelity(&year_2024(), &request().with_logo(Some(logo)), ExportFormat::Pdf)
        .unwrap();
    let doc = Document::load_mem(&report.bytes).unwrap();
    assert!(!page_texts(&doc)[0].iter().any(|t| t == "LOGO"));

    let huge = fx.path("huge.png");
    fs::write(&huge, vec![0u8; 5 * 1024 * 1024 + 1]).unwrap();
    let report = fx
        .service()
        .generate_fidelity(&year_2024(), &request().with_logo(Some(huge)), ExportFormat::Pdf)
        .unwrap();
    let doc = Document::load_mem(&report.bytes).unwrap();
    assert!(page_texts(&doc)[0].iter().any(|t| t == "LOGO"));
}

#[test]
fn corrupt_logo_renders_placeholder() {
    let fx = Fixture::new();
    fx.client("Ana", "Rojas");

    let corrupt = fx.path("corrupt.png");
    fs::write(&corrupt, b"\x89PNG\r\n\x1a\nthis is not really a png").unwrap();
    let report = fx
        .service()
        .generate_fidelity(&year_2024(), &request().with_logo(Some(corrupt)), ExportFormat::Pdf)
        .unwrap();
    let doc = Document::load_mem(&report.bytes).unwrap();
    let texts = page_texts(&doc);
    assert!(texts[0].iter().any(|t| t == "LOGO"));
    assert!(texts[0].iter().any(|t| t == "Ana Rojas"));
}

#[test]
fn long_reports_paginate_with_repeated_headers() {
    let fx = Fixture::new();
    for i in 0..90 {
        fx.client("Ana", &surname(i));
    }

    let report = fx
        .service()
        .generate_fidelity(&year_2024(), &request(), ExportFormat::Pdf)
        .unwrap();
    let doc = Document::load_mem(&report.bytes).unwrap();
    let pages = page_texts(&doc);
    assert!(pages.len() >= 2);

    let total = pages.len();
    for (i, texts) in pages.iter().enumerate() {
        assert!(texts.iter().any(|t| t == "Purchases"), "page {} lacks headers", i + 1);
        let footer = format!("Page {} of {}", i + 1, total);
        assert!(texts.contains(&footer), "page {} lacks footer", i + 1);
    }
    assert!(pages[total - 1].iter().any(|t| t == "Total spent"));
}

#[test]
fn rendering_is_deterministic() {
    let fx = Fixture::new();
    let ana = fx.client("Ana", "Rojas");
    fx.sale(ana, "42", at(2024, 8, 8, 8, 8));

    let service = fx.service();
    for format in [ExportFormat::Pdf, ExportFormat::Xlsx] {
        let first = service.generate_fidelity(&year_2024(), &request(), format).unwrap();
        let second = service.generate_fidelity(&year_2024(), &request(), format).unwrap();
        assert_eq!(first.bytes, second.bytes, "{format} output differs");
    }
}

#[test]
fn spreadsheet_is_a_zip_package() {
    let fx = Fixture::new();
    fx.client("Ana", "Rojas");

    let report = fx
        .service()
        .generate_fidelity(&year_2024(), &request(), ExportFormat::Xlsx)
        .unwrap();
    assert!(report.bytes.starts_with(b"PK"));
    assert!(report.file_name.ends_with(".xlsx"));
    assert_eq!(report.rows, 1);
}

#[test]
fn renderers_reject_rows_without_a_name() {
    let config = ReportConfig::new("Client Fidelity Report", year_2024(), at(2025, 1, 1, 0, 0));
    let rows = vec![ClientFidelityRow {
        client_id: 7,
        full_name: " ".to_string(),
        nit: None,
        sales_count: 0,
        total_spent: Decimal::ZERO,
        avg_ticket: Decimal::ZERO,
        last_sale: None,
    }];

    for result in [FidelityPdf.render(&config, &rows), FidelityXlsx.render(&config, &rows)] {
        match result {
            Err(PharmacyError::MissingField { row, field }) => {
                assert_eq!(row, 1);
                assert_eq!(field, "full_name");
            }
            other => panic!("unexpected result: {:?}", other.map(|b| b.len())),
        }
    }
}

#[test]
fn service_without_renderers_reports_the_format() {
    let fx = Fixture::new();
    let service = ReportService::new(fx.db.clone(), ReportOptions::default());
    let err = service
        .generate_fidelity(&year_2024(), &request(), ExportFormat::Xlsx)
        .unwrap_err();
    assert!(matches!(err, PharmacyError::RendererNotRegistered(ExportFormat::Xlsx)));
}

#[test]
fn inventory_groups_and_filters_medicines() {
    let fx = Fixture::new();
    fx.medicine("Paracetamol", "Analgesics", 5, "0.5", true);
    fx.medicine("Ibuprofen", "Analgesics", 40, "0.8", true);
    fx.medicine("Aspirin", "Analgesics", 200, "0.3", false);
    fx.medicine("Amoxicillin", "Antibiotics", 8, "1.2", true);
    let service = fx.service();

    let filter = InventoryFilter {
        sort: InventorySort::StockTotal,
        order: SortOrder::Desc,
        ..InventoryFilter::default()
    };
    let rows = service.inventory_rows(&filter).unwrap();
    let names: Vec<&str> = rows.iter().map(|r| r.medicine_name.as_str()).collect();
    assert_eq!(names, vec!["Aspirin", "Ibuprofen", "Paracetamol", "Amoxicillin"]);
    assert!(!rows[0].active);

    let low = InventoryFilter {
        only_low_stock: true,
        ..InventoryFilter::default()
    };
    let rows = service.inventory_rows(&low).unwrap();
    let names: Vec<&str> = rows.iter().map(|r| r.medicine_name.as_str()).collect();
    assert_eq!(names, vec!["Paracetamol", "Amoxicillin"]);

    let antibiotics = CatalogRepository::new(fx.db.clone())
        .find_category("ANTIBIOTICS")
        .unwrap()
        .unwrap();
    let priced = InventoryFilter {
        category_id: Some(antibiotics.id),
        min_price: Some(amount("1.20")),
        max_price: Some(amount("2")),
        ..InventoryFilter::default()
    };
    let rows = service.inventory_rows(&priced).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].medicine_name, "Amoxicillin");
}

#[test]
fn inventory_pdf_shows_categories_and_subtotals() {
    let fx = Fixture::new();
    fx.medicine("Paracetamol", "Analgesics", 5, "0.5", true);
    fx.medicine("Amoxicillin", "Antibiotics", 80, "1.25", true);

    let report = fx
        .service()
        .generate_inventory(&InventoryFilter::default(), &request(), ExportFormat::Pdf)
        .unwrap();
    assert_eq!(report.title, "Medicines by Category");
    assert!(report.file_name.starts_with("MedicinesByCategoryReport_"));

    let doc = Document::load_mem(&report.bytes).unwrap();
    let texts: Vec<String> = page_texts(&doc).into_iter().flatten().collect();
    assert!(texts.iter().any(|t| t == "Analgesics (1 medicines)"));
    assert!(texts.iter().any(|t| t == "Antibiotics (1 medicines)"));
    assert_eq!(texts.iter().filter(|t| *t == "Subtotal").count(), 2);
    assert!(texts.iter().any(|t| t == "Low"));
    assert!(texts.iter().any(|t| t == "Bs. 102.50"));

    let direct = InventoryPdf.render(
        &ReportConfig::new(
            "Medicines by Category",
            InventoryFilter::default(),
            at(2025, 1, 1, 0, 0),
        ),
        &[],
    );
    assert!(direct.is_ok());
}

fn xlsx_part(bytes: &[u8], name: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut part = String::new();
    archive
        .by_name(name)
        .unwrap()
        .read_to_string(&mut part)
        .unwrap();
    part
}

#[test]
fn fidelity_spreadsheet_layout() {
    let fx = Fixture::new();
    let ana = fx.client("Ana", "Rojas");
    fx.client("Luis", "Vaca");
    fx.sale(ana, "12.5", at(2024, 4, 4, 9, 0));

    let report = fx
        .service()
        .generate_fidelity(&year_2024(), &request(), ExportFormat::Xlsx)
        .unwrap();
    let sheet = xlsx_part(&report.bytes, "xl/worksheets/sheet1.xml");
    assert!(sheet.contains(r#"<mergeCell ref="A1:G1"/>"#));
    assert!(sheet.contains(r#"state="frozen""#));

    let strings = xlsx_part(&report.bytes, "xl/sharedStrings.xml");
    assert!(strings.contains("Client Fidelity Report"));
    assert!(strings.contains("Luis Vaca"));
    assert!(strings.contains("Total (2 clients)"));

    // Luis has no purchases in the period.
    let styles = xlsx_part(&report.bytes, "xl/styles.xml");
    assert!(styles.contains("FFEDEDED"));
}

#[test]
fn inventory_spreadsheet_layout() {
    let fx = Fixture::new();
    fx.medicine("Paracetamol", "Analgesics", 5, "0.5", true);
    fx.medicine("Ibuprofen", "Analgesics", 30, "0.8", true);
    fx.medicine("Amoxicillin", "Antibiotics", 80, "1.25", false);

    let report = fx
        .service()
        .generate_inventory(&InventoryFilter::default(), &request(), ExportFormat::Xlsx)
        .unwrap();
    assert_eq!(report.mime_type, ExportFormat::Xlsx.mime_type());

    let sheet = xlsx_part(&report.bytes, "xl/worksheets/sheet1.xml");
    assert!(sheet.contains(r#"<mergeCell ref="A1:H1"/>"#));
    assert!(sheet.contains(r#"state="frozen""#));

    let strings = xlsx_part(&report.bytes, "xl/sharedStrings.xml");
    assert!(strings.contains("Medicines by Category"));
    assert!(strings.contains("Subtotal"));
    assert!(strings.contains("3 medicines"));
    assert!(strings.contains("Inactive"));

    let styles = xlsx_part(&report.bytes, "xl/styles.xml");
    assert!(styles.contains("FFFCDEDE"), "low stock fill missing");
    assert!(styles.contains("FFFFF2CC"), "medium stock fill missing");
    assert!(styles.contains("FFBF1A1A"), "inactive font missing");
}
