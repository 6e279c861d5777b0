#![cfg(feature = "excel_test_writer")]

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use insightflow::clean;
use insightflow::config::CleaningOptions;
use insightflow::ingestion::excel::{load_excel_from_path, load_excel_workbook_from_path};
use insightflow::ingestion::{ExcelSheetSelection, LoadOptions, load_from_path};
use insightflow::types::{ColumnType, Value};

fn tmp_file(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("insightflow-{name}-{nanos}.xlsx"))
}

fn write_people_xlsx(path: &PathBuf) {
    use rust_xlsxwriter::Workbook;

    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    ws.set_name("Sheet1").unwrap();

    ws.write_string(0, 0, "id").unwrap();
    ws.write_string(0, 1, "name").unwrap();
    ws.write_string(0, 2, "score").unwrap();
    ws.write_string(0, 3, "active").unwrap();

    let people = [(1, "Ada", Some(98.5), true), (2, "Grace", None, false), (3, "Linus", Some(77.0), true)];
    for (row, (id, name, score, active)) in people.iter().enumerate() {
        let row = row as u32 + 1;
        ws.write_number(row, 0, *id).unwrap();
        ws.write_string(row, 1, *name).unwrap();
        if let Some(score) = score {
            ws.write_number(row, 2, *score).unwrap();
        }
        ws.write_boolean(row, 3, *active).unwrap();
    }

    wb.save(path).unwrap();
}

fn write_multi_sheet_xlsx(path: &PathBuf) {
    use rust_xlsxwriter::Workbook;

    let mut wb = Workbook::new();

    let ws1 = wb.add_worksheet();
    ws1.set_name("Sheet1").unwrap();
    ws1.write_string(0, 0, "id").unwrap();
    ws1.write_string(0, 1, "name").unwrap();
    ws1.write_number(1, 0, 1).unwrap();
    ws1.write_string(1, 1, "Ada").unwrap();

    // Second sheet starts lower down and adds a column.
    let ws2 = wb.add_worksheet();
    ws2.set_name("Second").unwrap();
    ws2.write_string(2, 0, "name").unwrap();
    ws2.write_string(2, 1, "id").unwrap();
    ws2.write_string(2, 2, "team").unwrap();
    ws2.write_string(3, 0, "Linus").unwrap();
    ws2.write_number(3, 1, 3).unwrap();
    ws2.write_string(3, 2, "red").unwrap();

    wb.save(path).unwrap();
}

#[test]
fn load_excel_first_sheet() {
    let path = tmp_file("people");
    write_people_xlsx(&path);

    let ds = load_excel_from_path(&path, None).unwrap();
    assert_eq!(ds.columns, vec!["id", "name", "score", "active"]);
    assert_eq!(ds.row_count(), 3);
    assert_eq!(ds.rows[0][0], Value::Number(1.0));
    assert_eq!(ds.rows[0][1], Value::text("Ada"));
    assert_eq!(ds.rows[1][2], Value::Null);
    assert_eq!(ds.rows[1][3], Value::Bool(false));

    let (cleaned, report) = clean(&ds, &CleaningOptions::default()).unwrap();
    assert_eq!(report.column_types.get("score"), Some(ColumnType::Numeric));
    assert_eq!(report.column_types.get("active"), Some(ColumnType::Boolean));
    assert_eq!(cleaned.rows[1][2], Value::Number(87.75));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn load_excel_all_sheets_matches_columns_by_name() {
    let path = tmp_file("multi");
    write_multi_sheet_xlsx(&path);

    let ds = load_excel_workbook_from_path(&path, None).unwrap();
    assert_eq!(ds.columns, vec!["id", "name", "team"]);
    assert_eq!(ds.row_count(), 2);
    assert_eq!(ds.rows[0], vec![Value::Number(1.0), Value::text("Ada"), Value::Null]);
    assert_eq!(ds.rows[1], vec![Value::Number(3.0), Value::text("Linus"), Value::text("red")]);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn unified_loader_selects_sheets() {
    let path = tmp_file("multi-selected");
    write_multi_sheet_xlsx(&path);

    let opts = LoadOptions {
        excel_sheet_selection: ExcelSheetSelection::Sheet("Second".to_string()),
        ..Default::default()
    };
    let ds = load_from_path(&path, &opts).unwrap();
    assert_eq!(ds.columns, vec!["name", "id", "team"]);
    assert_eq!(ds.row_count(), 1);

    let opts = LoadOptions {
        excel_sheet_selection: ExcelSheetSelection::Sheets(vec!["Second".to_string(), "Sheet1".to_string()]),
        ..Default::default()
    };
    let ds = load_from_path(&path, &opts).unwrap();
    assert_eq!(ds.columns, vec!["name", "id", "team"]);
    assert_eq!(ds.rows[1], vec![Value::text("Ada"), Value::Number(1.0), Value::Null]);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn missing_sheet_is_an_error() {
    let path = tmp_file("missing-sheet");
    write_people_xlsx(&path);

    assert!(load_excel_from_path(&path, Some("Nope")).is_err());
    let _ = std::fs::remove_file(&path);
}
