use anyhow::Result;
use std::fs;
use tempfile::tempdir;

use autoaudit::app::{AuditUseCase, SheetSelector, SheetSource, UploadRequest};
use autoaudit::config::Config;
use autoaudit::error::AuditError;
use autoaudit::infra::{read_audit_csv, CsvReportSink, PdfReportSink, WorkbookSource, XlsxReportSink};
use autoaudit::pipeline::AuditPipeline;
use autoaudit::types::{CanonicalField, RiskLevel};

const DESKTOP_CHECKLIST: &str = "\
GAP ASSESSMENT ISO 27001:2022,,,,,
Unit: Divisi TI,,,,,
Klausa/Annex,Control Name,Persyaratan,Pertanyaan,Fungsi,Hasil Observasi
A.5.1,Policies for information security,Kebijakan ditetapkan,Apakah ada kebijakan?,TI,Belum Dilakukan
A.5.2,Information security roles,Peran ditetapkan,Apakah peran ditetapkan?,SDM,Dilakukan Sebagian
,,,,,
A.5.3,Segregation of duties,Tugas dipisah,Apakah tugas dipisah?,TI,Sudah Dilakukan
A.5.4,Management responsibilities,,,,Dalam review
";

#[test]
fn test_desktop_checklist_end_to_end() -> Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("checklist.csv");
    fs::write(&input, DESKTOP_CHECKLIST)?;
    let csv_out = dir.path().join("hasil.csv");
    let pdf_out = dir.path().join("laporan.pdf");
    let xlsx_out = dir.path().join("laporan.xlsx");

    let use_case = AuditUseCase::new(Box::new(WorkbookSource::new()), AuditPipeline::default())
        .with_sink(Box::new(CsvReportSink::new(&csv_out)))
        .with_sink(Box::new(PdfReportSink::new(&pdf_out)))
        .with_sink(Box::new(XlsxReportSink::new(&xlsx_out)));
    let outcome = use_case.run(&UploadRequest::new(&input, SheetSelector::First))?;

    assert_eq!(outcome.sheet, "checklist");
    assert_eq!(outcome.header_index, 2);
    assert_eq!(outcome.dropped_rows, 1);
    assert_eq!(outcome.table.columns, CanonicalField::SOURCE.to_vec());
    assert_eq!(outcome.summary.total, 4);
    assert_eq!(outcome.summary.count(RiskLevel::High), 1);
    assert_eq!(outcome.summary.count(RiskLevel::Medium), 1);
    assert_eq!(outcome.summary.count(RiskLevel::Low), 1);
    assert_eq!(outcome.summary.count(RiskLevel::Unknown), 1);
    assert_eq!(outcome.summary.implemented, 1);
    assert_eq!(outcome.summary.not_implemented, 3);
    assert_eq!(outcome.summary.high_risk.len(), 1);
    assert_eq!(outcome.summary.high_risk[0].clause, "A.5.1");
    assert_eq!(outcome.summary.high_risk[0].observation, "Belum Dilakukan");
    assert_eq!(
        outcome.artifacts,
        vec![csv_out.clone(), pdf_out.clone(), xlsx_out.clone()]
    );

    let reparsed = read_audit_csv(fs::File::open(&csv_out)?)?;
    assert_eq!(reparsed, outcome.table);

    let pdf = lopdf::Document::load(&pdf_out)?;
    assert_eq!(pdf.get_pages().len(), 1);

    let report = WorkbookSource::new().load(&xlsx_out, &SheetSelector::Named("Audit Report".into()))?;
    assert_eq!(report.sheet.rows.len(), outcome.table.len() + 1);
    assert_eq!(report.sheet.rows[1][0].text(), "A.5.1");
    Ok(())
}

#[test]
fn test_missing_marker_yields_no_table() -> Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("no_header.csv");
    fs::write(&input, "Annex,Status\nA.5.1,Belum\n")?;
    let csv_out = dir.path().join("out.csv");

    let use_case = AuditUseCase::new(Box::new(WorkbookSource::new()), AuditPipeline::default())
        .with_sink(Box::new(CsvReportSink::new(&csv_out)));
    let err = use_case
        .run(&UploadRequest::new(&input, SheetSelector::First))
        .unwrap_err();

    assert!(matches!(err, AuditError::HeaderNotFound { .. }));
    assert!(!csv_out.exists());
    Ok(())
}

#[test]
fn test_missing_status_column_is_reported() -> Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("partial.csv");
    fs::write(&input, "Klausa/Annex;Control Name;Catatan\nA.5.1;Policies;-\n")?;

    let err = AuditUseCase::new(Box::new(WorkbookSource::new()), AuditPipeline::default())
        .run(&UploadRequest::new(&input, SheetSelector::First))
        .unwrap_err();
    match err {
        AuditError::RequiredColumnsMissing { missing } => {
            assert_eq!(missing, vec![CanonicalField::StatusObservation]);
        }
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

/// The web dashboard variant: English statuses, `Annex` header row, no "Control Name".
#[test]
fn test_english_dashboard_variant() -> Result<()> {
    let config = Config::from_toml_str(
        r#"
marker_phrase = "Gap Assessment"
risk_preset = "english"
"#,
    )?;
    let dir = tempdir()?;
    let input = dir.path().join("dashboard.csv");
    fs::write(
        &input,
        "No,Annex,Fungsi,Pedoman / TKO,Gap Assessment,Status,Risk\n\
         1,A.5.1,IT,TKO-01,Tidak ada kebijakan,Not Implemented,High\n\
         2,A.5.2,HR,TKO-02,Sebagian,Partially Implemented,Medium\n\
         3,A.8.1,IT,TKO-03,-,Implemented,Low\n",
    )?;

    let outcome = AuditUseCase::new(Box::new(WorkbookSource::new()), AuditPipeline::from_config(&config))
        .run(&UploadRequest::new(&input, SheetSelector::First))?;

    assert_eq!(outcome.header_index, 0);
    let levels: Vec<RiskLevel> = outcome.table.records.iter().map(|r| r.risk.level).collect();
    assert_eq!(levels, vec![RiskLevel::High, RiskLevel::Medium, RiskLevel::Low]);
    assert_eq!(outcome.summary.implemented, 1);
    assert_eq!(outcome.summary.per_function["IT"]["Not Implemented"], 1);
    assert_eq!(outcome.summary.per_function["IT"]["Implemented"], 1);
    Ok(())
}

/// The risk-scoring variant: `Implemented` yes/partial/no column keyed by `Control ID`.
#[test]
fn test_risk_scoring_variant() -> Result<()> {
    let config = Config::from_toml_str(
        r#"
marker_phrase = "Control ID"

[[header_keywords]]
keyword = "control id"
field = "Clause/Annex"

[[header_keywords]]
keyword = "description"
field = "Control Description"

[[header_keywords]]
keyword = "implemented"
field = "Status Observation"

[[risk_rules]]
keyword = "partial"
label = "Partially Implemented"
level = "Medium"

[[risk_rules]]
keyword = "yes"
label = "Implemented"
level = "Low"

[[risk_rules]]
keyword = "no"
label = "Not Implemented"
level = "High"
"#,
    )?;
    let dir = tempdir()?;
    let input = dir.path().join("controls.csv");
    fs::write(
        &input,
        "Control ID,Description,Implemented\nAC-1,Access policy,Yes\nAC-2,Account mgmt,Partial\nAC-3,Enforcement,No\nAC-4,Flow,\n",
    )?;

    let outcome = AuditUseCase::new(Box::new(WorkbookSource::new()), AuditPipeline::from_config(&config))
        .run(&UploadRequest::new(&input, SheetSelector::First))?;

    let scores: Vec<u8> = outcome.table.records.iter().map(|r| r.risk.score()).collect();
    assert_eq!(scores, vec![1, 2, 3, 0]);
    assert_eq!(
        outcome.table.columns,
        vec![
            CanonicalField::ClauseAnnex,
            CanonicalField::ControlDescription,
            CanonicalField::StatusObservation
        ]
    );
    Ok(())
}

#[test]
fn test_config_file_drives_pipeline() -> Result<()> {
    let dir = tempdir()?;
    let config_path = dir.path().join("autoaudit.toml");
    fs::write(
        &config_path,
        "required_fields = [\"Control Name\", \"Responsible Function\"]\n[report]\ntitle = \"Audit Q3\"\n",
    )?;
    let config = Config::load(Some(config_path.as_path()))?;
    assert_eq!(config.report.title, "Audit Q3");
    assert_eq!(config.source.as_deref(), Some(config_path.as_path()));

    let pipeline = AuditPipeline::from_config(&config);
    assert_eq!(
        pipeline.required(),
        &[
            CanonicalField::ControlName,
            CanonicalField::ResponsibleFunction,
            CanonicalField::StatusObservation
        ]
    );
    Ok(())
}
