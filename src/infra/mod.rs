pub mod csv_report_adapter;
pub mod pdf_report_adapter;
pub mod workbook_source;
pub mod xlsx_report_adapter;

pub use csv_report_adapter::{read_audit_csv, write_audit_csv, CsvReportSink};
pub use pdf_report_adapter::{render_pdf, PdfReportSink};
pub use workbook_source::WorkbookSource;
pub use xlsx_report_adapter::{render_xlsx, XlsxReportSink};
