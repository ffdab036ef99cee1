use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tally_import::{DiscrepancyReport, DiscrepantTransaction};

/// One line of the written discrepancy file.
#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    date: String,
    kind: String,
    amount: String,
    description: &'a str,
}

impl<'a> From<&'a DiscrepantTransaction> for ReportRow<'a> {
    fn from(d: &'a DiscrepantTransaction) -> Self {
        Self {
            date: d.date.format("%d %b %Y").to_string(),
            kind: d.kind.to_string(),
            amount: d.amount.to_string(),
            description: &d.description,
        }
    }
}

pub fn print_summary<W: Write>(out: &mut W, report: &DiscrepancyReport) -> std::io::Result<()> {
    writeln!(
        out,
        "Matched: {}  Ambiguous: {}  Skipped: {}  Unmatched: {} (total {})",
        report.matched,
        report.ambiguous,
        report.skipped,
        report.unmatched_count(),
        report.unmatched_total(),
    )?;
    for d in report.discrepancies() {
        writeln!(
            out,
            "  {}  {:<20} {:>10}  {}",
            d.date.format("%d %b %Y"),
            d.kind.to_string(),
            d.amount.to_string(),
            d.description
        )?;
    }
    Ok(())
}

pub fn write_csv<W: Write>(writer: W, discrepancies: &[DiscrepantTransaction]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    if discrepancies.is_empty() {
        wtr.write_record(["date", "kind", "amount", "description"])?;
    }
    for d in discrepancies {
        wtr.serialize(ReportRow::from(d))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_csv_file(path: &Path, discrepancies: &[DiscrepantTransaction]) -> Result<(), csv::Error> {
    let file = std::fs::File::create(path)?;
    write_csv(file, discrepancies)?;
    tracing::info!("Wrote {} discrepancies to {}", discrepancies.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tally_core::{CanonicalTransaction, Money, TransactionKind};
    use tally_import::{ExpenseIndex, Reconciler};

    fn report() -> DiscrepancyReport {
        let tx = CanonicalTransaction::new(
            NaiveDate::from_ymd_opt(2019, 1, 4).unwrap(),
            TransactionKind::BillPayment,
            Money::from_cents(8000),
            Money::zero(),
            ["SP SERVICES".to_string(), "12345".to_string(), String::new()],
        )
        .unwrap();
        Reconciler::default().reconcile(&[tx], &ExpenseIndex::default())
    }

    #[test]
    fn summary_lists_unmatched() {
        let mut out = Vec::new();
        print_summary(&mut out, &report()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Matched: 0  Ambiguous: 0  Skipped: 0  Unmatched: 1 (total 80.00)"));
        assert!(text.contains("04 Jan 2019"));
        assert!(text.contains("SP SERVICES 12345"));
    }

    #[test]
    fn csv_has_header_and_formatted_amount() {
        let mut out = Vec::new();
        write_csv(&mut out, &report().discrepancies()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("date,kind,amount,description"));
        assert_eq!(lines.next(), Some("04 Jan 2019,Bill Payment,80.00,SP SERVICES 12345"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn empty_report_still_has_header() {
        let mut out = Vec::new();
        write_csv(&mut out, &[]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "date,kind,amount,description\n");
    }

    #[test]
    fn csv_file_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        write_csv_file(&path, &report().discrepancies()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
