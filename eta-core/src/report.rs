//! Per-status summary of a company's documents over a posting-date range.
//!
//! Groups follow the order operators read them in: the statuses reported by
//! the tax authority first, then documents signed but never transmitted,
//! then documents still waiting for a signature.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{DocumentStatus, TaxDocument};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFilter {
    pub company: String,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    /// Unsigned documents posted before this date predate e-invoicing for
    /// the company and are left out of the "Not Signed" group.
    pub signature_start_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub posting_date: NaiveDate,
    pub count: usize,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportGroup {
    pub label: String,
    pub status: DocumentStatus,
    pub count: usize,
    pub total: Decimal,
    pub days: Vec<ReportRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub groups: Vec<ReportGroup>,
    pub total_count: usize,
    pub grand_total: Decimal,
}

fn group_label(status: DocumentStatus) -> String {
    match status {
        DocumentStatus::Signed => "Signed Not Submitted".to_string(),
        other => other.as_str().to_string(),
    }
}

impl StatusReport {
    pub fn build<'a, I>(documents: I, filter: &ReportFilter) -> Self
    where
        I: IntoIterator<Item = &'a TaxDocument>,
    {
        let in_range: Vec<&TaxDocument> = documents
            .into_iter()
            .filter(|d| {
                d.company == filter.company
                    && d.posting_date >= filter.from_date
                    && d.posting_date <= filter.to_date
            })
            .collect();

        let unsigned_from = match filter.signature_start_date {
            Some(start) if start > filter.from_date => start,
            _ => filter.from_date,
        };

        let order = DocumentStatus::REMOTE
            .into_iter()
            .chain([DocumentStatus::Signed, DocumentStatus::NotSigned]);

        let mut groups = Vec::new();
        for status in order {
            let mut days: BTreeMap<NaiveDate, (usize, Decimal)> = BTreeMap::new();
            for doc in in_range.iter().filter(|d| d.status == status) {
                if status == DocumentStatus::NotSigned && doc.posting_date < unsigned_from {
                    continue;
                }
                let entry = days.entry(doc.posting_date).or_insert((0, Decimal::ZERO));
                entry.0 += 1;
                entry.1 += doc.grand_total;
            }
            if days.is_empty() {
                continue;
            }

            let days: Vec<ReportRow> = days
                .into_iter()
                .map(|(posting_date, (count, total))| ReportRow {
                    posting_date,
                    count,
                    total,
                })
                .collect();
            groups.push(ReportGroup {
                label: group_label(status),
                status,
                count: days.iter().map(|r| r.count).sum(),
                total: days.iter().map(|r| r.total).sum(),
                days,
            });
        }

        // Sum of the groups, so unsigned documents posted before the
        // signature start date are left out here too.
        Self {
            total_count: groups.iter().map(|g| g.count).sum(),
            grand_total: groups.iter().map(|g| g.total).sum(),
            groups,
        }
    }

    pub fn group(&self, status: DocumentStatus) -> Option<&ReportGroup> {
        self.groups.iter().find(|g| g.status == status)
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<24} {:<12} {:>8} {:>16}", "Status", "Date", "Count", "Grand Total")?;
        for group in &self.groups {
            writeln!(f, "{:<24} {:<12} {:>8} {:>16}", group.label, "", group.count, group.total)?;
            for day in &group.days {
                writeln!(
                    f,
                    "{:<24} {:<12} {:>8} {:>16}",
                    "",
                    day.posting_date.to_string(),
                    day.count,
                    day.total
                )?;
            }
        }
        write!(
            f,
            "{:<24} {:<12} {:>8} {:>16}",
            "Total Documents", "", self.total_count, self.grand_total
        )
    }
}
