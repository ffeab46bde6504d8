use crate::models::Project;
use std::io;

const HEADER: [&str; 8] = [
    "POSNO",
    "Quantity",
    "Profile",
    "Weight",
    "QuantityDone",
    "QuantitySent",
    "Date",
    "PdfFileName",
];

/// 导出项目明细进度到 CSV
pub fn export_csv<W: io::Write>(project: &Project, output: W) -> Result<(), csv::Error> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);
    writer.write_record(HEADER)?;

    for record in &project.records {
        writer.write_record(&[
            record.position_number.clone(),
            record.quantity_ordered.to_string(),
            record.profile_name.clone(),
            record.weight.to_string(),
            record.quantity_completed.to_string(),
            record.quantity_shipped.to_string(),
            record
                .last_updated_at
                .map(|d| d.to_rfc3339())
                .unwrap_or_default(),
            record.document_name.clone().unwrap_or_default(),
        ])?;
    }

    writer.flush()?;
    tracing::debug!("Exported {} records of {}", project.records.len(), project.name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LineItem;
    use chrono::{TimeZone, Utc};

    #[test]
    fn writes_header_and_one_row_per_record() {
        let mut done = LineItem::new("1234/", 10, "PR-50", 2.5, "Hall 7");
        done.quantity_completed = 4;
        done.last_updated_at = Some(Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap());
        done.document_name = Some("1234 cut, rev2.pdf".to_string());
        let project = Project::new("Hall 7", vec![done, LineItem::new("1300", 2, "HEA200", 41.0, "Hall 7")]);

        let mut out = Vec::new();
        export_csv(&project, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "POSNO,Quantity,Profile,Weight,QuantityDone,QuantitySent,Date,PdfFileName");
        assert_eq!(
            lines[1],
            "1234/,10,PR-50,2.5,4,0,2024-03-01T08:30:00+00:00,\"1234 cut, rev2.pdf\""
        );
        assert_eq!(lines[2], "1300,2,HEA200,41,0,0,,");
        assert_eq!(lines.len(), 3);
    }
}
