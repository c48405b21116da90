use cwl::reconcile::Mismatch;
use cwl::Result;

use csv::WriterBuilder;

const REPORT_HEADERS: [&str; 4] = ["user", "stored", "computed", "difference"];

/// Renders a reconciliation report as CSV, always including the header row
pub fn render_report(mismatches: &[Mismatch]) -> Result<String> {
    let mut wtr = WriterBuilder::new()
        .has_headers(false)
        .from_writer(vec![]);

    wtr.write_record(REPORT_HEADERS)?;

    for mismatch in mismatches {
        log::debug!("Serializing mismatch: {mismatch:?}");
        wtr.serialize(mismatch)?;
    }

    let report = String::from_utf8(wtr.into_inner()?)?;

    return Ok(report);
}

#[cfg(test)]
mod tests {
    use super::*;

    use cwl::ids::UserId;

    #[test]
    fn empty_report_has_headers() {
        assert_eq!(render_report(&[]).unwrap(), "user,stored,computed,difference\n");
    }

    #[test]
    fn missing_wallet_renders_empty_stored() {
        let report = render_report(&[Mismatch {
            user: UserId::from("u1"),
            stored: None,
            computed: -15,
            difference: 15,
        }])
        .unwrap();

        assert_eq!(report, "user,stored,computed,difference\nu1,,-15,15\n");
    }
}
