use serde::{Deserialize, Serialize};

/// Column order of the coupon log. Must match the field order of [`CouponRecord`].
pub const COLUMNS: [&str; 3] = ["display_name", "text", "formatted_timestamp"];

/// One row of the coupon log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponRecord {
    pub display_name: String,
    pub text: String,
    /// `YYYY-MM-DD HH:MM:SS`, or the raw timestamp if it could not be parsed
    pub formatted_timestamp: String,
}

impl CouponRecord {
    pub fn new(
        display_name: impl Into<String>,
        text: impl Into<String>,
        formatted_timestamp: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            text: text.into(),
            formatted_timestamp: formatted_timestamp.into(),
        }
    }
}

/// Encode `record` as one CSV row, preceded by the header row when asked.
pub(crate) fn encode_row(record: &CouponRecord, with_header: bool) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(with_header)
        .from_writer(Vec::new());
    writer.serialize(record)?;
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}
