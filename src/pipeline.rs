use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::{debug, error, info, warn};

use crate::coupon;
use crate::identity::IdentityResolver;
use crate::ledger::{CouponLog, CouponRecord, LedgerError};
use crate::platform::Mention;

const OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y%m%dT%H%M%S%.f%z"];

const NAIVE_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y%m%dT%H%M%S%.f",
    "%Y%m%dT%H%M",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y%m%d"];

/// Parse an ISO-8601 timestamp into its wall-clock time. The offset, if any,
/// is honoured for validation but the time is not converted to UTC.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    // Unix seconds, as some webhook payloads deliver them
    if raw.len() >= 9 && raw.bytes().all(|b| b.is_ascii_digit()) {
        let secs: i64 = raw.parse().ok()?;
        return DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc());
    }

    let rfc3339 = match raw.strip_suffix(['Z', 'z']) {
        Some(rest) => format!("{}+00:00", rest),
        None => raw.to_string(),
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(&rfc3339) {
        return Some(dt.naive_local());
    }
    // Graph's created_time uses a compact offset: 2024-01-15T10:30:00+0000
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&rfc3339, format) {
            return Some(dt.naive_local());
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Reformat an ISO-8601 timestamp as `YYYY-MM-DD HH:MM:SS`.
/// Unparseable input comes back unchanged.
pub fn format_timestamp(raw: &str) -> String {
    match parse_timestamp(raw) {
        Some(dt) => dt.format(OUTPUT_FORMAT).to_string(),
        None => {
            warn!("Could not parse timestamp '{}', keeping it unchanged", raw);
            raw.to_string()
        }
    }
}

/// What happened to a single mention
#[derive(Debug)]
pub enum MentionOutcome {
    /// Text carried no coupon; nothing was stored
    NoCoupon,
    /// A record was appended to the coupon log
    Saved(CouponRecord),
    /// The mention qualified but could not be stored
    Skipped(LedgerError),
}

/// Tallies from running a batch of mentions through the pipeline
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub seen: usize,
    pub saved: usize,
    pub skipped: usize,
}

/// Detect → resolve → format → persist, one mention at a time.
#[derive(Clone)]
pub struct MentionPipeline {
    resolver: IdentityResolver,
    log: CouponLog,
}

impl MentionPipeline {
    pub fn new(resolver: IdentityResolver, log: CouponLog) -> Self {
        Self { resolver, log }
    }

    /// Process one mention. Failures stay inside the returned outcome.
    pub async fn process(&self, mention: &Mention) -> MentionOutcome {
        if !coupon::detect(&mention.text) {
            debug!("No coupon in mention from {:?}", mention.sender_id);
            return MentionOutcome::NoCoupon;
        }

        let display_name = self.resolver.resolve(mention.sender_id.as_deref()).await;
        let record = CouponRecord::new(
            display_name,
            mention.text.clone(),
            format_timestamp(&mention.timestamp),
        );

        match self.log.append(&record).await {
            Ok(()) => {
                info!(
                    "Saved coupon {} from {} at {}",
                    coupon::extract(&record.text).unwrap_or_default(),
                    record.display_name,
                    record.formatted_timestamp
                );
                MentionOutcome::Saved(record)
            }
            Err(e) => {
                error!("Failed to save coupon mention: {}", e);
                MentionOutcome::Skipped(e)
            }
        }
    }

    /// Process mentions in order; one failure never stops the rest.
    pub async fn process_all<'a, I>(&self, mentions: I) -> BatchSummary
    where
        I: IntoIterator<Item = &'a Mention>,
    {
        let mut summary = BatchSummary::default();
        for mention in mentions {
            summary.seen += 1;
            match self.process(mention).await {
                MentionOutcome::NoCoupon => {}
                MentionOutcome::Saved(_) => summary.saved += 1,
                MentionOutcome::Skipped(_) => summary.skipped += 1,
            }
        }
        summary
    }
}
