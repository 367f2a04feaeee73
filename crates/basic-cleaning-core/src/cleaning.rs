use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{CleaningError, Result};

pub const PRICE_COLUMN: &str = "price";
pub const LAST_REVIEW_COLUMN: &str = "last_review";

/// Tried in order; the first format that parses a value wins.
const LAST_REVIEW_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Timestamps keep only their calendar date.
const LAST_REVIEW_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Closed price interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, price: f64) -> bool {
        self.min <= price && price <= self.max
    }

    /// True for `min > max` and for NaN bounds. Not an error: nothing matches.
    pub fn is_empty(&self) -> bool {
        !(self.min <= self.max)
    }

    fn predicate(&self) -> Expr {
        if self.is_empty() {
            return lit(false);
        }
        // Non-strict cast: prices that are not numbers become null and drop out.
        let price = col(PRICE_COLUMN).cast(DataType::Float64);
        price
            .clone()
            .is_not_nan()
            .and(price.clone().gt_eq(lit(self.min)))
            .and(price.lt_eq(lit(self.max)))
    }
}

/// Keep the rows whose `price` lies in `range` and retype `last_review` as a
/// nullable `Date`. Unparseable review dates become null.
pub fn clean_listings(df: &DataFrame, range: PriceRange) -> Result<DataFrame> {
    for required in [PRICE_COLUMN, LAST_REVIEW_COLUMN] {
        if df.get_column_index(required).is_none() {
            return Err(CleaningError::MissingColumn(required));
        }
    }

    let filtered = df.clone().lazy().filter(range.predicate()).collect()?;

    let review = filtered.column(LAST_REVIEW_COLUMN)?;
    let nulls_before = review.null_count();
    let review_expr = review_date_expr(review.dtype());

    let cleaned = filtered.lazy().with_column(review_expr).collect()?;
    let unparsed = cleaned
        .column(LAST_REVIEW_COLUMN)?
        .null_count()
        .saturating_sub(nulls_before);

    info!(
        rows_in = df.height(),
        rows_out = cleaned.height(),
        min_price = range.min,
        max_price = range.max,
        "[data-cleaning] - Preprocessing raw data"
    );
    if unparsed > 0 {
        warn!(
            unparsed,
            column = LAST_REVIEW_COLUMN,
            "values could not be parsed as dates and were set to null"
        );
    }

    Ok(cleaned)
}

fn review_date_expr(dtype: &DataType) -> Expr {
    let review = col(LAST_REVIEW_COLUMN);
    match dtype {
        DataType::Date => review,
        DataType::Datetime(_, _) => review.cast(DataType::Date),
        DataType::String => parse_review_dates(review),
        _ => parse_review_dates(review.cast(DataType::String)),
    }
    .alias(LAST_REVIEW_COLUMN)
}

fn parse_review_dates(text: Expr) -> Expr {
    let dates = LAST_REVIEW_FORMATS.iter().map(|format| {
        text.clone()
            .str()
            .to_date(lenient_options(format))
    });
    let timestamps = LAST_REVIEW_DATETIME_FORMATS.iter().map(|format| {
        text.clone()
            .str()
            .to_datetime(
                Some(TimeUnit::Microseconds),
                None,
                lenient_options(format),
                lit("raise"),
            )
            .cast(DataType::Date)
    });

    dates
        .chain(timestamps)
        .fold(lit(NULL).cast(DataType::Date), |parsed, attempt| {
            when(parsed.clone().is_not_null())
                .then(parsed)
                .otherwise(attempt)
        })
}

fn lenient_options(format: &str) -> StrptimeOptions {
    StrptimeOptions {
        format: Some(format.into()),
        strict: false,
        exact: true,
        cache: true,
    }
}
