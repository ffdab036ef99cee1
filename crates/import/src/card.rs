use chrono::{Datelike, NaiveDate};
use tally_core::TransactionError;

use crate::util::{last_word, title_case};

/// Year, then day, then abbreviated month: `"2018" + "20" + "Dec"`.
const CARD_DATE_FORMAT: &str = "%Y%d%b";
const CARD_DATE_TOKEN_LEN: usize = 5;

/// Recovers the purchase date a card statement embeds at the end of
/// reference 1 as a `ddMMM` token (e.g. `"... SI NG 20DEC"`).
///
/// The year comes from `bank_date`. The only rollover handled is a December
/// purchase on a January statement, which moves to the previous year; any
/// other purchase that crossed a year boundary keeps the statement's year.
///
/// A blank reference returns `bank_date` unchanged.
pub fn extract_card_date(bank_date: NaiveDate, reference1: &str) -> Result<NaiveDate, TransactionError> {
    if reference1.trim().is_empty() {
        tracing::debug!("Card reference 1 is empty, keeping bank date {}", bank_date);
        return Ok(bank_date);
    }

    let invalid = || TransactionError::InvalidReferenceDate(reference1.to_string());

    let token = last_word(reference1);
    if token.chars().count() != CARD_DATE_TOKEN_LEN {
        return Err(invalid());
    }

    let day: String = token.chars().take(2).collect();
    let month = title_case(&token.chars().skip(2).collect::<String>());

    let mut year = bank_date.year();
    if month == "Dec" && bank_date.month() == 1 {
        year -= 1;
    }

    let raw = format!("{year}{day}{month}");
    NaiveDate::parse_from_str(&raw, CARD_DATE_FORMAT).map_err(|_| invalid())
}
