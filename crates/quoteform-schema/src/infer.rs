//! Control-type inference.

use crate::field::ControlType;
use quoteform_ontology::ValueRange;

/// Option count at or below which an enumeration renders as radio buttons.
pub const RADIO_MAX_OPTIONS: usize = 3;

/// Infer the control type of a field. Total and side-effect free.
///
/// Priority, highest first:
/// 1. declared options: radio up to [`RADIO_MAX_OPTIONS`], select beyond
/// 2. boolean range: radio
/// 3. date range: date
/// 4. identifier contains `email` (case-sensitive): email
/// 5. identifier contains `phone` (case-sensitive): tel
/// 6. text
pub fn infer_control(range: ValueRange, identifier: &str, option_count: usize) -> ControlType {
    if option_count > 0 {
        return if option_count <= RADIO_MAX_OPTIONS {
            ControlType::Radio
        } else {
            ControlType::Select
        };
    }

    match range {
        ValueRange::Boolean => return ControlType::Radio,
        ValueRange::Date => return ControlType::Date,
        _ => {}
    }

    if identifier.contains("email") {
        ControlType::Email
    } else if identifier.contains("phone") {
        ControlType::Tel
    } else {
        ControlType::Text
    }
}
