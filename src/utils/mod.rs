pub mod month;

pub use month::{InvalidMonthFormat, format_month, month_index, month_range, parse_month};
