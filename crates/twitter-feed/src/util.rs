use chrono::DateTime;
use easy_ext::ext;

pub(crate) mod prelude {
    pub(crate) use super::DateTimeExt as _;
    pub(crate) use super::ErrorExt as _;
}

#[ext(ErrorExt)]
pub(crate) impl<E> E
where
    E: std::error::Error + ?Sized,
{
    fn display_chain(&self) -> display_error_chain::DisplayErrorChain<&Self> {
        display_error_chain::DisplayErrorChain::new(self)
    }
}

#[ext(DateTimeExt)]
pub(crate) impl<Tz: chrono::TimeZone> DateTime<Tz> {
    /// Renders the timestamp for display, keeping the provider's original
    /// time zone rather than converting to some local one.
    fn to_feed_timestamp(&self) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        self.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use chrono::DateTime;

    #[test]
    fn feed_timestamp_format() {
        let parsed = DateTime::parse_from_rfc3339("2023-05-01T15:30:45.000Z").unwrap();

        assert_eq!(parsed.to_feed_timestamp(), "2023-05-01 15:30:45");
    }

    #[test]
    fn feed_timestamp_keeps_the_original_offset() {
        let parsed = DateTime::parse_from_rfc3339("2023-05-01T15:30:45+03:00").unwrap();

        // No conversion: the hour stays as the provider sent it
        assert_eq!(parsed.to_feed_timestamp(), "2023-05-01 15:30:45");
    }
}

