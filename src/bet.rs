use time::Date;

use crate::error::ServerError;

/// One lottery entry. Immutable once constructed; `agency` is always the
/// id the server assigned to the submitting session, never a value trusted
/// from the wire payload itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bet {
    pub agency: u32,
    pub first_name: String,
    pub last_name: String,
    pub document: String,
    pub birthdate: Date,
    pub number: u32,
}

impl Bet {
    /// Parses the six-field `agency;first;last;document;birthdate;number`
    /// record the session has already prefixed with the trusted agency id.
    ///
    /// Any arity, numeric, or date failure rejects the whole record (and,
    /// by extension, the whole batch it came from).
    pub fn parse(record: &str) -> Result<Self, ServerError> {
        let fields: Vec<&str> = record.split(';').collect();
        let [agency, first_name, last_name, document, birthdate, number] = fields.as_slice()
        else {
            return Err(ServerError::Parse(format!(
                "expected 6 fields, got {}",
                fields.len()
            )));
        };

        let agency: u32 = agency
            .parse()
            .map_err(|_| ServerError::Parse(format!("invalid agency id: {agency}")))?;
        let number: u32 = number
            .parse()
            .map_err(|_| ServerError::Parse(format!("invalid bet number: {number}")))?;

        if first_name.is_empty() || last_name.is_empty() || document.is_empty() {
            return Err(ServerError::Parse(
                "first_name, last_name and document must be non-empty".into(),
            ));
        }

        let birthdate = parse_iso_date(birthdate)
            .ok_or_else(|| ServerError::Parse(format!("invalid birthdate: {birthdate}")))?;

        Ok(Bet {
            agency,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            document: document.to_string(),
            birthdate,
            number,
        })
    }

    /// Serializes this bet as one store line: six `;`-separated fields,
    /// no trailing newline (the caller appends one per line).
    pub fn to_line(&self) -> String {
        format!(
            "{};{};{};{};{};{}",
            self.agency,
            self.first_name,
            self.last_name,
            self.document,
            format_iso_date(self.birthdate),
            self.number
        )
    }

    /// Parses a line previously produced by [`Bet::to_line`].
    pub fn from_line(line: &str) -> Result<Self, ServerError> {
        Self::parse(line)
    }

    /// The on-wire `<agency>;<first>;<last>;<document>;<birthdate>;<number>`
    /// text carried in a WINNER frame's payload.
    pub fn to_winner_record(&self) -> String {
        self.to_line()
    }
}

fn parse_iso_date(s: &str) -> Option<Date> {
    let parts: Vec<&str> = s.split('-').collect();
    let [year, month, day] = parts.as_slice() else {
        return None;
    };
    let year: i32 = year.parse().ok()?;
    let month: u8 = month.parse().ok()?;
    let day: u8 = day.parse().ok()?;
    let month = time::Month::try_from(month).ok()?;
    Date::from_calendar_date(year, month, day).ok()
}

fn format_iso_date(d: Date) -> String {
    format!("{:04}-{:02}-{:02}", d.year(), u8::from(d.month()), d.day())
}
