//! The one VTIMEZONE every document carries.
//!
//! This is static data: it does not depend on the exported events and renders
//! to the same bytes on every run.

/// Which half of the year a rule covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Standard,
    Daylight,
}

impl RuleKind {
    fn component(self) -> &'static str {
        match self {
            RuleKind::Standard => "STANDARD",
            RuleKind::Daylight => "DAYLIGHT",
        }
    }
}

/// A fixed-offset rule switching in on the last Sunday of `month`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetRule {
    pub kind: RuleKind,
    pub abbreviation: &'static str,
    pub offset_from_hours: i32,
    pub offset_to_hours: i32,
    pub month: u32,
    /// First onset (1970) as (day of month, local hour)
    pub first_onset: (u32, u32),
}

impl OffsetRule {
    fn write_ics(&self, out: &mut String) {
        let component = self.kind.component();
        let (day, hour) = self.first_onset;

        push_line(out, &format!("BEGIN:{component}"));
        push_line(
            out,
            &format!("DTSTART:1970{:02}{:02}T{:02}0000", self.month, day, hour),
        );
        push_line(
            out,
            &format!("TZOFFSETFROM:{}", format_offset(self.offset_from_hours)),
        );
        push_line(
            out,
            &format!("TZOFFSETTO:{}", format_offset(self.offset_to_hours)),
        );
        push_line(out, &format!("TZNAME:{}", self.abbreviation));
        push_line(
            out,
            &format!("RRULE:FREQ=YEARLY;BYMONTH={};BYDAY=-1SU", self.month),
        );
        push_line(out, &format!("END:{component}"));
    }
}

/// A VTIMEZONE with one standard and one daylight rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimezoneDefinition {
    pub tzid: &'static str,
    pub standard: OffsetRule,
    pub daylight: OffsetRule,
}

impl TimezoneDefinition {
    /// Central European Time: CET (UTC+1) from the last Sunday of October,
    /// CEST (UTC+2) from the last Sunday of March.
    pub const fn europe_berlin() -> Self {
        TimezoneDefinition {
            tzid: "Europe/Berlin",
            standard: OffsetRule {
                kind: RuleKind::Standard,
                abbreviation: "CET",
                offset_from_hours: 2,
                offset_to_hours: 1,
                month: 10,
                first_onset: (25, 3),
            },
            daylight: OffsetRule {
                kind: RuleKind::Daylight,
                abbreviation: "CEST",
                offset_from_hours: 1,
                offset_to_hours: 2,
                month: 3,
                first_onset: (29, 2),
            },
        }
    }

    /// Render the VTIMEZONE component, CRLF terminated.
    pub fn to_ics(&self) -> String {
        let mut out = String::new();
        push_line(&mut out, "BEGIN:VTIMEZONE");
        push_line(&mut out, &format!("TZID:{}", self.tzid));
        self.standard.write_ics(&mut out);
        self.daylight.write_ics(&mut out);
        push_line(&mut out, "END:VTIMEZONE");
        out
    }
}

fn format_offset(hours: i32) -> String {
    let sign = if hours < 0 { '-' } else { '+' };
    format!("{}{:02}00", sign, hours.abs())
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push_str("\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn berlin_rules() {
        let ics = TimezoneDefinition::europe_berlin().to_ics();
        let expected = "BEGIN:VTIMEZONE\r\n\
TZID:Europe/Berlin\r\n\
BEGIN:STANDARD\r\n\
DTSTART:19701025T030000\r\n\
TZOFFSETFROM:+0200\r\n\
TZOFFSETTO:+0100\r\n\
TZNAME:CET\r\n\
RRULE:FREQ=YEARLY;BYMONTH=10;BYDAY=-1SU\r\n\
END:STANDARD\r\n\
BEGIN:DAYLIGHT\r\n\
DTSTART:19700329T020000\r\n\
TZOFFSETFROM:+0100\r\n\
TZOFFSETTO:+0200\r\n\
TZNAME:CEST\r\n\
RRULE:FREQ=YEARLY;BYMONTH=3;BYDAY=-1SU\r\n\
END:DAYLIGHT\r\n\
END:VTIMEZONE\r\n";
        assert_eq!(ics, expected);
    }

    #[test]
    fn negative_offsets_are_signed() {
        assert_eq!(format_offset(-5), "-0500");
        assert_eq!(format_offset(0), "+0000");
    }
}
