//! Serializing a `CalendarDocument` to ICS text.
//!
//! Event components are rendered by the icalendar crate. The calendar header
//! and the VTIMEZONE are written by hand so their bytes never depend on the
//! library version. After rendering, `enforce_title_limit` re-scans every
//! SUMMARY line as plain text and clips it to a hard ceiling.

use icalendar::{Calendar, Component, EventLike, Property, ValueType};

use crate::event::{EventTime, NormalizedEvent};
use crate::ics::build::CalendarDocument;

/// Marker appended by the textual pass.
pub const POST_PASS_MARKER: &str = "...";

const CALSCALE: &str = "GREGORIAN";
const METHOD: &str = "PUBLISH";
/// RFC 5545 content line limit, in octets, excluding CRLF
const FOLD_OCTETS: usize = 75;

/// Render the document and clip its title lines to `title_limit`.
///
/// Rendering always completes before the textual pass runs.
pub fn serialize(doc: &CalendarDocument, title_limit: usize) -> Vec<u8> {
    let rendered = render(doc);
    enforce_title_limit(&rendered, title_limit).into_bytes()
}

/// Render the document to CRLF-terminated ICS text.
pub fn render(doc: &CalendarDocument) -> String {
    let mut out = String::new();
    push_line(&mut out, "BEGIN:VCALENDAR");
    push_folded(&mut out, &format!("PRODID:{}", doc.product_id));
    push_line(&mut out, &format!("VERSION:{}", doc.version));
    push_line(&mut out, &format!("CALSCALE:{CALSCALE}"));
    push_line(&mut out, &format!("METHOD:{METHOD}"));
    push_folded(
        &mut out,
        &format!("X-WR-CALNAME:{}", escape_text(&doc.display_name)),
    );
    push_line(&mut out, &format!("X-WR-TIMEZONE:{}", doc.timezone.tzid));
    out.push_str(&doc.timezone.to_ics());
    out.push_str(&render_events(doc));
    push_line(&mut out, "END:VCALENDAR");
    out
}

/// Render the VEVENT components only.
fn render_events(doc: &CalendarDocument) -> String {
    if doc.events.is_empty() {
        return String::new();
    }

    let mut cal = Calendar::new();
    let stamp = doc.stamp.format("%Y%m%dT%H%M%SZ").to_string();
    for event in &doc.events {
        cal.push(to_ics_event(event, &stamp));
    }
    let rendered = cal.done().to_string();

    // Keep everything between the first VEVENT and the closing VCALENDAR;
    // the library's own header is replaced by ours.
    let Some(begin) = rendered.find("BEGIN:VEVENT") else {
        return String::new();
    };
    let end = rendered.rfind("END:VCALENDAR").unwrap_or(rendered.len());

    let mut out = String::with_capacity(end.saturating_sub(begin));
    for line in rendered[begin..end].split_terminator('\n') {
        let line = line.trim_end_matches('\r');
        if !line.is_empty() {
            push_line(&mut out, line);
        }
    }
    out
}

fn to_ics_event(event: &NormalizedEvent, stamp: &str) -> icalendar::Event {
    let mut ics_event = icalendar::Event::new();
    ics_event.uid(&event.uid());
    ics_event.summary(&event.title);
    ics_event.add_property("DTSTAMP", stamp);

    add_datetime_property(&mut ics_event, "DTSTART", &event.start);
    add_datetime_property(&mut ics_event, "DTEND", &event.end);

    if let Some(ref desc) = event.description {
        ics_event.description(desc);
    }
    if let Some(ref loc) = event.location {
        ics_event.location(loc);
    }

    if !event.calendar_name.is_empty() {
        ics_event.add_property("CATEGORIES", &event.calendar_name);
    }

    ics_event.done()
}

/// Add a datetime property formatted by `EventTime` variant.
fn add_datetime_property(ics_event: &mut icalendar::Event, name: &str, time: &EventTime) {
    match time {
        EventTime::Date(d) => {
            let mut prop = Property::new(name, d.format("%Y%m%d").to_string());
            prop.append_parameter(ValueType::Date);
            ics_event.append_property(prop);
        }
        EventTime::DateTimeUtc(dt) => {
            ics_event.add_property(name, dt.format("%Y%m%dT%H%M%SZ").to_string());
        }
        EventTime::DateTimeFloating(dt) => {
            ics_event.add_property(name, dt.format("%Y%m%dT%H%M%S").to_string());
        }
    }
}

/// Clip every SUMMARY value longer than `limit` characters to `limit`
/// characters plus `POST_PASS_MARKER`.
///
/// Folded lines are joined before measuring and refolded after a rewrite.
/// Lines that need no rewrite keep their exact bytes, so running this twice
/// gives the same output as running it once. A limit of 0 disables the pass.
pub fn enforce_title_limit(ics: &str, limit: usize) -> String {
    if limit == 0 {
        return ics.to_string();
    }

    let mut out = String::with_capacity(ics.len());
    for physical in content_lines(ics) {
        let logical = unfold(&physical);
        match clip_summary(&logical, limit) {
            Some(clipped) => {
                tracing::debug!(line = %logical, "Clipped title line");
                push_folded(&mut out, &clipped);
            }
            None => {
                for line in physical {
                    push_line(&mut out, line);
                }
            }
        }
    }
    out
}

/// Group physical lines into content lines (a line plus its continuations).
fn content_lines(ics: &str) -> Vec<Vec<&str>> {
    let mut groups: Vec<Vec<&str>> = Vec::new();
    for line in ics.split_terminator('\n') {
        let line = line.trim_end_matches('\r');
        let continues = line.starts_with(' ') || line.starts_with('\t');
        match groups.last_mut() {
            Some(group) if continues => group.push(line),
            _ => groups.push(vec![line]),
        }
    }
    groups
}

fn unfold(physical: &[&str]) -> String {
    let mut logical = String::new();
    for (i, line) in physical.iter().enumerate() {
        if i == 0 {
            logical.push_str(line);
        } else {
            logical.push_str(&line[1..]);
        }
    }
    logical
}

/// The rewritten SUMMARY line, or `None` when it is within the ceiling.
fn clip_summary(line: &str, limit: usize) -> Option<String> {
    let rest = line.strip_prefix("SUMMARY")?;
    if !(rest.starts_with(':') || rest.starts_with(';')) {
        return None;
    }
    let colon = line.find(':')?;
    let (name, value) = (&line[..colon], &line[colon + 1..]);

    let len = value.chars().count();
    if len <= limit {
        return None;
    }
    if value.ends_with(POST_PASS_MARKER) && len <= limit + POST_PASS_MARKER.len() {
        return None;
    }

    let mut head: String = value.chars().take(limit).collect();
    // An odd run of trailing backslashes means the cut landed inside an escape
    let trailing = head.chars().rev().take_while(|&c| c == '\\').count();
    if trailing % 2 == 1 {
        head.pop();
    }

    Some(format!("{name}:{head}{POST_PASS_MARKER}"))
}

/// RFC 5545 TEXT escaping.
fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            ';' => escaped.push_str("\\;"),
            ',' => escaped.push_str("\\,"),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            c => escaped.push(c),
        }
    }
    escaped
}

/// Push a content line folded at 75 octets, never inside a UTF-8 sequence.
fn push_folded(out: &mut String, line: &str) {
    let mut width = 0;
    for c in line.chars() {
        let len = c.len_utf8();
        if width + len > FOLD_OCTETS {
            out.push_str("\r\n ");
            width = 1;
        }
        out.push(c);
        width += len;
    }
    out.push_str("\r\n");
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push_str("\r\n");
}
