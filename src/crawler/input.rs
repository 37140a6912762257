//! Input line parsing
//!
//! Each input line is `<identifier>[<TAB><handle>]`. Only the first two
//! TAB-separated fields are looked at; anything after them is ignored but kept
//! in the raw line.

/// Fields parsed from one input line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputLine<'a> {
    pub id: u64,
    pub handle: Option<&'a str>,
}

/// Parses an input line
///
/// Returns `None` when the identifier field is not an unsigned integer; such
/// lines are skipped. An empty handle field counts as absent.
pub fn parse_line(line: &str) -> Option<InputLine<'_>> {
    let mut fields = line.split('\t');
    let id = fields.next()?.parse::<u64>().ok()?;
    let handle = fields.next().filter(|handle| !handle.is_empty());
    Some(InputLine { id, handle })
}
