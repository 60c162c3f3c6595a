//! Comparison of rendered list content against backend state

use regex::Regex;

use crate::error::{Error, Result};
use crate::types::{ExpectedLinks, FlowEntry, FlowRowText, LinkRowText};

/// `re.search`-style match: the pattern may occur anywhere in `text`
pub fn text_matches(pattern: &str, text: &str) -> Result<bool> {
    Ok(Regex::new(pattern)?.is_match(text))
}

/// Checks the link list rows against the expected links.
///
/// Row count must be exact and every row must name an expected port with
/// the expected number and peer.
pub fn check_link_rows(expected: &ExpectedLinks, rows: &[LinkRowText]) -> Result<()> {
    if rows.len() != expected.len() {
        return Err(Error::mismatch(
            "link-list",
            format!("expected {} rows, found {}", expected.len(), rows.len()),
        ));
    }

    for row in rows {
        let link = expected.get(&row.name).ok_or_else(|| {
            Error::mismatch("link-list", format!("unexpected port {}", row.name))
        })?;
        if link.port_no.to_string() != row.no {
            return Err(Error::mismatch(
                "link-list",
                format!("{}: port no {} != {}", row.name, row.no, link.port_no),
            ));
        }
        if link.peer != row.peer {
            return Err(Error::mismatch(
                "link-list",
                format!("{}: peer {} != {}", row.name, row.peer, link.peer),
            ));
        }
    }
    Ok(())
}

/// Checks one flow list row against the flow it should display.
///
/// The stats cell must show the priority, the rules cell the TCP source
/// port and the actions cell the first output port.
pub fn check_flow_row(index: usize, flow: &FlowEntry, row: &FlowRowText) -> Result<()> {
    let priority = flow.effective_priority();
    if !text_matches(&format!("priority={}", priority), &row.stats)? {
        return Err(Error::mismatch(
            "flow-list",
            format!("i={}, priority={}, display={}", index, priority, row.stats),
        ));
    }

    if let Some(tp_src) = flow.matches.tp_src {
        if !text_matches(&format!("tp_src={}", tp_src), &row.rules)? {
            return Err(Error::mismatch(
                "flow-list",
                format!("i={}, tp_src={}, display={}", index, tp_src, row.rules),
            ));
        }
    }

    if let Some(port) = flow.output_port() {
        if !text_matches(&format!("OUTPUT:{}", port), &row.actions)? {
            return Err(Error::mismatch(
                "flow-list",
                format!("i={}, OUTPUT={}, display={}", index, port, row.actions),
            ));
        }
    }
    Ok(())
}
