//! Core types shared by the harness: switches, links and flow entries

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Datapath identifier of a switch
pub type Dpid = u64;

/// EtherType of IPv4
pub const ETH_TYPE_IP: u16 = 0x0800;

/// IP protocol number of TCP
pub const IPPROTO_TCP: u8 = 6;

/// Priority the controller assumes for flows that carry none
pub const OFP_DEFAULT_PRIORITY: u16 = 0x8000;

const SWITCH_ID_PREFIX: &str = "node-switch-";

/// DOM id of the node drawn for a switch
pub fn switch_element_id(dpid: Dpid) -> String {
    format!("{}{}", SWITCH_ID_PREFIX, dpid)
}

/// Inverse of [`switch_element_id`]
pub fn parse_switch_element_id(id: &str) -> Option<Dpid> {
    id.strip_prefix(SWITCH_ID_PREFIX)?.parse().ok()
}

/// Label the topology view prints for a switch
pub fn switch_label(dpid: Dpid) -> String {
    format!("dpid: 0x{:x}", dpid)
}

/// Emulator name of the n-th switch; the emulator assigns dpid n to it
pub fn switch_name(n: Dpid) -> String {
    format!("s{}", n)
}

/// Interface name of port `port` on switch `switch`
pub fn port_name(switch: &str, port: u32) -> String {
    format!("{}-eth{}", switch, port)
}

/// A flow entry as accepted by `/stats/flowentry/{add,modify,delete}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowEntry {
    pub dpid: Dpid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_id: Option<u8>,
    #[serde(rename = "match", default)]
    pub matches: FlowMatch,
    #[serde(default)]
    pub actions: Vec<FlowAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_sec: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_nsec: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowMatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_port: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dl_type: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nw_proto: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tp_src: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tp_dst: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowAction {
    Output { port: u32 },
}

impl FlowEntry {
    /// TCP flow on `dpid` matching source port `tp_src`, forwarded to `out_port`
    pub fn tcp_output(dpid: Dpid, priority: u16, tp_src: u16, out_port: u32) -> Self {
        Self {
            dpid,
            priority: Some(priority),
            table_id: None,
            matches: FlowMatch {
                dl_type: Some(ETH_TYPE_IP),
                nw_proto: Some(IPPROTO_TCP),
                tp_src: Some(tp_src),
                ..Default::default()
            },
            actions: vec![FlowAction::Output { port: out_port }],
            duration_sec: None,
            duration_nsec: None,
        }
    }

    pub fn effective_priority(&self) -> u16 {
        self.priority.unwrap_or(OFP_DEFAULT_PRIORITY)
    }

    /// Port of the first output action
    pub fn output_port(&self) -> Option<u32> {
        self.actions.iter().map(|FlowAction::Output { port }| *port).next()
    }

    /// Rewrites the port of every output action
    pub fn set_output_port(&mut self, port: u32) {
        for action in &mut self.actions {
            let FlowAction::Output { port: p } = action;
            *p = port;
        }
    }

    /// Order in which the flow list renders entries: table ascending,
    /// priority descending, then the longest-lived flow first.
    pub fn display_order(a: &FlowEntry, b: &FlowEntry) -> Ordering {
        a.table_id
            .unwrap_or(0)
            .cmp(&b.table_id.unwrap_or(0))
            .then_with(|| b.effective_priority().cmp(&a.effective_priority()))
            .then_with(|| {
                b.duration_sec
                    .unwrap_or(0)
                    .cmp(&a.duration_sec.unwrap_or(0))
            })
            .then_with(|| {
                b.duration_nsec
                    .unwrap_or(0)
                    .cmp(&a.duration_nsec.unwrap_or(0))
            })
    }
}

/// Sort flows the way the flow list shows them; stable for ties
pub fn sort_for_display(flows: &mut [FlowEntry]) {
    flows.sort_by(FlowEntry::display_order);
}

/// What the link list should show for one local port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedLink {
    pub port_no: u32,
    pub peer: String,
}

/// Expected link list content keyed by local port name
pub type ExpectedLinks = BTreeMap<String, ExpectedLink>;

/// Text of one rendered link list row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRowText {
    pub no: String,
    pub name: String,
    pub peer: String,
}

/// Text of the three value cells of one rendered flow list row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRowText {
    pub stats: String,
    pub rules: String,
    pub actions: String,
}

impl FlowRowText {
    /// Cells of rows scrolled out of the list render without text
    pub fn is_rendered(&self) -> bool {
        !self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(1, "dpid: 0x1" ; "single digit")]
    #[test_case(255, "dpid: 0xff" ; "lowercase hex")]
    #[test_case(0x1_0000_0000, "dpid: 0x100000000" ; "wide dpid")]
    fn test_switch_label(dpid: Dpid, expected: &str) {
        assert_eq!(switch_label(dpid), expected);
    }

    #[test]
    fn test_switch_element_id() {
        assert_eq!(switch_element_id(12), "node-switch-12");
        assert_eq!(parse_switch_element_id("node-switch-12"), Some(12));
        assert_eq!(parse_switch_element_id("node-switch-"), None);
        assert_eq!(parse_switch_element_id("node-host-3"), None);
    }

    #[test]
    fn test_names() {
        assert_eq!(switch_name(4), "s4");
        assert_eq!(port_name("s1", 3), "s1-eth3");
    }

    #[test]
    fn test_flow_entry_request_body() {
        let flow = FlowEntry::tcp_output(1, 100, 99, 1);
        let body = serde_json::to_value(&flow).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "dpid": 1,
                "priority": 100,
                "match": {"dl_type": 2048, "nw_proto": 6, "tp_src": 99},
                "actions": [{"type": "OUTPUT", "port": 1}]
            })
        );
    }

    #[test]
    fn test_flow_entry_from_stats_reply() {
        let raw = r#"{"dpid": 1, "table_id": 0, "duration_sec": 12, "duration_nsec": 5,
                      "priority": 101, "match": {"tp_src": 102},
                      "actions": [{"type": "OUTPUT", "port": 2}]}"#;
        let flow: FlowEntry = serde_json::from_str(raw).unwrap();
        assert_eq!(flow.duration_sec, Some(12));
        assert_eq!(flow.output_port(), Some(2));
        assert_eq!(flow.matches.tp_src, Some(102));
    }

    #[test]
    fn test_set_output_port() {
        let mut flow = FlowEntry::tcp_output(1, 100, 103, 2);
        flow.set_output_port(3);
        assert_eq!(flow.output_port(), Some(3));
    }

    #[test]
    fn test_display_order() {
        let mut low = FlowEntry::tcp_output(1, 100, 1, 1);
        let high = FlowEntry::tcp_output(1, 104, 2, 1);
        let mut default_prio = FlowEntry::tcp_output(1, 0, 3, 1);
        default_prio.priority = None;
        let mut other_table = FlowEntry::tcp_output(1, 200, 4, 1);
        other_table.table_id = Some(1);
        let mut older_low = low.clone();
        older_low.duration_sec = Some(30);
        low.duration_sec = Some(10);

        let mut flows = vec![
            other_table.clone(),
            low.clone(),
            high.clone(),
            older_low.clone(),
            default_prio.clone(),
        ];
        sort_for_display(&mut flows);

        assert_eq!(flows, vec![default_prio, high, older_low, low, other_table]);
    }

    #[test]
    fn test_display_order_nsec_tiebreak() {
        let mut a = FlowEntry::tcp_output(1, 100, 1, 1);
        let mut b = a.clone();
        a.duration_nsec = Some(10);
        b.duration_nsec = Some(20);
        assert_eq!(FlowEntry::display_order(&a, &b), Ordering::Greater);
        assert_eq!(FlowEntry::display_order(&b, &a), Ordering::Less);
        assert_eq!(FlowEntry::display_order(&a, &a), Ordering::Equal);
    }

    #[test]
    fn test_flow_row_rendered() {
        let mut row = FlowRowText::default();
        assert!(!row.is_rendered());
        row.actions = "OUTPUT:1".to_string();
        assert!(row.is_rendered());
    }
}
