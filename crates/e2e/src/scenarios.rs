//! GUI scenarios
//!
//! Every scenario starts from a freshly loaded page with the connection
//! dialog open (see [`GuiSession::set_up`]) and leaves cleanup of the
//! emulated network to [`GuiSession::tear_down`].

use std::collections::BTreeMap;
use std::time::Duration;
use futures::future::{FutureExt, LocalBoxFuture};
use tokio::time::sleep;
use tracing::info;

use topogui_common::checks::{check_flow_row, check_link_rows, text_matches};
use topogui_common::geometry::{approx_eq, distance, distances_equal};
use topogui_common::types::{
    port_name, sort_for_display, switch_label, switch_name, Dpid, ExpectedLink, ExpectedLinks,
    FlowEntry,
};
use topogui_common::Rect;

use crate::browser::{self, click_and_drag, drag_by_offset, resize_by_offset, Located};
use crate::elements::{Closable, Draggable, Region};
use crate::error::{ensure, ensure_eq, E2eResult};
use crate::session::GuiSession;
use crate::waits::DriverUtil;

/// Time the topology view needs to finish moving switches
const ANIMATION_SETTLE: Duration = Duration::from_secs(1);

/// Port the connection dialog proposes before the user edits it
const DIALOG_DEFAULT_PORT: &str = "8080";

const REGION_DRAG: i64 = 50;
const REGION_RESIZE: i64 = 20;
const SWITCH_DRAG: i64 = 10;

/// Attempts the flow list gets to redraw after a flow table change
const FLOW_REFRESH_ATTEMPTS: u32 = 10;

pub type ScenarioFn = for<'a> fn(&'a mut GuiSession) -> LocalBoxFuture<'a, E2eResult<()>>;

/// A named scenario
#[derive(Clone, Copy)]
pub struct Scenario {
    pub name: &'static str,
    pub description: &'static str,
    pub run: ScenarioFn,
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario").field("name", &self.name).finish()
    }
}

/// All scenarios in execution order
pub fn all() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "default",
            description: "initial page state before connecting",
            run: |s| default(s).boxed_local(),
        },
        Scenario {
            name: "contents_close_open",
            description: "regions close and reopen from the menu",
            run: |s| contents_close_open(s).boxed_local(),
        },
        Scenario {
            name: "contents_draggable",
            description: "regions move with their title bar",
            run: |s| contents_draggable(s).boxed_local(),
        },
        Scenario {
            name: "contents_resize",
            description: "regions grow with their resize handle",
            run: |s| contents_resize(s).boxed_local(),
        },
        Scenario {
            name: "connected",
            description: "the dialog connects the GUI to the REST API",
            run: |s| connected(s).boxed_local(),
        },
        Scenario {
            name: "topology_discovery",
            description: "switches appear, lay out, select, move and vanish",
            run: |s| topology_discovery(s).boxed_local(),
        },
        Scenario {
            name: "link_discovery",
            description: "the link list follows link changes",
            run: |s| link_discovery(s).boxed_local(),
        },
        Scenario {
            name: "flow_discovery",
            description: "the flow list follows flow table changes",
            run: |s| flow_discovery(s).boxed_local(),
        },
    ]
}

pub fn find(name: &str) -> Option<Scenario> {
    all().into_iter().find(|s| s.name == name)
}

async fn displayed(el: &Located) -> E2eResult<bool> {
    DriverUtil::is_displayed(el).await
}

pub async fn default(session: &mut GuiSession) -> E2eResult<()> {
    let dialog = &session.dialog;
    ensure(displayed(&dialog.body()).await?, || {
        "connection dialog is not shown".to_string()
    })?;
    ensure_eq(
        dialog.host().value().await?,
        Some(session.config().gui.host.clone()),
        "dialog host",
    )?;
    ensure_eq(
        dialog.port().value().await?,
        Some(DIALOG_DEFAULT_PORT.to_string()),
        "dialog port",
    )?;

    dialog.cancel().click().await?;

    let topology = &session.topology;
    let text = topology.body().text().await?;
    ensure(text_matches("Disconnected", &text)?, || {
        format!("topology is not disconnected: {:?}", text)
    })?;
    let switches = topology.switches().find_all().await?.len();
    ensure_eq(switches, 0, "switches drawn before connecting")?;

    let link_list = &session.link_list;
    ensure(displayed(&link_list.body()).await?, || {
        "link list is not shown".to_string()
    })?;
    ensure_eq(link_list.row_count().await?, 0, "link list rows")?;

    let flow_list = &session.flow_list;
    ensure(displayed(&flow_list.body()).await?, || {
        "flow list is not shown".to_string()
    })?;
    ensure_eq(flow_list.rows().await?.len(), 0, "flow list rows")?;
    Ok(())
}

async fn close_open<R: Closable>(util: &DriverUtil, target: &R, opener: Located) -> E2eResult<()> {
    let body = target.body();
    util.wait_for_visible(&body).await?;

    target.close().click().await?;
    ensure(DriverUtil::is_hidden(&body).await?, || {
        format!("{} does not close content.", target.name())
    })?;

    opener.click().await?;
    util.wait_for_visible(&body).await?;
    Ok(())
}

pub async fn contents_close_open(session: &mut GuiSession) -> E2eResult<()> {
    let util = &session.util;
    let menu = &session.menu;

    close_open(util, &session.dialog, menu.dialog()).await?;
    session.dialog.close().click().await?;

    close_open(util, &session.link_list, menu.link_list()).await?;
    close_open(util, &session.flow_list, menu.flow_list()).await?;
    Ok(())
}

/// Position of an element, for exact comparisons after a move
fn origin(rect: &Rect) -> (f64, f64) {
    (rect.x, rect.y)
}

async fn drag_region<R: Draggable>(driver: &thirtyfour::WebDriver, target: &R) -> E2eResult<()> {
    let titlebar = target.titlebar().find().await?;
    let before = browser::rect(&titlebar).await?;

    click_and_drag(driver, &titlebar, REGION_DRAG, REGION_DRAG).await?;

    let after = browser::rect(&titlebar).await?;
    let moved = before.translated(REGION_DRAG as f64, REGION_DRAG as f64);
    ensure_eq(
        origin(&after),
        origin(&moved),
        &format!("{} draggable error", target.name()),
    )?;

    // Regions refuse to move onto each other, so put it back.
    click_and_drag(driver, &titlebar, -REGION_DRAG, -REGION_DRAG).await?;
    Ok(())
}

pub async fn contents_draggable(session: &mut GuiSession) -> E2eResult<()> {
    session.dialog.close().click().await?;

    let driver = session.driver();
    drag_region(driver, &session.menu).await?;
    drag_region(driver, &session.topology).await?;
    drag_region(driver, &session.link_list).await?;
    drag_region(driver, &session.flow_list).await?;
    Ok(())
}

async fn resize_region<R: Region>(
    driver: &thirtyfour::WebDriver,
    util: &DriverUtil,
    target: &R,
) -> E2eResult<()> {
    let body = target.body();
    util.wait_for_visible(&body).await?;

    let body_el = body.find().await?;
    let handle = target.resize_handle().find().await?;
    let before = browser::rect(&body_el).await?;

    resize_by_offset(driver, &body_el, &handle, REGION_RESIZE, REGION_RESIZE).await?;

    let after = browser::rect(&body_el).await?;
    ensure_eq(
        (after.width, after.height),
        (before.width + REGION_RESIZE as f64, before.height + REGION_RESIZE as f64),
        &format!("{} resize error", target.name()),
    )?;

    resize_by_offset(driver, &body_el, &handle, -REGION_RESIZE, -REGION_RESIZE).await?;
    Ok(())
}

pub async fn contents_resize(session: &mut GuiSession) -> E2eResult<()> {
    let driver = session.driver();
    let util = &session.util;

    resize_region(driver, util, &session.dialog).await?;
    session.dialog.cancel().click().await?;

    resize_region(driver, util, &session.menu).await?;
    resize_region(driver, util, &session.topology).await?;
    resize_region(driver, util, &session.link_list).await?;
    resize_region(driver, util, &session.flow_list).await?;
    Ok(())
}

pub async fn connected(session: &mut GuiSession) -> E2eResult<()> {
    let dialog = &session.dialog;
    let rest = &session.config().rest;
    dialog.host().fill(&rest.host).await?;
    dialog.port().fill(&rest.port.to_string()).await?;

    dialog.launch().click().await?;
    session
        .util
        .wait_for_text(&session.topology.body(), "Connected")
        .await?;
    Ok(())
}

async fn switch_rect(session: &GuiSession, dpid: Dpid) -> E2eResult<Rect> {
    browser::rect(&session.topology.switch(dpid).await?).await
}

async fn switch_distance(session: &GuiSession, a: Dpid, b: Dpid) -> E2eResult<f64> {
    let formula = session.config().layout.center_formula;
    Ok(distance(
        &switch_rect(session, a).await?,
        &switch_rect(session, b).await?,
        formula,
    ))
}

pub async fn topology_discovery(session: &mut GuiSession) -> E2eResult<()> {
    let emulator = session.emulator().await?;
    session.rest_connect().await?;

    let util = &session.util;
    let topo = &session.topology;
    let tolerance = session.config().layout.distance_tolerance;

    emulator.add_switch(&switch_name(1)).await?;
    util.wait_for_text(&topo.body(), &switch_label(1)).await?;

    for dpid in 2..=4 {
        emulator.add_switch(&switch_name(dpid)).await?;
    }
    for dpid in 2..=4 {
        util.wait_for_text(&topo.body(), &switch_label(dpid)).await?;
    }
    sleep(ANIMATION_SETTLE).await;

    // Four switches are drawn as a diamond.
    let sides = [
        switch_distance(session, 1, 2).await?,
        switch_distance(session, 2, 3).await?,
        switch_distance(session, 3, 4).await?,
        switch_distance(session, 4, 1).await?,
    ];
    ensure(distances_equal(&sides, tolerance), || {
        format!("switches are not laid out as a diamond: {:?}", sides)
    })?;

    for sw in topo.switches().find_all().await? {
        sw.click().await?;
        let dpid = topo.dpid_of(&sw).await?;
        ensure(topo.is_selected(&sw).await?, || {
            format!("dpid={} is not selected after click", dpid)
        })?;
    }

    let mut home = BTreeMap::new();
    for sw in topo.switches().find_all().await? {
        let dpid = topo.dpid_of(&sw).await?;
        let before = browser::rect(&sw).await?;
        home.insert(dpid, origin(&before));

        drag_by_offset(session.driver(), &sw, SWITCH_DRAG, SWITCH_DRAG).await?;

        let after = browser::rect(&sw).await?;
        let moved = before.translated(SWITCH_DRAG as f64, SWITCH_DRAG as f64);
        ensure_eq(
            origin(&after),
            origin(&moved),
            &format!("dpid={} draggable error", dpid),
        )?;
    }

    session.menu.redesign().click().await?;
    sleep(ANIMATION_SETTLE).await;
    for sw in topo.switches().find_all().await? {
        let dpid = topo.dpid_of(&sw).await?;
        let now = origin(&browser::rect(&sw).await?);
        ensure_eq(
            Some(now),
            home.get(&dpid).copied(),
            &format!("dpid={} position after redesign", dpid),
        )?;
    }

    emulator.del_switch(&switch_name(4)).await?;
    util.wait_for_text_absent(&topo.body(), &switch_label(4))
        .await?;
    sleep(ANIMATION_SETTLE).await;

    // Three switches are drawn as an isosceles triangle.
    let d12 = switch_distance(session, 1, 2).await?;
    let d13 = switch_distance(session, 1, 3).await?;
    ensure(approx_eq(d12, d13, tolerance), || {
        format!("switches are not an isosceles triangle: {} != {}", d12, d13)
    })?;

    emulator.stop().await?;
    for dpid in 1..=3 {
        util.wait_for_text_absent(&topo.body(), &switch_label(dpid))
            .await?;
    }
    Ok(())
}

pub async fn link_discovery(session: &mut GuiSession) -> E2eResult<()> {
    let emulator = session.emulator().await?;
    session.rest_connect().await?;

    let util = &session.util;
    let link_list = &session.link_list;

    for dpid in 1..=4 {
        emulator.add_switch(&switch_name(dpid)).await?;
    }
    util.wait_for_text(&session.topology.body(), &switch_label(1))
        .await?;
    session.topology.switch(1).await?.click().await?;

    let s1 = switch_name(1);
    let mut expected = ExpectedLinks::new();
    for (port, peer) in (1..).zip(2..=4) {
        let peer = switch_name(peer);
        emulator.add_link(&s1, &peer).await?;
        expected.insert(
            port_name(&s1, port),
            ExpectedLink {
                port_no: port,
                peer: port_name(&peer, 1),
            },
        );
    }

    for link in expected.values() {
        util.wait_for_text(&link_list.body(), &link.peer).await?;
    }
    check_link_rows(&expected, &link_list.row_texts().await?)?;
    let before = link_list.row_count().await?;

    let s4 = switch_name(4);
    emulator.del_link(&s1, &s4).await?;
    expected.remove(&port_name(&s1, 3));
    util.wait_for_text_absent(&link_list.body(), &port_name(&s4, 1))
        .await?;

    ensure_eq(link_list.row_count().await?, before - 1, "link rows after delete")?;
    check_link_rows(&expected, &link_list.row_texts().await?)?;
    Ok(())
}

/// Waits for the flow list to redraw, then checks it row by row against
/// `flows` in display order
async fn check_flow_list(session: &GuiSession, flows: &mut [FlowEntry]) -> E2eResult<()> {
    sort_for_display(flows);

    let list = &session.flow_list;
    let interval = session.util.interval();
    list.wait_for_refreshed(FLOW_REFRESH_ATTEMPTS, interval)
        .await?;

    ensure_eq(list.rows().await?.len(), flows.len(), "flow list rows")?;

    for (i, flow) in flows.iter().enumerate() {
        let mut row = list.row_text(i, interval).await?;
        if !row.is_rendered() {
            list.scroll_to_row(i).await?;
            row = list.row_text(i, interval).await?;
        }
        check_flow_row(i, flow, &row)?;
    }
    Ok(())
}

pub async fn flow_discovery(session: &mut GuiSession) -> E2eResult<()> {
    let emulator = session.emulator().await?;
    session.rest_connect().await?;

    let dpid: Dpid = 1;
    emulator.add_switch(&switch_name(dpid)).await?;
    session
        .util
        .wait_for_text(&session.topology.body(), &switch_label(dpid))
        .await?;
    session.topology.switch(dpid).await?.click().await?;

    let session = &*session;
    let rest = session.rest();
    let mut flows = Vec::new();

    info!("flow_discovery: single flow");
    let flow = FlowEntry::tcp_output(dpid, 100, 99, 1);
    rest.add_flow(&flow).await?;
    flows.push(flow);
    check_flow_list(session, &mut flows).await?;

    info!("flow_discovery: five more flows");
    for priority in 100..=104 {
        let flow = FlowEntry::tcp_output(dpid, priority, priority + 1, 2);
        rest.add_flow(&flow).await?;
        flows.push(flow);
    }
    check_flow_list(session, &mut flows).await?;

    let changed = |flow: &FlowEntry| matches!(flow.matches.tp_src, Some(103) | Some(104));

    info!("flow_discovery: modify output port");
    for flow in flows.iter_mut().filter(|f| changed(&**f)) {
        flow.set_output_port(3);
        rest.modify_flow(flow).await?;
    }
    check_flow_list(session, &mut flows).await?;

    info!("flow_discovery: delete flows");
    let (deleted, mut kept): (Vec<_>, Vec<_>) = flows.into_iter().partition(|f| changed(f));
    for flow in &deleted {
        rest.delete_flow(flow).await?;
    }
    check_flow_list(session, &mut kept).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_scenario_names_unique() {
        let names: HashSet<_> = all().iter().map(|s| s.name).collect();
        assert_eq!(names.len(), all().len());
    }

    #[test]
    fn test_find() {
        assert_eq!(find("flow_discovery").map(|s| s.name), Some("flow_discovery"));
        assert!(find("flow_discovary").is_none());
    }

    #[test]
    fn test_setup_only_scenarios_come_first() {
        let names: Vec<_> = all().iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec![
                "default",
                "contents_close_open",
                "contents_draggable",
                "contents_resize",
                "connected",
                "topology_discovery",
                "link_discovery",
                "flow_discovery",
            ]
        );
    }
}
