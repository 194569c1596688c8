//! End-to-end capture/resolve behaviour over page snapshots

use anchor_locator::{
    CaptureOptions, ContextNode, Locator, MatchKind, PrecisionLevel, SelectorSet, Target,
};
use waypoint_dom_snapshot::{DocumentId, Page};

const DASHBOARD: &str = r#"
<html>
  <body>
    <header><a class="logo" href="/">Acme</a></header>
    <div id="app">
      <section class="panel">
        <div class="row">
          <div class="cell"><button class="save-btn">Save</button></div>
          <div class="cell"><button class="cancel-btn">Cancel</button></div>
        </div>
        <ul class="list">
          <li>alpha</li>
          <li>beta</li>
          <li>gamma</li>
        </ul>
      </section>
      <form>
        <input name="email" type="email">
        <input name="password" type="password">
      </form>
    </div>
  </body>
</html>"#;

fn node(selectors: &[&str], depth: usize, parent: Option<ContextNode>) -> ContextNode {
    let mut node = ContextNode::leaf(selectors.iter().copied().collect::<SelectorSet>());
    node.depth = depth;
    node.parent = parent.map(Box::new);
    node
}

/// `.save-btn` > `.cell` > `.row` > `section.panel` > `#app`
fn save_button_chain() -> ContextNode {
    let app = node(&["#app"], 4, None);
    let panel = node(&["section.panel"], 3, Some(app));
    let row = node(&[".row"], 2, Some(panel));
    let cell = node(&[".cell"], 1, Some(row));
    node(&[".save-btn"], 0, Some(cell))
}

#[test]
fn every_anchorable_element_round_trips() {
    let page = Page::parse(DASHBOARD);
    let locator = Locator::default();

    for element in page.top().elements() {
        if element.is_structural_boundary() {
            continue;
        }
        let target = match locator.capture(&element, &CaptureOptions::default()) {
            Ok(target) => target,
            Err(err) => panic!("{element} should be anchorable: {err}"),
        };
        let result = locator
            .resolve(&target, page.top())
            .unwrap_or_else(|| panic!("{element} did not resolve"));
        assert_eq!(result.element, element);
        assert_eq!(result.match_kind, MatchKind::Strict, "{element}");
    }
}

#[test]
fn resolution_is_idempotent() {
    let page = Page::parse(DASHBOARD);
    let locator = Locator::default();
    let beta = page.top().query_selector_all("li").unwrap()[1];
    let target = locator.capture(&beta, &CaptureOptions::default()).unwrap();

    let first = locator.resolve(&target, page.top()).unwrap();
    let second = locator.resolve(&target, page.top()).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.report(), second.report());
}

#[test]
fn persisted_target_survives_json() {
    let page = Page::parse(DASHBOARD);
    let locator = Locator::default();
    let email = page.top().query_selector("input[name=email]").unwrap().unwrap();
    let target = locator.capture(&email, &CaptureOptions::default()).unwrap();

    let json = serde_json::to_string(&target).unwrap();
    assert!(json.contains("\"contextTree\""));
    let reloaded: Target = serde_json::from_str(&json).unwrap();
    assert_eq!(reloaded, target);

    let reparsed = Page::parse(DASHBOARD);
    let result = locator.resolve(&reloaded, reparsed.top()).unwrap();
    assert_eq!(result.element.attr("name"), Some("email"));
}

#[test]
fn sole_match_is_not_rejected_by_tie_breaking() {
    let page = Page::parse(DASHBOARD);
    let locator = Locator::default();
    let target = Target::auto(save_button_chain());
    let result = locator.resolve(&target, page.top()).unwrap();
    assert_eq!(result.element.text_content(), "Save");
    assert_eq!(result.match_kind, MatchKind::Strict);
}

#[test]
fn ancestor_chain_disambiguates_duplicates() {
    let page = Page::parse(
        r#"
        <div id="sidebar"><div class="row"><button class="save-btn">Save</button></div></div>
        <div id="app">
          <section class="panel">
            <div class="row"><div class="cell"><button class="save-btn">Save</button></div></div>
          </section>
        </div>"#,
    );
    let locator = Locator::default();
    let result = locator.resolve(&Target::auto(save_button_chain()), page.top()).unwrap();

    let expected = page.top().query_selector(".cell > .save-btn").unwrap().unwrap();
    assert_eq!(result.element, expected);
    assert_eq!(result.match_kind, MatchKind::Strict);
}

#[test]
fn removed_ancestor_degrades_by_precision_level() {
    // div.cell removed: the button now sits directly in div.row
    let mutated = Page::parse(
        r#"
        <div id="app">
          <section class="panel">
            <div class="row"><button class="save-btn">Save</button></div>
          </section>
        </div>"#,
    );
    let locator = Locator::default();

    let medium = Target::auto(save_button_chain());
    let result = locator.resolve(&medium, mutated.top()).unwrap();
    assert_eq!(result.element.text_content(), "Save");
    match result.match_kind {
        MatchKind::Degraded { rate } => assert!((rate - 7.5).abs() < 1e-9),
        other => panic!("expected degraded match, got {other:?}"),
    }

    let looser = Target::auto(save_button_chain()).with_precision(PrecisionLevel::Looser);
    assert!(locator.resolve(&looser, mutated.top()).is_some());

    let stricter = Target::auto(save_button_chain()).with_precision(PrecisionLevel::Stricter);
    assert!(locator.resolve(&stricter, mutated.top()).is_none());
}

#[test]
fn unrelated_ancestry_is_never_accepted() {
    let elsewhere = Page::parse(r#"<nav><ul><li><span><button class="save-btn">Far</button></span></li></ul></nav>"#);
    let locator = Locator::default();
    for level in [PrecisionLevel::Looser, PrecisionLevel::Medium] {
        let target = Target::auto(save_button_chain()).with_precision(level);
        assert!(locator.resolve(&target, elsewhere.top()).is_none(), "{level}");
    }
}

#[test]
fn replaced_wrapper_still_resolves() {
    let page = Page::parse(
        r#"
        <div id="app">
          <section class="panel">
            <div class="row"><div class="box"><button class="save-btn">Near</button></div></div>
          </section>
        </div>"#,
    );
    let locator = Locator::default();
    let result = locator.resolve(&Target::auto(save_button_chain()), page.top()).unwrap();
    assert_eq!(result.element.text_content(), "Near");
    assert_eq!(result.match_kind, MatchKind::Degraded { rate: 7.5 });
}

#[test]
fn surviving_structure_beats_unrelated_duplicate() {
    let page = Page::parse(
        r#"
        <nav><ul><li><span><button class="save-btn">Far</button></span></li></ul></nav>
        <div id="app">
          <section class="panel">
            <div class="row"><div class="box"><button class="save-btn">Near</button></div></div>
          </section>
        </div>"#,
    );
    let locator = Locator::default();
    let result = locator.resolve(&Target::auto(save_button_chain()), page.top()).unwrap();
    assert_eq!(result.element.text_content(), "Near");
    assert!(result.match_kind.is_degraded());
}

#[test]
fn missing_custom_selector_returns_none() {
    let page = Page::parse(DASHBOARD);
    let locator = Locator::default();
    assert!(locator
        .resolve(&Target::custom("div#nonexistent", 0), page.top())
        .is_none());
    assert!(locator
        .resolve(&Target::custom("div#nonexistent", 0).across_frames(true), page.top())
        .is_none());
}

#[test]
fn inaccessible_frame_is_skipped() {
    let mut page = Page::parse_with_url(
        r#"<iframe id="ads"></iframe><iframe id="editor"></iframe>"#,
        "https://app.example.com/",
    )
    .unwrap();
    page.attach_frame(
        DocumentId::TOP,
        "#ads",
        r#"<button class="publish">Publish</button>"#,
        Some("https://ads.example.net/slot"),
    )
    .unwrap();
    let editor = page
        .attach_frame(
            DocumentId::TOP,
            "#editor",
            r#"<div class="toolbar"><button class="publish">Publish</button></div>"#,
            Some("/editor"),
        )
        .unwrap();

    let locator = Locator::default();
    let contexts = locator.enumerate_documents(page.top());
    let labels: Vec<&str> = contexts.iter().map(|ctx| ctx.frame_selector.as_str()).collect();
    assert_eq!(labels, vec!["", "iframe#editor"]);

    let target = Target::custom(".toolbar .publish", 0).across_frames(true);
    let result = locator.resolve(&target, page.top()).unwrap();
    assert_eq!(result.element.document().id(), editor);
    assert_eq!(result.iframe_context, "iframe#editor");
    assert!(result.is_in_iframe);

    let button = page
        .document(editor)
        .unwrap()
        .query_selector(".publish")
        .unwrap()
        .unwrap();
    let captured = locator
        .capture(
            &button,
            &CaptureOptions {
                search_across_frames: true,
                ..CaptureOptions::default()
            },
        )
        .unwrap();
    assert_eq!(locator.resolve(&captured, page.top()).unwrap().element, button);
}

#[test]
fn enumeration_is_deterministic() {
    let page = Page::parse(
        r#"<iframe srcdoc="<iframe name='inner' srcdoc='<p>x</p>'></iframe>"></iframe>
           <iframe class="preview" srcdoc="<p>y</p>"></iframe>"#,
    );
    let locator = Locator::default();
    let first = locator.enumerate_documents(page.top());
    let second = locator.enumerate_documents(page.top());
    assert_eq!(first, second);
    assert_eq!(first.len(), 4);
    assert_eq!(first[0].frame_selector, "");
}

#[test]
fn frame_search_disabled_only_sees_root() {
    let mut page = Page::parse("<iframe id='f'></iframe>");
    page.attach_frame(DocumentId::TOP, "#f", "<b id='inside'>x</b>", None)
        .unwrap();
    let locator = Locator::default();
    let target = Target::custom("#inside", 0);
    assert!(locator.resolve(&target, page.top()).is_none());
    assert!(locator.resolve(&target.across_frames(true), page.top()).is_some());
}
