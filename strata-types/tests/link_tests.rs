use serde_json::json;
use strata_types::{Link, LinkTarget};

// ── parsing ──────────────────────────────────────────────────────

#[test]
fn link_from_raw_entry() {
    let raw = json!({"sys": {"type": "Link", "linkType": "Entry", "id": "nyancat"}});
    let link = Link::from_raw(&raw).unwrap();
    assert_eq!(link.link_type, LinkTarget::Entry);
    assert_eq!(link.target.as_str(), "nyancat");
}

#[test]
fn link_from_raw_asset() {
    let raw = json!({"sys": {"type": "Link", "linkType": "Asset", "id": "cat-photo"}});
    let link = Link::from_raw(&raw).unwrap();
    assert_eq!(link.link_type, LinkTarget::Asset);
}

#[test]
fn link_from_raw_rejects_plain_values() {
    assert!(Link::from_raw(&json!("just a string")).is_none());
    assert!(Link::from_raw(&json!(42)).is_none());
    assert!(Link::from_raw(&json!({"title": "no sys here"})).is_none());
    assert!(Link::from_raw(&json!([1, 2, 3])).is_none());
}

#[test]
fn link_from_raw_rejects_non_link_sys() {
    // An embedded resource has a sys block too, but type != "Link".
    let raw = json!({"sys": {"type": "Entry", "id": "nyancat"}});
    assert!(Link::from_raw(&raw).is_none());
}

#[test]
fn link_from_raw_rejects_unknown_link_type() {
    let raw = json!({"sys": {"type": "Link", "linkType": "Space", "id": "xyz"}});
    assert!(Link::from_raw(&raw).is_none());
}

#[test]
fn link_from_raw_rejects_empty_id() {
    let raw = json!({"sys": {"type": "Link", "linkType": "Entry", "id": ""}});
    assert!(Link::from_raw(&raw).is_none());
}

// ── serialization ────────────────────────────────────────────────

#[test]
fn link_to_raw_wire_shape() {
    let link = Link::new(LinkTarget::Entry, "nyancat");
    assert_eq!(
        link.to_raw(),
        json!({"sys": {"type": "Link", "linkType": "Entry", "id": "nyancat"}})
    );
}

#[test]
fn link_roundtrip() {
    let link = Link::new(LinkTarget::Asset, "garfield");
    assert_eq!(Link::from_raw(&link.to_raw()).unwrap(), link);
}
