use lumera_core::{HierarchyNode, KindFilter, NodeKind};

fn group(id: i64, title: &str, elements: Vec<HierarchyNode>) -> HierarchyNode {
    HierarchyNode {
        kind: NodeKind::Group,
        id,
        title: title.to_owned(),
        elements,
        upload_url: None,
        page_url: None,
    }
}

fn photo_set(id: i64, title: &str) -> HierarchyNode {
    HierarchyNode {
        kind: NodeKind::PhotoSet,
        id,
        title: title.to_owned(),
        elements: Vec::new(),
        upload_url: Some(format!("https://up.lumera.photos/{id}")),
        page_url: None,
    }
}

fn sample_tree() -> HierarchyNode {
    group(
        1,
        "Home",
        vec![
            group(
                10,
                "Travel",
                vec![photo_set(100, "Iceland"), photo_set(101, "Japan")],
            ),
            photo_set(11, "Loose Shots"),
        ],
    )
}

#[test]
fn resolves_nested_titles() {
    let root = sample_tree();

    let node = root
        .resolve("/Home/Travel/Iceland", '/', KindFilter::PhotoSet)
        .unwrap();
    assert_eq!(node.id, 100);

    let node = root.resolve("/Home/Travel", '/', KindFilter::Group).unwrap();
    assert_eq!(node.id, 10);
}

#[test]
fn leading_empty_segment_is_optional() {
    let root = sample_tree();

    let with_slash = root.resolve("/Home/Travel", '/', KindFilter::Any).unwrap();
    let without = root.resolve("Home/Travel", '/', KindFilter::Any).unwrap();
    assert_eq!(with_slash.id, without.id);
}

#[test]
fn root_title_alone_resolves_to_root() {
    let root = sample_tree();

    let node = root.resolve("/Home", '/', KindFilter::Group).unwrap();
    assert_eq!(node.id, 1);

    assert!(root.resolve("/Home", '/', KindFilter::PhotoSet).is_none());
}

#[test]
fn root_title_mismatch_is_not_found() {
    let root = sample_tree();
    assert!(root.resolve("/Office/Travel", '/', KindFilter::Any).is_none());
}

#[test]
fn missing_intermediate_segment_is_not_found() {
    let root = sample_tree();
    assert!(
        root.resolve("/Home/Nowhere/Iceland", '/', KindFilter::Any)
            .is_none()
    );
}

#[test]
fn leaf_kind_mismatch_is_not_found() {
    let root = sample_tree();
    assert!(
        root.resolve("/Home/Travel/Iceland", '/', KindFilter::Group)
            .is_none()
    );
    assert!(root.resolve("/Home/Travel", '/', KindFilter::PhotoSet).is_none());
}

#[test]
fn photo_sets_have_no_descendants() {
    let root = sample_tree();
    assert!(
        root.resolve("/Home/Loose Shots/Inner", '/', KindFilter::Any)
            .is_none()
    );
}

#[test]
fn first_match_wins_on_duplicate_titles() {
    let root = group(
        1,
        "Home",
        vec![photo_set(50, "Twin"), photo_set(51, "Twin")],
    );

    let node = root.resolve("/Home/Twin", '/', KindFilter::Any).unwrap();
    assert_eq!(node.id, 50);
}

#[test]
fn empty_and_doubled_segments_fail() {
    let root = sample_tree();
    assert!(root.resolve("", '/', KindFilter::Any).is_none());
    assert!(root.resolve("/", '/', KindFilter::Any).is_none());
    assert!(root.resolve("/Home//Travel", '/', KindFilter::Any).is_none());
    assert!(root.resolve("/Home/Travel/", '/', KindFilter::Any).is_none());
}

#[test]
fn delimiter_is_configurable() {
    let root = sample_tree();
    let node = root
        .resolve(":Home:Travel:Japan", ':', KindFilter::PhotoSet)
        .unwrap();
    assert_eq!(node.id, 101);
}

#[test]
fn wire_nodes_decode_with_type_discriminator() {
    let root: HierarchyNode = serde_json::from_value(serde_json::json!({
        "$type": "Group",
        "Id": 7,
        "Title": "Home",
        "Elements": [
            {
                "$type": "PhotoSet",
                "Id": 8,
                "Title": "Prints",
                "UploadUrl": "https://up.lumera.photos/8",
                "PageUrl": "https://lumera.photos/ansel/prints"
            },
            { "$type": "Calendar", "Id": 9, "Title": "Oddity" }
        ]
    }))
    .unwrap();

    assert_eq!(root.kind, NodeKind::Group);
    assert_eq!(root.elements[0].kind, NodeKind::PhotoSet);
    assert_eq!(
        root.elements[0].upload_url.as_deref(),
        Some("https://up.lumera.photos/8")
    );
    assert_eq!(root.elements[1].kind, NodeKind::Other);
}
