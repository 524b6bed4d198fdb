use super::*;
use std::error::Error as _;

#[test]
fn node_errors_convert_into_render_errors() {
    let err: RenderError = NodeError::Missing { id: 4 }.into();

    assert_eq!(err.to_string(), "render node 4 missing");
    let source = err.source().expect("node error is the source");
    assert_eq!(source.to_string(), "render node 4 missing");
}

#[test]
fn reconcile_errors_keep_their_source() {
    let err = RenderError::reconcile(NodeError::InvalidParent { id: 2 });

    assert_eq!(
        err.to_string(),
        "reconcile failed: render node 2 cannot hold children"
    );
    assert!(err.source().is_some());
    assert!(RenderError::Reentrant.source().is_none());
}

#[test]
fn component_ids_are_unique() {
    let first = next_component_id();
    let second = next_component_id();

    assert!(second > first);
}
