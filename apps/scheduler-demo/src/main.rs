use std::cell::RefCell;
use std::error::Error;
use std::rc::Rc;

use indexmap::IndexMap;
use ripple_core::collections::map::HashMap;
use ripple_core::{
    Component, ComponentId, DiffRequest, HostAnchor, HostId, NodeId, NodeKind, Reconciler,
    RenderError, RenderTree, StateUpdate,
};
use ripple_runtime_std::StdRuntime;

const ROOT_CONTAINER: HostId = 0;

type Counter = Component<&'static str, IndexMap<&'static str, i64>>;
type View = Box<dyn Fn() -> String>;
type Views = Rc<RefCell<HashMap<ComponentId, View>>>;

/// Flat stand-in for a host tree: host nodes in document order.
#[derive(Default)]
struct Document {
    order: Vec<HostId>,
    labels: HashMap<HostId, String>,
    next: HostId,
}

impl Document {
    fn insert(&mut self, label: impl Into<String>, before: Option<HostId>) -> HostId {
        self.next += 1;
        let host = self.next;
        let index = before
            .and_then(|anchor| self.order.iter().position(|&h| h == anchor))
            .unwrap_or(self.order.len());
        self.order.insert(index, host);
        self.labels.insert(host, label.into());
        host
    }

    fn remove(&mut self, host: HostId) {
        self.order.retain(|&h| h != host);
        self.labels.remove(&host);
    }

    fn print(&self) {
        for host in &self.order {
            let label = self.labels.get(host).map(String::as_str).unwrap_or("?");
            println!("  #{host:<3} {label}");
        }
    }
}

/// Replaces a component's output with a single host node labelled by its view.
struct DocumentReconciler {
    document: Rc<RefCell<Document>>,
    views: Views,
}

impl Reconciler for DocumentReconciler {
    fn diff_and_commit(
        &mut self,
        tree: &mut RenderTree,
        request: DiffRequest<'_>,
    ) -> Result<Option<HostId>, RenderError> {
        let id = request.instance.id();
        let Some(node) = request.instance.node() else {
            return Ok(None);
        };
        let label = {
            let views = self.views.borrow();
            let view = views.get(&id).ok_or_else(|| {
                RenderError::reconcile(format!("no view registered for component #{id}"))
            })?;
            view()
        };
        log::info!(
            "component #{id} renders {label:?} before {:?} (forced: {})",
            request.anchor,
            request.is_forced
        );

        let mut document = self.document.borrow_mut();
        if let Some(previous) = request.previous_host {
            document.remove(previous);
        }
        let host = document.insert(label, request.anchor);
        let leaf = tree.create(NodeKind::HostLeaf { host });
        if let Some(old) = tree.set_output(node, Some(leaf))? {
            tree.remove(old)?;
        }
        Ok(Some(host))
    }
}

fn counter(runtime: &StdRuntime, views: &Views, name: &'static str) -> Counter {
    let component = runtime.create_component(name, IndexMap::from([("count", 0)]));
    let view = component.clone();
    views.borrow_mut().insert(
        component.id(),
        Box::new(move || {
            view.commit_state();
            let count = view.with_state(|state| state.get("count").copied().unwrap_or_default());
            view.with_props(|name| format!("{name}: {count}"))
        }),
    );
    component
}

fn mount(tree: &mut RenderTree, parent: NodeId, component: &Counter) -> Result<(), RenderError> {
    let node = tree.create(NodeKind::ComponentHost {
        instance: component.id(),
        output: None,
    });
    tree.append_child(parent, node)?;
    component.core().set_depth(0);
    component.core().mount(node, HostAnchor::new(ROOT_CONTAINER));
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    println!("=== Ripple scheduler demo ===");
    println!("Two counters between a header and a footer. Updates are batched,");
    println!("rendered parent-first, and inserted before the next host node.");
    println!();

    let document = Rc::new(RefCell::new(Document::default()));
    let views: Views = Rc::new(RefCell::new(HashMap::default()));
    let runtime = StdRuntime::new(DocumentReconciler {
        document: Rc::clone(&document),
        views: Rc::clone(&views),
    });

    let apples = counter(&runtime, &views, "apples");
    let pears = counter(&runtime, &views, "pears");
    {
        let mut tree = runtime.runtime().tree_mut();
        let mut doc = document.borrow_mut();
        let root = tree.create(NodeKind::TransparentGroup);
        let header = tree.create(NodeKind::HostLeaf {
            host: doc.insert("== basket ==", None),
        });
        tree.append_child(root, header)?;
        mount(&mut tree, root, &apples)?;
        mount(&mut tree, root, &pears)?;
        let footer = tree.create(NodeKind::HostLeaf {
            host: doc.insert("== end ==", None),
        });
        tree.append_child(root, footer)?;
    }

    for component in [&apples, &pears] {
        runtime.runtime().force_update(component.core(), None)?;
    }
    println!("after mount:");
    document.borrow().print();

    for _ in 0..3 {
        apples.update_state(
            |state, _| Some(IndexMap::from([("count", state["count"] + 1)])),
            None,
        );
    }
    pears.set_state(
        StateUpdate::Merge(IndexMap::from([("count", 10)])),
        Some(Box::new(|| log::info!("pears committed"))),
    );
    println!("queued flushes: {}", runtime.trigger().pending());

    let stats = runtime.run_until_idle();
    println!(
        "flush rendered {} and skipped {}:",
        stats.rendered, stats.skipped
    );
    document.borrow().print();

    Ok(())
}
