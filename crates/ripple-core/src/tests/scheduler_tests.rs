use super::*;
use crate::platform::TestTrigger;
use crate::ComponentId;
use std::cell::RefCell;

struct Fixture {
    trigger: Rc<TestTrigger>,
    scheduler: Scheduler,
    rendered: Rc<RefCell<Vec<ComponentId>>>,
}

fn fixture() -> Fixture {
    let trigger = Rc::new(TestTrigger::default());
    let scheduler = Scheduler::new(trigger.clone());
    let rendered = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&rendered);
    scheduler.install_renderer(move |instance| {
        log.borrow_mut().push(instance.id());
        Ok(UpdateOutcome::Rendered { host: None })
    });
    Fixture {
        trigger,
        scheduler,
        rendered,
    }
}

fn instance(scheduler: &Scheduler, depth: usize) -> InstanceRef {
    let core = ComponentCore::new(scheduler.handle());
    core.set_depth(depth);
    core
}

#[test]
fn duplicate_enqueue_renders_once() {
    let fx = fixture();
    let a = instance(&fx.scheduler, 0);

    fx.scheduler.enqueue(&a);
    fx.scheduler.enqueue(&a);

    assert_eq!(fx.scheduler.len(), 1);
    assert_eq!(fx.trigger.scheduled(), 1);
    let stats = fx.trigger.run().expect("armed").expect("flush succeeds");
    assert_eq!(stats, FlushStats { rendered: 1, skipped: 0 });
    assert_eq!(fx.rendered.borrow().as_slice(), &[a.id()]);
    assert!(!a.is_dirty());
}

#[test]
fn shallow_instances_render_first() {
    let fx = fixture();
    let deep = instance(&fx.scheduler, 2);
    let root = instance(&fx.scheduler, 0);
    let middle = instance(&fx.scheduler, 1);
    let sibling = instance(&fx.scheduler, 2);

    for core in [&deep, &root, &sibling, &middle] {
        fx.scheduler.enqueue(core);
    }
    fx.scheduler.flush().expect("flush succeeds");

    assert_eq!(
        fx.rendered.borrow().as_slice(),
        &[root.id(), middle.id(), deep.id(), sibling.id()]
    );
}

#[test]
fn only_one_trigger_per_pending_period() {
    let fx = fixture();
    let a = instance(&fx.scheduler, 0);
    let b = instance(&fx.scheduler, 1);

    fx.scheduler.enqueue(&a);
    fx.scheduler.enqueue(&b);
    assert_eq!(fx.trigger.scheduled(), 1);
    assert!(fx.scheduler.is_armed());

    fx.trigger.run();
    assert!(!fx.scheduler.is_armed());

    fx.scheduler.enqueue(&a);
    assert_eq!(fx.trigger.scheduled(), 2);
}

#[test]
fn renders_queued_during_flush_drain_in_the_same_flush() {
    let trigger = Rc::new(TestTrigger::default());
    let scheduler = Scheduler::new(trigger.clone());
    let parent = instance(&scheduler, 0);
    let child = instance(&scheduler, 1);
    let rendered = Rc::new(RefCell::new(Vec::new()));
    {
        let log = Rc::clone(&rendered);
        let parent_id = parent.id();
        let child = Rc::clone(&child);
        scheduler.install_renderer(move |instance| {
            log.borrow_mut().push(instance.id());
            if instance.id() == parent_id {
                child.schedule_render();
            }
            Ok(UpdateOutcome::Rendered { host: None })
        });
    }

    scheduler.enqueue(&parent);
    let stats = trigger.run().expect("armed").expect("flush succeeds");

    assert_eq!(stats.rendered, 2);
    assert_eq!(rendered.borrow().as_slice(), &[parent.id(), child.id()]);
    assert_eq!(trigger.scheduled(), 1);
    assert_eq!(trigger.pending(), 0);
}

#[test]
fn empty_flush_is_a_no_op() {
    let fx = fixture();

    for _ in 0..3 {
        assert_eq!(fx.scheduler.flush().expect("flush"), FlushStats::default());
    }

    assert_eq!(fx.trigger.scheduled(), 0);
    assert!(fx.rendered.borrow().is_empty());
}

#[test]
fn instances_rendered_early_are_skipped() {
    let fx = fixture();
    let a = instance(&fx.scheduler, 0);
    let b = instance(&fx.scheduler, 1);
    fx.scheduler.enqueue(&a);
    fx.scheduler.enqueue(&b);

    b.mark_rendered();
    let stats = fx.scheduler.flush().expect("flush succeeds");

    assert_eq!(stats, FlushStats { rendered: 1, skipped: 1 });
    assert_eq!(fx.rendered.borrow().as_slice(), &[a.id()]);
}

#[test]
fn dropped_instances_are_skipped() {
    let fx = fixture();
    let kept = instance(&fx.scheduler, 1);
    {
        let dropped = instance(&fx.scheduler, 0);
        fx.scheduler.enqueue(&dropped);
    }
    fx.scheduler.enqueue(&kept);

    let stats = fx.scheduler.flush().expect("flush succeeds");

    assert_eq!(stats, FlushStats { rendered: 1, skipped: 1 });
    assert_eq!(fx.rendered.borrow().as_slice(), &[kept.id()]);
}

#[test]
fn render_error_aborts_the_drain() {
    let trigger = Rc::new(TestTrigger::default());
    let scheduler = Scheduler::new(trigger.clone());
    let failing = instance(&scheduler, 0);
    let waiting = instance(&scheduler, 1);
    let failing_id = failing.id();
    let rendered = Rc::new(RefCell::new(Vec::new()));
    {
        let log = Rc::clone(&rendered);
        scheduler.install_renderer(move |instance| {
            if instance.id() == failing_id {
                return Err(RenderError::reconcile("render exploded"));
            }
            log.borrow_mut().push(instance.id());
            Ok(UpdateOutcome::Rendered { host: None })
        });
    }

    scheduler.enqueue(&failing);
    scheduler.enqueue(&waiting);
    let err = trigger.run().expect("armed").expect_err("render fails");

    assert_eq!(err.to_string(), "reconcile failed: render exploded");
    assert!(rendered.borrow().is_empty());
    assert_eq!(scheduler.len(), 1);
    assert!(waiting.is_dirty());
    assert!(!scheduler.is_armed());

    // Re-enqueueing a still-dirty instance does not arm a flush on its own.
    scheduler.enqueue(&waiting);
    assert_eq!(trigger.scheduled(), 1);

    let other = instance(&scheduler, 2);
    scheduler.enqueue(&other);
    assert_eq!(trigger.scheduled(), 2);
    trigger.run().expect("armed").expect("flush succeeds");
    assert_eq!(rendered.borrow().as_slice(), &[waiting.id(), other.id()]);
}

#[test]
fn missing_renderer_skips_entries() {
    let trigger = Rc::new(TestTrigger::default());
    let scheduler = Scheduler::new(trigger.clone());
    let a = instance(&scheduler, 0);
    scheduler.enqueue(&a);

    let stats = scheduler.flush().expect("flush succeeds");

    assert_eq!(stats, FlushStats { rendered: 0, skipped: 1 });
    assert!(!a.is_dirty());
}

#[test]
fn handle_outlives_scheduler_quietly() {
    let trigger = Rc::new(TestTrigger::default());
    let handle = Scheduler::new(trigger.clone()).handle();
    let core = ComponentCore::new(handle.clone());

    handle.enqueue(&core);

    assert!(!handle.is_alive());
    assert!(!core.is_dirty());
    assert_eq!(trigger.scheduled(), 0);
    assert_eq!(handle.flush().expect("flush"), FlushStats::default());
}

#[test]
fn immediate_trigger_flushes_inside_enqueue() {
    let trigger = Rc::new(crate::platform::ImmediateTrigger::new());
    let scheduler = Scheduler::new(trigger.clone());
    let rendered = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&rendered);
    scheduler.install_renderer(move |instance| {
        log.borrow_mut().push(instance.id());
        if instance.depth() > 0 {
            return Err(RenderError::reconcile("nested render failed"));
        }
        Ok(UpdateOutcome::Rendered { host: None })
    });
    let ok = instance(&scheduler, 0);
    let failing = instance(&scheduler, 1);

    scheduler.enqueue(&ok);
    assert_eq!(rendered.borrow().as_slice(), &[ok.id()]);
    assert!(scheduler.is_empty());
    assert!(!scheduler.is_armed());
    assert!(trigger.take_error().is_none());

    scheduler.enqueue(&failing);
    assert!(matches!(trigger.take_error(), Some(RenderError::Reconcile(_))));
    assert!(trigger.take_error().is_none());
    assert!(!scheduler.is_armed());
}

#[test]
fn skipped_entry_delivers_callbacks_of_an_earlier_commit() {
    let fx = fixture();
    let child = instance(&fx.scheduler, 1);
    let delivered = Rc::new(Cell::new(false));
    let flag = Rc::clone(&delivered);
    child.push_callback(Box::new(move || flag.set(true)));
    fx.scheduler.enqueue(&child);

    child.mark_rendered();
    assert!(!delivered.get());
    let stats = fx.scheduler.flush().expect("flush succeeds");

    assert_eq!(stats, FlushStats { rendered: 0, skipped: 1 });
    assert!(delivered.get());
    assert_eq!(child.pending_callbacks(), 0);
    assert!(fx.rendered.borrow().is_empty());
}

#[test]
fn deferring_replays_a_synchronous_flush_afterwards() {
    let trigger = Rc::new(crate::platform::ImmediateTrigger::new());
    let scheduler = Scheduler::new(trigger.clone());
    let rendered = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&rendered);
    scheduler.install_renderer(move |instance| {
        log.borrow_mut().push(instance.id());
        Ok(UpdateOutcome::Rendered { host: None })
    });
    let sibling = instance(&scheduler, 1);

    let rendered_inside = scheduler.deferring(|| {
        scheduler.enqueue(&sibling);
        rendered.borrow().len()
    });

    assert_eq!(rendered_inside, 0);
    assert_eq!(rendered.borrow().as_slice(), &[sibling.id()]);
    assert!(!sibling.is_dirty());
    assert!(scheduler.is_empty());
    assert!(!scheduler.is_armed());
    assert!(trigger.take_error().is_none());
}

#[test]
fn reentrant_render_leaves_the_entry_queued_and_dirty() {
    let trigger = Rc::new(TestTrigger::default());
    let scheduler = Scheduler::new(trigger.clone());
    let rendered = Rc::new(RefCell::new(Vec::new()));
    let busy = Rc::new(Cell::new(true));
    {
        let rendered = Rc::clone(&rendered);
        let busy = Rc::clone(&busy);
        scheduler.install_renderer(move |instance| {
            if busy.replace(false) {
                return Err(RenderError::Reentrant);
            }
            rendered.borrow_mut().push(instance.id());
            Ok(UpdateOutcome::Rendered { host: None })
        });
    }
    let first = instance(&scheduler, 0);
    let second = instance(&scheduler, 1);
    scheduler.enqueue(&first);
    scheduler.enqueue(&second);

    let err = scheduler.flush().expect_err("driver busy");
    assert!(matches!(err, RenderError::Reentrant));
    assert!(first.is_dirty());
    assert_eq!(scheduler.len(), 2);
    assert!(!scheduler.is_armed());

    let later = instance(&scheduler, 0);
    scheduler.enqueue(&later);
    assert_eq!(trigger.scheduled(), 2);
    trigger.run().expect("armed").expect("flush succeeds");

    assert_eq!(
        rendered.borrow().as_slice(),
        &[first.id(), later.id(), second.id()]
    );
}
