use std::cell::{Ref, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::component::{Callback, Component, InstanceRef};
use crate::node::RenderTree;
use crate::platform::FlushTrigger;
use crate::reconciler::Reconciler;
use crate::scheduler::{FlushStats, Scheduler, SchedulerHandle};
use crate::state::State;
use crate::update::{UpdateDriver, UpdateOutcome};
use crate::RenderError;

/// Scheduler and update driver for one application root.
#[derive(Clone)]
pub struct Runtime {
    scheduler: Scheduler,
    driver: Rc<UpdateDriver>,
}

impl Runtime {
    pub fn new(trigger: Rc<dyn FlushTrigger>, reconciler: impl Reconciler + 'static) -> Self {
        Self::with_driver(trigger, UpdateDriver::new(reconciler))
    }

    pub fn with_driver(trigger: Rc<dyn FlushTrigger>, driver: UpdateDriver) -> Self {
        let scheduler = Scheduler::new(trigger);
        let driver = Rc::new(driver);
        let weak_driver = Rc::downgrade(&driver);
        scheduler.install_renderer(move |instance| match weak_driver.upgrade() {
            Some(driver) => driver.force_update(instance, false, None),
            None => Ok(UpdateOutcome::Skipped),
        });
        Self { scheduler, driver }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.scheduler.handle()
    }

    pub fn driver(&self) -> &UpdateDriver {
        &self.driver
    }

    pub fn tree(&self) -> Ref<'_, RenderTree> {
        self.driver.tree()
    }

    pub fn tree_mut(&self) -> RefMut<'_, RenderTree> {
        self.driver.tree_mut()
    }

    /// Creates an unmounted component bound to this runtime's scheduler.
    pub fn create_component<P: 'static, S: State>(&self, props: P, state: S) -> Component<P, S> {
        Component::new(self.handle(), props, state)
    }

    /// User-initiated re-render; bypasses "skip update" hooks.
    pub fn force_update(
        &self,
        instance: &InstanceRef,
        callback: Option<Callback>,
    ) -> Result<UpdateOutcome, RenderError> {
        self.force_update_with(instance, true, callback)
    }

    /// Renders `instance` now. Flushes armed while it renders run after it
    /// returns, so a synchronous trigger never re-enters the driver.
    pub fn force_update_with(
        &self,
        instance: &InstanceRef,
        is_forced: bool,
        callback: Option<Callback>,
    ) -> Result<UpdateOutcome, RenderError> {
        self.scheduler
            .deferring(|| self.driver.force_update(instance, is_forced, callback))
    }

    pub fn flush(&self) -> Result<FlushStats, RenderError> {
        self.scheduler.flush()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("scheduler", &self.scheduler)
            .field("driver", &self.driver)
            .finish()
    }
}
