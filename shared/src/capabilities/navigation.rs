//! Fire-and-forget navigation requests to the shell.

use crux_core::capability::{CapabilityContext, Operation};
use crux_core::macros::Capability;
use serde::{Deserialize, Serialize};

use crate::model::Route;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavigationOperation {
    /// Drop the whole stack and show the login screen after `after_ms`.
    ResetToLogin { after_ms: u64 },
    Open(Route),
}

impl Operation for NavigationOperation {
    type Output = ();
}

#[derive(Capability)]
pub struct Navigation<Ev> {
    context: CapabilityContext<NavigationOperation, Ev>,
}

impl<Ev> Navigation<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<NavigationOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn reset_to_login(&self, after_ms: u64) {
        self.notify(NavigationOperation::ResetToLogin { after_ms });
    }

    pub fn open(&self, route: Route) {
        self.notify(NavigationOperation::Open(route));
    }

    fn notify(&self, operation: NavigationOperation) {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            ctx.notify_shell(operation).await;
        });
    }
}
