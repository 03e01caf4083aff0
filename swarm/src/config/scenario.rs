use rama::error::BoxError;
use swarmload_lib::scenario::{self, Scenario};

/// Scenarios that can be run by name.
#[derive(Debug, Clone, Copy, clap::ValueEnum, Default, PartialEq, Eq)]
pub enum ScenarioKind {
    /// A visitor requesting `/hello` every 5 to 15 seconds.
    #[default]
    WebsiteUser,
}

impl ScenarioKind {
    /// Construct the concrete scenario for this kind.
    pub fn build(self) -> Result<Scenario, BoxError> {
        match self {
            ScenarioKind::WebsiteUser => scenario::website_user(),
        }
    }
}
