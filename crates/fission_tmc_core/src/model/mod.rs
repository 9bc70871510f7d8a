mod campaign;
mod ids;
mod reaction;
mod report;
mod yields;

pub use campaign::{
    AllParametersTrial, Campaign, CampaignSpec, Mode, ParameterDefinition, ParameterGroup,
    Perturbation, SingleParameterTrial, TrialOutcome, TrialResults,
};
pub use ids::TrialId;
pub use reaction::{Reaction, element_symbol};
pub use report::{Report, ReportValue};
pub use yields::{DEFAULT_CAPACITY, YieldFormat, YieldTable, columns};
