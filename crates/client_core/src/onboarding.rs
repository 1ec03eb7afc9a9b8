//! Profile-completion wizard.
//!
//! Step 2 is chosen from the stored answers every time it is viewed, so going
//! back to step 1 and switching actor kind re-routes through the other
//! variant. Answers are a tagged union: individual and organization fields
//! can never coexist.

use shared::{
    domain::{Role, TransportMode},
    protocol::{AccountType, ProfileUpdate},
};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WizardStep {
    ChooseActorKind,
    Details,
    Confirmation,
}

impl WizardStep {
    pub fn number(self) -> u8 {
        match self {
            WizardStep::ChooseActorKind => 1,
            WizardStep::Details => 2,
            WizardStep::Confirmation => 3,
        }
    }

    fn next(self) -> Option<Self> {
        match self {
            WizardStep::ChooseActorKind => Some(WizardStep::Details),
            WizardStep::Details => Some(WizardStep::Confirmation),
            WizardStep::Confirmation => None,
        }
    }

    fn previous(self) -> Option<Self> {
        match self {
            WizardStep::ChooseActorKind => None,
            WizardStep::Details => Some(WizardStep::ChooseActorKind),
            WizardStep::Confirmation => Some(WizardStep::Details),
        }
    }
}

/// Which screen to render for the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepView {
    ChooseActorKind,
    IndividualRole,
    OrganizationDetails,
    Confirmation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorKind {
    Individual,
    Organization,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizationDetails {
    pub name: String,
    /// Marketplace side the organization declares; drives both validation
    /// and the post-onboarding dashboard.
    pub organization_type: Option<Role>,
    pub address: String,
    pub industry: String,
    pub modes: Vec<TransportMode>,
}

impl OrganizationDetails {
    pub fn toggle_mode(&mut self, mode: TransportMode) {
        if let Some(index) = self.modes.iter().position(|m| *m == mode) {
            self.modes.remove(index);
        } else {
            self.modes.push(mode);
        }
    }

    pub fn is_complete(&self) -> bool {
        let base = !self.name.trim().is_empty() && !self.address.trim().is_empty();
        match self.organization_type {
            Some(Role::Shipper) => base && !self.industry.trim().is_empty(),
            Some(Role::Carrier) => base && !self.modes.is_empty(),
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActorAnswers {
    Individual { sub_role: Option<Role> },
    Organization(OrganizationDetails),
}

impl ActorAnswers {
    pub fn kind(&self) -> ActorKind {
        match self {
            ActorAnswers::Individual { .. } => ActorKind::Individual,
            ActorAnswers::Organization(_) => ActorKind::Organization,
        }
    }

    fn details_complete(&self) -> bool {
        match self {
            ActorAnswers::Individual { sub_role } => sub_role.is_some(),
            ActorAnswers::Organization(details) => details.is_complete(),
        }
    }

    fn role(&self) -> Option<Role> {
        match self {
            ActorAnswers::Individual { sub_role } => *sub_role,
            ActorAnswers::Organization(details) => details.organization_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardRoute {
    Shipper,
    Carrier,
}

impl DashboardRoute {
    pub fn path(self) -> &'static str {
        match self {
            DashboardRoute::Shipper => "/dashboard/shipper",
            DashboardRoute::Carrier => "/dashboard/carrier",
        }
    }
}

impl From<Role> for DashboardRoute {
    fn from(role: Role) -> Self {
        match role {
            Role::Shipper => DashboardRoute::Shipper,
            Role::Carrier => DashboardRoute::Carrier,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OnboardingError {
    #[error("step {step} is missing required answers")]
    StepIncomplete { step: u8 },
    #[error("onboarding is already complete")]
    AlreadyComplete,
    #[error("answers are read-only on the confirmation step")]
    Finalized,
    #[error("answer requires the {expected:?} branch")]
    WrongBranch { expected: ActorKind },
    #[error("destination is only available on the confirmation step (current step {step})")]
    NotAtTerminalStep { step: u8 },
    #[error("onboarding answers are incomplete")]
    IncompleteAnswers,
}

#[derive(Debug, Clone)]
pub struct OnboardingFlowController {
    step: WizardStep,
    answers: Option<ActorAnswers>,
}

impl Default for OnboardingFlowController {
    fn default() -> Self {
        Self::new()
    }
}

impl OnboardingFlowController {
    pub fn new() -> Self {
        Self {
            step: WizardStep::ChooseActorKind,
            answers: None,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn answers(&self) -> Option<&ActorAnswers> {
        self.answers.as_ref()
    }

    pub fn actor_kind(&self) -> Option<ActorKind> {
        self.answers.as_ref().map(ActorAnswers::kind)
    }

    pub fn is_complete(&self) -> bool {
        self.step == WizardStep::Confirmation
    }

    pub fn view(&self) -> StepView {
        match (self.step, self.actor_kind()) {
            (WizardStep::ChooseActorKind, _) | (WizardStep::Details, None) => {
                StepView::ChooseActorKind
            }
            (WizardStep::Details, Some(ActorKind::Individual)) => StepView::IndividualRole,
            (WizardStep::Details, Some(ActorKind::Organization)) => StepView::OrganizationDetails,
            (WizardStep::Confirmation, _) => StepView::Confirmation,
        }
    }

    /// Re-selecting the current kind keeps its answers; switching kind starts
    /// the other branch empty.
    pub fn choose_actor_kind(&mut self, kind: ActorKind) -> Result<(), OnboardingError> {
        self.ensure_editable()?;
        if self.actor_kind() == Some(kind) {
            return Ok(());
        }
        self.answers = Some(match kind {
            ActorKind::Individual => ActorAnswers::Individual { sub_role: None },
            ActorKind::Organization => ActorAnswers::Organization(OrganizationDetails::default()),
        });
        Ok(())
    }

    pub fn choose_sub_role(&mut self, role: Role) -> Result<(), OnboardingError> {
        self.ensure_editable()?;
        match &mut self.answers {
            Some(ActorAnswers::Individual { sub_role }) => {
                *sub_role = Some(role);
                Ok(())
            }
            _ => Err(OnboardingError::WrongBranch {
                expected: ActorKind::Individual,
            }),
        }
    }

    pub fn organization_mut(&mut self) -> Result<&mut OrganizationDetails, OnboardingError> {
        self.ensure_editable()?;
        match &mut self.answers {
            Some(ActorAnswers::Organization(details)) => Ok(details),
            _ => Err(OnboardingError::WrongBranch {
                expected: ActorKind::Organization,
            }),
        }
    }

    pub fn can_advance(&self) -> bool {
        match self.step {
            WizardStep::ChooseActorKind => self.answers.is_some(),
            WizardStep::Details => self
                .answers
                .as_ref()
                .is_some_and(ActorAnswers::details_complete),
            WizardStep::Confirmation => false,
        }
    }

    /// Moves one step forward. The step is unchanged on error.
    pub fn advance(&mut self) -> Result<WizardStep, OnboardingError> {
        let Some(next) = self.step.next() else {
            return Err(OnboardingError::AlreadyComplete);
        };
        if !self.can_advance() {
            return Err(OnboardingError::StepIncomplete {
                step: self.step.number(),
            });
        }
        self.step = next;
        Ok(next)
    }

    /// Moves one step back; stays put on the first step.
    pub fn retreat(&mut self) -> WizardStep {
        if let Some(previous) = self.step.previous() {
            self.step = previous;
        }
        self.step
    }

    pub fn compute_destination(&self) -> Result<DashboardRoute, OnboardingError> {
        let answers = self.finalized_answers()?;
        answers
            .role()
            .map(DashboardRoute::from)
            .ok_or(OnboardingError::IncompleteAnswers)
    }

    /// Body for the profile endpoint, available once the flow is complete.
    pub fn profile_update(&self) -> Result<ProfileUpdate, OnboardingError> {
        let answers = self.finalized_answers()?;
        let role = answers.role().ok_or(OnboardingError::IncompleteAnswers)?;
        let update = match answers {
            ActorAnswers::Individual { .. } => ProfileUpdate {
                account_type: AccountType::Individual,
                role,
                org_name: None,
                address: None,
                industry: None,
                modes: Vec::new(),
            },
            ActorAnswers::Organization(details) => ProfileUpdate {
                account_type: AccountType::Organization,
                role,
                org_name: Some(details.name.trim().to_string()),
                address: Some(details.address.trim().to_string()),
                industry: match role {
                    Role::Shipper => Some(details.industry.trim().to_string()),
                    Role::Carrier => None,
                },
                modes: match role {
                    Role::Shipper => Vec::new(),
                    Role::Carrier => details.modes.clone(),
                },
            },
        };
        Ok(update)
    }

    fn finalized_answers(&self) -> Result<&ActorAnswers, OnboardingError> {
        if self.step != WizardStep::Confirmation {
            return Err(OnboardingError::NotAtTerminalStep {
                step: self.step.number(),
            });
        }
        self.answers
            .as_ref()
            .filter(|answers| answers.details_complete())
            .ok_or(OnboardingError::IncompleteAnswers)
    }

    fn ensure_editable(&self) -> Result<(), OnboardingError> {
        if self.step == WizardStep::Confirmation {
            return Err(OnboardingError::Finalized);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/onboarding_tests.rs"]
mod tests;
