//! Stage actors
//!
//! ```text
//! SalesSpec ─► Intake ─► LeadBatch ─► Filter ─► FilteredLeadBatch
//!                                                     │
//!        requester ◄─ SummaryResponse ◄─ Summarizer ◄─┴─ Scorer
//! ```
//!
//! Every stage holds an in-flight guard while it works on a unit, so an
//! overlapping request is ignored rather than interleaved. A stage that ends
//! up with zero records logs a warning and forwards nothing.

mod filter;
mod intake;
mod scorer;
mod summarizer;

pub use filter::FilterStage;
pub use intake::IntakeStage;
pub use scorer::ScorerStage;
pub use summarizer::{SummarizerStage, SUMMARIES_KEY};

use messaging_actors::{ActorBuilder, ActorContext, ActorError, AgentProfile, StateFlag};
use tracing::info;
use types::{Address, CorrelationId, Message, MessageBody, Role, RoutingError, RoutingTable};

/// State key of the in-flight guard
pub const IN_FLIGHT_KEY: &str = "is_running";

/// A pipeline stage that can be hosted as an actor
pub trait Stage: Sized + Send + Sync + 'static {
    /// Routing role the stage answers to
    const ROLE: Role;

    /// Name used for logs and the `source` metadata stamp
    const NAME: &'static str;

    fn into_actor(self, address: Address) -> ActorBuilder;

    /// What the stage advertises to discovery
    fn profile() -> AgentProfile;

    /// Host the stage at the address the routing table holds for its role
    fn actor(self, routing: &RoutingTable) -> Result<ActorBuilder, RoutingError> {
        let address = routing.address(Self::ROLE)?.clone();
        Ok(self.into_actor(address).advertise(Self::profile()))
    }
}

async fn announce(ctx: ActorContext, role: Role) -> messaging_actors::Result<()> {
    ctx.state().set(IN_FLIGHT_KEY, serde_json::Value::Bool(false))?;
    info!(actor = %ctx.name(), role = %role, address = %ctx.address(), "Stage started");
    Ok(())
}

/// Claim the in-flight guard, logging when the stage is busy
fn begin(ctx: &ActorContext) -> Option<StateFlag> {
    let guard = ctx.state().claim(IN_FLIGHT_KEY);
    if guard.is_none() {
        info!(actor = %ctx.name(), "Already processing a unit of work - ignoring request");
    }
    guard
}

/// Send a stage's output to the role downstream of `role`
async fn pass_on<B: MessageBody>(
    ctx: &ActorContext,
    role: Role,
    body: B,
    correlation_id: Option<CorrelationId>,
) -> messaging_actors::Result<()> {
    let next = role.downstream().ok_or_else(|| {
        ActorError::configuration(format!("{role} has no downstream stage"), Some("role"))
    })?;
    ctx.send_to_role(next, forward(body, correlation_id)).await
}

/// Build a message that keeps the inbound correlation id
fn forward<B: MessageBody>(body: B, correlation_id: Option<CorrelationId>) -> Message {
    let message = Message::new(body);
    match correlation_id {
        Some(id) => message.with_correlation_id(id),
        None => message,
    }
}
