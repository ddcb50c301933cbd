pub mod agent;
pub mod config;
pub mod errors;
pub mod llm;
pub mod perception;
pub mod response;

pub use agent::actions::{DecodedAction, UiAction};
pub use agent::engine::{AgentOptions, StepOutcome, UsageTotals, VlmAgent};
pub use agent::output::{NullSink, OutputSink, Sender, TracingSink};
pub use config::{load_config, AppConfig};
pub use errors::{PilotError, PilotResult};
pub use llm::provider::VlmProvider;
pub use llm::registry::{CallProfile, ProviderRegistry};
pub use llm::types::{ContentItem, Message, VlmReply, VlmRequest};
pub use perception::types::{ParsedScreen, Point, ScreenElement};
pub use response::directive::ActionDirective;
