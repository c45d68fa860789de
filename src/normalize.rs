//! Conversation normalization.
//!
//! Reconciles embedded `system` messages with separately supplied instructions into a
//! single directive and rewrites roles the target does not accept.

use tracing::debug;

use crate::capability::{CapabilityRecord, SystemChannel};
use crate::types::{Message, Role};

/// Separator placed between merged system texts.
pub const SYSTEM_SEPARATOR: &str = "\n\n";

/// Conversation in the shape a provider expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedMessages {
    /// Side-channel directive; only populated for [`SystemChannel::SideChannel`] targets.
    pub system: Option<String>,
    /// Message list containing only roles the target accepts.
    pub messages: Vec<Message>,
}

/// Normalizes `conversation` (user input already appended) for `record`.
///
/// # Examples
///
/// ```
/// use parley_llm::capability::{capabilities, Provider};
/// use parley_llm::normalize::normalize_messages;
/// use parley_llm::types::Message;
///
/// let record = capabilities(Provider::Claude, "claude-sonnet-4-0");
/// let conversation = vec![Message::system("A"), Message::user("hello")];
/// let normalized = normalize_messages(&conversation, Some("B"), &record);
///
/// assert_eq!(normalized.system.as_deref(), Some("A\n\nB"));
/// assert_eq!(normalized.messages, vec![Message::user("hello")]);
/// ```
pub fn normalize_messages(
    conversation: &[Message],
    instructions: Option<&str>,
    record: &CapabilityRecord,
) -> NormalizedMessages {
    let system = effective_system_text(conversation, instructions);

    let mut messages = Vec::with_capacity(conversation.len() + 1);
    if let (Some(text), SystemChannel::Message) = (&system, record.system_channel) {
        messages.push(Message::system(text.clone()));
    }
    for message in conversation.iter().filter(|m| m.role != Role::System) {
        messages.push(Message::new(
            downgrade_role(message.role, record),
            message.content.clone(),
        ));
    }

    NormalizedMessages {
        system: match record.system_channel {
            SystemChannel::SideChannel => system,
            SystemChannel::Message => None,
        },
        messages,
    }
}

/// Concatenates every embedded system message and appends the instructions.
fn effective_system_text(conversation: &[Message], instructions: Option<&str>) -> Option<String> {
    let parts: Vec<&str> = conversation
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .chain(instructions)
        .filter(|text| !text.trim().is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(SYSTEM_SEPARATOR))
    }
}

fn downgrade_role(role: Role, record: &CapabilityRecord) -> Role {
    if record.supports_role(role) {
        role
    } else {
        debug!(from = %role, to = %Role::User, "role not accepted by provider, downgrading");
        Role::User
    }
}
