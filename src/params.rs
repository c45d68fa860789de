//! Generic sampling knobs to provider request fields.
//!
//! Translation resolves the thinking level first and then runs the ordered
//! [`DEGRADATION_RULES`] table. Each rule pairs a capability predicate with a field
//! rewrite, so the "ignore what the provider cannot take" policy is readable in one place.

use tracing::debug;

use crate::capability::{CapabilityRecord, ThinkingToken};
use crate::types::{RequestOptions, ThinkingLevel};

/// Provider-neutral sampling fields that survived capability gating.
///
/// Wire adapters place each present field under the provider's own name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SamplingParams {
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub top_k: Option<u32>,
    pub max_tokens: Option<u32>,
    pub presence_penalty: Option<f64>,
    pub frequency_penalty: Option<f64>,
    pub thinking: Option<ThinkingToken>,
    pub user: Option<String>,
}

impl SamplingParams {
    /// Returns the thinking token when it actually enables reasoning.
    pub fn active_thinking(&self) -> Option<ThinkingToken> {
        self.thinking.filter(ThinkingToken::is_active)
    }
}

/// One entry of the degradation table.
#[derive(Clone, Copy)]
pub struct DegradationRule {
    pub name: &'static str,
    /// Returns `true` when the rule rewrote at least one field.
    pub apply: fn(&CapabilityRecord, &mut SamplingParams) -> bool,
}

impl std::fmt::Debug for DegradationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DegradationRule")
            .field("name", &self.name)
            .finish()
    }
}

/// Ordered capability rules applied after thinking resolution.
pub const DEGRADATION_RULES: &[DegradationRule] = &[
    DegradationRule {
        name: "temperature_locked",
        apply: drop_locked_sampling,
    },
    DegradationRule {
        name: "greedy_top_p",
        apply: pin_greedy_top_p,
    },
    DegradationRule {
        name: "top_p_exclusive_with_temperature",
        apply: drop_top_p_beside_temperature,
    },
    DegradationRule {
        name: "top_k_unsupported",
        apply: drop_top_k,
    },
    DegradationRule {
        name: "penalties_unsupported",
        apply: drop_penalties,
    },
    DegradationRule {
        name: "user_unsupported",
        apply: drop_user,
    },
    DegradationRule {
        name: "thinking_budget_below_max_tokens",
        apply: fit_thinking_budget,
    },
    DegradationRule {
        name: "sampling_locked_while_thinking",
        apply: drop_sampling_while_thinking,
    },
    DegradationRule {
        name: "default_max_tokens",
        apply: fill_default_max_tokens,
    },
];

/// The ordered rule table, for auditing.
pub fn degradation_rules() -> &'static [DegradationRule] {
    DEGRADATION_RULES
}

/// Translates `request` into the fields `record` accepts.
///
/// Deterministic: identical inputs always yield identical output.
///
/// # Examples
///
/// ```
/// use parley_llm::capability::{capabilities, Provider};
/// use parley_llm::params::translate;
/// use parley_llm::types::{RequestOptions, ThinkingLevel};
///
/// let record = capabilities(Provider::OpenAi, "o4-mini");
/// let request = RequestOptions {
///     temperature: Some(0.7),
///     thinking: Some(ThinkingLevel::High),
///     ..RequestOptions::default()
/// };
/// let params = translate(&request, None, &record);
/// assert_eq!(params.temperature, None);
/// assert!(params.thinking.is_some());
/// ```
pub fn translate(
    request: &RequestOptions,
    default_thinking: Option<ThinkingLevel>,
    record: &CapabilityRecord,
) -> SamplingParams {
    let mut params = SamplingParams {
        temperature: request.temperature,
        top_p: request.top_p,
        top_k: request.top_k,
        max_tokens: request.max_tokens,
        presence_penalty: request.presence_penalty,
        frequency_penalty: request.frequency_penalty,
        thinking: resolve_thinking(request.thinking.or(default_thinking), record),
        user: request.user.clone(),
    };

    for rule in DEGRADATION_RULES {
        if (rule.apply)(record, &mut params) {
            debug!(rule = rule.name, "request fields rewritten by capability rule");
        }
    }
    params
}

/// Maps a thinking level through the record's vocabulary.
pub fn resolve_thinking(
    level: Option<ThinkingLevel>,
    record: &CapabilityRecord,
) -> Option<ThinkingToken> {
    let level = level?;
    let Some(vocabulary) = record.thinking else {
        debug!(%level, "model has no thinking control, dropping level");
        return None;
    };
    let level = if level == ThinkingLevel::Off && record.thinking_required {
        debug!("model cannot disable thinking, using lowest level");
        ThinkingLevel::Low
    } else {
        level
    };
    vocabulary.token(level)
}

fn drop_locked_sampling(record: &CapabilityRecord, params: &mut SamplingParams) -> bool {
    if !record.temperature_locked {
        return false;
    }
    let fired = params.temperature.is_some()
        || params.top_p.is_some()
        || params.presence_penalty.is_some()
        || params.frequency_penalty.is_some();
    params.temperature = None;
    params.top_p = None;
    params.presence_penalty = None;
    params.frequency_penalty = None;
    fired
}

fn greedy_applies(record: &CapabilityRecord, params: &SamplingParams) -> bool {
    record.greedy_top_p.is_some() && params.temperature == Some(0.0)
}

fn pin_greedy_top_p(record: &CapabilityRecord, params: &mut SamplingParams) -> bool {
    if !greedy_applies(record, params) {
        return false;
    }
    params.top_p = record.greedy_top_p;
    true
}

fn drop_top_p_beside_temperature(record: &CapabilityRecord, params: &mut SamplingParams) -> bool {
    if !record.top_p_exclusive_with_temperature
        || params.temperature.is_none()
        || greedy_applies(record, params)
    {
        return false;
    }
    params.top_p.take().is_some()
}

fn drop_top_k(record: &CapabilityRecord, params: &mut SamplingParams) -> bool {
    !record.accepts_top_k && params.top_k.take().is_some()
}

fn drop_penalties(record: &CapabilityRecord, params: &mut SamplingParams) -> bool {
    if record.accepts_penalties {
        return false;
    }
    let presence = params.presence_penalty.take().is_some();
    let frequency = params.frequency_penalty.take().is_some();
    presence || frequency
}

fn drop_user(record: &CapabilityRecord, params: &mut SamplingParams) -> bool {
    !record.accepts_user && params.user.take().is_some()
}

/// Shrinks a budget that would not fit under the caller's `max_tokens`, or drops thinking
/// when the shrunk budget falls below the provider minimum.
fn fit_thinking_budget(record: &CapabilityRecord, params: &mut SamplingParams) -> bool {
    let (Some(min_budget), Some(max_tokens), Some(ThinkingToken::Budget(budget))) = (
        record.min_thinking_budget,
        params.max_tokens,
        params.active_thinking(),
    ) else {
        return false;
    };
    if budget < max_tokens {
        return false;
    }
    let shrunk = max_tokens.saturating_sub(1);
    if shrunk >= min_budget {
        debug!(budget, shrunk, max_tokens, "thinking budget shrunk below max_tokens");
        params.thinking = Some(ThinkingToken::Budget(shrunk));
    } else {
        debug!(
            budget,
            max_tokens,
            min_budget,
            "max_tokens leaves no room for thinking, dropping it"
        );
        params.thinking = None;
    }
    true
}

fn drop_sampling_while_thinking(record: &CapabilityRecord, params: &mut SamplingParams) -> bool {
    if !record.sampling_locked_while_thinking || params.active_thinking().is_none() {
        return false;
    }
    let temperature = params.temperature.take().is_some();
    let top_p = params.top_p.take().is_some();
    let top_k = params.top_k.take().is_some();
    temperature || top_p || top_k
}

fn fill_default_max_tokens(record: &CapabilityRecord, params: &mut SamplingParams) -> bool {
    let (None, Some(default)) = (params.max_tokens, record.default_max_tokens) else {
        return false;
    };
    let budget = params
        .active_thinking()
        .and_then(|token| token.budget())
        .unwrap_or(0);
    params.max_tokens = Some(default.saturating_add(budget));
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Provider, capabilities};

    fn full_request() -> RequestOptions {
        RequestOptions {
            temperature: Some(0.7),
            top_p: Some(0.9),
            top_k: Some(40),
            max_tokens: Some(512),
            presence_penalty: Some(0.5),
            frequency_penalty: Some(0.25),
            user: Some("user-42".into()),
            ..RequestOptions::default()
        }
    }

    #[test]
    fn temperature_locked_models_never_emit_sampling_fields() {
        let record = capabilities(Provider::OpenAi, "o3");
        let combos = [
            (Some(0.0), None, None, None),
            (Some(1.3), Some(0.1), Some(2.0), Some(-2.0)),
            (None, Some(0.5), None, Some(1.0)),
            (None, None, Some(0.3), None),
        ];
        for (temperature, top_p, presence, frequency) in combos {
            let request = RequestOptions {
                temperature,
                top_p,
                presence_penalty: presence,
                frequency_penalty: frequency,
                ..RequestOptions::default()
            };
            let params = translate(&request, None, &record);
            assert_eq!(params.temperature, None);
            assert_eq!(params.top_p, None);
            assert_eq!(params.presence_penalty, None);
            assert_eq!(params.frequency_penalty, None);
        }
    }

    #[test]
    fn temperature_wins_over_top_p_when_exclusive() {
        let record = capabilities(Provider::OpenAi, "gpt-4o");
        let params = translate(&full_request(), None, &record);
        assert_eq!(params.temperature, Some(0.7));
        assert_eq!(params.top_p, None);

        let request = RequestOptions {
            top_p: Some(0.9),
            ..RequestOptions::default()
        };
        assert_eq!(translate(&request, None, &record).top_p, Some(0.9));
    }

    #[test]
    fn non_exclusive_providers_keep_both() {
        let record = capabilities(Provider::Gemini, "gemini-2.0-flash");
        let params = translate(&full_request(), None, &record);
        assert_eq!(params.temperature, Some(0.7));
        assert_eq!(params.top_p, Some(0.9));
        assert_eq!(params.top_k, Some(40));
    }

    #[test]
    fn greedy_requests_pin_top_p_on_mistral() {
        let record = capabilities(Provider::Mistral, "mistral-small-latest");
        let request = RequestOptions {
            temperature: Some(0.0),
            top_p: Some(0.3),
            ..RequestOptions::default()
        };
        let params = translate(&request, None, &record);
        assert_eq!(params.temperature, Some(0.0));
        assert_eq!(params.top_p, Some(1.0));

        let request = RequestOptions {
            temperature: Some(0.4),
            top_p: Some(0.3),
            ..RequestOptions::default()
        };
        let params = translate(&request, None, &record);
        assert_eq!(params.top_p, None);
    }

    #[test]
    fn unsupported_fields_are_dropped() {
        let groq = capabilities(Provider::Groq, "llama-3.1-8b-instant");
        let params = translate(&full_request(), None, &groq);
        assert_eq!(params.top_k, None);
        assert_eq!(params.presence_penalty, None);
        assert_eq!(params.frequency_penalty, None);
        assert_eq!(params.user.as_deref(), Some("user-42"));

        let mistral = capabilities(Provider::Mistral, "mistral-large-latest");
        assert_eq!(translate(&full_request(), None, &mistral).user, None);
    }

    #[test]
    fn thinking_is_dropped_without_error_when_unsupported() {
        let record = capabilities(Provider::OpenAi, "gpt-4o");
        let request = RequestOptions {
            thinking: Some(ThinkingLevel::High),
            ..RequestOptions::default()
        };
        assert_eq!(translate(&request, None, &record).thinking, None);
    }

    #[test]
    fn request_thinking_overrides_client_default() {
        let record = capabilities(Provider::Gemini, "gemini-2.5-flash");
        let request = RequestOptions {
            thinking: Some(ThinkingLevel::Low),
            ..RequestOptions::default()
        };
        let params = translate(&request, Some(ThinkingLevel::High), &record);
        assert_eq!(params.thinking, Some(ThinkingToken::Budget(1024)));

        let params = translate(&RequestOptions::default(), Some(ThinkingLevel::High), &record);
        assert_eq!(params.thinking, Some(ThinkingToken::Budget(24576)));
    }

    #[test]
    fn off_is_forced_to_lowest_level_on_thinking_only_models() {
        let pro = capabilities(Provider::Gemini, "gemini-2.5-pro");
        assert_eq!(
            resolve_thinking(Some(ThinkingLevel::Off), &pro),
            Some(ThinkingToken::Budget(1024))
        );

        let flash = capabilities(Provider::Gemini, "gemini-2.5-flash");
        assert_eq!(
            resolve_thinking(Some(ThinkingLevel::Off), &flash),
            Some(ThinkingToken::Budget(0))
        );

        let o3 = capabilities(Provider::OpenAi, "o3");
        assert_eq!(
            resolve_thinking(Some(ThinkingLevel::Off), &o3),
            Some(ThinkingToken::Effort("low"))
        );
    }

    #[test]
    fn claude_thinking_drops_sampling_and_grows_default_max_tokens() {
        let record = capabilities(Provider::Claude, "claude-sonnet-4-0");
        let request = RequestOptions {
            temperature: Some(0.2),
            top_k: Some(10),
            thinking: Some(ThinkingLevel::Medium),
            ..RequestOptions::default()
        };
        let params = translate(&request, None, &record);
        assert_eq!(params.temperature, None);
        assert_eq!(params.top_k, None);
        assert_eq!(params.thinking, Some(ThinkingToken::Budget(8192)));
        assert_eq!(params.max_tokens, Some(4096 + 8192));
    }

    #[test]
    fn claude_budget_is_fitted_under_explicit_max_tokens() {
        let record = capabilities(Provider::Claude, "claude-sonnet-4-0");

        let request = RequestOptions {
            max_tokens: Some(1000),
            temperature: Some(0.2),
            thinking: Some(ThinkingLevel::Low),
            ..RequestOptions::default()
        };
        let params = translate(&request, None, &record);
        assert_eq!(params.thinking, None);
        assert_eq!(params.max_tokens, Some(1000));
        assert_eq!(params.temperature, Some(0.2));

        let request = RequestOptions {
            max_tokens: Some(4000),
            thinking: Some(ThinkingLevel::Medium),
            ..RequestOptions::default()
        };
        let params = translate(&request, None, &record);
        assert_eq!(params.thinking, Some(ThinkingToken::Budget(3999)));
        assert_eq!(params.max_tokens, Some(4000));

        let request = RequestOptions {
            max_tokens: Some(3000),
            thinking: Some(ThinkingLevel::Low),
            ..RequestOptions::default()
        };
        let params = translate(&request, None, &record);
        assert_eq!(params.thinking, Some(ThinkingToken::Budget(2048)));
    }

    #[test]
    fn gemini_budget_is_not_tied_to_max_tokens() {
        let record = capabilities(Provider::Gemini, "gemini-2.5-flash");
        let request = RequestOptions {
            max_tokens: Some(500),
            thinking: Some(ThinkingLevel::Medium),
            ..RequestOptions::default()
        };
        let params = translate(&request, None, &record);
        assert_eq!(params.thinking, Some(ThinkingToken::Budget(8192)));
        assert_eq!(params.max_tokens, Some(500));
    }

    #[test]
    fn explicit_max_tokens_is_passed_through_unclamped() {
        let record = capabilities(Provider::Claude, "claude-3-5-haiku-latest");
        let request = RequestOptions {
            max_tokens: Some(1_000_000),
            ..RequestOptions::default()
        };
        assert_eq!(translate(&request, None, &record).max_tokens, Some(1_000_000));
        assert_eq!(
            translate(&RequestOptions::default(), None, &record).max_tokens,
            Some(4096)
        );
    }

    #[test]
    fn translation_is_deterministic() {
        let record = capabilities(Provider::Claude, "claude-3-7-sonnet-latest");
        let request = RequestOptions {
            thinking: Some(ThinkingLevel::High),
            ..full_request()
        };
        assert_eq!(
            translate(&request, None, &record),
            translate(&request, None, &record)
        );
    }

    #[test]
    fn rule_table_is_ordered_with_lock_first() {
        let names: Vec<_> = degradation_rules().iter().map(|rule| rule.name).collect();
        assert_eq!(names.first(), Some(&"temperature_locked"));
        let greedy = names.iter().position(|n| *n == "greedy_top_p").unwrap();
        let exclusive = names
            .iter()
            .position(|n| *n == "top_p_exclusive_with_temperature")
            .unwrap();
        assert!(greedy < exclusive);
        let fit = names
            .iter()
            .position(|n| *n == "thinking_budget_below_max_tokens")
            .unwrap();
        let locked = names
            .iter()
            .position(|n| *n == "sampling_locked_while_thinking")
            .unwrap();
        assert!(fit < locked);
    }
}
