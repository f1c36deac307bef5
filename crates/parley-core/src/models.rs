//! Static model catalog.
//!
//! Advisory only: an id outside this list is passed to the vendor
//! verbatim, so newly released models work without a code change.

use crate::providers::ProviderKind;

/// One known model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelOption {
    pub id: &'static str,
    pub label: &'static str,
    pub provider: ProviderKind,
}

const CATALOG: &[ModelOption] = &[
    ModelOption {
        id: "claude-opus-4-1",
        label: "Claude Opus 4.1",
        provider: ProviderKind::Anthropic,
    },
    ModelOption {
        id: "claude-sonnet-4-5",
        label: "Claude Sonnet 4.5",
        provider: ProviderKind::Anthropic,
    },
    ModelOption {
        id: "claude-haiku-4-5",
        label: "Claude Haiku 4.5",
        provider: ProviderKind::Anthropic,
    },
    ModelOption {
        id: "gemini-2.5-pro",
        label: "Gemini 2.5 Pro",
        provider: ProviderKind::Google,
    },
    ModelOption {
        id: "gemini-2.5-flash",
        label: "Gemini 2.5 Flash",
        provider: ProviderKind::Google,
    },
    ModelOption {
        id: "gemini-2.5-flash-lite",
        label: "Gemini 2.5 Flash-Lite",
        provider: ProviderKind::Google,
    },
    ModelOption {
        id: "gpt-5",
        label: "GPT-5",
        provider: ProviderKind::OpenAI,
    },
    ModelOption {
        id: "gpt-5-mini",
        label: "GPT-5 mini",
        provider: ProviderKind::OpenAI,
    },
    ModelOption {
        id: "gpt-5-nano",
        label: "GPT-5 nano",
        provider: ProviderKind::OpenAI,
    },
    ModelOption {
        id: "gpt-5-pro",
        label: "GPT-5 pro",
        provider: ProviderKind::OpenAI,
    },
    ModelOption {
        id: "gpt-4-1",
        label: "GPT-4.1",
        provider: ProviderKind::OpenAI,
    },
];

/// Returns the full catalog.
pub fn all() -> &'static [ModelOption] {
    CATALOG
}

/// Returns the known models of one provider.
pub fn for_provider(kind: ProviderKind) -> impl Iterator<Item = &'static ModelOption> {
    CATALOG.iter().filter(move |m| m.provider == kind)
}

/// Returns the default model of a provider (first catalog entry).
pub fn default_model(kind: ProviderKind) -> &'static ModelOption {
    for_provider(kind)
        .next()
        .expect("every provider has at least one catalog entry")
}

/// Looks up a model by id.
pub fn find(id: &str) -> Option<&'static ModelOption> {
    CATALOG.iter().find(|m| m.id == id)
}
